// SPDX-License-Identifier: GPL-3.0-only

//! Capture lifecycle controller
//!
//! [`ScannerController`] owns the capture session and the highlight
//! geometry for one scanning surface. It queries the permission gate on
//! load, routes the user through the permission or settings dialog when
//! needed, starts and stops the session with the view lifecycle, and
//! forwards the first decoded QR payload to the result sink exactly once.
//!
//! The controller holds its host, event sink, and result sink weakly: a
//! collaborator that has been dropped turns the notification into a no-op.

pub mod detector;
pub mod gst;
pub mod session;
pub mod types;

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::alerts::{self, Alert};
use crate::constants::ALERT_DELAY;
use crate::permission::{CameraAccess, PermissionState};
use crate::sinks::{EventSink, ResultSink, Severity};

use self::detector::{Detection, Symbology};
use self::session::{CaptureBackend, CaptureSession, DetectionHandler, Orientation};
use self::types::{Color, Rect};

/// Construction-time options for a scanner controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Close the presented view on the first successful decode, delivering
    /// the result only after dismissal completes
    pub auto_dismiss_on_detect: bool,
    /// Delay before permission dialogs are presented
    pub alert_delay: Duration,
    /// Tint forwarded to the host's placeholder and highlight rendering
    pub tint: Color,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            auto_dismiss_on_detect: true,
            alert_delay: ALERT_DELAY,
            tint: Color::ACCENT,
        }
    }
}

/// Lifecycle phase of a scanner controller
///
/// `Finished` is terminal for the decode flow; [`ScannerController::resume`]
/// can restart the session afterwards, but the result sink never fires a
/// second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerPhase {
    Uninitialized,
    /// Waiting for the user to answer the permission dialog
    AwaitingPermission,
    /// Access denied, restricted, or unreportable; settings dialog route
    Denied,
    /// No usable camera, or the pipeline could not be constructed
    Unavailable,
    /// Session configured but not started
    Ready,
    Running,
    Stopped,
    /// A payload was decoded and the session stopped
    Finished,
}

/// Presentation seam for the surface hosting the scanner
///
/// The host shows dialogs and performs the dismissal of the scanning view.
/// `dismiss` must invoke `on_complete` once the dismissal (including any
/// animation) has finished.
pub trait ScannerHost: Send + Sync {
    fn present_alert(&self, alert: Alert);
    fn dismiss(&self, on_complete: Box<dyn FnOnce() + Send>);
}

#[derive(Debug, Clone, Copy)]
enum SessionOp {
    Start,
    Stop,
}

struct Inner {
    phase: ScannerPhase,
    session: Option<Arc<dyn CaptureSession>>,
    /// View-space rectangle over the last detected code, zero when none
    highlight: Rect,
    /// Bounds of the preview surface in view coordinates
    preview_frame: Rect,
    orientation: Orientation,
    /// Set once the result sink has been notified
    delivered: bool,
    tint: Color,
}

/// Camera-permission-gated QR scanning controller
pub struct ScannerController {
    weak_self: Weak<ScannerController>,
    config: ScannerConfig,
    access: CameraAccess,
    backend: Arc<dyn CaptureBackend>,
    host: Mutex<Weak<dyn ScannerHost>>,
    event_sink: Mutex<Weak<dyn EventSink>>,
    result_sink: Mutex<Weak<dyn ResultSink>>,
    inner: Mutex<Inner>,
}

impl ScannerController {
    pub fn new(
        config: ScannerConfig,
        access: CameraAccess,
        backend: Arc<dyn CaptureBackend>,
    ) -> Arc<Self> {
        let tint = config.tint;
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            config,
            access,
            backend,
            host: Mutex::new(Weak::<NullHost>::new() as Weak<dyn ScannerHost>),
            event_sink: Mutex::new(
                Weak::<crate::sinks::TracingEventSink>::new() as Weak<dyn EventSink>
            ),
            result_sink: Mutex::new(Weak::<NullResultSink>::new() as Weak<dyn ResultSink>),
            inner: Mutex::new(Inner {
                phase: ScannerPhase::Uninitialized,
                session: None,
                highlight: Rect::ZERO,
                preview_frame: Rect::ZERO,
                orientation: Orientation::default(),
                delivered: false,
                tint,
            }),
        })
    }

    /// Controller wired to the portal permission gate and the GStreamer
    /// backend
    pub fn with_defaults(config: ScannerConfig) -> Arc<Self> {
        Self::new(
            config,
            CameraAccess::portal(),
            Arc::new(gst::GstCaptureBackend::default()),
        )
    }

    pub fn set_host(&self, host: Weak<dyn ScannerHost>) {
        *self.host.lock().unwrap() = host;
    }

    pub fn set_event_sink(&self, sink: Weak<dyn EventSink>) {
        *self.event_sink.lock().unwrap() = sink;
    }

    pub fn set_result_sink(&self, sink: Weak<dyn ResultSink>) {
        *self.result_sink.lock().unwrap() = sink;
    }

    pub fn phase(&self) -> ScannerPhase {
        self.inner.lock().unwrap().phase
    }

    /// View-space rectangle marking the last detected code
    pub fn highlight_frame(&self) -> Rect {
        self.inner.lock().unwrap().highlight
    }

    pub fn preview_frame(&self) -> Rect {
        self.inner.lock().unwrap().preview_frame
    }

    pub fn orientation(&self) -> Orientation {
        self.inner.lock().unwrap().orientation
    }

    pub fn tint(&self) -> Color {
        self.inner.lock().unwrap().tint
    }

    pub fn set_tint(&self, tint: Color) {
        self.inner.lock().unwrap().tint = tint;
    }

    /// Query the permission gate and route accordingly.
    ///
    /// Authorized configures the pipeline immediately. Not-determined and
    /// the blocked states present their dialog after a short delay so the
    /// view transition settles first.
    pub async fn on_load(&self) {
        let state = self.access.status();
        info!(permission = %state, "Camera permission queried");

        match state {
            PermissionState::Authorized => self.configure(),
            PermissionState::NotDetermined => {
                self.inner.lock().unwrap().phase = ScannerPhase::AwaitingPermission;
                self.wait_alert_delay().await;

                let on_grant = {
                    let weak = self.weak_self.clone();
                    move || {
                        if let Some(this) = weak.upgrade() {
                            this.configure();
                            this.on_appear();
                        }
                    }
                };
                let on_denied = {
                    let weak = self.weak_self.clone();
                    move || {
                        if let Some(this) = weak.upgrade() {
                            this.close(None);
                        }
                    }
                };
                self.present(alerts::permission_alert(
                    self.access.clone(),
                    on_grant,
                    on_denied,
                ));
            }
            PermissionState::Denied | PermissionState::Restricted | PermissionState::Unknown => {
                self.inner.lock().unwrap().phase = ScannerPhase::Denied;
                self.wait_alert_delay().await;

                let weak = self.weak_self.clone();
                self.present(alerts::settings_alert(move || {
                    if let Some(this) = weak.upgrade() {
                        this.close(None);
                    }
                }));
            }
        }
    }

    /// Start the session when the view appears
    pub fn on_appear(&self) {
        let session = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.phase, ScannerPhase::Ready | ScannerPhase::Stopped) {
                return;
            }
            inner.phase = ScannerPhase::Running;
            inner.session.clone()
        };
        if let Some(session) = session {
            self.dispatch_session(session, SessionOp::Start);
            self.emit(Severity::Info, "capture session started");
        }
    }

    /// Stop the session when the view disappears
    pub fn on_disappear(&self) {
        let session = {
            let mut inner = self.inner.lock().unwrap();
            if inner.phase != ScannerPhase::Running {
                return;
            }
            inner.phase = ScannerPhase::Stopped;
            inner.session.clone()
        };
        if let Some(session) = session {
            self.dispatch_session(session, SessionOp::Stop);
            self.emit(Severity::Info, "capture session stopped");
        }
    }

    /// Record the preview surface bounds after a layout pass
    pub fn on_layout(&self, bounds: Rect) {
        self.inner.lock().unwrap().preview_frame = bounds;
    }

    /// Push a new interface orientation into the capture pipeline
    pub fn on_orientation_change(&self, orientation: Orientation) {
        let session = {
            let mut inner = self.inner.lock().unwrap();
            inner.orientation = orientation;
            inner.session.clone()
        };
        if let Some(session) = session {
            session.set_orientation(orientation);
        }
        self.emit(
            Severity::Info,
            &format!("orientation changed to {}", orientation),
        );
    }

    /// Tap gesture: manually pause or resume the session
    pub fn toggle_session(&self) {
        let (session, op) = {
            let mut inner = self.inner.lock().unwrap();
            match inner.phase {
                ScannerPhase::Running => {
                    inner.phase = ScannerPhase::Stopped;
                    (inner.session.clone(), SessionOp::Stop)
                }
                ScannerPhase::Ready | ScannerPhase::Stopped => {
                    inner.phase = ScannerPhase::Running;
                    (inner.session.clone(), SessionOp::Start)
                }
                _ => return,
            }
        };
        if let Some(session) = session {
            debug!(op = ?op, "Toggling capture session");
            self.dispatch_session(session, op);
        }
    }

    /// Restart the session and clear the highlight frame
    pub fn resume(&self) {
        let session = {
            let mut inner = self.inner.lock().unwrap();
            let Some(session) = inner.session.clone() else {
                return;
            };
            inner.phase = ScannerPhase::Running;
            inner.highlight = Rect::ZERO;
            session
        };
        self.dispatch_session(session, SessionOp::Start);
        self.emit(Severity::Info, "capture session resumed");
    }

    /// Handle the recognized objects of one sampled frame.
    ///
    /// Only the first object of a batch is considered; platforms may report
    /// several codes per frame, and this component always picks index 0.
    pub fn handle_detections(&self, batch: &[Detection]) {
        if batch.is_empty() {
            self.inner.lock().unwrap().highlight = Rect::ZERO;
            self.emit(Severity::Warning, "no QR code detected");
            return;
        }

        let first = &batch[0];
        if first.symbology != Symbology::Qr {
            return;
        }
        let Some(payload) = first.payload.clone() else {
            return;
        };

        let session = {
            let mut inner = self.inner.lock().unwrap();
            if inner.delivered || inner.phase == ScannerPhase::Finished {
                return;
            }
            inner.highlight = first.bounds.to_view(inner.preview_frame);
            inner.phase = ScannerPhase::Finished;
            inner.session.clone()
        };
        if let Some(session) = session {
            self.dispatch_session(session, SessionOp::Stop);
        }

        // Payload length only; the content must never reach the event log
        self.emit(
            Severity::Info,
            &format!("qr code decoded ({} chars)", payload.len()),
        );

        if self.config.auto_dismiss_on_detect {
            self.close(Some(payload));
        } else {
            self.deliver(&payload);
        }
    }

    fn configure(&self) {
        let weak = self.weak_self.clone();
        let handler: DetectionHandler = Arc::new(move |batch| {
            if let Some(this) = weak.upgrade() {
                this.handle_detections(&batch);
            }
        });

        match self.backend.open(handler) {
            Ok(session) => {
                let mut inner = self.inner.lock().unwrap();
                session.set_orientation(inner.orientation);
                inner.session = Some(session);
                inner.phase = ScannerPhase::Ready;
                debug!("Capture session configured");
            }
            Err(e) => {
                self.inner.lock().unwrap().phase = ScannerPhase::Unavailable;
                error!(error = %e, "Failed to configure capture session");
                self.emit(Severity::Error, &format!("camera unavailable: {}", e));
            }
        }
    }

    /// Ask the host to dismiss the view; an attached payload is delivered
    /// only after the dismissal completes. Without a host there is nothing
    /// to dismiss and delivery happens immediately.
    fn close(&self, payload: Option<String>) {
        let Some(host) = self.host.lock().unwrap().upgrade() else {
            if let Some(text) = payload {
                self.deliver(&text);
            }
            return;
        };
        let weak = self.weak_self.clone();
        host.dismiss(Box::new(move || {
            if let (Some(this), Some(text)) = (weak.upgrade(), payload) {
                this.deliver(&text);
            }
        }));
    }

    fn deliver(&self, text: &str) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.delivered {
                return;
            }
            inner.delivered = true;
        }
        if let Some(sink) = self.result_sink.lock().unwrap().upgrade() {
            sink.result_decoded(text);
        }
    }

    fn present(&self, alert: Alert) {
        if let Some(host) = self.host.lock().unwrap().upgrade() {
            host.present_alert(alert);
        }
    }

    fn emit(&self, severity: Severity, message: &str) {
        if let Some(sink) = self.event_sink.lock().unwrap().upgrade() {
            sink.event(message, severity);
        }
    }

    /// Wait out the configured dialog delay.
    ///
    /// The timer needs a tokio reactor; callers driving the controller from
    /// a plain executor get a blocking wait instead.
    async fn wait_alert_delay(&self) {
        let delay = self.config.alert_delay;
        if delay.is_zero() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(_) => tokio::time::sleep(delay).await,
            Err(_) => std::thread::sleep(delay),
        }
    }

    /// Session state changes run off the calling thread when a runtime is
    /// available, so hardware (de)activation never blocks the UI.
    fn dispatch_session(&self, session: Arc<dyn CaptureSession>, op: SessionOp) {
        let run = move || {
            let result = match op {
                SessionOp::Start => session.start(),
                SessionOp::Stop => session.stop(),
            };
            if let Err(e) = result {
                warn!(error = %e, op = ?op, "Capture session state change failed");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(run);
            }
            Err(_) => run(),
        }
    }
}

/// Placeholder type for the empty weak sink slots
struct NullResultSink;

impl ResultSink for NullResultSink {
    fn result_decoded(&self, _text: &str) {}
}

/// Placeholder type for the empty weak host slot
struct NullHost;

impl ScannerHost for NullHost {
    fn present_alert(&self, _alert: Alert) {}
    fn dismiss(&self, _on_complete: Box<dyn FnOnce() + Send>) {}
}
