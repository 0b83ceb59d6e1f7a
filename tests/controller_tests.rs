// SPDX-License-Identifier: GPL-3.0-only

//! Behavioral tests for the scanner controller
//!
//! Scripted authority, session, and host stubs stand in for the portal,
//! the GStreamer pipeline, and the presenting toolkit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use qr_capture::{
    Alert, CameraAccess, CameraAuthority, CaptureBackend, CaptureError, CaptureResult,
    CaptureSession, Detection, DetectionHandler, EventSink, FrameRegion, Orientation,
    PermissionState, Rect, ResultSink, ScannerConfig, ScannerController, ScannerHost,
    ScannerPhase, Severity, Symbology,
};

struct ScriptedAuthority {
    state: PermissionState,
    grant: bool,
}

impl CameraAuthority for ScriptedAuthority {
    fn status(&self) -> PermissionState {
        self.state
    }

    fn request_access(&self, on_resolved: Box<dyn FnOnce(bool) + Send>) {
        on_resolved(self.grant);
    }
}

#[derive(Default)]
struct StubSession {
    running: Mutex<bool>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    orientation: Mutex<Option<Orientation>>,
}

impl CaptureSession for StubSession {
    fn start(&self) -> CaptureResult<()> {
        *self.running.lock().unwrap() = true;
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> CaptureResult<()> {
        *self.running.lock().unwrap() = false;
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn set_orientation(&self, orientation: Orientation) {
        *self.orientation.lock().unwrap() = Some(orientation);
    }
}

struct StubBackend {
    session: Arc<StubSession>,
    fail: bool,
}

impl CaptureBackend for StubBackend {
    fn open(&self, _on_detections: DetectionHandler) -> CaptureResult<Arc<dyn CaptureSession>> {
        if self.fail {
            Err(CaptureError::NoDevice)
        } else {
            Ok(self.session.clone())
        }
    }
}

/// Host recording presented alerts and dismissals; dismissal completions
/// run synchronously, standing in for a finished animation.
struct RecordingHost {
    alerts: Mutex<Vec<Alert>>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl ScannerHost for RecordingHost {
    fn present_alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }

    fn dismiss(&self, on_complete: Box<dyn FnOnce() + Send>) {
        self.log.lock().unwrap().push("dismiss");
        on_complete();
    }
}

struct RecordingEvents(Mutex<Vec<(String, Severity)>>);

impl EventSink for RecordingEvents {
    fn event(&self, message: &str, severity: Severity) {
        self.0.lock().unwrap().push((message.to_string(), severity));
    }
}

impl RecordingEvents {
    fn contains(&self, message: &str, severity: Severity) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|(m, s)| m == message && *s == severity)
    }
}

struct CollectingResults {
    results: Mutex<Vec<String>>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl ResultSink for CollectingResults {
    fn result_decoded(&self, text: &str) {
        self.log.lock().unwrap().push("deliver");
        self.results.lock().unwrap().push(text.to_string());
    }
}

struct Fixture {
    controller: Arc<ScannerController>,
    host: Arc<RecordingHost>,
    events: Arc<RecordingEvents>,
    results: Arc<CollectingResults>,
    session: Arc<StubSession>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn fixture(state: PermissionState, grant: bool, auto_dismiss: bool, fail: bool) -> Fixture {
    fixture_with_delay(state, grant, auto_dismiss, fail, Duration::ZERO)
}

fn fixture_with_delay(
    state: PermissionState,
    grant: bool,
    auto_dismiss: bool,
    fail: bool,
    alert_delay: Duration,
) -> Fixture {
    init_tracing();

    let session = Arc::new(StubSession::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    let config = ScannerConfig {
        auto_dismiss_on_detect: auto_dismiss,
        alert_delay,
        ..Default::default()
    };
    let controller = ScannerController::new(
        config,
        CameraAccess::new(Arc::new(ScriptedAuthority { state, grant })),
        Arc::new(StubBackend {
            session: session.clone(),
            fail,
        }),
    );

    let host = Arc::new(RecordingHost {
        alerts: Mutex::new(Vec::new()),
        log: log.clone(),
    });
    let events = Arc::new(RecordingEvents(Mutex::new(Vec::new())));
    let results = Arc::new(CollectingResults {
        results: Mutex::new(Vec::new()),
        log: log.clone(),
    });

    controller.set_host(Arc::downgrade(&host) as Weak<dyn ScannerHost>);
    controller.set_event_sink(Arc::downgrade(&events) as Weak<dyn EventSink>);
    controller.set_result_sink(Arc::downgrade(&results) as Weak<dyn ResultSink>);

    Fixture {
        controller,
        host,
        events,
        results,
        session,
        log,
    }
}

/// Authorized loads never sleep, so they resolve synchronously outside a
/// runtime and session dispatch runs inline.
fn load_authorized(auto_dismiss: bool) -> Fixture {
    let fx = fixture(PermissionState::Authorized, false, auto_dismiss, false);
    futures::executor::block_on(fx.controller.on_load());
    fx
}

fn qr(payload: &str) -> Detection {
    Detection {
        symbology: Symbology::Qr,
        payload: Some(payload.to_string()),
        bounds: FrameRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        },
    }
}

#[test]
fn test_authorized_load_reaches_ready() {
    let fx = load_authorized(true);
    assert_eq!(fx.controller.phase(), ScannerPhase::Ready);
    assert!(fx.host.alerts.lock().unwrap().is_empty());
}

#[test]
fn test_appear_and_disappear_drive_session() {
    let fx = load_authorized(true);

    fx.controller.on_appear();
    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    assert_eq!(fx.session.starts.load(Ordering::SeqCst), 1);
    assert!(fx.events.contains("capture session started", Severity::Info));

    fx.controller.on_disappear();
    assert_eq!(fx.controller.phase(), ScannerPhase::Stopped);
    assert_eq!(fx.session.stops.load(Ordering::SeqCst), 1);
    assert!(fx.events.contains("capture session stopped", Severity::Info));
}

#[test]
fn test_unavailable_device_surfaces_distinct_state() {
    let fx = fixture(PermissionState::Authorized, false, true, true);
    futures::executor::block_on(fx.controller.on_load());

    assert_eq!(fx.controller.phase(), ScannerPhase::Unavailable);
    assert!(fx
        .events
        .0
        .lock()
        .unwrap()
        .iter()
        .any(|(m, s)| m.starts_with("camera unavailable") && *s == Severity::Error));

    // Appearing without a session is a no-op
    fx.controller.on_appear();
    assert_eq!(fx.controller.phase(), ScannerPhase::Unavailable);
    assert_eq!(fx.session.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_not_determined_presents_permission_alert() {
    let fx = fixture(PermissionState::NotDetermined, true, true, false);
    fx.controller.on_load().await;

    assert_eq!(fx.controller.phase(), ScannerPhase::AwaitingPermission);
    let alerts = fx.host.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(!alerts[0].title().is_empty());
}

#[test]
fn test_not_determined_load_outside_runtime_presents_alert() {
    // Hosts without a tokio runtime still get the delayed dialog routes
    let fx = fixture_with_delay(
        PermissionState::NotDetermined,
        true,
        true,
        false,
        Duration::from_millis(10),
    );
    futures::executor::block_on(fx.controller.on_load());

    assert_eq!(fx.controller.phase(), ScannerPhase::AwaitingPermission);
    assert_eq!(fx.host.alerts.lock().unwrap().len(), 1);
}

#[test]
fn test_denied_load_outside_runtime_presents_settings_alert() {
    let fx = fixture_with_delay(
        PermissionState::Denied,
        false,
        true,
        false,
        Duration::from_millis(10),
    );
    futures::executor::block_on(fx.controller.on_load());

    assert_eq!(fx.controller.phase(), ScannerPhase::Denied);
    assert_eq!(fx.host.alerts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_permission_grant_configures_and_starts() {
    let fx = fixture(PermissionState::NotDetermined, true, true, false);
    fx.controller.on_load().await;

    let alert = fx.host.alerts.lock().unwrap().pop().unwrap();
    alert.confirm();

    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fx.session.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_permission_refusal_dismisses_view() {
    let fx = fixture(PermissionState::NotDetermined, false, true, false);
    fx.controller.on_load().await;

    let alert = fx.host.alerts.lock().unwrap().pop().unwrap();
    alert.confirm();

    assert_eq!(*fx.log.lock().unwrap(), vec!["dismiss"]);
    assert!(fx.results.results.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_presents_settings_alert_and_dismissal_closes() {
    for state in [
        PermissionState::Denied,
        PermissionState::Restricted,
        PermissionState::Unknown,
    ] {
        let fx = fixture(state, false, true, false);
        fx.controller.on_load().await;

        assert_eq!(fx.controller.phase(), ScannerPhase::Denied);
        let alert = fx.host.alerts.lock().unwrap().pop().unwrap();
        alert.cancel();

        assert_eq!(*fx.log.lock().unwrap(), vec!["dismiss"]);
    }
}

#[test]
fn test_empty_batch_resets_highlight_and_delivers_nothing() {
    let fx = load_authorized(true);
    fx.controller.on_layout(Rect::new(0.0, 0.0, 400.0, 200.0));
    fx.controller.on_appear();

    fx.controller.handle_detections(&[qr("x")]);
    assert!(!fx.controller.highlight_frame().is_empty());

    // Finished already; resume to keep scanning, then lose the code
    fx.controller.resume();
    fx.controller.handle_detections(&[]);

    assert_eq!(fx.controller.highlight_frame(), Rect::ZERO);
    assert!(fx.events.contains("no QR code detected", Severity::Warning));
}

#[test]
fn test_non_qr_batch_keeps_session_running() {
    let fx = load_authorized(true);
    fx.controller.on_appear();

    fx.controller.handle_detections(&[Detection {
        symbology: Symbology::Other,
        payload: Some("not a qr".into()),
        bounds: FrameRegion::default(),
    }]);

    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    assert!(fx.session.is_running());
    assert!(fx.results.results.lock().unwrap().is_empty());
}

#[test]
fn test_detection_without_payload_is_ignored() {
    let fx = load_authorized(true);
    fx.controller.on_appear();

    fx.controller.handle_detections(&[Detection {
        symbology: Symbology::Qr,
        payload: None,
        bounds: FrameRegion::default(),
    }]);

    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    assert!(fx.results.results.lock().unwrap().is_empty());
}

#[test]
fn test_auto_dismiss_delivers_after_dismissal() {
    let fx = load_authorized(true);
    fx.controller.on_appear();

    fx.controller.handle_detections(&[qr("payload")]);

    assert_eq!(fx.controller.phase(), ScannerPhase::Finished);
    assert_eq!(*fx.log.lock().unwrap(), vec!["dismiss", "deliver"]);
    assert_eq!(*fx.results.results.lock().unwrap(), vec!["payload"]);
}

#[test]
fn test_without_auto_dismiss_delivery_is_immediate_and_view_stays() {
    let fx = load_authorized(false);
    fx.controller.on_layout(Rect::new(0.0, 0.0, 400.0, 200.0));
    fx.controller.on_appear();

    fx.controller.handle_detections(&[qr("payload")]);

    assert_eq!(*fx.log.lock().unwrap(), vec!["deliver"]);
    assert_eq!(*fx.results.results.lock().unwrap(), vec!["payload"]);
    assert_eq!(fx.controller.phase(), ScannerPhase::Finished);
    assert!(!fx.session.is_running());
    // Highlight transformed into the view bounds set by the layout pass
    assert_eq!(
        fx.controller.highlight_frame(),
        Rect::new(100.0, 50.0, 200.0, 100.0)
    );
}

#[test]
fn test_result_delivered_exactly_once() {
    let fx = load_authorized(false);
    fx.controller.on_appear();

    fx.controller.handle_detections(&[qr("first")]);
    fx.controller.handle_detections(&[qr("second")]);
    fx.controller.resume();
    fx.controller.handle_detections(&[qr("third")]);

    assert_eq!(*fx.results.results.lock().unwrap(), vec!["first"]);
}

#[test]
fn test_only_first_batch_element_is_considered() {
    let fx = load_authorized(false);
    fx.controller.on_appear();

    fx.controller.handle_detections(&[
        Detection {
            symbology: Symbology::Other,
            payload: Some("skipped".into()),
            bounds: FrameRegion::default(),
        },
        qr("never reached"),
    ]);

    // First element was not a QR symbol, so the whole batch is a no-op
    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    assert!(fx.results.results.lock().unwrap().is_empty());
}

#[test]
fn test_toggle_twice_restores_running_state() {
    let fx = load_authorized(true);
    fx.controller.on_appear();
    assert_eq!(fx.controller.phase(), ScannerPhase::Running);

    fx.controller.toggle_session();
    assert_eq!(fx.controller.phase(), ScannerPhase::Stopped);
    fx.controller.toggle_session();
    assert_eq!(fx.controller.phase(), ScannerPhase::Running);

    assert_eq!(fx.session.starts.load(Ordering::SeqCst), 2);
    assert_eq!(fx.session.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_resume_restarts_and_clears_highlight() {
    let fx = load_authorized(false);
    fx.controller.on_layout(Rect::new(0.0, 0.0, 400.0, 200.0));
    fx.controller.on_appear();
    fx.controller.handle_detections(&[qr("done")]);
    assert!(!fx.controller.highlight_frame().is_empty());

    fx.controller.resume();

    assert_eq!(fx.controller.phase(), ScannerPhase::Running);
    assert_eq!(fx.controller.highlight_frame(), Rect::ZERO);
    assert!(fx.events.contains("capture session resumed", Severity::Info));
}

#[test]
fn test_orientation_change_reaches_session() {
    let fx = load_authorized(true);

    fx.controller
        .on_orientation_change(Orientation::LandscapeLeft);

    assert_eq!(
        *fx.session.orientation.lock().unwrap(),
        Some(Orientation::LandscapeLeft)
    );
    assert!(fx.events.contains(
        "orientation changed to landscape left",
        Severity::Info
    ));
}

#[test]
fn test_example_url_scenario() {
    let fx = load_authorized(true);
    fx.controller.on_layout(Rect::new(0.0, 0.0, 400.0, 200.0));
    fx.controller.on_appear();

    fx.controller.handle_detections(&[qr("https://example.com")]);

    // The event log reports the payload length, never its content
    assert!(fx
        .events
        .contains("qr code decoded (19 chars)", Severity::Info));
    assert!(!fx
        .events
        .0
        .lock()
        .unwrap()
        .iter()
        .any(|(m, _)| m.contains("example.com")));
    assert_eq!(
        *fx.results.results.lock().unwrap(),
        vec!["https://example.com"]
    );
}

#[test]
fn test_vanished_sinks_are_noops() {
    let fx = load_authorized(false);
    fx.controller.on_appear();

    drop(fx.results);
    drop(fx.events);
    drop(fx.host);

    // Nothing to notify, nothing to dismiss into; must not panic
    fx.controller.handle_detections(&[qr("late")]);
    assert_eq!(fx.controller.phase(), ScannerPhase::Finished);
}
