// SPDX-License-Identifier: GPL-3.0-only

//! Declarative-UI adapter
//!
//! Bridges the scanner controller into data-binding-style UI frameworks: a
//! [`ScannerBinding`] owns a controller configured to auto-dismiss and
//! writes every decoded payload into a caller-owned [`StringBinding`].

use std::sync::{Arc, Mutex, Weak};

use crate::permission::CameraAccess;
use crate::scanner::session::CaptureBackend;
use crate::scanner::types::Color;
use crate::scanner::{ScannerConfig, ScannerController};
use crate::sinks::ResultSink;

/// A shared two-way string cell
#[derive(Debug, Clone, Default)]
pub struct StringBinding(Arc<Mutex<String>>);

impl StringBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.0.lock().unwrap().clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.0.lock().unwrap() = value.into();
    }
}

/// Result sink writing decoded payloads into the bound string
struct BindingSink {
    text: StringBinding,
}

impl ResultSink for BindingSink {
    fn result_decoded(&self, text: &str) {
        self.text.set(text);
    }
}

/// Scanner wrapped for declarative UI hosts
///
/// The wrapped controller always auto-dismisses on detection, matching how
/// binding-driven UIs present the scanner modally.
pub struct ScannerBinding {
    controller: Arc<ScannerController>,
    // Keeps the controller's weak result sink alive
    _sink: Arc<BindingSink>,
}

impl ScannerBinding {
    pub fn new(
        text: StringBinding,
        access: CameraAccess,
        backend: Arc<dyn CaptureBackend>,
    ) -> Self {
        let config = ScannerConfig {
            auto_dismiss_on_detect: true,
            ..Default::default()
        };
        let controller = ScannerController::new(config, access, backend);

        let sink = Arc::new(BindingSink { text });
        controller.set_result_sink(Arc::downgrade(&sink) as Weak<dyn ResultSink>);

        Self {
            controller,
            _sink: sink,
        }
    }

    /// Forward a tint color at construction time
    pub fn tint(self, color: Color) -> Self {
        self.controller.set_tint(color);
        self
    }

    /// Forward updated options from the host framework
    pub fn update(&self, tint: Color) {
        self.controller.set_tint(tint);
    }

    pub fn controller(&self) -> &Arc<ScannerController> {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CaptureResult;
    use crate::permission::{CameraAuthority, PermissionState};
    use crate::scanner::detector::{Detection, FrameRegion, Symbology};
    use crate::scanner::session::{CaptureSession, DetectionHandler, Orientation};

    struct GrantedAuthority;

    impl CameraAuthority for GrantedAuthority {
        fn status(&self) -> PermissionState {
            PermissionState::Authorized
        }

        fn request_access(&self, on_resolved: Box<dyn FnOnce(bool) + Send>) {
            on_resolved(true);
        }
    }

    struct IdleSession;

    impl CaptureSession for IdleSession {
        fn start(&self) -> CaptureResult<()> {
            Ok(())
        }

        fn stop(&self) -> CaptureResult<()> {
            Ok(())
        }

        fn is_running(&self) -> bool {
            false
        }

        fn set_orientation(&self, _orientation: Orientation) {}
    }

    struct IdleBackend;

    impl CaptureBackend for IdleBackend {
        fn open(
            &self,
            _on_detections: DetectionHandler,
        ) -> CaptureResult<Arc<dyn CaptureSession>> {
            Ok(Arc::new(IdleSession))
        }
    }

    #[test]
    fn test_decoded_payload_lands_in_bound_string() {
        let text = StringBinding::new();
        let binding = ScannerBinding::new(
            text.clone(),
            CameraAccess::new(Arc::new(GrantedAuthority)),
            Arc::new(IdleBackend),
        );

        futures::executor::block_on(binding.controller().on_load());
        binding.controller().on_appear();
        binding.controller().handle_detections(&[Detection {
            symbology: Symbology::Qr,
            payload: Some("bound text".into()),
            bounds: FrameRegion::default(),
        }]);

        assert_eq!(text.get(), "bound text");
    }
}
