// SPDX-License-Identifier: GPL-3.0-only

//! Camera-permission-gated QR code scanning component
//!
//! This library owns the non-rendering half of a QR scanning surface:
//! permission gating, capture session lifecycle, symbol detection, and
//! highlight geometry. The host toolkit renders the preview and dialogs
//! from the data this crate exposes.
//!
//! # Architecture
//!
//! - [`permission`]: camera authorization queries and prompts (XDG portal)
//! - [`alerts`]: permission and settings dialog models
//! - [`scanner`]: the capture lifecycle controller and GStreamer session
//! - [`sinks`]: severity-tagged event and decode-result observers
//! - [`binding`]: adapter for data-binding-style UI frameworks
//! - [`i18n`]: embedded fluent localizations for dialog copy

pub mod alerts;
pub mod binding;
pub mod constants;
pub mod errors;
pub mod i18n;
pub mod permission;
pub mod scanner;
pub mod sinks;

// Re-export the component surface
pub use alerts::{permission_alert, settings_alert, Alert, AlertButton};
pub use binding::{ScannerBinding, StringBinding};
pub use errors::{CaptureError, CaptureResult};
pub use permission::{CameraAccess, CameraAuthority, PermissionState};
pub use scanner::detector::{Detection, FrameRegion, Symbology};
pub use scanner::gst::GstCaptureBackend;
pub use scanner::session::{CaptureBackend, CaptureSession, DetectionHandler, Orientation};
pub use scanner::types::{Color, Rect};
pub use scanner::{ScannerConfig, ScannerController, ScannerHost, ScannerPhase};
pub use sinks::{EventSink, ResultSink, Severity, TracingEventSink};
