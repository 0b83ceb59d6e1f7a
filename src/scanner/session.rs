// SPDX-License-Identifier: GPL-3.0-only

//! Capture session seams
//!
//! The controller owns its session through these traits so the GStreamer
//! pipeline and scripted test sessions are interchangeable.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::CaptureResult;

use super::detector::Detection;

/// Interface orientation pushed into the capture pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::PortraitUpsideDown => write!(f, "portrait upside down"),
            Orientation::LandscapeLeft => write!(f, "landscape left"),
            Orientation::LandscapeRight => write!(f, "landscape right"),
        }
    }
}

/// Callback receiving the detections of one sampled frame.
///
/// Invoked with an empty batch when a sampled frame contains no code.
pub type DetectionHandler = Arc<dyn Fn(Vec<Detection>) + Send + Sync>;

/// A running or stopped camera capture session
///
/// `start` and `stop` are idempotent; implementations guard their running
/// state with a single lock so state changes are race-free regardless of
/// the calling thread.
pub trait CaptureSession: Send + Sync {
    fn start(&self) -> CaptureResult<()>;
    fn stop(&self) -> CaptureResult<()>;
    fn is_running(&self) -> bool;
    fn set_orientation(&self, orientation: Orientation);
}

/// Factory opening capture sessions wired to a detection handler
pub trait CaptureBackend: Send + Sync {
    fn open(&self, on_detections: DetectionHandler) -> CaptureResult<Arc<dyn CaptureSession>>;
}
