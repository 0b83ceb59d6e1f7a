// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture component

use std::fmt;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Capture-session errors
///
/// All of these are terminal for the current session; the controller never
/// retries session construction on its own.
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// No usable camera source element could be created
    NoDevice,
    /// Pipeline construction failed
    InitializationFailed(String),
    /// Pipeline state change (start/stop) failed
    StateChange(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoDevice => write!(f, "No camera devices found"),
            CaptureError::InitializationFailed(msg) => {
                write!(f, "Initialization failed: {}", msg)
            }
            CaptureError::StateChange(msg) => write!(f, "State change failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
