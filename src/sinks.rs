// SPDX-License-Identifier: GPL-3.0-only

//! Observer interfaces notified by the scanner controller
//!
//! Both sinks are optional collaborators held weakly by the controller: a
//! sink that has been dropped is skipped silently. Neither interface has a
//! return value or an error channel.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

/// Severity tag attached to scanner lifecycle events
///
/// Ordered `Verbose < Debug < Info < Warning < Error`; comparison follows
/// the numeric rank.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Numeric rank of this severity
    pub fn rank(self) -> u8 {
        match self {
            Severity::Verbose => 10,
            Severity::Debug => 20,
            Severity::Info => 30,
            Severity::Warning => 40,
            Severity::Error => 50,
        }
    }
}

/// Observer notified of scanner lifecycle events
///
/// Called once per occurrence with a human-readable message and a severity
/// tag. Implementations must not block; they run on whichever thread drove
/// the controller.
pub trait EventSink: Send + Sync {
    fn event(&self, message: &str, severity: Severity);
}

/// Observer notified exactly once per successful decode
pub trait ResultSink: Send + Sync {
    fn result_decoded(&self, text: &str);
}

/// [`EventSink`] that forwards events to `tracing` at the matching level
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn event(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Verbose => trace!("{message}"),
            Severity::Debug => debug!("{message}"),
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}
