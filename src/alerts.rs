// SPDX-License-Identifier: GPL-3.0-only

//! Permission dialog models
//!
//! Dialogs are plain data so the host toolkit decides how to render them.
//! Each has a cancel path and an action path; the action button carries a
//! one-shot handler. The host invokes [`Alert::confirm`] when the user
//! activates the action button and [`Alert::cancel`] otherwise.

use std::process::Command;

use tracing::{info, warn};

use crate::constants::SETTINGS_COMMAND;
use crate::fl;
use crate::permission::CameraAccess;

type Handler = Box<dyn FnOnce() + Send>;

/// One button of a dialog, with an optional one-shot handler
pub struct AlertButton {
    label: String,
    handler: Option<Handler>,
}

impl AlertButton {
    fn plain(label: String) -> Self {
        Self {
            label,
            handler: None,
        }
    }

    fn with_handler<F>(label: String, handler: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            label,
            handler: Some(Box::new(handler)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the button's handler, if any
    pub fn activate(self) {
        if let Some(handler) = self.handler {
            handler();
        }
    }
}

impl std::fmt::Debug for AlertButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertButton")
            .field("label", &self.label)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// A two-button modal dialog description
pub struct Alert {
    title: String,
    message: String,
    cancel: AlertButton,
    action: AlertButton,
    on_dismiss: Option<Handler>,
}

impl Alert {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cancel_label(&self) -> &str {
        self.cancel.label()
    }

    pub fn action_label(&self) -> &str {
        self.action.label()
    }

    /// The user activated the action button: run its handler, then the
    /// dismissal hook.
    pub fn confirm(self) {
        self.action.activate();
        if let Some(on_dismiss) = self.on_dismiss {
            on_dismiss();
        }
    }

    /// The user cancelled or closed the dialog: only the dismissal hook
    /// runs.
    pub fn cancel(self) {
        if let Some(on_dismiss) = self.on_dismiss {
            on_dismiss();
        }
    }
}

impl std::fmt::Debug for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alert")
            .field("title", &self.title)
            .field("message", &self.message)
            .finish()
    }
}

/// Dialog asking the user to grant camera access.
///
/// The action button resolves access through the gate: `on_success` runs if
/// the user grants, `on_denied` otherwise. Cancel performs no callback.
pub fn permission_alert<S, D>(access: CameraAccess, on_success: S, on_denied: D) -> Alert
where
    S: FnOnce() + Send + 'static,
    D: FnOnce() + Send + 'static,
{
    Alert {
        title: fl!("alert_title"),
        message: fl!("alert_message"),
        cancel: AlertButton::plain(fl!("cancel_alert")),
        action: AlertButton::with_handler(fl!("give_access_action"), move || {
            access.request_if_needed(move |granted| {
                if granted {
                    on_success();
                } else {
                    on_denied();
                }
            });
        }),
        on_dismiss: None,
    }
}

/// Dialog routing the user to the system settings after a denial.
///
/// The action button launches the settings surface; it does not invoke
/// `on_dismiss` itself. That fires when the dialog closes, on either path.
pub fn settings_alert<F>(on_dismiss: F) -> Alert
where
    F: FnOnce() + Send + 'static,
{
    Alert {
        title: fl!("setting_alert_title"),
        message: fl!("setting_alert_message"),
        cancel: AlertButton::plain(fl!("cancel_alert")),
        action: AlertButton::with_handler(fl!("setting_alert_go"), || {
            match Command::new(SETTINGS_COMMAND).spawn() {
                Ok(_) => info!(command = SETTINGS_COMMAND, "Opened system settings"),
                Err(e) => {
                    warn!(command = SETTINGS_COMMAND, error = %e, "Failed to open system settings");
                }
            }
        }),
        on_dismiss: Some(Box::new(on_dismiss)),
    }
}
