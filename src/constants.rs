// SPDX-License-Identifier: GPL-3.0-only

//! Shared tunables for the scanning component

use std::time::Duration;

/// Delay before presenting a permission or settings dialog.
///
/// Presenting immediately on first appearance makes the dialog flicker in
/// while the view transition is still animating.
pub const ALERT_DELAY: Duration = Duration::from_millis(300);

/// Minimum interval between two decoded camera frames.
///
/// Decoding every frame wastes CPU; QR codes held up to a camera survive
/// a 200 ms sampling grid comfortably.
pub const DETECTION_INTERVAL: Duration = Duration::from_millis(200);

/// Command launched by the settings dialog's confirm action.
pub const SETTINGS_COMMAND: &str = "cosmic-settings";
