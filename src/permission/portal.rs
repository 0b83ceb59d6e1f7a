// SPDX-License-Identifier: GPL-3.0-only

//! XDG desktop portal camera authority
//!
//! Queries the portal permission store for the current camera verdict and
//! issues prompts through `org.freedesktop.portal.Camera.AccessCamera`.
//! Both work in native and flatpak environments (with appropriate D-Bus
//! permissions).

use std::collections::HashMap;

use futures::StreamExt;
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use super::{CameraAuthority, PermissionState};

/// Permission store table holding device verdicts
const STORE_TABLE: &str = "devices";
/// Permission store entry for the camera
const STORE_ID: &str = "camera";

#[zbus::proxy(
    interface = "org.freedesktop.portal.Camera",
    default_service = "org.freedesktop.portal.Desktop",
    default_path = "/org/freedesktop/portal/desktop"
)]
trait Camera {
    fn access_camera(&self, options: HashMap<&str, Value<'_>>) -> zbus::Result<OwnedObjectPath>;

    #[zbus(property)]
    fn is_camera_present(&self) -> zbus::Result<bool>;
}

#[zbus::proxy(
    interface = "org.freedesktop.portal.Request",
    default_service = "org.freedesktop.portal.Desktop"
)]
trait Request {
    #[zbus(signal)]
    fn response(&self, response: u32, results: HashMap<String, OwnedValue>) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.impl.portal.PermissionStore",
    default_service = "org.freedesktop.impl.portal.PermissionStore",
    default_path = "/org/freedesktop/impl/portal/PermissionStore"
)]
trait PermissionStore {
    #[allow(clippy::type_complexity)]
    fn lookup(
        &self,
        table: &str,
        id: &str,
    ) -> zbus::Result<(HashMap<String, Vec<String>>, OwnedValue)>;
}

/// Camera authority backed by the XDG desktop portal
#[derive(Debug, Clone, Default)]
pub struct PortalAuthority {
    /// Application id used for permission store lookups.
    ///
    /// Empty for non-sandboxed processes, matching what the portal records
    /// for them.
    app_id: String,
}

impl PortalAuthority {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    async fn query_status(&self) -> zbus::Result<PermissionState> {
        let connection = zbus::Connection::session().await?;

        let camera = CameraProxy::new(&connection).await?;
        if !camera.is_camera_present().await.unwrap_or(true) {
            return Ok(PermissionState::Restricted);
        }

        let store = PermissionStoreProxy::new(&connection).await?;
        match store.lookup(STORE_TABLE, STORE_ID).await {
            Ok((permissions, _data)) => {
                let verdict = permissions
                    .get(self.app_id.as_str())
                    .and_then(|v| v.first())
                    .map(String::as_str);
                Ok(match verdict {
                    Some("yes") => PermissionState::Authorized,
                    Some("no") => PermissionState::Denied,
                    // "ask" or no entry: the user was never asked
                    _ => PermissionState::NotDetermined,
                })
            }
            // The store reports an error for tables it has no entry for
            Err(e) => {
                debug!(error = %e, "Permission store lookup failed, treating as not determined");
                Ok(PermissionState::NotDetermined)
            }
        }
    }

    async fn prompt(&self) -> zbus::Result<bool> {
        let connection = zbus::Connection::session().await?;
        let camera = CameraProxy::new(&connection).await?;

        // Subscribe to the request object before issuing the call so the
        // Response signal cannot be missed. The portal derives the request
        // path from our unique name and the handle token.
        let token = format!("qr_capture_{}", std::process::id());
        let sender = connection
            .unique_name()
            .map(|name| name.as_str().trim_start_matches(':').replace('.', "_"))
            .unwrap_or_default();
        let request_path = format!("/org/freedesktop/portal/desktop/request/{sender}/{token}");

        let request = RequestProxy::builder(&connection)
            .path(request_path)?
            .build()
            .await?;
        let mut responses = request.receive_response().await?;

        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("handle_token", Value::from(token.as_str()));
        let _handle = camera.access_camera(options).await?;

        match responses.next().await {
            Some(signal) => {
                let args = signal.args()?;
                let granted = *args.response() == 0;
                info!(granted, "Camera access prompt resolved");
                Ok(granted)
            }
            None => Ok(false),
        }
    }
}

impl CameraAuthority for PortalAuthority {
    fn status(&self) -> PermissionState {
        match pollster::block_on(self.query_status()) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Failed to query camera permission");
                PermissionState::Unknown
            }
        }
    }

    fn request_access(&self, on_resolved: Box<dyn FnOnce(bool) + Send>) {
        let authority = self.clone();
        let resolve = async move {
            let granted = match authority.prompt().await {
                Ok(granted) => granted,
                Err(e) => {
                    warn!(error = %e, "Camera access prompt failed");
                    false
                }
            };
            on_resolved(granted);
        };

        // Prompts resolve on the runtime when one is available; otherwise
        // block the caller until the user answers.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(resolve);
            }
            Err(_) => pollster::block_on(resolve),
        }
    }
}
