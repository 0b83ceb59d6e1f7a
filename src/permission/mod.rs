// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! Queries and requests camera-use authorization from the host platform.
//! The platform side sits behind the [`CameraAuthority`] trait so that the
//! production XDG portal backend and scripted test authorities are
//! interchangeable. The gate never caches a state beyond a single query.

pub mod portal;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Camera authorization state reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionState {
    /// The user granted camera access
    Authorized,
    /// The user denied camera access
    Denied,
    /// Access is blocked by the platform (no camera present, or policy)
    Restricted,
    /// The user has not been asked yet
    NotDetermined,
    /// The platform could not report a state
    Unknown,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Authorized => write!(f, "authorized"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Restricted => write!(f, "restricted"),
            PermissionState::NotDetermined => write!(f, "not determined"),
            PermissionState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Platform seam for permission queries and prompts
pub trait CameraAuthority: Send + Sync {
    /// Current authorization state. Synchronous, no side effects.
    fn status(&self) -> PermissionState;

    /// Prompt the user for camera access.
    ///
    /// `on_resolved` is invoked exactly once with the user's choice; it may
    /// run on a background task.
    fn request_access(&self, on_resolved: Box<dyn FnOnce(bool) + Send>);
}

/// Permission gate over a [`CameraAuthority`]
#[derive(Clone)]
pub struct CameraAccess {
    authority: Arc<dyn CameraAuthority>,
}

impl CameraAccess {
    pub fn new(authority: Arc<dyn CameraAuthority>) -> Self {
        Self { authority }
    }

    /// Gate backed by the XDG desktop portal
    pub fn portal() -> Self {
        Self::new(Arc::new(portal::PortalAuthority::default()))
    }

    /// Query the current authorization state
    pub fn status(&self) -> PermissionState {
        self.authority.status()
    }

    /// Resolve camera access, prompting the user only when necessary.
    ///
    /// Already-resolved states invoke `on_resolved` synchronously on the
    /// calling thread; `NotDetermined` issues the platform prompt and
    /// resolves with the user's choice. The callback fires exactly once
    /// per call.
    pub fn request_if_needed<F>(&self, on_resolved: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        match self.status() {
            PermissionState::Authorized => on_resolved(true),
            PermissionState::Denied | PermissionState::Restricted | PermissionState::Unknown => {
                on_resolved(false)
            }
            PermissionState::NotDetermined => self.authority.request_access(Box::new(on_resolved)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedAuthority {
        state: PermissionState,
        grant: bool,
        prompts: AtomicUsize,
    }

    impl ScriptedAuthority {
        fn new(state: PermissionState, grant: bool) -> Self {
            Self {
                state,
                grant,
                prompts: AtomicUsize::new(0),
            }
        }
    }

    impl CameraAuthority for ScriptedAuthority {
        fn status(&self) -> PermissionState {
            self.state
        }

        fn request_access(&self, on_resolved: Box<dyn FnOnce(bool) + Send>) {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            on_resolved(self.grant);
        }
    }

    fn resolve(state: PermissionState, grant: bool) -> (Vec<bool>, usize) {
        let authority = Arc::new(ScriptedAuthority::new(state, grant));
        let access = CameraAccess::new(authority.clone());
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let calls_in = calls.clone();
        access.request_if_needed(move |granted| calls_in.lock().unwrap().push(granted));
        let result = calls.lock().unwrap().clone();
        (result, authority.prompts.load(Ordering::SeqCst))
    }

    #[test]
    fn test_authorized_resolves_true_without_prompt() {
        assert_eq!(resolve(PermissionState::Authorized, false), (vec![true], 0));
    }

    #[test]
    fn test_blocked_states_resolve_false_without_prompt() {
        for state in [
            PermissionState::Denied,
            PermissionState::Restricted,
            PermissionState::Unknown,
        ] {
            assert_eq!(resolve(state, true), (vec![false], 0));
        }
    }

    #[test]
    fn test_not_determined_prompts_once_and_reports_choice() {
        assert_eq!(
            resolve(PermissionState::NotDetermined, true),
            (vec![true], 1)
        );
        assert_eq!(
            resolve(PermissionState::NotDetermined, false),
            (vec![false], 1)
        );
    }
}
