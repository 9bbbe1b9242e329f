//! The two process-wide atomics shared between the readiness watcher, the
//! process supervisor and the HTTP API.
//!
//! There is exactly one `LauncherState` per process; it is cheaply `Clone`d
//! (an `Arc` bump) into every `warp::Filter` and into the watcher/supervisor
//! tasks, mirroring the way the teacher threads an `Arc<Context<T>>` through
//! its HTTP filters instead of passing a state handle through every call.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Domain of the validator child process status.
///
/// Transitions are owned entirely by the supervisor; the HTTP layer and the
/// readiness watcher only ever read this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorStatus {
    Stopped,
    Running,
    Errored,
}

impl ValidatorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidatorStatus::Stopped => "stopped",
            ValidatorStatus::Running => "running",
            ValidatorStatus::Errored => "errored",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => ValidatorStatus::Running,
            2 => ValidatorStatus::Errored,
            _ => ValidatorStatus::Stopped,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ValidatorStatus::Stopped => 0,
            ValidatorStatus::Running => 1,
            ValidatorStatus::Errored => 2,
        }
    }
}

struct Inner {
    ready: AtomicBool,
    status: AtomicU8,
}

/// Cheaply-cloneable handle onto the process' readiness flag and validator
/// status. Cloning shares the same underlying atomics.
#[derive(Clone)]
pub struct LauncherState {
    inner: Arc<Inner>,
}

impl LauncherState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                ready: AtomicBool::new(false),
                status: AtomicU8::new(ValidatorStatus::Stopped.to_u8()),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Flips the readiness flag from `false` to `true`.
    ///
    /// Returns `true` if this call performed the flip, `false` if it was
    /// already set. The watcher calls this exactly once on success; the
    /// return value lets it avoid logging "became ready" twice in a racy
    /// restart scenario (not expected, but cheap to guard).
    pub fn set_ready(&self) -> bool {
        self.inner
            .ready
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn status(&self) -> ValidatorStatus {
        ValidatorStatus::from_u8(self.inner.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: ValidatorStatus) {
        self.inner.status.store(status.to_u8(), Ordering::SeqCst);
    }
}

impl Default for LauncherState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_flips_once() {
        let state = LauncherState::new();
        assert!(!state.is_ready());
        assert!(state.set_ready());
        assert!(state.is_ready());
        // A second flip attempt reports it was already set.
        assert!(!state.set_ready());
        assert!(state.is_ready());
    }

    #[test]
    fn status_defaults_to_stopped_and_is_shared_across_clones() {
        let state = LauncherState::new();
        assert_eq!(state.status(), ValidatorStatus::Stopped);

        let clone = state.clone();
        clone.set_status(ValidatorStatus::Running);
        assert_eq!(state.status(), ValidatorStatus::Running);
    }
}
