//! Runtime lifecycle manager
//!
//! Tracks the process-wide `Uninitialized → Initialized → Finalized` state of
//! the foreign runtime. Initialization is idempotent; finalization is terminal
//! and any later use is a fatal error.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tether_sdk::ForeignApi;

use crate::error::{BridgeError, BridgeResult};

/// Lifecycle state of the foreign runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Not started yet
    Uninitialized,
    /// Started and usable
    Initialized,
    /// Torn down; no further use allowed
    Finalized,
}

static GLOBAL: Lazy<Arc<Lifecycle>> = Lazy::new(|| Arc::new(Lifecycle::new()));

/// Lifecycle gate shared by every component touching the runtime
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<RuntimeState>,
}

impl Lifecycle {
    /// Create a private lifecycle in the `Uninitialized` state
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuntimeState::Uninitialized),
        }
    }

    /// The process-wide lifecycle
    pub fn global() -> Arc<Lifecycle> {
        GLOBAL.clone()
    }

    /// Current state
    pub fn state(&self) -> RuntimeState {
        *self.state.lock()
    }

    /// Whether the runtime has been torn down
    pub fn is_finalized(&self) -> bool {
        self.state() == RuntimeState::Finalized
    }

    /// Start the runtime once; later calls are no-ops.
    ///
    /// # Panics
    /// Panics when called after [`Lifecycle::shutdown`].
    pub fn ensure_initialized(&self, api: &dyn ForeignApi, search_paths: &[String]) -> BridgeResult<()> {
        let mut state = self.state.lock();
        match *state {
            RuntimeState::Initialized => Ok(()),
            RuntimeState::Finalized => {
                panic!("{} runtime used after shutdown", api.name())
            }
            RuntimeState::Uninitialized => {
                if !api.initialize(search_paths) {
                    return Err(BridgeError::foreign(
                        "initialize",
                        format!("{} runtime failed to start", api.name()),
                    ));
                }
                *state = RuntimeState::Initialized;
                tracing::debug!(runtime = api.name(), ?search_paths, "foreign runtime initialized");
                Ok(())
            }
        }
    }

    /// Tear the runtime down.
    ///
    /// A no-op when the runtime never started or is already finalized.
    pub fn shutdown(&self, api: &dyn ForeignApi) {
        let mut state = self.state.lock();
        if *state == RuntimeState::Initialized {
            api.finalize();
            *state = RuntimeState::Finalized;
            tracing::debug!(runtime = api.name(), "foreign runtime finalized");
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_testing::SimRuntime;

    fn paths() -> Vec<String> {
        vec!["./".to_string()]
    }

    #[test]
    fn test_initialize_once() {
        let sim = SimRuntime::new();
        let lifecycle = Lifecycle::new();
        lifecycle.ensure_initialized(&sim, &paths()).unwrap();
        lifecycle.ensure_initialized(&sim, &paths()).unwrap();
        assert_eq!(sim.init_count(), 1);
        assert_eq!(lifecycle.state(), RuntimeState::Initialized);
        assert_eq!(sim.search_paths(), paths());
    }

    #[test]
    fn test_failed_start_stays_uninitialized() {
        let sim = SimRuntime::new();
        sim.set_fail_initialize(true);
        let lifecycle = Lifecycle::new();
        let err = lifecycle.ensure_initialized(&sim, &paths()).unwrap_err();
        assert!(matches!(err, BridgeError::ForeignRuntime { .. }));
        assert_eq!(lifecycle.state(), RuntimeState::Uninitialized);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let sim = SimRuntime::new();
        let lifecycle = Lifecycle::new();
        lifecycle.shutdown(&sim);
        assert_eq!(lifecycle.state(), RuntimeState::Uninitialized);

        lifecycle.ensure_initialized(&sim, &paths()).unwrap();
        lifecycle.shutdown(&sim);
        lifecycle.shutdown(&sim);
        assert!(lifecycle.is_finalized());
        assert!(sim.is_finalized());
    }

    #[test]
    #[should_panic(expected = "used after shutdown")]
    fn test_use_after_shutdown_is_fatal() {
        let sim = SimRuntime::new();
        let lifecycle = Lifecycle::new();
        lifecycle.ensure_initialized(&sim, &paths()).unwrap();
        lifecycle.shutdown(&sim);
        let _ = lifecycle.ensure_initialized(&sim, &paths());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&Lifecycle::global(), &Lifecycle::global()));
    }
}
