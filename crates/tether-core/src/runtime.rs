//! Shared runtime context: backend, lifecycle gate and configuration

use std::rc::Rc;
use std::sync::Arc;

use tether_sdk::ForeignApi;

use crate::config::BridgeConfig;
use crate::error::BridgeResult;
use crate::lifecycle::Lifecycle;

/// Everything a foreign call site needs, shared by every reference.
pub(crate) struct ForeignRuntime {
    api: Rc<dyn ForeignApi>,
    lifecycle: Arc<Lifecycle>,
    config: BridgeConfig,
}

impl ForeignRuntime {
    pub(crate) fn new(api: Rc<dyn ForeignApi>, lifecycle: Arc<Lifecycle>, config: BridgeConfig) -> Rc<Self> {
        Rc::new(Self {
            api,
            lifecycle,
            config,
        })
    }

    #[inline]
    pub(crate) fn api(&self) -> &dyn ForeignApi {
        &*self.api
    }

    #[inline]
    pub(crate) fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Gate for every operation touching the runtime
    pub(crate) fn ensure(&self) -> BridgeResult<()> {
        self.lifecycle
            .ensure_initialized(&*self.api, &self.config.search_paths)
    }

    pub(crate) fn shutdown(&self) {
        self.lifecycle.shutdown(&*self.api);
    }
}
