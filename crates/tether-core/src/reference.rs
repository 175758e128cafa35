//! Owned foreign references
//!
//! [`ForeignRef`] owns exactly one reference count on a foreign object.
//! Cloning acquires another; dropping releases one. After runtime shutdown a
//! drop leaks the reference instead of calling into a dead runtime.

use std::fmt;
use std::rc::Rc;

use tether_sdk::{ForeignKind, RawRef};

use crate::runtime::ForeignRuntime;

/// Owned reference to a foreign object
pub(crate) struct ForeignRef {
    raw: RawRef,
    runtime: Rc<ForeignRuntime>,
}

impl ForeignRef {
    /// Take ownership of a new reference
    pub(crate) fn from_owned(runtime: Rc<ForeignRuntime>, raw: RawRef) -> Self {
        Self { raw, runtime }
    }

    /// Acquire a reference on a borrowed object
    pub(crate) fn from_borrowed(runtime: Rc<ForeignRuntime>, raw: RawRef) -> Self {
        runtime.api().incref(raw);
        Self { raw, runtime }
    }

    #[inline]
    pub(crate) fn raw(&self) -> RawRef {
        self.raw
    }

    #[inline]
    pub(crate) fn runtime(&self) -> &Rc<ForeignRuntime> {
        &self.runtime
    }

    pub(crate) fn kind(&self) -> ForeignKind {
        self.runtime.api().kind_of(self.raw)
    }
}

impl Clone for ForeignRef {
    fn clone(&self) -> Self {
        if self.runtime.lifecycle().is_finalized() {
            panic!("foreign reference {:?} cloned after shutdown", self.raw);
        }
        Self::from_borrowed(self.runtime.clone(), self.raw)
    }
}

impl Drop for ForeignRef {
    fn drop(&mut self) {
        if self.runtime.lifecycle().is_finalized() {
            tracing::debug!(raw = ?self.raw, "leaking foreign reference dropped after shutdown");
            return;
        }
        self.runtime.api().decref(self.raw);
    }
}

impl fmt::Debug for ForeignRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignRef").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::lifecycle::Lifecycle;
    use std::sync::Arc;
    use tether_testing::SimRuntime;

    fn setup() -> (Rc<SimRuntime>, Rc<ForeignRuntime>) {
        let sim = Rc::new(SimRuntime::new());
        let rt = ForeignRuntime::new(sim.clone(), Arc::new(Lifecycle::new()), BridgeConfig::default());
        rt.ensure().unwrap();
        (sim, rt)
    }

    #[test]
    fn test_clone_and_drop_balance() {
        let (sim, rt) = setup();
        let raw = sim.str("x");
        let owned = ForeignRef::from_owned(rt.clone(), raw);
        let copy = owned.clone();
        assert_eq!(sim.refcount(raw), 2);
        drop(owned);
        assert_eq!(sim.refcount(raw), 1);
        drop(copy);
        assert!(!sim.is_alive(raw));
    }

    #[test]
    fn test_drop_after_shutdown_leaks() {
        let (sim, rt) = setup();
        let raw = sim.str("x");
        let owned = ForeignRef::from_owned(rt.clone(), raw);
        rt.shutdown();
        drop(owned);
        assert_eq!(sim.refcount(raw), 1);
    }

    #[test]
    #[should_panic(expected = "cloned after shutdown")]
    fn test_clone_after_shutdown_is_fatal() {
        let (sim, rt) = setup();
        let owned = ForeignRef::from_owned(rt.clone(), sim.int(1));
        rt.shutdown();
        let _copy = owned.clone();
    }
}
