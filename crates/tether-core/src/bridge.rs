//! Host-facing entry points
//!
//! [`Bridge`] is what the host interpreter calls: import, construct, invoke,
//! field access, index chains and lifecycle control. A bridge built without a
//! backend answers [`Bridge::is_foreign_value`] normally and fails every other
//! operation with [`BridgeError::RuntimeNotAvailable`].

use std::rc::Rc;
use std::sync::Arc;

use tether_sdk::ForeignApi;

use crate::backend;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::ForeignHandle;
use crate::lifecycle::Lifecycle;
use crate::pack::pack;
use crate::protocol::{self, IndexOp};
use crate::reference::ForeignRef;
use crate::runtime::ForeignRuntime;
use crate::unpack::unpack;
use crate::value::HostValue;

/// Object an invocation or field access is dispatched on
#[derive(Debug, Clone, Copy)]
pub enum Receiver<'a> {
    /// An existing handle
    Handle(&'a ForeignHandle),
    /// A dotted module path, optionally followed by attributes (`"os.path"`)
    Name(&'a str),
}

impl<'a> From<&'a ForeignHandle> for Receiver<'a> {
    fn from(handle: &'a ForeignHandle) -> Self {
        Receiver::Handle(handle)
    }
}

impl<'a> From<&'a str> for Receiver<'a> {
    fn from(name: &'a str) -> Self {
        Receiver::Name(name)
    }
}

/// The foreign-object value bridge
pub struct Bridge {
    runtime: Option<Rc<ForeignRuntime>>,
}

impl Bridge {
    /// Bridge over the backend compiled into this build, gated by the
    /// process-wide lifecycle
    pub fn new(config: BridgeConfig) -> Self {
        match backend::default_backend() {
            Some(api) => Self::with_api(api, Lifecycle::global(), config),
            None => {
                tracing::debug!("no foreign runtime backend compiled in");
                Self::unavailable()
            }
        }
    }

    /// Bridge over an explicit backend and lifecycle
    pub fn with_api(api: Rc<dyn ForeignApi>, lifecycle: Arc<Lifecycle>, config: BridgeConfig) -> Self {
        Self {
            runtime: Some(ForeignRuntime::new(api, lifecycle, config)),
        }
    }

    /// Bridge without a backend
    pub fn unavailable() -> Self {
        Self { runtime: None }
    }

    /// Whether a backend is present
    pub fn is_available(&self) -> bool {
        self.runtime.is_some()
    }

    /// Name of the backend, if any
    pub fn runtime_name(&self) -> Option<&str> {
        self.runtime.as_ref().map(|rt| rt.api().name())
    }

    fn runtime(&self) -> BridgeResult<&Rc<ForeignRuntime>> {
        let rt = self.runtime.as_ref().ok_or_else(|| {
            BridgeError::RuntimeNotAvailable("built without a foreign runtime backend".to_string())
        })?;
        rt.ensure()?;
        Ok(rt)
    }

    /// Check that `handle` was produced by this bridge's runtime
    fn owns(&self, handle: &ForeignHandle) -> BridgeResult<()> {
        let rt = self.runtime()?;
        if Rc::ptr_eq(handle.reference().runtime(), rt) {
            Ok(())
        } else {
            Err(BridgeError::conversion(
                "foreign handle belongs to a different runtime",
            ))
        }
    }

    fn resolve(&self, receiver: Receiver<'_>) -> BridgeResult<ForeignRef> {
        match receiver {
            Receiver::Handle(handle) => {
                self.owns(handle)?;
                Ok(handle.reference().clone())
            }
            Receiver::Name(name) => resolve_name(self.runtime()?, name),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the foreign runtime (idempotent)
    pub fn init(&self) -> BridgeResult<()> {
        self.runtime().map(|_| ())
    }

    /// Tear the foreign runtime down. Handles must not be used afterwards.
    pub fn exit(&self) {
        if let Some(rt) = &self.runtime {
            rt.shutdown();
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Import a module
    pub fn import(&self, module: &str) -> BridgeResult<ForeignHandle> {
        let rt = self.runtime()?;
        protocol::import(rt, module).map(ForeignHandle::wrap)
    }

    /// Instantiate `class_name` from `module` with positional `args`
    pub fn construct(&self, module: &ForeignHandle, class_name: &str, args: &[HostValue]) -> BridgeResult<ForeignHandle> {
        let module = self.resolve(Receiver::Handle(module))?;
        let class = protocol::get_attr(&module, class_name)?;
        protocol::call(&class, args).map(ForeignHandle::wrap)
    }

    /// Call `method` on a handle, or on a dotted module path for static
    /// dispatch, and pack the result
    pub fn invoke<'a>(&self, receiver: impl Into<Receiver<'a>>, method: &str, args: &[HostValue]) -> BridgeResult<HostValue> {
        let target = self.resolve(receiver.into())?;
        let callable = protocol::get_attr(&target, method)?;
        pack(protocol::call(&callable, args)?)
    }

    /// Read an attribute
    pub fn get_field<'a>(&self, receiver: impl Into<Receiver<'a>>, field: &str) -> BridgeResult<HostValue> {
        let target = self.resolve(receiver.into())?;
        pack(protocol::get_attr(&target, field)?)
    }

    /// Write an attribute
    pub fn set_field<'a>(&self, receiver: impl Into<Receiver<'a>>, field: &str, value: &HostValue) -> BridgeResult<()> {
        let target = self.resolve(receiver.into())?;
        let value = unpack(target.runtime(), value)?;
        protocol::set_attr(&target, field, &value)
    }

    /// Evaluate a read chain on a handle
    pub fn subsref(&self, root: &ForeignHandle, chain: &[IndexOp]) -> BridgeResult<HostValue> {
        self.owns(root)?;
        protocol::subsref(root, chain)
    }

    /// Evaluate a write chain on a handle; returns the root handle
    pub fn subsasgn(&self, root: &ForeignHandle, chain: &[IndexOp], rhs: &HostValue) -> BridgeResult<ForeignHandle> {
        self.owns(root)?;
        protocol::subsasgn(root, chain, rhs)
    }

    /// Public member names of a handle
    pub fn members(&self, handle: &ForeignHandle) -> BridgeResult<Vec<String>> {
        self.owns(handle)?;
        handle.members()
    }

    /// Whether `value` is a foreign handle; never fails
    pub fn is_foreign_value(&self, value: &HostValue) -> bool {
        value.is_foreign()
    }
}

/// Import the longest importable prefix of `name`, then walk the rest as
/// attributes
fn resolve_name(rt: &Rc<ForeignRuntime>, name: &str) -> BridgeResult<ForeignRef> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(BridgeError::unsupported(format!("invalid qualified name '{}'", name)));
    }
    let mut split = segments.len();
    let mut target = loop {
        if split == 1 {
            break protocol::import(rt, segments[0])?;
        }
        if let Some(module) = protocol::try_import(rt, &segments[..split].join(".")) {
            break module;
        }
        split -= 1;
    };
    for attr in &segments[split..] {
        target = protocol::get_attr(&target, attr)?;
    }
    Ok(target)
}
