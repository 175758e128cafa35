//! Protocol bridge
//!
//! Interprets chains of host index operations (`a.b(1).c`, `a.b(2) = v`)
//! against foreign objects. Intermediate results stay foreign references;
//! only the final target of a read is packed.

use std::rc::Rc;

use tether_sdk::{Int, Scalar};

use crate::error::{BridgeError, BridgeResult};
use crate::handle::ForeignHandle;
use crate::pack::pack;
use crate::reference::ForeignRef;
use crate::runtime::ForeignRuntime;
use crate::translate;
use crate::unpack::{unpack, unpack_tuple};
use crate::value::HostValue;

/// One element of an index chain
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    /// `.name`
    Field(String),
    /// `(args)`: invocation, or positional lookup on non-callables
    Call(Vec<HostValue>),
    /// `{args}`: positional lookup
    Index(Vec<HostValue>),
}

impl IndexOp {
    /// `.name`
    pub fn field(name: impl Into<String>) -> Self {
        IndexOp::Field(name.into())
    }

    /// `(args)`
    pub fn call(args: impl IntoIterator<Item = HostValue>) -> Self {
        IndexOp::Call(args.into_iter().collect())
    }

    /// `{args}`
    pub fn index(args: impl IntoIterator<Item = HostValue>) -> Self {
        IndexOp::Index(args.into_iter().collect())
    }
}

// ============================================================================
// Foreign call sites
// ============================================================================

pub(crate) fn import(rt: &Rc<ForeignRuntime>, module: &str) -> BridgeResult<ForeignRef> {
    tracing::trace!(module, "import");
    translate::check_ref(rt, "import", rt.api().import(module))
}

/// Import that clears a failure silently; used to find the importable prefix
/// of a dotted name
pub(crate) fn try_import(rt: &Rc<ForeignRuntime>, module: &str) -> Option<ForeignRef> {
    let found = rt.api().import(module);
    match translate::clear(rt) {
        Some(diagnostic) => {
            if let Some(raw) = found {
                rt.api().decref(raw);
            }
            tracing::trace!(module, %diagnostic, "not importable");
            None
        }
        None => found.map(|raw| ForeignRef::from_owned(rt.clone(), raw)),
    }
}

pub(crate) fn get_attr(target: &ForeignRef, name: &str) -> BridgeResult<ForeignRef> {
    let rt = target.runtime();
    tracing::trace!(target = ?target.raw(), name, "get attribute");
    translate::check_ref(rt, "get field", rt.api().get_attr(target.raw(), name))
}

pub(crate) fn set_attr(target: &ForeignRef, name: &str, value: &ForeignRef) -> BridgeResult<()> {
    let rt = target.runtime();
    tracing::trace!(target = ?target.raw(), name, "set attribute");
    let ok = rt.api().set_attr(target.raw(), name, value.raw());
    translate::check_status(rt, "set field", ok)
}

pub(crate) fn call(target: &ForeignRef, args: &[HostValue]) -> BridgeResult<ForeignRef> {
    let rt = target.runtime();
    let tuple = unpack_tuple(rt, args)?;
    tracing::trace!(target = ?target.raw(), argc = args.len(), "call");
    translate::check_ref(rt, "call", rt.api().call(target.raw(), tuple.raw()))
}

fn get_item(target: &ForeignRef, args: &[HostValue]) -> BridgeResult<ForeignRef> {
    let rt = target.runtime();
    let key = index_key(rt, args)?;
    tracing::trace!(target = ?target.raw(), "get item");
    translate::check_ref(rt, "index", rt.api().get_item(target.raw(), key.raw()))
}

fn set_item(target: &ForeignRef, args: &[HostValue], value: &ForeignRef) -> BridgeResult<()> {
    let rt = target.runtime();
    let key = index_key(rt, args)?;
    tracing::trace!(target = ?target.raw(), "set item");
    let ok = rt.api().set_item(target.raw(), key.raw(), value.raw());
    translate::check_status(rt, "indexed assignment", ok)
}

/// Convert one 1-based host position into a 0-based foreign integer
fn index_key(rt: &Rc<ForeignRuntime>, args: &[HostValue]) -> BridgeResult<ForeignRef> {
    let [position] = args else {
        return Err(BridgeError::unsupported(format!(
            "exactly one index is supported, got {}",
            args.len()
        )));
    };
    let one_based = match position.as_scalar() {
        Some(Scalar::Int(i)) => i64::try_from(i.to_i128()).ok(),
        Some(Scalar::Float(x)) => {
            let x = x.to_f64();
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            (x.fract() == 0.0 && x < i64::MAX as f64).then_some(x as i64)
        }
        Some(Scalar::Bool(_)) | None => None,
    };
    match one_based {
        Some(n) if n >= 1 => unpack(rt, &HostValue::Integer(Int::I64(n - 1))),
        _ => Err(BridgeError::unsupported(format!(
            "index must be a positive integer, got {}",
            position.type_name()
        ))),
    }
}

// ============================================================================
// Chains
// ============================================================================

fn step(target: &ForeignRef, op: &IndexOp) -> BridgeResult<ForeignRef> {
    let api = target.runtime().api();
    match op {
        IndexOp::Field(name) => get_attr(target, name),
        IndexOp::Call(args) => {
            if api.is_callable(target.raw()) {
                call(target, args)
            } else if api.supports_indexing(target.raw()) {
                get_item(target, args)
            } else {
                Err(BridgeError::unsupported(format!(
                    "{} object is neither callable nor indexable",
                    target.kind().name()
                )))
            }
        }
        IndexOp::Index(args) => {
            if api.supports_indexing(target.raw()) {
                get_item(target, args)
            } else {
                Err(BridgeError::unsupported(format!(
                    "{} object does not support indexing",
                    target.kind().name()
                )))
            }
        }
    }
}

/// Evaluate a read chain and pack the final target
pub(crate) fn subsref(root: &ForeignHandle, chain: &[IndexOp]) -> BridgeResult<HostValue> {
    let rt = root.reference().runtime();
    rt.ensure()?;
    if chain.is_empty() {
        return Ok(HostValue::Foreign(root.clone()));
    }
    let mut target = root.reference().clone();
    for op in chain {
        target = step(&target, op)?;
    }
    pack(target)
}

/// Evaluate a write chain; the last element receives `rhs`.
///
/// Returns the root handle itself.
pub(crate) fn subsasgn(root: &ForeignHandle, chain: &[IndexOp], rhs: &HostValue) -> BridgeResult<ForeignHandle> {
    let rt = root.reference().runtime();
    rt.ensure()?;
    let Some((last, prefix)) = chain.split_last() else {
        return Err(BridgeError::unsupported("assignment needs at least one index"));
    };
    let mut target = root.reference().clone();
    for op in prefix {
        target = step(&target, op)?;
    }
    match last {
        IndexOp::Field(name) => {
            let value = unpack(rt, rhs)?;
            set_attr(&target, name, &value)?;
        }
        IndexOp::Call(args) | IndexOp::Index(args) => {
            if !rt.api().supports_indexing(target.raw()) {
                return Err(BridgeError::unsupported(format!(
                    "{} object does not support indexed assignment",
                    target.kind().name()
                )));
            }
            let value = unpack(rt, rhs)?;
            set_item(&target, args, &value)?;
        }
    }
    Ok(root.clone())
}
