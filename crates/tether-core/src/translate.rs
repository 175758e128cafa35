//! Error translator
//!
//! Every foreign call site funnels its result through one of these checks
//! before the result is used. A pending foreign error is fetched, cleared and
//! turned into [`BridgeError::ForeignRuntime`]; a failure sentinel without a
//! pending error becomes a generic "operation failed".

use std::rc::Rc;

use tether_sdk::{ForeignDiagnostic, RawRef};

use crate::error::{BridgeError, BridgeResult};
use crate::reference::ForeignRef;
use crate::runtime::ForeignRuntime;

const GENERIC_FAILURE: &str = "operation failed";

/// Check a call returning a new reference
pub(crate) fn check_ref(
    rt: &Rc<ForeignRuntime>,
    operation: &str,
    result: Option<RawRef>,
) -> BridgeResult<ForeignRef> {
    let api = rt.api();
    if api.error_occurred() {
        let diagnostic = api.take_error();
        if let Some(raw) = result {
            api.decref(raw);
        }
        return Err(report(rt, operation, diagnostic));
    }
    match result {
        Some(raw) => Ok(ForeignRef::from_owned(rt.clone(), raw)),
        None => Err(report(rt, operation, None)),
    }
}

/// Check a call returning a success flag
pub(crate) fn check_status(rt: &ForeignRuntime, operation: &str, ok: bool) -> BridgeResult<()> {
    let api = rt.api();
    if api.error_occurred() {
        return Err(report(rt, operation, api.take_error()));
    }
    if ok {
        Ok(())
    } else {
        Err(report(rt, operation, None))
    }
}

/// Check a call returning a plain value, optionally with a failure sentinel
pub(crate) fn check_value<T>(rt: &ForeignRuntime, operation: &str, value: Option<T>) -> BridgeResult<T> {
    let api = rt.api();
    if api.error_occurred() {
        return Err(report(rt, operation, api.take_error()));
    }
    value.ok_or_else(|| report(rt, operation, None))
}

/// Fetch and clear a pending error without reporting it
pub(crate) fn clear(rt: &ForeignRuntime) -> Option<ForeignDiagnostic> {
    let api = rt.api();
    if api.error_occurred() {
        api.take_error()
    } else {
        None
    }
}

fn report(rt: &ForeignRuntime, operation: &str, diagnostic: Option<ForeignDiagnostic>) -> BridgeError {
    let message = diagnostic
        .map(|d| d.to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
    if rt.config().debug {
        tracing::error!(runtime = rt.api().name(), operation, %message, "foreign error");
    }
    BridgeError::foreign(operation, message)
}
