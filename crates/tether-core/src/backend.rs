//! Compiled-in backend selection

use std::rc::Rc;

use tether_sdk::ForeignApi;

/// The backend enabled at build time, if any
#[cfg(feature = "python")]
pub(crate) fn default_backend() -> Option<Rc<dyn ForeignApi>> {
    Some(Rc::new(tether_python::PythonApi::new()))
}

/// The backend enabled at build time, if any
#[cfg(not(feature = "python"))]
pub(crate) fn default_backend() -> Option<Rc<dyn ForeignApi>> {
    None
}
