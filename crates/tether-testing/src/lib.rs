//! Tether testing - a simulated foreign runtime
//!
//! [`SimRuntime`] implements [`tether_sdk::ForeignApi`] entirely in memory so
//! the bridge can be tested without an interpreter. It tracks reference counts
//! exactly and panics on lifecycle misuse.

#![warn(missing_docs)]

mod object;
mod runtime;

pub use object::NativeFn;
pub use runtime::SimRuntime;
