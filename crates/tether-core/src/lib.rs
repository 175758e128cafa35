//! Tether - a bridge between host values and foreign runtime objects
//!
//! The bridge lets a dynamically typed numeric host hold, inspect, call into
//! and exchange values with objects living in an embedded foreign runtime:
//!
//! - [`HostValue`] is the host side of every exchange, with [`ForeignHandle`]
//!   as the opaque variant owning one foreign reference
//! - the packer and unpacker convert in both directions, keeping numeric
//!   subtypes exact
//! - [`IndexOp`] chains (`a.b(1).c`) are translated into attribute, item and
//!   call operations
//! - every foreign call is checked for pending foreign errors, surfaced as
//!   [`BridgeError`]
//! - [`Lifecycle`] gates runtime start-up and shutdown
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{Bridge, BridgeConfig, HostValue};
//!
//! let bridge = Bridge::new(BridgeConfig::default());
//! let root = bridge.invoke("math", "sqrt", &[HostValue::from(2.0)])?;
//! ```

#![warn(missing_docs)]

mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod handle;
pub mod lifecycle;
mod pack;
pub mod persist;
pub mod protocol;
mod reference;
mod runtime;
mod translate;
mod unpack;
pub mod value;

pub use bridge::{Bridge, Receiver};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use handle::ForeignHandle;
pub use lifecycle::{Lifecycle, RuntimeState};
pub use persist::PersistFormat;
pub use protocol::IndexOp;
pub use value::{HostValue, Matrix};

pub use tether_sdk::{Float, Int, NumericKind, Scalar};

/// Whether `value` is a foreign handle; answerable without any runtime
pub fn is_foreign_value(value: &HostValue) -> bool {
    value.is_foreign()
}
