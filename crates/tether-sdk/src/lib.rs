//! Tether SDK - embedding API for foreign object runtimes
//!
//! This crate holds the minimal types a foreign-runtime backend needs to plug
//! into the bridge without depending on `tether-core`:
//!
//! - [`ForeignApi`]: the C-API-shaped surface a backend implements
//! - [`RawRef`], [`ForeignKind`], [`ForeignDiagnostic`]: what crosses it
//! - [`NumericKind`] and the [`NUMERIC_SPECS`] table, plus the typed scalars
//!   [`Int`], [`Float`] and [`Scalar`] shared with host values
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{ForeignApi, NumericKind, Scalar};
//!
//! fn make_byte(api: &dyn ForeignApi) -> Option<tether_sdk::RawRef> {
//!     let value = Scalar::from_i128(NumericKind::UInt8, 200).ok()?;
//!     api.new_scalar(value)
//! }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod error;
pub mod numeric;

pub use api::{ForeignApi, ForeignDiagnostic, ForeignKind, RawRef};
pub use error::{NumericError, NumericResult};
pub use numeric::{Float, Int, NumericKind, NumericSpec, Scalar, NUMERIC_SPECS};
