//! Persistence hooks
//!
//! Foreign objects are never serialized. Saving skips the value and loading
//! leaves the handle untouched; both report a warning and succeed so that
//! saving a workspace holding handles does not abort.

use std::fmt;

use crate::handle::ForeignHandle;
use crate::value::HostValue;

/// Host persistence formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistFormat {
    /// Text format
    Ascii,
    /// Native binary format
    Binary,
    /// HDF5 container
    Hdf5,
}

impl fmt::Display for PersistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersistFormat::Ascii => "ascii",
            PersistFormat::Binary => "binary",
            PersistFormat::Hdf5 => "hdf5",
        })
    }
}

impl ForeignHandle {
    /// Save hook: warns and skips. Always succeeds.
    pub fn save(&self, format: PersistFormat) -> bool {
        tracing::warn!(
            %format,
            class = self.class_name(),
            "save: unable to save foreign objects, skipping"
        );
        true
    }

    /// Load hook: warns and leaves the handle as is. Always succeeds.
    pub fn load(&mut self, format: PersistFormat) -> bool {
        tracing::warn!(
            %format,
            class = self.class_name(),
            "load: unable to load foreign objects, keeping the handle"
        );
        true
    }
}

/// Number of foreign handles a save of `value` skips
pub fn skipped_handles(value: &HostValue, format: PersistFormat) -> usize {
    match value {
        HostValue::Foreign(handle) => usize::from(handle.save(format)),
        HostValue::Cell(items) => items.iter().map(|item| skipped_handles(item, format)).sum(),
        _ => 0,
    }
}
