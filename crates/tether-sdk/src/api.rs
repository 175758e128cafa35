//! ForeignApi trait: the embedding surface of a foreign object runtime
//!
//! Backends (CPython, the simulated runtime used in tests) implement this
//! trait. The bridge programs against it and never sees backend internals.
//!
//! # Ownership
//!
//! The trait mirrors a C embedding API with manual reference counting:
//!
//! - Every method returning `Option<RawRef>` hands the caller a **new**
//!   reference. `None` is the failure sentinel.
//! - `RawRef` arguments are **borrowed**. Containers built by the runtime
//!   (`new_tuple`, `set_item`, `set_attr`) acquire their own references.
//! - A failing method sets the runtime's pending-error state, which the caller
//!   reads and clears through [`ForeignApi::take_error`].
//!
//! # Threading
//!
//! Runtimes are not assumed reentrant or thread-safe. Implementations are
//! driven from one thread and use interior mutability behind `&self`.

use std::fmt;
use std::num::NonZeroU64;

use crate::numeric::{NumericKind, Scalar};

/// Raw, non-owning reference to a foreign object.
///
/// The bits are backend-defined (a pointer for CPython, a slot id for the
/// simulated runtime). A `RawRef` carries no ownership by itself; the bridge
/// wraps it in an owning type before letting it escape.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawRef(NonZeroU64);

impl RawRef {
    /// Create from non-zero bits
    #[inline]
    pub const fn new(bits: NonZeroU64) -> Self {
        Self(bits)
    }

    /// Create from raw bits; zero is the null reference and yields `None`
    #[inline]
    pub const fn from_bits(bits: u64) -> Option<Self> {
        match NonZeroU64::new(bits) {
            Some(bits) => Some(Self(bits)),
            None => None,
        }
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0.get()
    }

    /// Create from a pointer; null yields `None`
    #[inline]
    pub fn from_ptr<T>(ptr: *mut T) -> Option<Self> {
        Self::from_bits(ptr as usize as u64)
    }

    /// Reinterpret as a pointer
    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as usize as *mut T
    }
}

impl fmt::Debug for RawRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawRef({:#x})", self.0.get())
    }
}

/// Closed classification of foreign objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKind {
    /// The runtime's null object
    Null,
    /// Boolean
    Bool,
    /// Integer of arbitrary magnitude
    Integer,
    /// Floating point
    Float,
    /// Byte string
    Bytes,
    /// Unicode string
    Unicode,
    /// Ordered sequence (tuple- or list-like)
    Sequence,
    /// Unordered attribute bag (dict-like)
    AttributeBag,
    /// Anything else: instances, modules, callables
    Object,
}

impl ForeignKind {
    /// True for integer, float and bool
    pub const fn is_numeric(self) -> bool {
        matches!(self, ForeignKind::Bool | ForeignKind::Integer | ForeignKind::Float)
    }

    /// True for byte and unicode strings
    pub const fn is_string(self) -> bool {
        matches!(self, ForeignKind::Bytes | ForeignKind::Unicode)
    }

    /// Lowercase kind name for diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ForeignKind::Null => "null",
            ForeignKind::Bool => "bool",
            ForeignKind::Integer => "integer",
            ForeignKind::Float => "float",
            ForeignKind::Bytes => "bytes",
            ForeignKind::Unicode => "unicode",
            ForeignKind::Sequence => "sequence",
            ForeignKind::AttributeBag => "attribute-bag",
            ForeignKind::Object => "object",
        }
    }
}

/// Captured pending-error state of the foreign runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignDiagnostic {
    /// Foreign exception class name (may be empty)
    pub kind: String,
    /// Foreign exception message
    pub message: String,
}

impl ForeignDiagnostic {
    /// Create a diagnostic
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ForeignDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.is_empty(), self.message.is_empty()) {
            (true, _) => f.write_str(&self.message),
            (false, true) => f.write_str(&self.kind),
            (false, false) => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Embedding API of a foreign object runtime.
///
/// See the module docs for the ownership contract.
pub trait ForeignApi {
    /// Short runtime name used in diagnostics (e.g. `"python"`)
    fn name(&self) -> &str;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the runtime and append `search_paths` to its module search path.
    ///
    /// Returns false when the runtime could not be started.
    fn initialize(&self, search_paths: &[String]) -> bool;

    /// Tear the runtime down. No other method may be called afterwards.
    fn finalize(&self);

    // ========================================================================
    // Reference counting
    // ========================================================================

    /// Acquire one more reference
    fn incref(&self, obj: RawRef);

    /// Release one reference
    fn decref(&self, obj: RawRef);

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Classify an object
    fn kind_of(&self, obj: RawRef) -> ForeignKind;

    /// Exact numeric subtype, for runtimes with typed numbers.
    ///
    /// Runtimes whose integers are unbounded return `None` and the bridge
    /// falls back to `int64`/`double`.
    fn numeric_kind(&self, _obj: RawRef) -> Option<NumericKind> {
        None
    }

    /// Function or type name used as the display class-name
    fn type_name(&self, obj: RawRef) -> Option<String>;

    /// Attribute names visible on the object
    fn member_names(&self, obj: RawRef) -> Option<Vec<String>>;

    /// Whether the object can be invoked
    fn is_callable(&self, obj: RawRef) -> bool;

    /// Whether the object accepts positional item lookup
    fn supports_indexing(&self, obj: RawRef) -> bool;

    // ========================================================================
    // Scalar extraction
    // ========================================================================

    /// Integer value; `None` when it does not fit in 128 bits
    fn int_value(&self, obj: RawRef) -> Option<i128>;

    /// Float value
    fn float_value(&self, obj: RawRef) -> f64;

    /// Bool value
    fn bool_value(&self, obj: RawRef) -> bool;

    /// Raw bytes of a byte string, UTF-8 bytes of a unicode string
    fn string_bytes(&self, obj: RawRef) -> Option<Vec<u8>>;

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Number of elements of an ordered sequence
    fn sequence_len(&self, obj: RawRef) -> Option<usize>;

    /// Element `index` of an ordered sequence (new reference)
    fn sequence_item(&self, obj: RawRef, index: usize) -> Option<RawRef>;

    // ========================================================================
    // Construction
    // ========================================================================

    /// The runtime's null object (new reference)
    fn none(&self) -> RawRef;

    /// Scalar built with the constructor matching the scalar's subtype
    fn new_scalar(&self, value: Scalar) -> Option<RawRef>;

    /// Unicode string
    fn new_string(&self, text: &str) -> Option<RawRef>;

    /// Ordered sequence holding its own references to `items`
    fn new_tuple(&self, items: &[RawRef]) -> Option<RawRef>;

    // ========================================================================
    // Protocol
    // ========================================================================

    /// Import a module by dotted name
    fn import(&self, name: &str) -> Option<RawRef>;

    /// Attribute get
    fn get_attr(&self, obj: RawRef, name: &str) -> Option<RawRef>;

    /// Attribute set; false on failure
    fn set_attr(&self, obj: RawRef, name: &str, value: RawRef) -> bool;

    /// Invoke `callable` with the positional arguments in tuple `args`
    fn call(&self, callable: RawRef, args: RawRef) -> Option<RawRef>;

    /// Item get (`obj[key]`)
    fn get_item(&self, obj: RawRef, key: RawRef) -> Option<RawRef>;

    /// Item set (`obj[key] = value`); false on failure
    fn set_item(&self, obj: RawRef, key: RawRef, value: RawRef) -> bool;

    // ========================================================================
    // Error state
    // ========================================================================

    /// Whether an error is pending
    fn error_occurred(&self) -> bool;

    /// Fetch and clear the pending error
    fn take_error(&self) -> Option<ForeignDiagnostic>;
}
