//! Numeric subtypes shared by host values and foreign scalars.
//!
//! Every width/signedness combination is described exactly once in
//! [`NUMERIC_SPECS`]. Conversions read the descriptor (bit width, signedness,
//! floating-ness) instead of repeating one branch per subtype, so adding a
//! subtype means adding one table row and one enum arm.
//!
//! # Table
//!
//! ```text
//! kind     name      bits  signed  float  code
//! Int8     int8         8  yes     no     b
//! UInt8    uint8        8  no      no     B
//! Int16    int16       16  yes     no     h
//! UInt16   uint16      16  no      no     H
//! Int32    int32       32  yes     no     i
//! UInt32   uint32      32  no      no     I
//! Int64    int64       64  yes     no     L
//! UInt64   uint64      64  no      no     K
//! Single   single      32  yes     yes    f
//! Double   double      64  yes     yes    d
//! Logical  logical      1  no      no     ?
//! ```

use std::fmt;

use crate::error::{NumericError, NumericResult};

/// Host numeric subtype.
///
/// The discriminant doubles as the row index into [`NUMERIC_SPECS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NumericKind {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    UInt8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    UInt16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    UInt32 = 5,
    /// Signed 64-bit integer
    Int64 = 6,
    /// Unsigned 64-bit integer
    UInt64 = 7,
    /// 32-bit IEEE 754 float
    Single = 8,
    /// 64-bit IEEE 754 float
    Double = 9,
    /// Boolean
    Logical = 10,
}

/// Descriptor for one numeric subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSpec {
    /// Subtype this row describes
    pub kind: NumericKind,
    /// Host-visible class name
    pub name: &'static str,
    /// Storage width in bits
    pub bits: u32,
    /// Whether negative values are representable
    pub signed: bool,
    /// Whether the subtype is floating point
    pub float: bool,
    /// Single-character build code used by C-style value builders
    pub code: char,
}

const fn spec(
    kind: NumericKind,
    name: &'static str,
    bits: u32,
    signed: bool,
    float: bool,
    code: char,
) -> NumericSpec {
    NumericSpec {
        kind,
        name,
        bits,
        signed,
        float,
        code,
    }
}

/// Lookup table indexed by `NumericKind as usize`.
pub const NUMERIC_SPECS: [NumericSpec; 11] = [
    spec(NumericKind::Int8, "int8", 8, true, false, 'b'),
    spec(NumericKind::UInt8, "uint8", 8, false, false, 'B'),
    spec(NumericKind::Int16, "int16", 16, true, false, 'h'),
    spec(NumericKind::UInt16, "uint16", 16, false, false, 'H'),
    spec(NumericKind::Int32, "int32", 32, true, false, 'i'),
    spec(NumericKind::UInt32, "uint32", 32, false, false, 'I'),
    spec(NumericKind::Int64, "int64", 64, true, false, 'L'),
    spec(NumericKind::UInt64, "uint64", 64, false, false, 'K'),
    spec(NumericKind::Single, "single", 32, true, true, 'f'),
    spec(NumericKind::Double, "double", 64, true, true, 'd'),
    spec(NumericKind::Logical, "logical", 1, false, false, '?'),
];

impl NumericKind {
    /// All subtypes in table order
    pub const ALL: [NumericKind; 11] = [
        NumericKind::Int8,
        NumericKind::UInt8,
        NumericKind::Int16,
        NumericKind::UInt16,
        NumericKind::Int32,
        NumericKind::UInt32,
        NumericKind::Int64,
        NumericKind::UInt64,
        NumericKind::Single,
        NumericKind::Double,
        NumericKind::Logical,
    ];

    /// Descriptor row for this subtype
    #[inline]
    pub fn spec(self) -> &'static NumericSpec {
        &NUMERIC_SPECS[self as usize]
    }

    /// Host-visible class name (`"uint8"`, `"double"`, ...)
    #[inline]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Look a subtype up by its host class name
    pub fn from_name(name: &str) -> Option<Self> {
        NUMERIC_SPECS
            .iter()
            .find(|row| row.name == name)
            .map(|row| row.kind)
    }

    /// Look a subtype up by its build code
    pub fn from_code(code: char) -> Option<Self> {
        NUMERIC_SPECS
            .iter()
            .find(|row| row.code == code)
            .map(|row| row.kind)
    }

    /// True for the eight integer subtypes
    #[inline]
    pub fn is_integer(self) -> bool {
        let row = self.spec();
        !row.float && self != NumericKind::Logical
    }

    /// True for `Single` and `Double`
    #[inline]
    pub fn is_float(self) -> bool {
        self.spec().float
    }

    /// Inclusive value range of an integer subtype, `None` otherwise.
    pub fn int_range(self) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = self.spec().bits;
        if self.spec().signed {
            let half = 1i128 << (bits - 1);
            Some((-half, half - 1))
        } else {
            Some((0, (1i128 << bits) - 1))
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Int
// ============================================================================

/// An integer scalar carrying its exact subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Int {
    /// int8
    I8(i8),
    /// uint8
    U8(u8),
    /// int16
    I16(i16),
    /// uint16
    U16(u16),
    /// int32
    I32(i32),
    /// uint32
    U32(u32),
    /// int64
    I64(i64),
    /// uint64
    U64(u64),
}

impl Int {
    /// Build an integer of `kind` from a wide value.
    ///
    /// The range check is driven by the descriptor table, so every subtype
    /// shares this single code path. Out-of-range values fail with
    /// [`NumericError::Overflow`]; they are never truncated.
    pub fn new(kind: NumericKind, value: i128) -> NumericResult<Self> {
        let (min, max) = kind.int_range().ok_or(NumericError::KindMismatch {
            expected: "integer",
            got: kind.name(),
        })?;
        if value < min || value > max {
            return Err(NumericError::Overflow {
                value: value.to_string(),
                target: kind.name(),
            });
        }
        // In range for `kind`, so the narrowing casts below are lossless.
        Ok(match kind {
            NumericKind::Int8 => Int::I8(value as i8),
            NumericKind::UInt8 => Int::U8(value as u8),
            NumericKind::Int16 => Int::I16(value as i16),
            NumericKind::UInt16 => Int::U16(value as u16),
            NumericKind::Int32 => Int::I32(value as i32),
            NumericKind::UInt32 => Int::U32(value as u32),
            NumericKind::Int64 => Int::I64(value as i64),
            NumericKind::UInt64 => Int::U64(value as u64),
            NumericKind::Single | NumericKind::Double | NumericKind::Logical => {
                return Err(NumericError::KindMismatch {
                    expected: "integer",
                    got: kind.name(),
                })
            }
        })
    }

    /// Subtype of this integer
    pub fn kind(self) -> NumericKind {
        match self {
            Int::I8(_) => NumericKind::Int8,
            Int::U8(_) => NumericKind::UInt8,
            Int::I16(_) => NumericKind::Int16,
            Int::U16(_) => NumericKind::UInt16,
            Int::I32(_) => NumericKind::Int32,
            Int::U32(_) => NumericKind::UInt32,
            Int::I64(_) => NumericKind::Int64,
            Int::U64(_) => NumericKind::UInt64,
        }
    }

    /// Widen to `i128` (lossless for every subtype)
    pub fn to_i128(self) -> i128 {
        match self {
            Int::I8(v) => v as i128,
            Int::U8(v) => v as i128,
            Int::I16(v) => v as i128,
            Int::U16(v) => v as i128,
            Int::I32(v) => v as i128,
            Int::U32(v) => v as i128,
            Int::I64(v) => v as i128,
            Int::U64(v) => v as i128,
        }
    }

    /// Value as `f64` (may round for magnitudes above 2^53)
    pub fn to_f64(self) -> f64 {
        self.to_i128() as f64
    }
}

macro_rules! impl_int_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Int {
                fn from(value: $ty) -> Self {
                    Int::$variant(value)
                }
            }
        )*
    };
}

impl_int_from! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

// ============================================================================
// Float
// ============================================================================

/// A floating-point scalar carrying its exact subtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Float {
    /// single
    F32(f32),
    /// double
    F64(f64),
}

impl Float {
    /// Build a float of `kind` from a double.
    ///
    /// A finite double whose magnitude exceeds `f32::MAX` cannot become a
    /// `single` and fails with [`NumericError::Overflow`].
    pub fn new(kind: NumericKind, value: f64) -> NumericResult<Self> {
        match kind {
            NumericKind::Double => Ok(Float::F64(value)),
            NumericKind::Single => {
                if value.is_finite() && value.abs() > f32::MAX as f64 {
                    return Err(NumericError::Overflow {
                        value: value.to_string(),
                        target: kind.name(),
                    });
                }
                Ok(Float::F32(value as f32))
            }
            other => Err(NumericError::KindMismatch {
                expected: "float",
                got: other.name(),
            }),
        }
    }

    /// Subtype of this float
    pub fn kind(self) -> NumericKind {
        match self {
            Float::F32(_) => NumericKind::Single,
            Float::F64(_) => NumericKind::Double,
        }
    }

    /// Widen to `f64`
    pub fn to_f64(self) -> f64 {
        match self {
            Float::F32(v) => v as f64,
            Float::F64(v) => v,
        }
    }
}

impl From<f32> for Float {
    fn from(value: f32) -> Self {
        Float::F32(value)
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Float::F64(value)
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Float::F32(v) => write!(f, "{}", v),
            Float::F64(v) => write!(f, "{}", v),
        }
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// Any numeric scalar: the element type of host matrices and the payload of
/// foreign scalar constructors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// logical
    Bool(bool),
    /// One of the integer subtypes
    Int(Int),
    /// One of the float subtypes
    Float(Float),
}

impl Scalar {
    /// Build a scalar of `kind` from an integral value.
    ///
    /// Integer kinds are range-checked; float kinds take the nearest value;
    /// `Logical` is true for any non-zero value.
    pub fn from_i128(kind: NumericKind, value: i128) -> NumericResult<Self> {
        if kind.is_integer() {
            Int::new(kind, value).map(Scalar::Int)
        } else if kind.is_float() {
            Float::new(kind, value as f64).map(Scalar::Float)
        } else {
            Ok(Scalar::Bool(value != 0))
        }
    }

    /// Build a scalar of `kind` from a double.
    ///
    /// Integer kinds require an integral, in-range value.
    pub fn from_f64(kind: NumericKind, value: f64) -> NumericResult<Self> {
        if kind.is_float() {
            Float::new(kind, value).map(Scalar::Float)
        } else if kind.is_integer() {
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(NumericError::Inexact {
                    value: value.to_string(),
                    target: kind.name(),
                });
            }
            Int::new(kind, value as i128).map(Scalar::Int)
        } else {
            Ok(Scalar::Bool(value != 0.0))
        }
    }

    /// Subtype of this scalar
    pub fn kind(self) -> NumericKind {
        match self {
            Scalar::Bool(_) => NumericKind::Logical,
            Scalar::Int(i) => i.kind(),
            Scalar::Float(f) => f.kind(),
        }
    }

    /// Widen to `f64` (true is 1.0)
    pub fn to_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Int(i) => i.to_f64(),
            Scalar::Float(f) => f.to_f64(),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<Int> for Scalar {
    fn from(i: Int) -> Self {
        Scalar::Int(i)
    }
}

impl From<Float> for Scalar {
    fn from(f: Float) -> Self {
        Scalar::Float(f)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_discriminant() {
        for kind in NumericKind::ALL {
            assert_eq!(kind.spec().kind, kind);
        }
    }

    #[test]
    fn test_lookup_by_name_and_code() {
        assert_eq!(NumericKind::from_name("uint16"), Some(NumericKind::UInt16));
        assert_eq!(NumericKind::from_code('K'), Some(NumericKind::UInt64));
        assert_eq!(NumericKind::from_name("complex"), None);
    }

    #[test]
    fn test_int_range_from_descriptor() {
        assert_eq!(NumericKind::Int8.int_range(), Some((-128, 127)));
        assert_eq!(NumericKind::UInt8.int_range(), Some((0, 255)));
        assert_eq!(
            NumericKind::UInt64.int_range(),
            Some((0, u64::MAX as i128))
        );
        assert_eq!(NumericKind::Double.int_range(), None);
        assert_eq!(NumericKind::Logical.int_range(), None);
    }

    #[test]
    fn test_int_new_keeps_subtype() {
        let v = Int::new(NumericKind::UInt8, 200).unwrap();
        assert_eq!(v, Int::U8(200));
        assert_eq!(v.kind(), NumericKind::UInt8);
        assert_eq!(v.to_i128(), 200);
    }

    #[test]
    fn test_int_new_overflow_is_rejected() {
        let err = Int::new(NumericKind::Int8, 128).unwrap_err();
        assert!(matches!(err, NumericError::Overflow { target: "int8", .. }));
        assert!(Int::new(NumericKind::UInt32, -1).is_err());
        assert!(Int::new(NumericKind::UInt64, u64::MAX as i128 + 1).is_err());
    }

    #[test]
    fn test_int_new_rejects_float_kind() {
        let err = Int::new(NumericKind::Double, 1).unwrap_err();
        assert!(matches!(err, NumericError::KindMismatch { .. }));
    }

    #[test]
    fn test_single_overflow() {
        assert!(Float::new(NumericKind::Single, 1e300).is_err());
        assert_eq!(
            Float::new(NumericKind::Single, 1.5).unwrap(),
            Float::F32(1.5)
        );
        // Infinities are representable, not an overflow
        assert!(Float::new(NumericKind::Single, f64::INFINITY).is_ok());
    }

    #[test]
    fn test_scalar_from_f64_requires_integral_value() {
        assert_eq!(
            Scalar::from_f64(NumericKind::Int16, -3.0).unwrap(),
            Scalar::Int(Int::I16(-3))
        );
        assert!(matches!(
            Scalar::from_f64(NumericKind::Int16, 2.5),
            Err(NumericError::Inexact { .. })
        ));
        assert_eq!(
            Scalar::from_f64(NumericKind::Logical, 2.0).unwrap(),
            Scalar::Bool(true)
        );
    }

    #[test]
    fn test_scalar_widening() {
        assert_eq!(Scalar::Bool(true).to_f64(), 1.0);
        assert_eq!(Scalar::Int(Int::I32(-7)).to_f64(), -7.0);
        assert_eq!(Scalar::Float(Float::F32(0.5)).to_f64(), 0.5);
        assert_eq!(Scalar::Int(Int::U64(9)).kind(), NumericKind::UInt64);
    }
}
