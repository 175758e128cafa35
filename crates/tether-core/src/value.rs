//! Host value model

use std::fmt;

use tether_sdk::{Float, Int, NumericKind, Scalar};

use crate::error::{BridgeError, BridgeResult};
use crate::handle::ForeignHandle;

/// A value of the host language
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Absent value
    Undefined,
    /// Logical scalar
    Bool(bool),
    /// Integer scalar of a fixed width and signedness
    Integer(Int),
    /// Floating point scalar
    Float(Float),
    /// UTF-8 text
    String(String),
    /// Ordered heterogeneous sequence
    Cell(Vec<HostValue>),
    /// Homogeneous numeric array
    Matrix(Matrix),
    /// Opaque foreign object
    Foreign(ForeignHandle),
}

impl HostValue {
    /// Whether this is a foreign handle
    pub fn is_foreign(&self) -> bool {
        matches!(self, HostValue::Foreign(_))
    }

    /// The foreign handle, if this is one
    pub fn as_foreign(&self) -> Option<&ForeignHandle> {
        match self {
            HostValue::Foreign(handle) => Some(handle),
            _ => None,
        }
    }

    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Bool(_) => "logical",
            HostValue::Integer(i) => i.kind().name(),
            HostValue::Float(f) => f.kind().name(),
            HostValue::String(_) => "string",
            HostValue::Cell(_) => "cell",
            HostValue::Matrix(_) => "matrix",
            HostValue::Foreign(_) => "foreign",
        }
    }

    /// Scalar payload of a numeric or logical value
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            HostValue::Bool(b) => Some(Scalar::Bool(*b)),
            HostValue::Integer(i) => Some(Scalar::Int(*i)),
            HostValue::Float(f) => Some(Scalar::Float(*f)),
            _ => None,
        }
    }
}

impl From<Scalar> for HostValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Bool(b) => HostValue::Bool(b),
            Scalar::Int(i) => HostValue::Integer(i),
            Scalar::Float(f) => HostValue::Float(f),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

macro_rules! impl_from_native {
    ($($ty:ty => $variant:ident($inner:ident)),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    HostValue::$variant($inner::from(value))
                }
            }
        )*
    };
}

impl_from_native! {
    i8 => Integer(Int),
    u8 => Integer(Int),
    i16 => Integer(Int),
    u16 => Integer(Int),
    i32 => Integer(Int),
    u32 => Integer(Int),
    i64 => Integer(Int),
    u64 => Integer(Int),
    f32 => Float(Float),
    f64 => Float(Float),
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(values: Vec<HostValue>) -> Self {
        HostValue::Cell(values)
    }
}

impl From<Matrix> for HostValue {
    fn from(value: Matrix) -> Self {
        HostValue::Matrix(value)
    }
}

impl From<ForeignHandle> for HostValue {
    fn from(value: ForeignHandle) -> Self {
        HostValue::Foreign(value)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Undefined => f.write_str("[]"),
            HostValue::Bool(b) => write!(f, "{}", *b as u8),
            HostValue::Integer(i) => write!(f, "{}", i),
            HostValue::Float(x) => write!(f, "{}", x),
            HostValue::String(s) => f.write_str(s),
            HostValue::Cell(items) => write!(f, "{{1x{} cell}}", items.len()),
            HostValue::Matrix(m) => {
                let dims: Vec<String> = m.dims().iter().map(|d| d.to_string()).collect();
                write!(f, "[{} {}]", dims.join("x"), m.kind())
            }
            HostValue::Foreign(handle) => write!(f, "{}", handle),
        }
    }
}

/// Homogeneous numeric array, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    kind: NumericKind,
    dims: Vec<usize>,
    data: Vec<Scalar>,
}

impl Matrix {
    /// Create a matrix, checking the element count and element kinds
    pub fn new(kind: NumericKind, dims: Vec<usize>, data: Vec<Scalar>) -> BridgeResult<Self> {
        let expected: usize = dims.iter().product();
        if dims.is_empty() || expected != data.len() {
            return Err(BridgeError::conversion(format!(
                "matrix of dims {:?} needs {} elements, got {}",
                dims,
                expected,
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|s| s.kind() != kind) {
            return Err(BridgeError::conversion(format!(
                "{} element in {} matrix",
                bad.kind(),
                kind
            )));
        }
        Ok(Self { kind, dims, data })
    }

    /// Create a 2-d matrix from rows; ragged rows are rejected
    pub fn from_rows(kind: NumericKind, rows: Vec<Vec<Scalar>>) -> BridgeResult<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != ncols) {
            return Err(BridgeError::conversion("ragged rows in matrix"));
        }
        Self::new(kind, vec![nrows, ncols], rows.into_iter().flatten().collect())
    }

    /// Create a 2-d double matrix
    pub fn from_f64(rows: usize, cols: usize, data: &[f64]) -> BridgeResult<Self> {
        let data = data.iter().map(|&x| Scalar::Float(Float::F64(x))).collect();
        Self::new(NumericKind::Double, vec![rows, cols], data)
    }

    /// The `0x0` double matrix
    pub fn empty() -> Self {
        Self {
            kind: NumericKind::Double,
            dims: vec![0, 0],
            data: Vec::new(),
        }
    }

    /// Element subtype
    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    /// Dimensions
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Elements in row-major order
    pub fn data(&self) -> &[Scalar] {
        &self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix has no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(rows, cols)` view of an array with at most two non-trivial dimensions.
    ///
    /// Singleton dimensions are squeezed away, which leaves the row-major
    /// element order unchanged. Returns `None` for true N-d arrays.
    pub fn shape_2d(&self) -> Option<(usize, usize)> {
        match self.dims.as_slice() {
            [n] => Some((1, *n)),
            [r, c] => Some((*r, *c)),
            dims => {
                let significant: Vec<usize> = dims.iter().copied().filter(|&d| d != 1).collect();
                match significant.as_slice() {
                    [] => Some((1, 1)),
                    [n] => Some((1, *n)),
                    [r, c] => Some((*r, *c)),
                    _ => None,
                }
            }
        }
    }

    /// Element at `(row, col)` of a 2-d view
    pub fn get(&self, row: usize, col: usize) -> Option<Scalar> {
        let (rows, cols) = self.shape_2d()?;
        if row < rows && col < cols {
            self.data.get(row * cols + col).copied()
        } else {
            None
        }
    }
}
