//! Object model of the simulated runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tether_sdk::{ForeignKind, NumericKind, RawRef};

use crate::runtime::SimRuntime;

/// Body of a simulated function.
///
/// Receives borrowed argument references and returns a new reference, or
/// `None` after (normally) raising through [`SimRuntime::raise`].
pub type NativeFn = Rc<dyn Fn(&SimRuntime, &[RawRef]) -> Option<RawRef>>;

/// A heap object of the simulated runtime
pub(crate) enum Object {
    None,
    Bool(bool),
    Int {
        value: i128,
        kind: Option<NumericKind>,
    },
    Float {
        value: f64,
        kind: Option<NumericKind>,
    },
    Bytes(Vec<u8>),
    Str(String),
    /// Unicode string stored as UTF-16 code units, possibly unpaired
    Utf16(Vec<u16>),
    Tuple(Vec<RawRef>),
    List(Vec<RawRef>),
    Dict(BTreeMap<String, RawRef>),
    Module {
        name: String,
        attrs: BTreeMap<String, RawRef>,
    },
    Class {
        name: String,
        attrs: BTreeMap<String, RawRef>,
    },
    Instance {
        class: RawRef,
        attrs: BTreeMap<String, RawRef>,
    },
    Function {
        name: String,
        body: NativeFn,
    },
    BoundMethod {
        receiver: RawRef,
        function: RawRef,
    },
}

impl Object {
    pub(crate) fn kind(&self) -> ForeignKind {
        match self {
            Object::None => ForeignKind::Null,
            Object::Bool(_) => ForeignKind::Bool,
            Object::Int { .. } => ForeignKind::Integer,
            Object::Float { .. } => ForeignKind::Float,
            Object::Bytes(_) => ForeignKind::Bytes,
            Object::Str(_) | Object::Utf16(_) => ForeignKind::Unicode,
            Object::Tuple(_) | Object::List(_) => ForeignKind::Sequence,
            Object::Dict(_) => ForeignKind::AttributeBag,
            Object::Module { .. }
            | Object::Class { .. }
            | Object::Instance { .. }
            | Object::Function { .. }
            | Object::BoundMethod { .. } => ForeignKind::Object,
        }
    }

    /// Builtin type name; instances and bound methods need the heap to
    /// resolve theirs and are handled by the runtime.
    pub(crate) fn builtin_type_name(&self) -> &'static str {
        match self {
            Object::None => "NoneType",
            Object::Bool(_) => "bool",
            Object::Int { .. } => "int",
            Object::Float { .. } => "float",
            Object::Bytes(_) => "bytes",
            Object::Str(_) | Object::Utf16(_) => "str",
            Object::Tuple(_) => "tuple",
            Object::List(_) => "list",
            Object::Dict(_) => "dict",
            Object::Module { .. } => "module",
            Object::Class { .. } => "type",
            Object::Instance { .. } => "object",
            Object::Function { .. } => "function",
            Object::BoundMethod { .. } => "method",
        }
    }

    /// References this object holds on other objects
    pub(crate) fn children(&self) -> Vec<RawRef> {
        match self {
            Object::Tuple(items) | Object::List(items) => items.clone(),
            Object::Dict(attrs) | Object::Module { attrs, .. } | Object::Class { attrs, .. } => {
                attrs.values().copied().collect()
            }
            Object::Instance { class, attrs } => {
                let mut out: Vec<RawRef> = attrs.values().copied().collect();
                out.push(*class);
                out
            }
            Object::BoundMethod { receiver, function } => vec![*receiver, *function],
            _ => Vec::new(),
        }
    }

    /// Attribute table, for the object kinds that have one
    pub(crate) fn attrs(&self) -> Option<&BTreeMap<String, RawRef>> {
        match self {
            Object::Dict(attrs)
            | Object::Module { attrs, .. }
            | Object::Class { attrs, .. }
            | Object::Instance { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub(crate) fn attrs_mut(&mut self) -> Option<&mut BTreeMap<String, RawRef>> {
        match self {
            Object::Dict(attrs)
            | Object::Module { attrs, .. }
            | Object::Class { attrs, .. }
            | Object::Instance { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::None => write!(f, "None"),
            Object::Bool(b) => write!(f, "Bool({})", b),
            Object::Int { value, kind } => write!(f, "Int({}, {:?})", value, kind),
            Object::Float { value, kind } => write!(f, "Float({}, {:?})", value, kind),
            Object::Bytes(b) => write!(f, "Bytes({:?})", b),
            Object::Str(s) => write!(f, "Str({:?})", s),
            Object::Utf16(units) => write!(f, "Utf16({:?})", units),
            Object::Tuple(items) => write!(f, "Tuple({:?})", items),
            Object::List(items) => write!(f, "List({:?})", items),
            Object::Dict(attrs) => write!(f, "Dict({:?})", attrs),
            Object::Module { name, .. } => write!(f, "Module({})", name),
            Object::Class { name, .. } => write!(f, "Class({})", name),
            Object::Instance { class, .. } => write!(f, "Instance(class={:?})", class),
            Object::Function { name, .. } => write!(f, "Function({})", name),
            Object::BoundMethod { receiver, function } => {
                write!(f, "BoundMethod({:?}, {:?})", receiver, function)
            }
        }
    }
}
