//! `SimRuntime`: a deterministic foreign runtime living in process memory.
//!
//! It follows the same contract as an embedded interpreter: manual reference
//! counts, a single pending-error slot, modules resolved by name, classes whose
//! instances get bound methods. It is stricter than a real runtime: calling the
//! embedding API before `initialize` or after `finalize`, or releasing a dead
//! reference, panics so tests catch lifecycle and ownership bugs.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tether_sdk::{ForeignApi, ForeignDiagnostic, ForeignKind, NumericKind, RawRef, Scalar};

use crate::object::{NativeFn, Object};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimState {
    Fresh,
    Running,
    Finalized,
}

struct Slot {
    refcnt: usize,
    object: Object,
}

struct Heap {
    slots: FxHashMap<u64, Slot>,
    next_id: NonZeroU64,
    modules: FxHashMap<String, RawRef>,
}

/// Simulated foreign runtime.
///
/// Builder helpers (`int`, `tuple`, `module`, ...) work in any state so tests
/// can prepare objects before the bridge initializes the runtime. Helpers that
/// take `RawRef`s for containers *steal* them; helpers returning `RawRef`
/// return new references unless documented otherwise.
pub struct SimRuntime {
    heap: RefCell<Heap>,
    state: Cell<SimState>,
    init_calls: Cell<usize>,
    fail_initialize: Cell<bool>,
    search_paths: RefCell<Vec<String>>,
    pending: RefCell<Option<ForeignDiagnostic>>,
    none: RawRef,
}

impl SimRuntime {
    /// Create an uninitialized runtime holding only the null object
    pub fn new() -> Self {
        let first = NonZeroU64::MIN;
        let none = RawRef::new(first);
        let mut slots = FxHashMap::default();
        slots.insert(
            first.get(),
            Slot {
                refcnt: 1,
                object: Object::None,
            },
        );
        Self {
            heap: RefCell::new(Heap {
                slots,
                next_id: first.saturating_add(1),
                modules: FxHashMap::default(),
            }),
            state: Cell::new(SimState::Fresh),
            init_calls: Cell::new(0),
            fail_initialize: Cell::new(false),
            search_paths: RefCell::new(Vec::new()),
            pending: RefCell::new(None),
            none,
        }
    }

    // ========================================================================
    // State inspection
    // ========================================================================

    /// Whether `initialize` succeeded and `finalize` has not run
    pub fn is_running(&self) -> bool {
        self.state.get() == SimState::Running
    }

    /// Whether `finalize` has run
    pub fn is_finalized(&self) -> bool {
        self.state.get() == SimState::Finalized
    }

    /// Number of `initialize` calls received
    pub fn init_count(&self) -> usize {
        self.init_calls.get()
    }

    /// Search paths appended by `initialize`
    pub fn search_paths(&self) -> Vec<String> {
        self.search_paths.borrow().clone()
    }

    /// Make the next `initialize` calls fail
    pub fn set_fail_initialize(&self, fail: bool) {
        self.fail_initialize.set(fail);
    }

    /// Number of live objects, including the null object and modules
    pub fn live_objects(&self) -> usize {
        self.heap.borrow().slots.len()
    }

    /// Current reference count; 0 for a dead object
    pub fn refcount(&self, obj: RawRef) -> usize {
        self.heap
            .borrow()
            .slots
            .get(&obj.to_bits())
            .map(|slot| slot.refcnt)
            .unwrap_or(0)
    }

    /// Whether the object is still alive
    pub fn is_alive(&self, obj: RawRef) -> bool {
        self.refcount(obj) > 0
    }

    /// Whether an error is pending (usable in any state)
    pub fn has_pending_error(&self) -> bool {
        self.pending.borrow().is_some()
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Untyped integer
    pub fn int(&self, value: i128) -> RawRef {
        self.alloc(Object::Int { value, kind: None })
    }

    /// Untyped float
    pub fn float(&self, value: f64) -> RawRef {
        self.alloc(Object::Float { value, kind: None })
    }

    /// Bool
    pub fn boolean(&self, value: bool) -> RawRef {
        self.alloc(Object::Bool(value))
    }

    /// Byte string (need not be valid UTF-8)
    pub fn bytes(&self, value: &[u8]) -> RawRef {
        self.alloc(Object::Bytes(value.to_vec()))
    }

    /// Unicode string
    pub fn str(&self, value: &str) -> RawRef {
        self.alloc(Object::Str(value.to_string()))
    }

    /// Unicode string from UTF-16 code units. Unpaired surrogates are kept
    /// and make UTF-8 extraction fail with `UnicodeEncodeError`.
    pub fn utf16_str(&self, units: &[u16]) -> RawRef {
        self.alloc(Object::Utf16(units.to_vec()))
    }

    /// Tuple; steals `items`
    pub fn tuple(&self, items: Vec<RawRef>) -> RawRef {
        self.alloc(Object::Tuple(items))
    }

    /// Mutable list; steals `items`
    pub fn list(&self, items: Vec<RawRef>) -> RawRef {
        self.alloc(Object::List(items))
    }

    /// Attribute bag; steals the values
    pub fn dict(&self, entries: Vec<(&str, RawRef)>) -> RawRef {
        self.alloc(Object::Dict(collect_attrs(entries)))
    }

    /// Function object
    pub fn function(
        &self,
        name: &str,
        body: impl Fn(&SimRuntime, &[RawRef]) -> Option<RawRef> + 'static,
    ) -> RawRef {
        let body: NativeFn = Rc::new(body);
        self.alloc(Object::Function {
            name: name.to_string(),
            body,
        })
    }

    /// Class object; steals the attribute values.
    ///
    /// Function attributes become bound methods on instances; a `__init__`
    /// function runs on construction with the new instance first.
    pub fn class(&self, name: &str, attrs: Vec<(&str, RawRef)>) -> RawRef {
        self.alloc(Object::Class {
            name: name.to_string(),
            attrs: collect_attrs(attrs),
        })
    }

    /// Register an importable module; steals the attribute values.
    ///
    /// The registry keeps the module alive. The returned reference is
    /// borrowed from the registry.
    pub fn module(&self, name: &str, attrs: Vec<(&str, RawRef)>) -> RawRef {
        let module = self.alloc(Object::Module {
            name: name.to_string(),
            attrs: collect_attrs(attrs),
        });
        let previous = self
            .heap
            .borrow_mut()
            .modules
            .insert(name.to_string(), module);
        if let Some(previous) = previous {
            self.release(previous);
        }
        module
    }

    /// Set the pending error
    pub fn raise(&self, kind: &str, message: impl Into<String>) {
        *self.pending.borrow_mut() = Some(ForeignDiagnostic::new(kind, message));
    }

    /// Acquire a reference without the lifecycle check
    pub fn retain(&self, obj: RawRef) {
        let mut heap = self.heap.borrow_mut();
        match heap.slots.get_mut(&obj.to_bits()) {
            Some(slot) => slot.refcnt += 1,
            None => panic!("retain of dead object {:?}", obj),
        }
    }

    /// Release a reference without the lifecycle check.
    ///
    /// # Panics
    /// Panics when `obj` is already dead.
    pub fn release(&self, obj: RawRef) {
        let mut work = vec![obj];
        while let Some(current) = work.pop() {
            let freed = {
                let mut heap = self.heap.borrow_mut();
                let Some(slot) = heap.slots.get_mut(&current.to_bits()) else {
                    panic!("release of dead object {:?}", current);
                };
                slot.refcnt -= 1;
                if slot.refcnt == 0 {
                    heap.slots.remove(&current.to_bits()).map(|slot| slot.object)
                } else {
                    None
                }
            };
            // Dropped outside the borrow: function bodies may own captures.
            if let Some(object) = freed {
                work.extend(object.children());
            }
        }
    }

    // ========================================================================
    // Peeking (borrowed, no lifecycle check)
    // ========================================================================

    /// Kind of an object
    pub fn kind(&self, obj: RawRef) -> ForeignKind {
        self.with_object(obj, Object::kind)
    }

    /// Attribute value, borrowed
    pub fn attr(&self, obj: RawRef, name: &str) -> Option<RawRef> {
        self.with_object(obj, |o| o.attrs().and_then(|a| a.get(name).copied()))
    }

    /// Sequence items, borrowed
    pub fn items(&self, obj: RawRef) -> Option<Vec<RawRef>> {
        self.with_object(obj, |o| match o {
            Object::Tuple(items) | Object::List(items) => Some(items.clone()),
            _ => None,
        })
    }

    /// Integer payload
    pub fn int_of(&self, obj: RawRef) -> Option<i128> {
        self.with_object(obj, |o| match o {
            Object::Int { value, .. } => Some(*value),
            _ => None,
        })
    }

    /// Float payload
    pub fn float_of(&self, obj: RawRef) -> Option<f64> {
        self.with_object(obj, |o| match o {
            Object::Float { value, .. } => Some(*value),
            _ => None,
        })
    }

    /// Bool payload
    pub fn bool_of(&self, obj: RawRef) -> Option<bool> {
        self.with_object(obj, |o| match o {
            Object::Bool(b) => Some(*b),
            _ => None,
        })
    }

    /// String payload
    pub fn str_of(&self, obj: RawRef) -> Option<String> {
        self.with_object(obj, |o| match o {
            Object::Str(s) => Some(s.clone()),
            Object::Utf16(units) => String::from_utf16(units).ok(),
            _ => None,
        })
    }

    /// Subtype tag carried by typed numbers
    pub fn scalar_kind(&self, obj: RawRef) -> Option<NumericKind> {
        self.with_object(obj, |o| match o {
            Object::Int { kind, .. } | Object::Float { kind, .. } => *kind,
            Object::Bool(_) => Some(NumericKind::Logical),
            _ => None,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn alloc(&self, object: Object) -> RawRef {
        let mut heap = self.heap.borrow_mut();
        let id = heap.next_id;
        heap.next_id = id.saturating_add(1);
        heap.slots.insert(id.get(), Slot { refcnt: 1, object });
        RawRef::new(id)
    }

    fn with_object<R>(&self, obj: RawRef, f: impl FnOnce(&Object) -> R) -> R {
        let heap = self.heap.borrow();
        match heap.slots.get(&obj.to_bits()) {
            Some(slot) => f(&slot.object),
            None => panic!("access to dead object {:?}", obj),
        }
    }

    fn assert_running(&self, operation: &str) {
        match self.state.get() {
            SimState::Running => {}
            SimState::Fresh => panic!("SimRuntime::{} called before initialize", operation),
            SimState::Finalized => panic!("SimRuntime::{} called after finalize", operation),
        }
    }

    fn display_type(&self, obj: RawRef) -> String {
        let class = self.with_object(obj, |o| match o {
            Object::Instance { class, .. } => Some(*class),
            _ => None,
        });
        match class {
            Some(class) => self.with_object(class, |o| match o {
                Object::Class { name, .. } => name.clone(),
                other => other.builtin_type_name().to_string(),
            }),
            None => self.with_object(obj, |o| o.builtin_type_name().to_string()),
        }
    }

    fn instantiate(&self, class: RawRef, args: &[RawRef]) -> Option<RawRef> {
        let (name, init) = self.with_object(class, |o| match o {
            Object::Class { name, attrs } => (name.clone(), attrs.get("__init__").copied()),
            _ => (String::new(), None),
        });
        let init_body = init.and_then(|f| {
            self.with_object(f, |o| match o {
                Object::Function { body, .. } => Some(body.clone()),
                _ => None,
            })
        });

        self.retain(class);
        let instance = self.alloc(Object::Instance {
            class,
            attrs: BTreeMap::new(),
        });

        match init_body {
            Some(body) => {
                let mut argv = Vec::with_capacity(args.len() + 1);
                argv.push(instance);
                argv.extend_from_slice(args);
                match body(self, &argv) {
                    Some(result) => {
                        self.release(result);
                        Some(instance)
                    }
                    None => {
                        self.release(instance);
                        None
                    }
                }
            }
            None if !args.is_empty() => {
                self.release(instance);
                self.raise("TypeError", format!("{}() takes no arguments", name));
                None
            }
            None => Some(instance),
        }
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_attrs(entries: Vec<(&str, RawRef)>) -> BTreeMap<String, RawRef> {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

enum Lookup {
    Found(RawRef),
    Bind(RawRef),
    Missing,
}

enum Callee {
    Function(NativeFn, Option<RawRef>),
    Bound(RawRef, RawRef),
    Class,
    NotCallable,
}

impl ForeignApi for SimRuntime {
    fn name(&self) -> &str {
        "sim"
    }

    fn initialize(&self, search_paths: &[String]) -> bool {
        if self.state.get() == SimState::Finalized {
            panic!("SimRuntime::initialize called after finalize");
        }
        self.init_calls.set(self.init_calls.get() + 1);
        if self.fail_initialize.get() {
            return false;
        }
        self.state.set(SimState::Running);
        self.search_paths
            .borrow_mut()
            .extend(search_paths.iter().cloned());
        true
    }

    fn finalize(&self) {
        self.assert_running("finalize");
        self.state.set(SimState::Finalized);
    }

    fn incref(&self, obj: RawRef) {
        self.assert_running("incref");
        self.retain(obj);
    }

    fn decref(&self, obj: RawRef) {
        self.assert_running("decref");
        self.release(obj);
    }

    fn kind_of(&self, obj: RawRef) -> ForeignKind {
        self.assert_running("kind_of");
        self.kind(obj)
    }

    fn numeric_kind(&self, obj: RawRef) -> Option<NumericKind> {
        self.assert_running("numeric_kind");
        self.with_object(obj, |o| match o {
            Object::Int { kind, .. } | Object::Float { kind, .. } => *kind,
            _ => None,
        })
    }

    fn type_name(&self, obj: RawRef) -> Option<String> {
        self.assert_running("type_name");
        let function = self.with_object(obj, |o| match o {
            Object::BoundMethod { function, .. } => Some(*function),
            _ => None,
        });
        let target = function.unwrap_or(obj);
        let direct = self.with_object(target, |o| match o {
            Object::Function { name, .. }
            | Object::Class { name, .. }
            | Object::Module { name, .. } => Some(name.clone()),
            _ => None,
        });
        Some(direct.unwrap_or_else(|| self.display_type(obj)))
    }

    fn member_names(&self, obj: RawRef) -> Option<Vec<String>> {
        self.assert_running("member_names");
        let class = self.with_object(obj, |o| match o {
            Object::Instance { class, .. } => Some(*class),
            _ => None,
        });
        let mut names: Vec<String> = self.with_object(obj, |o| {
            o.attrs()
                .map(|a| a.keys().cloned().collect())
                .unwrap_or_default()
        });
        if let Some(class) = class {
            names.extend(self.with_object(class, |o| {
                o.attrs()
                    .map(|a| a.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            }));
        }
        Some(names)
    }

    fn is_callable(&self, obj: RawRef) -> bool {
        self.assert_running("is_callable");
        self.with_object(obj, |o| {
            matches!(
                o,
                Object::Function { .. } | Object::BoundMethod { .. } | Object::Class { .. }
            )
        })
    }

    fn supports_indexing(&self, obj: RawRef) -> bool {
        self.assert_running("supports_indexing");
        self.with_object(obj, |o| {
            matches!(o, Object::Tuple(_) | Object::List(_) | Object::Dict(_))
        })
    }

    fn int_value(&self, obj: RawRef) -> Option<i128> {
        self.assert_running("int_value");
        let value = self.with_object(obj, |o| match o {
            Object::Int { value, .. } => Some(*value),
            Object::Bool(b) => Some(*b as i128),
            _ => None,
        });
        if value.is_none() {
            let ty = self.display_type(obj);
            self.raise("TypeError", format!("'{}' object cannot be interpreted as an integer", ty));
        }
        value
    }

    fn float_value(&self, obj: RawRef) -> f64 {
        self.assert_running("float_value");
        let value = self.with_object(obj, |o| match o {
            Object::Float { value, .. } => Some(*value),
            Object::Int { value, .. } => Some(*value as f64),
            Object::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        });
        match value {
            Some(v) => v,
            None => {
                let ty = self.display_type(obj);
                self.raise("TypeError", format!("must be real number, not {}", ty));
                -1.0
            }
        }
    }

    fn bool_value(&self, obj: RawRef) -> bool {
        self.assert_running("bool_value");
        self.with_object(obj, |o| match o {
            Object::None => false,
            Object::Bool(b) => *b,
            Object::Int { value, .. } => *value != 0,
            Object::Float { value, .. } => *value != 0.0,
            Object::Bytes(b) => !b.is_empty(),
            Object::Str(s) => !s.is_empty(),
            Object::Utf16(units) => !units.is_empty(),
            Object::Tuple(items) | Object::List(items) => !items.is_empty(),
            Object::Dict(attrs) => !attrs.is_empty(),
            _ => true,
        })
    }

    fn string_bytes(&self, obj: RawRef) -> Option<Vec<u8>> {
        self.assert_running("string_bytes");
        let bytes = self.with_object(obj, |o| match o {
            Object::Bytes(b) => Some(Ok(b.clone())),
            Object::Str(s) => Some(Ok(s.as_bytes().to_vec())),
            Object::Utf16(units) => Some(String::from_utf16(units).map(String::into_bytes)),
            _ => None,
        });
        match bytes {
            Some(Ok(bytes)) => Some(bytes),
            Some(Err(_)) => {
                self.raise("UnicodeEncodeError", "surrogates not allowed");
                None
            }
            None => {
                let ty = self.display_type(obj);
                self.raise("TypeError", format!("expected str or bytes, got '{}'", ty));
                None
            }
        }
    }

    fn sequence_len(&self, obj: RawRef) -> Option<usize> {
        self.assert_running("sequence_len");
        let len = self.with_object(obj, |o| match o {
            Object::Tuple(items) | Object::List(items) => Some(items.len()),
            _ => None,
        });
        if len.is_none() {
            let ty = self.display_type(obj);
            self.raise("TypeError", format!("object of type '{}' has no len()", ty));
        }
        len
    }

    fn sequence_item(&self, obj: RawRef, index: usize) -> Option<RawRef> {
        self.assert_running("sequence_item");
        let item = self.with_object(obj, |o| match o {
            Object::Tuple(items) | Object::List(items) => items.get(index).copied(),
            _ => None,
        });
        match item {
            Some(item) => {
                self.retain(item);
                Some(item)
            }
            None => {
                let ty = self.display_type(obj);
                self.raise("IndexError", format!("{} index out of range", ty));
                None
            }
        }
    }

    fn none(&self) -> RawRef {
        self.assert_running("none");
        self.retain(self.none);
        self.none
    }

    fn new_scalar(&self, value: Scalar) -> Option<RawRef> {
        self.assert_running("new_scalar");
        let object = match value {
            Scalar::Bool(b) => Object::Bool(b),
            Scalar::Int(i) => Object::Int {
                value: i.to_i128(),
                kind: Some(i.kind()),
            },
            Scalar::Float(f) => Object::Float {
                value: f.to_f64(),
                kind: Some(f.kind()),
            },
        };
        Some(self.alloc(object))
    }

    fn new_string(&self, text: &str) -> Option<RawRef> {
        self.assert_running("new_string");
        Some(self.str(text))
    }

    fn new_tuple(&self, items: &[RawRef]) -> Option<RawRef> {
        self.assert_running("new_tuple");
        for item in items {
            self.retain(*item);
        }
        Some(self.tuple(items.to_vec()))
    }

    fn import(&self, name: &str) -> Option<RawRef> {
        self.assert_running("import");
        let module = self.heap.borrow().modules.get(name).copied();
        match module {
            Some(module) => {
                self.retain(module);
                Some(module)
            }
            None => {
                self.raise("ModuleNotFoundError", format!("No module named '{}'", name));
                None
            }
        }
    }

    fn get_attr(&self, obj: RawRef, name: &str) -> Option<RawRef> {
        self.assert_running("get_attr");
        let own = self.with_object(obj, |o| o.attrs().and_then(|a| a.get(name).copied()));
        let lookup = match own {
            Some(found) => Lookup::Found(found),
            None => {
                let class = self.with_object(obj, |o| match o {
                    Object::Instance { class, .. } => Some(*class),
                    _ => None,
                });
                match class.and_then(|c| self.attr(c, name)) {
                    Some(found) => {
                        let is_function =
                            self.with_object(found, |o| matches!(o, Object::Function { .. }));
                        if is_function {
                            Lookup::Bind(found)
                        } else {
                            Lookup::Found(found)
                        }
                    }
                    None => Lookup::Missing,
                }
            }
        };
        match lookup {
            Lookup::Found(found) => {
                self.retain(found);
                Some(found)
            }
            Lookup::Bind(function) => {
                self.retain(obj);
                self.retain(function);
                Some(self.alloc(Object::BoundMethod {
                    receiver: obj,
                    function,
                }))
            }
            Lookup::Missing => {
                let ty = self.display_type(obj);
                self.raise(
                    "AttributeError",
                    format!("'{}' object has no attribute '{}'", ty, name),
                );
                None
            }
        }
    }

    fn set_attr(&self, obj: RawRef, name: &str, value: RawRef) -> bool {
        self.assert_running("set_attr");
        let settable = self.with_object(obj, |o| o.attrs().is_some());
        if !settable {
            let ty = self.display_type(obj);
            self.raise(
                "AttributeError",
                format!("'{}' object attribute '{}' is read-only", ty, name),
            );
            return false;
        }
        self.retain(value);
        let previous = {
            let mut heap = self.heap.borrow_mut();
            heap.slots
                .get_mut(&obj.to_bits())
                .and_then(|slot| slot.object.attrs_mut())
                .and_then(|attrs| attrs.insert(name.to_string(), value))
        };
        if let Some(previous) = previous {
            self.release(previous);
        }
        true
    }

    fn call(&self, callable: RawRef, args: RawRef) -> Option<RawRef> {
        self.assert_running("call");
        let argv = match self.items(args) {
            Some(argv) => argv,
            None => {
                self.raise("TypeError", "argument list must be a tuple");
                return None;
            }
        };
        let callee = self.with_object(callable, |o| match o {
            Object::Function { body, .. } => Callee::Function(body.clone(), None),
            Object::BoundMethod { receiver, function } => Callee::Bound(*receiver, *function),
            Object::Class { .. } => Callee::Class,
            _ => Callee::NotCallable,
        });
        let callee = match callee {
            Callee::Bound(receiver, function) => {
                let body = self.with_object(function, |o| match o {
                    Object::Function { body, .. } => Some(body.clone()),
                    _ => None,
                });
                match body {
                    Some(body) => Callee::Function(body, Some(receiver)),
                    None => Callee::NotCallable,
                }
            }
            other => other,
        };
        match callee {
            Callee::Function(body, None) => body(self, &argv),
            Callee::Function(body, Some(receiver)) => {
                let mut bound = Vec::with_capacity(argv.len() + 1);
                bound.push(receiver);
                bound.extend(argv);
                body(self, &bound)
            }
            Callee::Class => self.instantiate(callable, &argv),
            Callee::Bound(..) => None,
            Callee::NotCallable => {
                let ty = self.display_type(callable);
                self.raise("TypeError", format!("'{}' object is not callable", ty));
                None
            }
        }
    }

    fn get_item(&self, obj: RawRef, key: RawRef) -> Option<RawRef> {
        self.assert_running("get_item");
        let ty = self.display_type(obj);
        let key_int = self.int_of(key);
        let key_str = self.str_of(key);
        enum Outcome {
            Hit(RawRef),
            OutOfRange,
            MissingKey,
            BadKey,
            NotSubscriptable,
        }
        let outcome = self.with_object(obj, |o| match o {
            Object::Tuple(items) | Object::List(items) => match key_int {
                Some(i) => resolve_index(i, items.len())
                    .map(|i| Outcome::Hit(items[i]))
                    .unwrap_or(Outcome::OutOfRange),
                None => Outcome::BadKey,
            },
            Object::Dict(attrs) => match key_str.as_deref().and_then(|k| attrs.get(k)) {
                Some(found) => Outcome::Hit(*found),
                None => Outcome::MissingKey,
            },
            _ => Outcome::NotSubscriptable,
        });
        match outcome {
            Outcome::Hit(found) => {
                self.retain(found);
                return Some(found);
            }
            Outcome::OutOfRange => self.raise("IndexError", format!("{} index out of range", ty)),
            Outcome::MissingKey => self.raise("KeyError", key_str.unwrap_or_default()),
            Outcome::BadKey => self.raise(
                "TypeError",
                format!("{} indices must be integers", ty),
            ),
            Outcome::NotSubscriptable => {
                self.raise("TypeError", format!("'{}' object is not subscriptable", ty))
            }
        }
        None
    }

    fn set_item(&self, obj: RawRef, key: RawRef, value: RawRef) -> bool {
        self.assert_running("set_item");
        let ty = self.display_type(obj);
        let key_int = self.int_of(key);
        let key_str = self.str_of(key);
        self.retain(value);
        let result: Result<Option<RawRef>, (&str, String)> = {
            let mut heap = self.heap.borrow_mut();
            match heap.slots.get_mut(&obj.to_bits()).map(|slot| &mut slot.object) {
                Some(Object::List(items)) => match key_int.and_then(|i| resolve_index(i, items.len())) {
                    Some(i) => Ok(Some(std::mem::replace(&mut items[i], value))),
                    None => Err(("IndexError", "list assignment index out of range".to_string())),
                },
                Some(Object::Dict(attrs)) => match key_str {
                    Some(k) => Ok(attrs.insert(k, value)),
                    None => Err(("TypeError", "attribute-bag keys must be str".to_string())),
                },
                _ => Err((
                    "TypeError",
                    format!("'{}' object does not support item assignment", ty),
                )),
            }
        };
        match result {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release(previous);
                }
                true
            }
            Err((kind, message)) => {
                self.release(value);
                self.raise(kind, message);
                false
            }
        }
    }

    fn error_occurred(&self) -> bool {
        self.assert_running("error_occurred");
        self.has_pending_error()
    }

    fn take_error(&self) -> Option<ForeignDiagnostic> {
        self.assert_running("take_error");
        self.pending.borrow_mut().take()
    }
}

fn resolve_index(index: i128, len: usize) -> Option<usize> {
    let len = len as i128;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        Some(index as usize)
    } else {
        None
    }
}
