//! Embedded CPython backend
//!
//! [`PythonApi`] implements [`ForeignApi`] directly over the CPython C API
//! (`pyo3::ffi`). The bridge owns reference counting, so this layer is a thin
//! translation:
//! - Every returned object is a new reference
//! - Borrowed references from the C API (`PyList_GetItem`, `PySys_GetObject`)
//!   never escape
//! - Failures leave the Python error indicator set for the bridge to fetch
//! - Fields of a `dict` are its string keys, so attribute bags read and write
//!   the same way as object attributes
//!
//! The interpreter is driven from the thread that initialized it, which holds
//! the GIL for the lifetime of the embedding.

use std::ffi::{c_char, CStr, CString};
use std::marker::PhantomData;
use std::ptr;

use pyo3::ffi;
use pyo3::prelude::*;
use tether_sdk::{Float, ForeignApi, ForeignDiagnostic, ForeignKind, Int, RawRef, Scalar};

// ============================================================================
// Helpers
// ============================================================================

#[inline]
fn ptr(obj: RawRef) -> *mut ffi::PyObject {
    obj.as_ptr()
}

#[inline]
fn new_ref(obj: *mut ffi::PyObject) -> Option<RawRef> {
    RawRef::from_ptr(obj)
}

/// Release a possibly-null reference
unsafe fn xdecref(obj: *mut ffi::PyObject) {
    if !obj.is_null() {
        ffi::Py_DecRef(obj);
    }
}

/// UTF-8 contents of a `str` object
unsafe fn unicode_to_string(obj: *mut ffi::PyObject) -> Option<String> {
    let mut size: ffi::Py_ssize_t = 0;
    let data = ffi::PyUnicode_AsUTF8AndSize(obj, &mut size);
    if data.is_null() {
        return None;
    }
    let bytes = std::slice::from_raw_parts(data as *const u8, size as usize);
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Convert a name for the C API, raising `ValueError` on interior NUL bytes
unsafe fn c_name(name: &str) -> Option<CString> {
    match CString::new(name) {
        Ok(name) => Some(name),
        Err(_) => {
            ffi::PyErr_SetString(
                ffi::PyExc_ValueError,
                c"embedded null character in name".as_ptr(),
            );
            None
        }
    }
}

/// Field access on a `dict` goes through its keys
#[inline]
unsafe fn is_attribute_bag(obj: *mut ffi::PyObject) -> bool {
    ffi::PyDict_Check(obj) != 0
}

/// Raise `AttributeError` for a missing field
unsafe fn missing_field(obj: *mut ffi::PyObject, name: &CStr) {
    let ty = CStr::from_ptr(ffi::PyEval_GetFuncName(obj)).to_string_lossy();
    let message = format!("'{}' object has no attribute '{}'", ty, name.to_string_lossy());
    if let Ok(message) = CString::new(message) {
        ffi::PyErr_SetString(ffi::PyExc_AttributeError, message.as_ptr());
    }
}

/// String entries of a Python list, skipping anything else
unsafe fn string_entries(listing: *mut ffi::PyObject) -> Vec<String> {
    let len = ffi::PyList_Size(listing).max(0);
    let mut names = Vec::with_capacity(len as usize);
    for i in 0..len {
        // Borrowed reference
        let item = ffi::PyList_GetItem(listing, i);
        if !item.is_null() && ffi::PyUnicode_Check(item) != 0 {
            match unicode_to_string(item) {
                Some(name) => names.push(name),
                None => ffi::PyErr_Clear(),
            }
        }
    }
    names
}

unsafe fn new_unicode(text: &str) -> *mut ffi::PyObject {
    ffi::PyUnicode_FromStringAndSize(text.as_ptr() as *const c_char, text.len() as ffi::Py_ssize_t)
}

// ============================================================================
// PythonApi
// ============================================================================

/// CPython embedding backend
pub struct PythonApi {
    // Interpreter state is bound to the embedding thread.
    _not_send: PhantomData<*const ()>,
}

impl PythonApi {
    /// Create the backend; the interpreter starts on `initialize`
    pub fn new() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for PythonApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignApi for PythonApi {
    fn name(&self) -> &str {
        "python"
    }

    fn initialize(&self, search_paths: &[String]) -> bool {
        unsafe {
            if ffi::Py_IsInitialized() == 0 {
                ffi::Py_InitializeEx(0);
            }
            if ffi::Py_IsInitialized() == 0 {
                return false;
            }
            // Borrowed reference
            let sys_path = ffi::PySys_GetObject(c"path".as_ptr());
            if sys_path.is_null() {
                return true;
            }
            for path in search_paths {
                let entry = new_unicode(path);
                if entry.is_null() || ffi::PyList_Append(sys_path, entry) != 0 {
                    tracing::warn!(path = %path, "failed to extend sys.path");
                    ffi::PyErr_Clear();
                }
                xdecref(entry);
            }
        }
        true
    }

    fn finalize(&self) {
        unsafe {
            if ffi::Py_FinalizeEx() != 0 {
                tracing::warn!("errors while finalizing the Python interpreter");
            }
        }
    }

    fn incref(&self, obj: RawRef) {
        unsafe { ffi::Py_IncRef(ptr(obj)) }
    }

    fn decref(&self, obj: RawRef) {
        unsafe { ffi::Py_DecRef(ptr(obj)) }
    }

    fn kind_of(&self, obj: RawRef) -> ForeignKind {
        let obj = ptr(obj);
        unsafe {
            if obj == ffi::Py_None() {
                ForeignKind::Null
            } else if ffi::PyBool_Check(obj) != 0 {
                ForeignKind::Bool
            } else if ffi::PyLong_Check(obj) != 0 {
                ForeignKind::Integer
            } else if ffi::PyFloat_Check(obj) != 0 {
                ForeignKind::Float
            } else if ffi::PyBytes_Check(obj) != 0 {
                ForeignKind::Bytes
            } else if ffi::PyUnicode_Check(obj) != 0 {
                ForeignKind::Unicode
            } else if ffi::PyTuple_Check(obj) != 0 || ffi::PyList_Check(obj) != 0 {
                ForeignKind::Sequence
            } else if ffi::PyDict_Check(obj) != 0 {
                ForeignKind::AttributeBag
            } else {
                ForeignKind::Object
            }
        }
    }

    fn type_name(&self, obj: RawRef) -> Option<String> {
        unsafe {
            let name = ffi::PyEval_GetFuncName(ptr(obj));
            if name.is_null() {
                None
            } else {
                Some(CStr::from_ptr(name).to_string_lossy().into_owned())
            }
        }
    }

    fn member_names(&self, obj: RawRef) -> Option<Vec<String>> {
        let obj = ptr(obj);
        unsafe {
            let listing = if is_attribute_bag(obj) {
                ffi::PyDict_Keys(obj)
            } else {
                ffi::PyObject_Dir(obj)
            };
            if listing.is_null() {
                return None;
            }
            let names = string_entries(listing);
            ffi::Py_DecRef(listing);
            Some(names)
        }
    }

    fn is_callable(&self, obj: RawRef) -> bool {
        unsafe { ffi::PyCallable_Check(ptr(obj)) != 0 }
    }

    fn supports_indexing(&self, obj: RawRef) -> bool {
        unsafe { ffi::PyObject_HasAttrString(ptr(obj), c"__getitem__".as_ptr()) != 0 }
    }

    fn int_value(&self, obj: RawRef) -> Option<i128> {
        let obj = ptr(obj);
        unsafe {
            let mut overflow: std::os::raw::c_int = 0;
            let value = ffi::PyLong_AsLongLongAndOverflow(obj, &mut overflow);
            if overflow == 0 {
                if value == -1 && !ffi::PyErr_Occurred().is_null() {
                    return None;
                }
                return Some(value as i128);
            }
            if overflow > 0 {
                let value = ffi::PyLong_AsUnsignedLongLong(obj);
                if !ffi::PyErr_Occurred().is_null() {
                    return None;
                }
                return Some(value as i128);
            }
            ffi::PyErr_SetString(
                ffi::PyExc_OverflowError,
                c"int too small to convert".as_ptr(),
            );
            None
        }
    }

    fn float_value(&self, obj: RawRef) -> f64 {
        unsafe { ffi::PyFloat_AsDouble(ptr(obj)) }
    }

    fn bool_value(&self, obj: RawRef) -> bool {
        unsafe { ffi::PyObject_IsTrue(ptr(obj)) == 1 }
    }

    fn string_bytes(&self, obj: RawRef) -> Option<Vec<u8>> {
        let obj = ptr(obj);
        unsafe {
            if ffi::PyBytes_Check(obj) != 0 {
                let data = ffi::PyBytes_AsString(obj);
                if data.is_null() {
                    return None;
                }
                let size = ffi::PyBytes_Size(obj).max(0) as usize;
                return Some(std::slice::from_raw_parts(data as *const u8, size).to_vec());
            }
            let mut size: ffi::Py_ssize_t = 0;
            let data = ffi::PyUnicode_AsUTF8AndSize(obj, &mut size);
            if data.is_null() {
                return None;
            }
            Some(std::slice::from_raw_parts(data as *const u8, size as usize).to_vec())
        }
    }

    fn sequence_len(&self, obj: RawRef) -> Option<usize> {
        let len = unsafe { ffi::PySequence_Size(ptr(obj)) };
        usize::try_from(len).ok()
    }

    fn sequence_item(&self, obj: RawRef, index: usize) -> Option<RawRef> {
        unsafe { new_ref(ffi::PySequence_GetItem(ptr(obj), index as ffi::Py_ssize_t)) }
    }

    fn none(&self) -> RawRef {
        unsafe {
            let none = ffi::Py_None();
            ffi::Py_IncRef(none);
            // Py_None is a static object and never null
            RawRef::from_ptr(none).unwrap_or_else(|| unreachable!("Py_None is null"))
        }
    }

    fn new_scalar(&self, value: Scalar) -> Option<RawRef> {
        let obj = unsafe {
            match value {
                Scalar::Bool(b) => ffi::PyBool_FromLong(b as std::os::raw::c_long),
                Scalar::Int(i @ (Int::U8(_) | Int::U16(_) | Int::U32(_) | Int::U64(_))) => {
                    ffi::PyLong_FromUnsignedLongLong(i.to_i128() as u64)
                }
                Scalar::Int(i) => ffi::PyLong_FromLongLong(i.to_i128() as i64),
                Scalar::Float(Float::F32(x)) => ffi::PyFloat_FromDouble(x as f64),
                Scalar::Float(Float::F64(x)) => ffi::PyFloat_FromDouble(x),
            }
        };
        new_ref(obj)
    }

    fn new_string(&self, text: &str) -> Option<RawRef> {
        unsafe { new_ref(new_unicode(text)) }
    }

    fn new_tuple(&self, items: &[RawRef]) -> Option<RawRef> {
        unsafe {
            let tuple = ffi::PyTuple_New(items.len() as ffi::Py_ssize_t);
            if tuple.is_null() {
                return None;
            }
            for (i, item) in items.iter().enumerate() {
                // PyTuple_SetItem steals the reference
                ffi::Py_IncRef(ptr(*item));
                ffi::PyTuple_SetItem(tuple, i as ffi::Py_ssize_t, ptr(*item));
            }
            new_ref(tuple)
        }
    }

    fn import(&self, name: &str) -> Option<RawRef> {
        unsafe {
            let name = c_name(name)?;
            new_ref(ffi::PyImport_ImportModule(name.as_ptr()))
        }
    }

    fn get_attr(&self, obj: RawRef, name: &str) -> Option<RawRef> {
        let obj = ptr(obj);
        unsafe {
            let name = c_name(name)?;
            if !is_attribute_bag(obj) {
                return new_ref(ffi::PyObject_GetAttrString(obj, name.as_ptr()));
            }
            // Borrowed reference; null without an error when the key is absent
            let found = ffi::PyDict_GetItemString(obj, name.as_ptr());
            if found.is_null() {
                missing_field(obj, &name);
                return None;
            }
            ffi::Py_IncRef(found);
            new_ref(found)
        }
    }

    fn set_attr(&self, obj: RawRef, name: &str, value: RawRef) -> bool {
        let obj = ptr(obj);
        unsafe {
            let Some(name) = c_name(name) else {
                return false;
            };
            if is_attribute_bag(obj) {
                ffi::PyDict_SetItemString(obj, name.as_ptr(), ptr(value)) == 0
            } else {
                ffi::PyObject_SetAttrString(obj, name.as_ptr(), ptr(value)) == 0
            }
        }
    }

    fn call(&self, callable: RawRef, args: RawRef) -> Option<RawRef> {
        unsafe { new_ref(ffi::PyObject_Call(ptr(callable), ptr(args), ptr::null_mut())) }
    }

    fn get_item(&self, obj: RawRef, key: RawRef) -> Option<RawRef> {
        unsafe { new_ref(ffi::PyObject_GetItem(ptr(obj), ptr(key))) }
    }

    fn set_item(&self, obj: RawRef, key: RawRef, value: RawRef) -> bool {
        unsafe { ffi::PyObject_SetItem(ptr(obj), ptr(key), ptr(value)) == 0 }
    }

    fn error_occurred(&self) -> bool {
        unsafe { !ffi::PyErr_Occurred().is_null() }
    }

    fn take_error(&self) -> Option<ForeignDiagnostic> {
        if !self.error_occurred() {
            return None;
        }
        Python::with_gil(|py| {
            let err = PyErr::take(py)?;
            let kind = err
                .get_type_bound(py)
                .name()
                .map(|name| name.to_string())
                .unwrap_or_default();
            let message = err.value_bound(py).to_string();
            Some(ForeignDiagnostic::new(kind, message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test drives the interpreter: the C API is bound to the thread that
    // initialized it.
    #[test]
    fn test_embedded_interpreter() {
        let api = PythonApi::new();
        assert!(api.initialize(&["./".to_string()]));

        let math = api.import("math").unwrap();
        let sqrt = api.get_attr(math, "sqrt").unwrap();
        assert_eq!(api.type_name(sqrt).as_deref(), Some("sqrt"));
        assert!(api.is_callable(sqrt));

        let two = api.new_scalar(Scalar::Float(Float::F64(2.0))).unwrap();
        let args = api.new_tuple(&[two]).unwrap();
        let root = api.call(sqrt, args).unwrap();
        assert_eq!(api.kind_of(root), ForeignKind::Float);
        assert!((api.float_value(root) - 2f64.sqrt()).abs() < 1e-12);

        let byte = api.new_scalar(Scalar::Int(Int::U64(u64::MAX))).unwrap();
        assert_eq!(api.int_value(byte), Some(u64::MAX as i128));

        let text = api.new_string("héllo").unwrap();
        assert_eq!(api.string_bytes(text), Some("héllo".as_bytes().to_vec()));

        let builtins = api.import("builtins").unwrap();
        let dict = api.get_attr(builtins, "dict").unwrap();
        let empty = api.new_tuple(&[]).unwrap();
        let bag = api.call(dict, empty).unwrap();
        assert_eq!(api.kind_of(bag), ForeignKind::AttributeBag);
        assert!(api.set_attr(bag, "count", two));
        let count = api.get_attr(bag, "count").unwrap();
        assert_eq!(api.float_value(count), 2.0);
        assert_eq!(api.member_names(bag), Some(vec!["count".to_string()]));
        assert!(api.get_attr(bag, "keys").is_none());
        assert_eq!(api.take_error().unwrap().kind, "AttributeError");

        assert!(api.import("no_such_module_here").is_none());
        let err = api.take_error().unwrap();
        assert_eq!(err.kind, "ModuleNotFoundError");
        assert!(!api.error_occurred());

        for obj in [count, bag, empty, dict, builtins, text, byte, root, args, two, sqrt, math] {
            api.decref(obj);
        }
    }
}
