//! Bridge integration tests against the embedded CPython backend
//!
//! # Running Tests
//! ```bash
//! cargo test -p tether-core --features python --test python_tests
//! ```

#![cfg(feature = "python")]

use tether_core::{Bridge, BridgeConfig, BridgeError, HostValue, IndexOp};

fn handle(value: HostValue) -> tether_core::ForeignHandle {
    match value {
        HostValue::Foreign(handle) => handle,
        other => panic!("expected a foreign handle, got {}", other.type_name()),
    }
}

// One test drives the interpreter: the C API is bound to the thread that
// initialized it.
#[test]
fn test_chains_through_cpython() {
    let bridge = Bridge::new(BridgeConfig::default());
    assert!(bridge.is_available());
    bridge.init().unwrap();

    // ===== Attribute bags: fields are keys =====

    let bag = handle(bridge.invoke("builtins", "dict", &[]).unwrap());
    assert_eq!(bag.class_name(), "dict");
    bridge
        .subsasgn(&bag, &[IndexOp::field("count")], &HostValue::from(5u32))
        .unwrap();
    assert_eq!(
        bridge.subsref(&bag, &[IndexOp::field("count")]).unwrap(),
        HostValue::from(5i64)
    );
    assert_eq!(bridge.members(&bag).unwrap(), vec!["count"]);

    let inner = bridge.invoke("builtins", "dict", &[]).unwrap();
    bridge.subsasgn(&bag, &[IndexOp::field("inner")], &inner).unwrap();
    let chain = [IndexOp::field("inner"), IndexOp::field("leaf")];
    bridge.subsasgn(&bag, &chain, &HostValue::from("ok")).unwrap();
    assert_eq!(bridge.subsref(&bag, &chain).unwrap(), HostValue::from("ok"));

    let err = bridge.subsref(&bag, &[IndexOp::field("nope")]).unwrap_err();
    assert_eq!(
        err,
        BridgeError::foreign("get field", "AttributeError: 'dict' object has no attribute 'nope'")
    );

    // ===== Objects and dotted names =====

    let joined = bridge
        .invoke("os.path", "join", &[HostValue::from("a"), HostValue::from("b")])
        .unwrap();
    assert_eq!(joined, HostValue::from("a/b"));
    assert_eq!(
        bridge.get_field("os.path", "sep").unwrap(),
        HostValue::from("/")
    );

    // ===== Positional access on a handle =====

    bridge
        .subsasgn(&bag, &[IndexOp::index([HostValue::from(1.0f64)])], &HostValue::from("zero"))
        .unwrap();
    assert_eq!(
        bridge.subsref(&bag, &[IndexOp::Call(vec![HostValue::from(1u8)])]).unwrap(),
        HostValue::from("zero")
    );

    // ===== Strings without a UTF-8 form =====

    let err = bridge
        .invoke("builtins", "chr", &[HostValue::from(0xd800u32)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::TypeConversion(_)), "{:?}", err);
}
