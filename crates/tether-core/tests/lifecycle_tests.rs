//! Runtime lifecycle through the public bridge

mod common;

use std::rc::Rc;
use std::sync::Arc;

use common::{fixture, fixture_with};
use tether_core::{Bridge, BridgeConfig, BridgeError, Lifecycle, RuntimeState};
use tether_testing::SimRuntime;

#[test]
fn test_first_use_initializes_once() {
    let f = fixture();
    assert_eq!(f.sim.init_count(), 0);
    f.bridge.import("geometry").unwrap();
    f.bridge.import("geometry.shapes").unwrap();
    f.bridge.init().unwrap();
    assert_eq!(f.sim.init_count(), 1);
    assert_eq!(f.sim.search_paths(), vec!["./".to_string()]);
}

#[test]
fn test_configured_search_paths() {
    let config = BridgeConfig::from_toml_str(
        r#"
        [bridge]
        search_paths = ["./", "vendor/site"]
        "#,
    )
    .unwrap();
    let f = fixture_with(config);
    f.bridge.init().unwrap();
    assert_eq!(
        f.sim.search_paths(),
        vec!["./".to_string(), "vendor/site".to_string()]
    );
}

#[test]
fn test_exit_before_init_is_noop() {
    let f = fixture();
    f.bridge.exit();
    assert!(!f.sim.is_finalized());
    f.bridge.init().unwrap();
    assert!(f.sim.is_running());
}

#[test]
fn test_exit_twice_is_noop() {
    let f = fixture();
    f.bridge.init().unwrap();
    f.bridge.exit();
    f.bridge.exit();
    assert!(f.sim.is_finalized());
}

#[test]
fn test_handle_dropped_after_exit_is_leaked() {
    let f = fixture();
    let geometry = f.bridge.import("geometry").unwrap();
    let live = f.sim.live_objects();
    f.bridge.exit();
    drop(geometry);
    assert_eq!(f.sim.live_objects(), live);
}

#[test]
#[should_panic(expected = "used after shutdown")]
fn test_use_after_exit_is_fatal() {
    let f = fixture();
    f.bridge.init().unwrap();
    f.bridge.exit();
    let _ = f.bridge.import("geometry");
}

#[test]
#[should_panic(expected = "used after shutdown")]
fn test_handle_use_after_exit_is_fatal() {
    let f = fixture();
    let geometry = f.bridge.import("geometry").unwrap();
    f.bridge.exit();
    let _ = geometry.members();
}

#[test]
fn test_failed_start_can_be_retried() {
    let sim = Rc::new(SimRuntime::new());
    sim.set_fail_initialize(true);
    let lifecycle = Arc::new(Lifecycle::new());
    let bridge = Bridge::with_api(sim.clone(), lifecycle.clone(), BridgeConfig::default());

    let err = bridge.init().unwrap_err();
    assert!(matches!(err, BridgeError::ForeignRuntime { ref operation, .. } if operation == "initialize"));
    assert_eq!(lifecycle.state(), RuntimeState::Uninitialized);

    sim.set_fail_initialize(false);
    bridge.init().unwrap();
    assert_eq!(lifecycle.state(), RuntimeState::Initialized);
}

#[test]
fn test_bridges_share_an_injected_lifecycle() {
    let sim = Rc::new(SimRuntime::new());
    let lifecycle = Arc::new(Lifecycle::new());
    let first = Bridge::with_api(sim.clone(), lifecycle.clone(), BridgeConfig::default());
    let second = Bridge::with_api(sim.clone(), lifecycle.clone(), BridgeConfig::default());
    first.init().unwrap();
    second.init().unwrap();
    assert_eq!(sim.init_count(), 1);
    assert_eq!(second.runtime_name(), Some("sim"));
}
