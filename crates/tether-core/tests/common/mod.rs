//! Shared fixtures: a `geometry` module installed in a simulated runtime.
//!
//! ```text
//! geometry
//!   Point(x, y)        instance attrs x, y, items = [10, 20, 30]
//!     .pair(k)         -> {"first": x * k, "second": y * k}
//!     .dims = 2
//!   echo(v)            -> v
//!   kind_name(v)       -> subtype name of a typed scalar, or "none"
//!   fail()             raises ValueError("boom")
//!   silent_fail()      fails without raising
//!   matrix()           -> ((1, 2, 3), (4, 5, 6))
//!   ragged()           -> ((1, 2), (3,))
//!   big()              -> 2 ** 70
//!   surrogate()        -> "\ud800" (no UTF-8 form)
//! geometry.shapes
//!   unit = 1.0
//!   area(r)            -> r * r
//! ```

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};

use tether_core::{Bridge, BridgeConfig, Lifecycle};
use tether_sdk::{ForeignApi, RawRef};
use tether_testing::SimRuntime;

pub struct Fixture {
    pub sim: Rc<SimRuntime>,
    pub bridge: Bridge,
    pub pair_calls: Rc<Cell<usize>>,
}

pub fn fixture() -> Fixture {
    fixture_with(BridgeConfig::default())
}

pub fn fixture_with(config: BridgeConfig) -> Fixture {
    let sim = Rc::new(SimRuntime::new());
    let pair_calls = install_geometry(&sim);
    let bridge = Bridge::with_api(sim.clone(), Arc::new(Lifecycle::new()), config);
    Fixture {
        sim,
        bridge,
        pair_calls,
    }
}

pub fn num(rt: &SimRuntime, r: RawRef) -> f64 {
    rt.float_of(r)
        .or_else(|| rt.int_of(r).map(|v| v as f64))
        .unwrap_or(f64::NAN)
}

// ============================================================================
// Log capture
// ============================================================================

struct EventCounter {
    level: Level,
    seen: Arc<AtomicUsize>,
}

impl Subscriber for EventCounter {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        if *event.metadata().level() == self.level {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Run `f` on this thread and count the events it logs at `level`
pub fn count_events<R>(level: Level, f: impl FnOnce() -> R) -> (R, usize) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = EventCounter {
        level,
        seen: seen.clone(),
    };
    let out = tracing::subscriber::with_default(counter, f);
    (out, seen.load(Ordering::SeqCst))
}

// ============================================================================
// Geometry module
// ============================================================================

fn install_geometry(sim: &SimRuntime) -> Rc<Cell<usize>> {
    let pair_calls = Rc::new(Cell::new(0));
    let counter = pair_calls.clone();

    let init = sim.function("__init__", |rt, args| {
        let [this, x, y] = args else {
            rt.raise("TypeError", "Point() takes 2 positional arguments");
            return None;
        };
        rt.set_attr(*this, "x", *x);
        rt.set_attr(*this, "y", *y);
        let items = rt.list(vec![rt.int(10), rt.int(20), rt.int(30)]);
        rt.set_attr(*this, "items", items);
        rt.release(items);
        Some(rt.none())
    });
    let pair = sim.function("pair", move |rt, args| {
        counter.set(counter.get() + 1);
        let k = num(rt, args[1]);
        let x = num(rt, rt.attr(args[0], "x")?);
        let y = num(rt, rt.attr(args[0], "y")?);
        Some(rt.dict(vec![("first", rt.float(x * k)), ("second", rt.float(y * k))]))
    });
    let point = sim.class(
        "Point",
        vec![("__init__", init), ("pair", pair), ("dims", sim.int(2))],
    );

    let echo = sim.function("echo", |rt, args| {
        rt.retain(args[0]);
        Some(args[0])
    });
    let kind_name = sim.function("kind_name", |rt, args| {
        let name = rt.scalar_kind(args[0]).map_or("none", |k| k.name());
        Some(rt.str(name))
    });
    let fail = sim.function("fail", |rt, _| {
        rt.raise("ValueError", "boom");
        None
    });
    let silent_fail = sim.function("silent_fail", |_, _| None);
    let matrix = sim.function("matrix", |rt, _| {
        let row1 = rt.tuple(vec![rt.int(1), rt.int(2), rt.int(3)]);
        let row2 = rt.tuple(vec![rt.int(4), rt.int(5), rt.int(6)]);
        Some(rt.tuple(vec![row1, row2]))
    });
    let ragged = sim.function("ragged", |rt, _| {
        let row1 = rt.tuple(vec![rt.int(1), rt.int(2)]);
        let row2 = rt.tuple(vec![rt.int(3)]);
        Some(rt.tuple(vec![row1, row2]))
    });
    let big = sim.function("big", |rt, _| Some(rt.int(1i128 << 70)));
    let surrogate = sim.function("surrogate", |rt, _| Some(rt.utf16_str(&[0xd800])));

    sim.module(
        "geometry",
        vec![
            ("Point", point),
            ("echo", echo),
            ("kind_name", kind_name),
            ("fail", fail),
            ("silent_fail", silent_fail),
            ("matrix", matrix),
            ("ragged", ragged),
            ("big", big),
            ("surrogate", surrogate),
        ],
    );

    let area = sim.function("area", |rt, args| {
        let r = num(rt, args[0]);
        Some(rt.float(r * r))
    });
    sim.module("geometry.shapes", vec![("unit", sim.float(1.0)), ("area", area)]);

    pair_calls
}
