//! Foreign handles: the opaque host value variant wrapping a foreign object

use std::fmt;
use std::rc::Rc;

use crate::error::BridgeResult;
use crate::reference::ForeignRef;
use crate::translate;

/// Host-side value owning one reference to a foreign object.
///
/// Cloning a handle re-acquires the reference; dropping releases it. The
/// display class-name is read once, when the handle is created.
#[derive(Clone)]
pub struct ForeignHandle {
    reference: ForeignRef,
    class_name: Rc<str>,
}

impl ForeignHandle {
    pub(crate) fn wrap(reference: ForeignRef) -> Self {
        let api = reference.runtime().api();
        let name = api.type_name(reference.raw());
        // Introspection failure only loses the display name.
        if api.error_occurred() {
            let _ = api.take_error();
        }
        let class_name: Rc<str> = match name {
            Some(name) if !name.is_empty() => name.into(),
            _ => "object".into(),
        };
        Self {
            reference,
            class_name,
        }
    }

    #[inline]
    pub(crate) fn reference(&self) -> &ForeignRef {
        &self.reference
    }

    /// Display class-name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Public member names, sorted and de-duplicated
    pub fn members(&self) -> BridgeResult<Vec<String>> {
        let rt = self.reference.runtime();
        rt.ensure()?;
        let names = rt.api().member_names(self.reference.raw());
        let mut names = translate::check_value(rt, "members", names)?;
        names.retain(|name| !name.starts_with('_'));
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Whether the cached class-name equals `class_name`
    pub fn is_instance_of(&self, class_name: &str) -> bool {
        *self.class_name == *class_name
    }

    /// Whether both handles refer to the same foreign object
    pub fn same_object(&self, other: &ForeignHandle) -> bool {
        self.reference.raw() == other.reference.raw()
    }

    /// Host dimensions of a handle, always scalar
    pub fn dims(&self) -> [usize; 2] {
        [1, 1]
    }
}

impl PartialEq for ForeignHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

impl fmt::Display for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Foreign object: {}>", self.class_name)
    }
}

impl fmt::Debug for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignHandle")
            .field("class_name", &&*self.class_name)
            .field("reference", &self.reference)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::lifecycle::Lifecycle;
    use crate::runtime::ForeignRuntime;
    use std::sync::Arc;
    use tether_testing::SimRuntime;

    fn setup() -> (Rc<SimRuntime>, Rc<ForeignRuntime>) {
        let sim = Rc::new(SimRuntime::new());
        let rt = ForeignRuntime::new(sim.clone(), Arc::new(Lifecycle::new()), BridgeConfig::default());
        rt.ensure().unwrap();
        (sim, rt)
    }

    #[test]
    fn test_class_name_and_display() {
        let (sim, rt) = setup();
        let class = sim.class("Point", vec![]);
        let handle = ForeignHandle::wrap(ForeignRef::from_owned(rt, class));
        assert_eq!(handle.class_name(), "Point");
        assert!(handle.is_instance_of("Point"));
        assert!(!handle.is_instance_of("point"));
        assert_eq!(handle.to_string(), "<Foreign object: Point>");
        assert_eq!(handle.dims(), [1, 1]);
    }

    #[test]
    fn test_members_hide_private_names() {
        let (sim, rt) = setup();
        let bag = sim.dict(vec![
            ("zeta", sim.int(1)),
            ("_hidden", sim.int(2)),
            ("alpha", sim.int(3)),
        ]);
        let handle = ForeignHandle::wrap(ForeignRef::from_owned(rt, bag));
        assert_eq!(handle.members().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_clone_shares_identity() {
        let (sim, rt) = setup();
        let raw = sim.dict(vec![]);
        let handle = ForeignHandle::wrap(ForeignRef::from_owned(rt, raw));
        let copy = handle.clone();
        assert_eq!(handle, copy);
        assert_eq!(sim.refcount(raw), 2);
        drop(copy);
        drop(handle);
        assert!(!sim.is_alive(raw));
    }
}
