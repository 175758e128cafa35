//! Host → foreign unpacker
//!
//! Every numeric value is rebuilt with the foreign constructor matching its
//! host subtype: a `uint8` stays a `uint8`. There is no best-effort
//! coercion; values without a foreign mapping fail with a conversion error.

use std::rc::Rc;

use tether_sdk::{RawRef, Scalar};

use crate::error::{BridgeError, BridgeResult};
use crate::reference::ForeignRef;
use crate::runtime::ForeignRuntime;
use crate::translate;
use crate::value::{HostValue, Matrix};

/// Convert a host value into a new foreign reference
pub(crate) fn unpack(rt: &Rc<ForeignRuntime>, value: &HostValue) -> BridgeResult<ForeignRef> {
    match value {
        HostValue::Undefined => Ok(ForeignRef::from_owned(rt.clone(), rt.api().none())),
        HostValue::Bool(b) => unpack_scalar(rt, Scalar::Bool(*b)),
        HostValue::Integer(i) => unpack_scalar(rt, Scalar::Int(*i)),
        HostValue::Float(f) => unpack_scalar(rt, Scalar::Float(*f)),
        HostValue::String(s) => unpack_string(rt, s),
        HostValue::Cell(items) => unpack_cell(rt, items),
        HostValue::Matrix(m) => unpack_matrix(rt, m),
        HostValue::Foreign(handle) => {
            let reference = handle.reference();
            if !Rc::ptr_eq(reference.runtime(), rt) {
                return Err(BridgeError::conversion(
                    "foreign handle belongs to a different runtime",
                ));
            }
            Ok(reference.clone())
        }
    }
}

/// Unpack a list of host values into one foreign argument tuple.
///
/// Fails as a whole when any element fails.
pub(crate) fn unpack_tuple(rt: &Rc<ForeignRuntime>, values: &[HostValue]) -> BridgeResult<ForeignRef> {
    let items = values
        .iter()
        .map(|value| unpack(rt, value))
        .collect::<BridgeResult<Vec<_>>>()?;
    build_tuple(rt, &items)
}

fn build_tuple(rt: &Rc<ForeignRuntime>, items: &[ForeignRef]) -> BridgeResult<ForeignRef> {
    let raws: Vec<RawRef> = items.iter().map(ForeignRef::raw).collect();
    translate::check_ref(rt, "build sequence", rt.api().new_tuple(&raws))
}

fn unpack_string(rt: &Rc<ForeignRuntime>, text: &str) -> BridgeResult<ForeignRef> {
    translate::check_ref(rt, "unpack string", rt.api().new_string(text))
}

fn unpack_cell(rt: &Rc<ForeignRuntime>, items: &[HostValue]) -> BridgeResult<ForeignRef> {
    let strings: Option<Vec<&str>> = items
        .iter()
        .map(|item| match item {
            HostValue::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    match strings {
        Some(strings) if !strings.is_empty() => {
            let refs = strings
                .into_iter()
                .map(|s| unpack_string(rt, s))
                .collect::<BridgeResult<Vec<_>>>()?;
            build_tuple(rt, &refs)
        }
        _ => unpack_tuple(rt, items),
    }
}

fn unpack_matrix(rt: &Rc<ForeignRuntime>, matrix: &Matrix) -> BridgeResult<ForeignRef> {
    let (rows, cols) = matrix.shape_2d().ok_or_else(|| {
        BridgeError::conversion(format!(
            "{}-dimensional array has no foreign representation",
            matrix.dims().len()
        ))
    })?;
    let data = matrix.data();
    let mut row_refs = Vec::with_capacity(rows);
    for r in 0..rows {
        let leaves = data[r * cols..(r + 1) * cols]
            .iter()
            .map(|&scalar| unpack_scalar(rt, scalar))
            .collect::<BridgeResult<Vec<_>>>()?;
        row_refs.push(build_tuple(rt, &leaves)?);
    }
    build_tuple(rt, &row_refs)
}

/// Build a foreign scalar with the constructor of the scalar's own subtype.
///
/// `Int` and `Float` are already exact subtypes, so the value goes across as
/// is; range checks happen where host values are built from untyped widths
/// ([`Scalar::from_i128`], [`Scalar::from_f64`]).
fn unpack_scalar(rt: &Rc<ForeignRuntime>, scalar: Scalar) -> BridgeResult<ForeignRef> {
    let spec = scalar.kind().spec();
    tracing::trace!(code = %spec.code, kind = spec.name, "unpack scalar");
    translate::check_ref(rt, "unpack scalar", rt.api().new_scalar(scalar))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::lifecycle::Lifecycle;
    use std::sync::Arc;
    use tether_sdk::{Float, ForeignApi, Int, NumericKind};
    use tether_testing::SimRuntime;

    fn setup() -> (Rc<SimRuntime>, Rc<ForeignRuntime>) {
        let sim = Rc::new(SimRuntime::new());
        let rt = ForeignRuntime::new(sim.clone(), Arc::new(Lifecycle::new()), BridgeConfig::default());
        rt.ensure().unwrap();
        (sim, rt)
    }

    #[test]
    fn test_scalar_keeps_subtype() {
        let (sim, rt) = setup();
        let obj = unpack(&rt, &HostValue::Integer(Int::U8(200))).unwrap();
        assert_eq!(sim.scalar_kind(obj.raw()), Some(NumericKind::UInt8));
        assert_eq!(sim.int_of(obj.raw()), Some(200));

        let obj = unpack(&rt, &HostValue::Float(Float::F32(0.5))).unwrap();
        assert_eq!(sim.scalar_kind(obj.raw()), Some(NumericKind::Single));
    }

    #[test]
    fn test_undefined_is_null() {
        let (sim, rt) = setup();
        let obj = unpack(&rt, &HostValue::Undefined).unwrap();
        assert_eq!(sim.kind(obj.raw()), tether_sdk::ForeignKind::Null);
    }

    #[test]
    fn test_string_list_fast_path() {
        let (sim, rt) = setup();
        let cell = HostValue::Cell(vec!["a".into(), "ünï".into()]);
        let obj = unpack(&rt, &cell).unwrap();
        let items = sim.items(obj.raw()).unwrap();
        assert_eq!(sim.str_of(items[1]).as_deref(), Some("ünï"));
    }

    #[test]
    fn test_matrix_is_row_major_tuple_of_tuples() {
        let (sim, rt) = setup();
        let data: Vec<Scalar> = (1..=6).map(|v| Scalar::Int(Int::I16(v))).collect();
        let m = Matrix::new(NumericKind::Int16, vec![2, 3], data).unwrap();
        let obj = unpack(&rt, &HostValue::Matrix(m)).unwrap();
        let rows = sim.items(obj.raw()).unwrap();
        assert_eq!(rows.len(), 2);
        let second = sim.items(rows[1]).unwrap();
        assert_eq!(sim.int_of(second[0]), Some(4));
        assert_eq!(sim.scalar_kind(second[0]), Some(NumericKind::Int16));
    }

    #[test]
    fn test_nd_array_is_rejected() {
        let (_sim, rt) = setup();
        let data = vec![Scalar::Bool(true); 8];
        let cube = Matrix::new(NumericKind::Logical, vec![2, 2, 2], data).unwrap();
        let err = unpack(&rt, &HostValue::Matrix(cube)).unwrap_err();
        assert!(matches!(err, BridgeError::TypeConversion(_)));
    }

    #[test]
    fn test_batch_failure_releases_partial_results() {
        let (sim, rt) = setup();
        let baseline = sim.live_objects();
        let cube = Matrix::new(NumericKind::Logical, vec![2, 2, 2], vec![Scalar::Bool(false); 8]).unwrap();
        let args = vec![HostValue::from(1i32), "s".into(), HostValue::Matrix(cube)];
        assert!(unpack_tuple(&rt, &args).is_err());
        assert_eq!(sim.live_objects(), baseline);
        assert!(!sim.error_occurred());
    }
}
