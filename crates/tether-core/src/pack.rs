//! Foreign → host packer
//!
//! Classification order, first match wins:
//!
//! 1. null → `Undefined`
//! 2. bool → `Bool` (before integer; bools are often integers underneath)
//! 3. integer → `Integer`, `int64` unless the backend reports a subtype
//! 4. float → `Float`, `double` unless the backend reports `single`
//! 5. byte or unicode string → `String` (strict UTF-8)
//! 6. sequence → `Matrix` when rectangular and numeric, else `Cell`
//! 7. anything else → `Foreign` handle

use tether_sdk::{Float, ForeignKind, Int, NumericKind, Scalar};

use crate::error::{BridgeError, BridgeResult};
use crate::handle::ForeignHandle;
use crate::reference::ForeignRef;
use crate::translate;
use crate::value::{HostValue, Matrix};

/// Convert a foreign object into a host value, consuming the reference
pub(crate) fn pack(obj: ForeignRef) -> BridgeResult<HostValue> {
    match obj.kind() {
        ForeignKind::Null => Ok(HostValue::Undefined),
        ForeignKind::Bool => Ok(HostValue::Bool(obj.runtime().api().bool_value(obj.raw()))),
        ForeignKind::Integer => pack_int(&obj).map(HostValue::Integer),
        ForeignKind::Float => pack_float(&obj).map(HostValue::Float),
        ForeignKind::Bytes | ForeignKind::Unicode => pack_string(&obj).map(HostValue::String),
        ForeignKind::Sequence => pack_sequence(&obj),
        ForeignKind::AttributeBag | ForeignKind::Object => Ok(HostValue::Foreign(ForeignHandle::wrap(obj))),
    }
}

fn pack_int(obj: &ForeignRef) -> BridgeResult<Int> {
    let rt = obj.runtime();
    let api = rt.api();
    let kind = api
        .numeric_kind(obj.raw())
        .filter(|k| k.is_integer())
        .unwrap_or(NumericKind::Int64);
    let value = api.int_value(obj.raw());
    if value.is_none() && api.error_occurred() {
        // Magnitude beyond 128 bits
        let diagnostic = api.take_error();
        return Err(BridgeError::Overflow {
            value: diagnostic.map_or_else(|| "integer".to_string(), |d| d.message),
            target: kind.name().to_string(),
        });
    }
    let value = translate::check_value(rt, "pack integer", value)?;
    Ok(Int::new(kind, value)?)
}

fn pack_float(obj: &ForeignRef) -> BridgeResult<Float> {
    let rt = obj.runtime();
    let api = rt.api();
    let kind = api
        .numeric_kind(obj.raw())
        .filter(|k| k.is_float())
        .unwrap_or(NumericKind::Double);
    let value = api.float_value(obj.raw());
    let value = translate::check_value(rt, "pack float", Some(value))?;
    Ok(Float::new(kind, value)?)
}

fn pack_string(obj: &ForeignRef) -> BridgeResult<String> {
    let rt = obj.runtime();
    let Some(bytes) = rt.api().string_bytes(obj.raw()) else {
        let reason = translate::clear(rt)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no UTF-8 form".to_string());
        return Err(BridgeError::conversion(format!(
            "string cannot be encoded as UTF-8: {}",
            reason
        )));
    };
    let bytes = translate::check_value(rt, "pack string", Some(bytes))?;
    String::from_utf8(bytes)
        .map_err(|err| BridgeError::conversion(format!("string is not valid UTF-8: {}", err)))
}

/// Numeric leaf widened to `double`
fn pack_leaf(obj: &ForeignRef) -> BridgeResult<f64> {
    Ok(match obj.kind() {
        ForeignKind::Bool => {
            if obj.runtime().api().bool_value(obj.raw()) {
                1.0
            } else {
                0.0
            }
        }
        ForeignKind::Integer => pack_int(obj)?.to_f64(),
        _ => pack_float(obj)?.to_f64(),
    })
}

/// Owned references to every element of a sequence
pub(crate) fn sequence_items(seq: &ForeignRef) -> BridgeResult<Vec<ForeignRef>> {
    let rt = seq.runtime();
    let api = rt.api();
    let len = translate::check_value(rt, "sequence length", api.sequence_len(seq.raw()))?;
    (0..len)
        .map(|i| translate::check_ref(rt, "sequence item", api.sequence_item(seq.raw(), i)))
        .collect()
}

fn pack_sequence(seq: &ForeignRef) -> BridgeResult<HostValue> {
    let autoconvert = seq.runtime().config().matrix_autoconversion;
    let items = sequence_items(seq)?;
    if items.is_empty() && autoconvert {
        return Ok(HostValue::Matrix(Matrix::empty()));
    }
    if autoconvert {
        if let Some(matrix) = pack_matrix(&items)? {
            return Ok(HostValue::Matrix(matrix));
        }
    }
    items
        .into_iter()
        .map(pack_cell_element)
        .collect::<BridgeResult<Vec<_>>>()
        .map(HostValue::Cell)
}

/// `Some` when every item is a sequence of one common length holding only
/// numeric leaves
fn pack_matrix(items: &[ForeignRef]) -> BridgeResult<Option<Matrix>> {
    let mut rows = Vec::with_capacity(items.len());
    let mut cols = None;
    for item in items {
        if item.kind() != ForeignKind::Sequence {
            return Ok(None);
        }
        let leaves = sequence_items(item)?;
        if *cols.get_or_insert(leaves.len()) != leaves.len() {
            return Ok(None);
        }
        if !leaves.iter().all(|leaf| leaf.kind().is_numeric()) {
            return Ok(None);
        }
        rows.push(leaves);
    }
    let cols = cols.unwrap_or(0);
    let data = rows
        .iter()
        .flatten()
        .map(|leaf| pack_leaf(leaf).map(|x| Scalar::Float(Float::F64(x))))
        .collect::<BridgeResult<Vec<_>>>()?;
    Matrix::new(NumericKind::Double, vec![items.len(), cols], data).map(Some)
}

fn pack_cell_element(item: ForeignRef) -> BridgeResult<HostValue> {
    if item.kind() != ForeignKind::Sequence {
        return pack(item);
    }
    let inner = sequence_items(&item)?;
    if inner.iter().any(|e| e.kind() == ForeignKind::Sequence) {
        let err = BridgeError::conversion("sequences nested more than one level deep are not supported");
        tracing::warn!(error = %err, len = inner.len(), "packing nested sequence as undefined placeholders");
        return Ok(HostValue::Cell(vec![HostValue::Undefined; inner.len()]));
    }
    inner
        .into_iter()
        .map(pack)
        .collect::<BridgeResult<Vec<_>>>()
        .map(HostValue::Cell)
}
