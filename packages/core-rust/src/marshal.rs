//! Conversion between typed values and [`WireValue`]s.
//!
//! Typed values are lowered to an intermediate [`rmpv::Value`] through serde.
//! Structurally primitive values (and homogeneous primitive arrays) map
//! directly onto the wire union; everything else goes through the first
//! matching codec in the [`CodecSet`] and travels as
//! [`WireValue::Encoded`]. The layer is pure: no state beyond the codec set
//! passed in.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::CodecSet;
use crate::error::MarshalError;
use crate::value::{ArrayValue, WireValue};

/// Converts a typed value into a wire value.
///
/// # Errors
///
/// Returns [`MarshalError::UnsupportedType`] when the value is not primitive
/// and no codec in the set accepts it.
pub fn to_wire_value<T: Serialize>(
    value: &T,
    codecs: &CodecSet,
) -> Result<WireValue, MarshalError> {
    let lowered =
        rmpv::ext::to_value(value).map_err(|_| MarshalError::UnsupportedType {
            type_name: std::any::type_name::<T>(),
        })?;

    if let Some(primitive) = primitive_wire(&lowered) {
        return Ok(primitive);
    }

    match codecs.encoder_for(&lowered) {
        Some(codec) => {
            tracing::trace!(
                type_name = std::any::type_name::<T>(),
                encoding = codec.encoding(),
                "encoding value through codec fallback"
            );
            Ok(WireValue::Encoded {
                data: codec.encode(&lowered)?,
                encoding: codec.encoding().to_string(),
            })
        }
        None => Err(MarshalError::UnsupportedType {
            type_name: std::any::type_name::<T>(),
        }),
    }
}

/// Recovers a typed value from a wire value.
///
/// `Null` yields the type's default value. `Encoded` payloads are decoded by
/// the first codec accepting their encoding tag; primitives are raised back
/// through serde.
///
/// # Errors
///
/// Returns [`MarshalError::UnknownEncoding`] when no codec accepts an encoded
/// payload's tag, and [`MarshalError::Incompatible`] when the recovered value
/// does not deserialize as `T`.
pub fn from_wire_value<T: DeserializeOwned + Default>(
    value: &WireValue,
    codecs: &CodecSet,
) -> Result<T, MarshalError> {
    let lowered = match value {
        WireValue::Null => return Ok(T::default()),
        WireValue::Encoded { data, encoding } => {
            let codec =
                codecs
                    .decoder_for(encoding)
                    .ok_or_else(|| MarshalError::UnknownEncoding {
                        encoding: encoding.clone(),
                    })?;
            codec.decode(data)?
        }
        primitive => raise(primitive),
    };

    rmpv::ext::from_value(lowered).map_err(|e| MarshalError::Incompatible {
        type_name: std::any::type_name::<T>(),
        message: e.to_string(),
    })
}

/// Direct mapping from an intermediate value to a primitive wire value.
/// `None` means "not primitive-shaped" and sends the value down the codec
/// path.
fn primitive_wire(value: &rmpv::Value) -> Option<WireValue> {
    match value {
        rmpv::Value::Nil => Some(WireValue::Null),
        rmpv::Value::Boolean(b) => Some(WireValue::Bool(*b)),
        rmpv::Value::Integer(i) => i
            .as_i64()
            .map(WireValue::Int)
            .or_else(|| i.as_u64().map(WireValue::UInt)),
        rmpv::Value::F32(f) => Some(WireValue::Float(f64::from(*f))),
        rmpv::Value::F64(f) => Some(WireValue::Float(*f)),
        rmpv::Value::String(s) => s.as_str().map(|s| WireValue::String(s.to_string())),
        rmpv::Value::Array(items) => primitive_array(items).map(WireValue::Array),
        _ => None,
    }
}

/// Homogeneous-primitive detection for arrays. Kind checks run narrowest
/// first so integer arrays do not collapse into floats.
fn primitive_array(items: &[rmpv::Value]) -> Option<ArrayValue> {
    if items.is_empty() {
        return Some(ArrayValue::Int(Vec::new()));
    }
    if let Some(bools) = collect_with(items, rmpv::Value::as_bool) {
        return Some(ArrayValue::Bool(bools));
    }
    if let Some(ints) = collect_with(items, rmpv::Value::as_i64) {
        return Some(ArrayValue::Int(ints));
    }
    if let Some(uints) = collect_with(items, rmpv::Value::as_u64) {
        return Some(ArrayValue::UInt(uints));
    }
    if let Some(strings) = collect_with(items, |v| v.as_str().map(ToString::to_string)) {
        return Some(ArrayValue::String(strings));
    }
    if let Some(floats) = collect_with(items, as_float) {
        return Some(ArrayValue::Float(floats));
    }
    None
}

fn collect_with<T>(
    items: &[rmpv::Value],
    f: impl Fn(&rmpv::Value) -> Option<T>,
) -> Option<Vec<T>> {
    items.iter().map(f).collect()
}

fn as_float(value: &rmpv::Value) -> Option<f64> {
    match value {
        rmpv::Value::F32(f) => Some(f64::from(*f)),
        rmpv::Value::F64(f) => Some(*f),
        rmpv::Value::Integer(i) => i.as_f64(),
        _ => None,
    }
}

/// Raises a primitive wire value back to the intermediate representation.
/// Timestamps lower to their epoch-millisecond integer.
fn raise(value: &WireValue) -> rmpv::Value {
    match value {
        WireValue::Null | WireValue::Encoded { .. } => rmpv::Value::Nil,
        WireValue::Bool(b) => rmpv::Value::Boolean(*b),
        WireValue::Int(i) | WireValue::Timestamp(i) => rmpv::Value::from(*i),
        WireValue::UInt(u) => rmpv::Value::from(*u),
        WireValue::Float(f) => rmpv::Value::F64(*f),
        WireValue::String(s) => rmpv::Value::String(s.clone().into()),
        WireValue::Array(array) => rmpv::Value::Array(raise_array(array)),
    }
}

fn raise_array(array: &ArrayValue) -> Vec<rmpv::Value> {
    match array {
        ArrayValue::Bool(v) => v.iter().map(|b| rmpv::Value::Boolean(*b)).collect(),
        ArrayValue::Int(v) | ArrayValue::Timestamp(v) => {
            v.iter().map(|i| rmpv::Value::from(*i)).collect()
        }
        ArrayValue::UInt(v) => v.iter().map(|u| rmpv::Value::from(*u)).collect(),
        ArrayValue::Float(v) => v.iter().map(|f| rmpv::Value::F64(*f)).collect(),
        ArrayValue::String(v) => v
            .iter()
            .map(|s| rmpv::Value::String(s.clone().into()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        values: Vec<f64>,
        ok: bool,
    }

    fn codecs() -> CodecSet {
        CodecSet::default()
    }

    #[test]
    fn primitives_map_directly() {
        let set = codecs();
        assert_eq!(
            to_wire_value(&true, &set).unwrap(),
            WireValue::Bool(true)
        );
        assert_eq!(to_wire_value(&-3_i32, &set).unwrap(), WireValue::Int(-3));
        assert_eq!(
            to_wire_value(&u64::MAX, &set).unwrap(),
            WireValue::UInt(u64::MAX)
        );
        assert_eq!(
            to_wire_value(&"hi", &set).unwrap(),
            WireValue::String("hi".to_string())
        );
        assert_eq!(
            to_wire_value(&vec![1_i64, 2, 3], &set).unwrap(),
            WireValue::Array(ArrayValue::Int(vec![1, 2, 3]))
        );
    }

    #[test]
    fn structs_fall_back_to_the_codec_set() {
        let set = codecs();
        let reading = Reading {
            sensor: "s1".to_string(),
            values: vec![0.5, 1.5],
            ok: true,
        };
        let wire = to_wire_value(&reading, &set).unwrap();
        match &wire {
            WireValue::Encoded { encoding, .. } => {
                assert_eq!(encoding, crate::codec::MSGPACK_ENCODING);
            }
            other => panic!("expected encoded value, got {other:?}"),
        }
        let back: Reading = from_wire_value(&wire, &set).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn no_codec_means_unsupported_type() {
        let set = CodecSet::empty();
        let reading = Reading::default();
        let err = to_wire_value(&reading, &set).unwrap_err();
        assert!(matches!(err, MarshalError::UnsupportedType { .. }));
    }

    #[test]
    fn unknown_encoding_is_rejected_on_decode() {
        let set = codecs();
        let wire = WireValue::Encoded {
            data: vec![1, 2, 3],
            encoding: "avro".to_string(),
        };
        let err = from_wire_value::<Reading>(&wire, &set).unwrap_err();
        assert!(matches!(err, MarshalError::UnknownEncoding { .. }));
    }

    #[test]
    fn null_yields_the_default_value() {
        let set = codecs();
        let n: i64 = from_wire_value(&WireValue::Null, &set).unwrap();
        assert_eq!(n, 0);
        let s: String = from_wire_value(&WireValue::Null, &set).unwrap();
        assert_eq!(s, "");
        let opt: Option<i64> = from_wire_value(&WireValue::Null, &set).unwrap();
        assert_eq!(opt, None);
        let reading: Reading = from_wire_value(&WireValue::Null, &set).unwrap();
        assert_eq!(reading, Reading::default());
    }

    #[test]
    fn timestamp_recovers_as_integer_millis() {
        let set = codecs();
        let millis: i64 = from_wire_value(&WireValue::Timestamp(1_700_000_000_000), &set).unwrap();
        assert_eq!(millis, 1_700_000_000_000);
    }

    #[test]
    fn incompatible_target_type_is_reported() {
        let set = codecs();
        let err = from_wire_value::<bool>(&WireValue::String("nope".to_string()), &set)
            .unwrap_err();
        assert!(matches!(err, MarshalError::Incompatible { .. }));
    }

    proptest! {
        #[test]
        fn round_trip_i64(v in any::<i64>()) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<i64>(&wire, &set).unwrap(), v);
        }

        #[test]
        fn round_trip_u64(v in any::<u64>()) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<u64>(&wire, &set).unwrap(), v);
        }

        #[test]
        fn round_trip_bool(v in any::<bool>()) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<bool>(&wire, &set).unwrap(), v);
        }

        #[test]
        fn round_trip_finite_float(v in -1.0e12_f64..1.0e12) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            let back: f64 = from_wire_value(&wire, &set).unwrap();
            prop_assert!((back - v).abs() < f64::EPSILON * v.abs().max(1.0));
        }

        #[test]
        fn round_trip_string(v in ".*") {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<String>(&wire, &set).unwrap(), v);
        }

        #[test]
        fn round_trip_int_array(v in prop::collection::vec(any::<i64>(), 0..16)) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<Vec<i64>>(&wire, &set).unwrap(), v);
        }

        #[test]
        fn round_trip_string_array(v in prop::collection::vec(".*", 0..8)) {
            let set = codecs();
            let wire = to_wire_value(&v, &set).unwrap();
            prop_assert_eq!(from_wire_value::<Vec<String>>(&wire, &set).unwrap(), v);
        }
    }
}
