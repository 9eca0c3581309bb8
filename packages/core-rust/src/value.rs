use serde::{Deserialize, Serialize};

/// Discriminant for [`WireValue`] variants, used in diagnostics and codec
/// predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    String,
    Timestamp,
    Array,
    Encoded,
}

/// Tagged wire value exchanged across the dynamic-operation boundary.
///
/// A closed union: either one of the primitive kinds, an array of a single
/// primitive kind, or an opaque [`WireValue::Encoded`] payload produced by a
/// codec. Values are immutable, compare structurally, and serialize to
/// `MsgPack` via `rmp_serde::to_vec_named()` with camelCase variant tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    /// Explicit null sentinel.
    Null,
    Bool(bool),
    /// Signed 64-bit integer. Narrower integer types widen into this kind.
    Int(i64),
    /// Unsigned 64-bit integer, used only for values above `i64::MAX`.
    UInt(u64),
    /// 64-bit IEEE 754 floating point. `f32` widens into this kind.
    Float(f64),
    String(String),
    /// Instant as UTC epoch milliseconds.
    Timestamp(i64),
    /// Array of exactly one primitive kind.
    Array(ArrayValue),
    /// Opaque payload produced by a codec, tagged with its encoding.
    Encoded {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        encoding: String,
    },
}

/// Homogeneous primitive array payload for [`WireValue::Array`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayValue {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    String(Vec<String>),
    Timestamp(Vec<i64>),
}

impl WireValue {
    /// Returns `true` for the null sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// Returns the variant discriminant.
    #[must_use]
    pub fn kind(&self) -> WireKind {
        match self {
            WireValue::Null => WireKind::Null,
            WireValue::Bool(_) => WireKind::Bool,
            WireValue::Int(_) => WireKind::Int,
            WireValue::UInt(_) => WireKind::UInt,
            WireValue::Float(_) => WireKind::Float,
            WireValue::String(_) => WireKind::String,
            WireValue::Timestamp(_) => WireKind::Timestamp,
            WireValue::Array(_) => WireKind::Array,
            WireValue::Encoded { .. } => WireKind::Encoded,
        }
    }
}

impl ArrayValue {
    /// Element kind of this array.
    #[must_use]
    pub fn element_kind(&self) -> WireKind {
        match self {
            ArrayValue::Bool(_) => WireKind::Bool,
            ArrayValue::Int(_) => WireKind::Int,
            ArrayValue::UInt(_) => WireKind::UInt,
            ArrayValue::Float(_) => WireKind::Float,
            ArrayValue::String(_) => WireKind::String,
            ArrayValue::Timestamp(_) => WireKind::Timestamp,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Bool(v) => v.len(),
            ArrayValue::Int(v) => v.len(),
            ArrayValue::UInt(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::String(v) => v.len(),
            ArrayValue::Timestamp(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        WireValue::Bool(v)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        WireValue::Int(v)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        WireValue::Float(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        WireValue::String(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        WireValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        assert_eq!(WireValue::Int(7), WireValue::Int(7));
        assert_ne!(WireValue::Int(7), WireValue::UInt(7));
        assert_eq!(
            WireValue::Array(ArrayValue::String(vec!["a".to_string()])),
            WireValue::Array(ArrayValue::String(vec!["a".to_string()])),
        );
        assert_eq!(
            WireValue::Encoded {
                data: vec![1, 2],
                encoding: "json".to_string()
            },
            WireValue::Encoded {
                data: vec![1, 2],
                encoding: "json".to_string()
            },
        );
        assert_ne!(
            WireValue::Encoded {
                data: vec![1, 2],
                encoding: "json".to_string()
            },
            WireValue::Encoded {
                data: vec![1, 2],
                encoding: "msgpack".to_string()
            },
        );
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(WireValue::Null.kind(), WireKind::Null);
        assert_eq!(WireValue::Timestamp(0).kind(), WireKind::Timestamp);
        assert_eq!(
            WireValue::Array(ArrayValue::Float(vec![1.5])).kind(),
            WireKind::Array
        );
    }

    #[test]
    fn null_sentinel() {
        assert!(WireValue::Null.is_null());
        assert!(!WireValue::Bool(false).is_null());
    }

    #[test]
    fn msgpack_round_trip() {
        let values = vec![
            WireValue::Null,
            WireValue::Bool(true),
            WireValue::Int(-42),
            WireValue::UInt(u64::MAX),
            WireValue::Float(2.5),
            WireValue::String("hello".to_string()),
            WireValue::Timestamp(1_700_000_000_000),
            WireValue::Array(ArrayValue::Int(vec![1, 2, 3])),
            WireValue::Encoded {
                data: vec![0xde, 0xad],
                encoding: "msgpack".to_string(),
            },
        ];
        for value in values {
            let bytes = rmp_serde::to_vec_named(&value).unwrap();
            let back: WireValue = rmp_serde::from_slice(&bytes).unwrap();
            assert_eq!(back, value);
        }
    }
}
