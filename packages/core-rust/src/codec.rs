//! Pluggable codecs for values with no direct primitive wire mapping.
//!
//! The marshalling layer lowers typed values to an intermediate
//! [`rmpv::Value`] before deciding how to put them on the wire. Values that
//! are not structurally primitive are handed to the first codec in the
//! [`CodecSet`] whose `can_encode` predicate accepts them, and travel as
//! [`WireValue::Encoded`](crate::WireValue::Encoded) tagged with the codec's
//! encoding name.

use std::sync::Arc;

use crate::error::MarshalError;

/// A single pluggable encoder/decoder.
///
/// Implementations must be cheap to query: `can_encode`/`can_decode` are
/// called in registration order on every conversion that falls off the
/// primitive fast path.
pub trait ObjectCodec: Send + Sync {
    /// Encoding tag stamped on produced wire values (e.g. `"msgpack"`).
    fn encoding(&self) -> &str;

    /// Whether this codec can encode the given intermediate value.
    fn can_encode(&self, value: &rmpv::Value) -> bool;

    /// Whether this codec can decode payloads carrying the given tag.
    fn can_decode(&self, encoding: &str) -> bool;

    /// Encode the intermediate value into an opaque payload.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::Codec`] if the value cannot be serialized.
    fn encode(&self, value: &rmpv::Value) -> Result<Vec<u8>, MarshalError>;

    /// Decode an opaque payload back into an intermediate value.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::Codec`] if the payload is malformed.
    fn decode(&self, data: &[u8]) -> Result<rmpv::Value, MarshalError>;
}

/// Ordered collection of codecs; the first match wins.
#[derive(Clone)]
pub struct CodecSet {
    codecs: Vec<Arc<dyn ObjectCodec>>,
}

impl CodecSet {
    /// Creates a codec set with the given codecs in priority order.
    #[must_use]
    pub fn new(codecs: Vec<Arc<dyn ObjectCodec>>) -> Self {
        Self { codecs }
    }

    /// Creates an empty codec set (every non-primitive conversion fails).
    #[must_use]
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Appends a codec at the lowest priority.
    pub fn push(&mut self, codec: Arc<dyn ObjectCodec>) {
        self.codecs.push(codec);
    }

    /// First codec whose `can_encode` accepts `value`.
    #[must_use]
    pub fn encoder_for(&self, value: &rmpv::Value) -> Option<&dyn ObjectCodec> {
        self.codecs
            .iter()
            .find(|c| c.can_encode(value))
            .map(AsRef::as_ref)
    }

    /// First codec whose `can_decode` accepts the encoding tag.
    #[must_use]
    pub fn decoder_for(&self, encoding: &str) -> Option<&dyn ObjectCodec> {
        self.codecs
            .iter()
            .find(|c| c.can_decode(encoding))
            .map(AsRef::as_ref)
    }
}

impl Default for CodecSet {
    /// `MsgPack` first (compact, binary-safe), JSON second.
    fn default() -> Self {
        Self::new(vec![Arc::new(MsgPackCodec), Arc::new(JsonCodec)])
    }
}

impl std::fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.encoding()))
            .finish()
    }
}

/// `MsgPack` codec: encodes any intermediate value via `rmpv`.
pub struct MsgPackCodec;

/// Encoding tag of [`MsgPackCodec`].
pub const MSGPACK_ENCODING: &str = "msgpack";

impl ObjectCodec for MsgPackCodec {
    fn encoding(&self) -> &str {
        MSGPACK_ENCODING
    }

    fn can_encode(&self, _value: &rmpv::Value) -> bool {
        true
    }

    fn can_decode(&self, encoding: &str) -> bool {
        encoding.eq_ignore_ascii_case(MSGPACK_ENCODING)
    }

    fn encode(&self, value: &rmpv::Value) -> Result<Vec<u8>, MarshalError> {
        rmp_serde::to_vec(value).map_err(|e| MarshalError::Codec {
            encoding: MSGPACK_ENCODING.to_string(),
            message: e.to_string(),
        })
    }

    fn decode(&self, data: &[u8]) -> Result<rmpv::Value, MarshalError> {
        rmp_serde::from_slice(data).map_err(|e| MarshalError::Codec {
            encoding: MSGPACK_ENCODING.to_string(),
            message: e.to_string(),
        })
    }
}

/// JSON codec: text payloads for transports that want human-readable bodies.
///
/// Cannot carry `MsgPack` extension values; `can_encode` rejects them so the
/// set falls through to another codec.
pub struct JsonCodec;

/// Encoding tag of [`JsonCodec`].
pub const JSON_ENCODING: &str = "json";

impl ObjectCodec for JsonCodec {
    fn encoding(&self) -> &str {
        JSON_ENCODING
    }

    fn can_encode(&self, value: &rmpv::Value) -> bool {
        !contains_ext(value)
    }

    fn can_decode(&self, encoding: &str) -> bool {
        encoding.eq_ignore_ascii_case(JSON_ENCODING)
    }

    fn encode(&self, value: &rmpv::Value) -> Result<Vec<u8>, MarshalError> {
        serde_json::to_vec(value).map_err(|e| MarshalError::Codec {
            encoding: JSON_ENCODING.to_string(),
            message: e.to_string(),
        })
    }

    fn decode(&self, data: &[u8]) -> Result<rmpv::Value, MarshalError> {
        serde_json::from_slice(data).map_err(|e| MarshalError::Codec {
            encoding: JSON_ENCODING.to_string(),
            message: e.to_string(),
        })
    }
}

fn contains_ext(value: &rmpv::Value) -> bool {
    match value {
        rmpv::Value::Ext(..) => true,
        rmpv::Value::Array(items) => items.iter().any(contains_ext),
        rmpv::Value::Map(entries) => entries
            .iter()
            .any(|(k, v)| contains_ext(k) || contains_ext(v)),
        _ => false,
    }
}
