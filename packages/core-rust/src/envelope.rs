//! Invocation envelopes: the request/response shapes every call kind shares.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::UriError;
use crate::uri::extract_feature_uri;
use crate::value::WireValue;

/// Request envelope for all three call kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub operation_id: Url,
    #[serde(default)]
    pub arguments: Vec<WireValue>,
}

impl InvocationRequest {
    #[must_use]
    pub fn new(operation_id: Url, arguments: Vec<WireValue>) -> Self {
        Self {
            operation_id,
            arguments,
        }
    }

    /// Structural validation performed before dispatch: the operation id must
    /// have the `<feature>/<kind>/<name>/` shape under the extensions root.
    ///
    /// # Errors
    ///
    /// [`UriError::NotAnOperation`] when the id is malformed.
    pub fn validate(&self) -> Result<(), UriError> {
        if extract_feature_uri(&self.operation_id).is_none() {
            return Err(UriError::NotAnOperation {
                uri: self.operation_id.clone(),
            });
        }
        Ok(())
    }
}

/// Response envelope; produced once for invoke, repeatedly for stream and
/// duplex-stream calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    #[serde(default)]
    pub results: Vec<WireValue>,
}

impl InvocationResponse {
    /// Response carrying exactly one result.
    #[must_use]
    pub fn single(result: WireValue) -> Self {
        Self {
            results: vec![result],
        }
    }

    /// Response with no results.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// First result, if any. Duplex bridging reads only this one.
    #[must_use]
    pub fn first_result(&self) -> Option<&WireValue> {
        self.results.first()
    }
}

/// One inbound fragment of a duplex-stream call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFragment {
    #[serde(default)]
    pub arguments: Vec<WireValue>,
}

impl StreamFragment {
    /// Fragment carrying exactly one argument.
    #[must_use]
    pub fn single(argument: WireValue) -> Self {
        Self {
            arguments: vec![argument],
        }
    }
}
