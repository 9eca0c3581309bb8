//! Self-describing operation metadata.
//!
//! Descriptors are created at bind time, are immutable afterwards, and are
//! owned by the operation registry. All structs serialize with camelCase
//! field names for wire compatibility.

use serde::{Deserialize, Serialize};
use url::Url;

/// The three call shapes an operation can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Unary request/response.
    Invoke,
    /// Request followed by a sequence of responses.
    Stream,
    /// Stream of requests against a stream of responses.
    DuplexStream,
}

impl OperationKind {
    /// Lower-case URI path segment for this kind.
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            OperationKind::Invoke => "invoke",
            OperationKind::Stream => "stream",
            OperationKind::DuplexStream => "duplexstream",
        }
    }

    /// Parses a URI path segment, case-insensitively.
    #[must_use]
    pub fn parse_segment(segment: &str) -> Option<Self> {
        if segment.eq_ignore_ascii_case("invoke") {
            Some(OperationKind::Invoke)
        } else if segment.eq_ignore_ascii_case("stream") {
            Some(OperationKind::Stream)
        } else if segment.eq_ignore_ascii_case("duplexstream") {
            Some(OperationKind::DuplexStream)
        } else {
            None
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

/// Free-form description of one positional input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescription {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

impl ParameterDescription {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable metadata describing one bound operation.
///
/// Carries either positional parameter descriptions or, for schema-oriented
/// bindings, request/response schema documents handed in by the caller.
/// Schema *generation* is out of scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Full operation URI; unique per kind.
    pub operation_id: Url,
    pub kind: OperationKind,
    /// Unqualified operation name (the last URI segment, pre-encoding).
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub input_parameters: Vec<ParameterDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub output_parameters: Vec<ParameterDescription>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response_schema: Option<serde_json::Value>,
}

/// Metadata describing one extension feature root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    pub uri: Url,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}
