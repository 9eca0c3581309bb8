use url::Url;

/// Failures from the marshalling layer and codec set.
///
/// Every variant is a flavor of the "unsupported type" condition: the value
/// could not be represented as (or recovered from) a wire value.
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("no codec can represent `{type_name}` as a wire value")]
    UnsupportedType { type_name: &'static str },
    #[error("no codec registered for encoding `{encoding}`")]
    UnknownEncoding { encoding: String },
    #[error("codec `{encoding}` failed: {message}")]
    Codec { encoding: String, message: String },
    #[error("wire value does not convert to `{type_name}`: {message}")]
    Incompatible {
        type_name: &'static str,
        message: String,
    },
}

/// Failures from the operation identity scheme.
#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("operation name is empty")]
    EmptyName,
    #[error("operation name `{name}` may not contain path separators")]
    InvalidName { name: String },
    #[error("`{uri}` is not an extension feature root")]
    NotAFeature { uri: Url },
    #[error("`{uri}` is not an extension operation uri")]
    NotAnOperation { uri: Url },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_context() {
        let err = MarshalError::UnknownEncoding {
            encoding: "avro".to_string(),
        };
        assert!(err.to_string().contains("avro"));

        let err = UriError::NotAFeature {
            uri: Url::parse("https://x/other/").unwrap(),
        };
        assert!(err.to_string().contains("https://x/other/"));
    }
}
