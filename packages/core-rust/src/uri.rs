//! Operation identity scheme.
//!
//! Operation URIs have the shape
//! `<feature-uri><kind-segment>/<operation-name>/`, always trailing-slash
//! terminated, where the feature URI itself is rooted under the well-known
//! extensions base path. The same unqualified name may exist once per kind;
//! the kind segment keeps those identities distinct.

use url::Url;

use crate::descriptor::OperationKind;
use crate::error::UriError;

/// Well-known root path under which all extension features live.
pub const EXTENSIONS_BASE_PATH: &str = "/extensions/";

/// Capability check supplied by the adapter-feature metadata subsystem:
/// decides whether a URI names an extension feature root.
pub trait FeatureUriValidator: Send + Sync {
    fn is_extension_feature(&self, uri: &Url) -> bool;
}

/// Default validator: accepts base-able URIs rooted under
/// [`EXTENSIONS_BASE_PATH`] with a trailing slash.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionsRootValidator;

impl FeatureUriValidator for ExtensionsRootValidator {
    fn is_extension_feature(&self, uri: &Url) -> bool {
        !uri.cannot_be_a_base()
            && uri.path().starts_with(EXTENSIONS_BASE_PATH)
            && uri.path().ends_with('/')
            && uri.path().len() > EXTENSIONS_BASE_PATH.len()
    }
}

/// Builds the operation URI `<feature>/<kind>/<name>/`.
///
/// The name is trimmed before use. The feature URI must pass the supplied
/// capability check and is normalized to end with `/` before joining, so the
/// result is always trailing-slash terminated.
///
/// # Errors
///
/// [`UriError::EmptyName`] when the trimmed name is empty,
/// [`UriError::InvalidName`] when it contains a path separator, and
/// [`UriError::NotAFeature`] when the capability check rejects the feature
/// URI.
pub fn build_operation_uri(
    validator: &dyn FeatureUriValidator,
    feature: &Url,
    name: &str,
    kind: OperationKind,
) -> Result<Url, UriError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UriError::EmptyName);
    }
    if name.contains('/') {
        return Err(UriError::InvalidName {
            name: name.to_string(),
        });
    }
    if !validator.is_extension_feature(feature) {
        return Err(UriError::NotAFeature {
            uri: feature.clone(),
        });
    }

    let mut base = feature.clone();
    if !base.path().ends_with('/') {
        let normalized = format!("{}/", base.path());
        base.set_path(&normalized);
    }
    base.join(&format!("{}/{name}/", kind.segment()))
        .map_err(|_| UriError::InvalidName {
            name: name.to_string(),
        })
}

/// Recovers the owning feature URI from an operation URI.
///
/// Returns `None` unless the URI is absolute and base-able, rooted under
/// [`EXTENSIONS_BASE_PATH`], shaped as at least
/// `<feature>/<kind>/<name>/` (three non-empty segments beyond the base),
/// and carries a valid kind segment in second-to-last position. The feature
/// URI is the input with the last two segments stripped.
#[must_use]
pub fn extract_feature_uri(operation_uri: &Url) -> Option<Url> {
    if operation_uri.cannot_be_a_base()
        || !operation_uri.path().starts_with(EXTENSIONS_BASE_PATH)
    {
        return None;
    }

    let segments: Vec<&str> = operation_uri
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    // segments[0] is the extensions base; at least feature + kind + name
    // must follow.
    if segments.len() < 4 {
        return None;
    }

    let kind_segment = segments[segments.len() - 2];
    OperationKind::parse_segment(kind_segment)?;

    let mut feature = operation_uri.clone();
    feature.set_query(None);
    feature.set_fragment(None);
    let feature_path = format!("/{}/", segments[..segments.len() - 2].join("/"));
    feature.set_path(&feature_path);
    Some(feature)
}
