//! Self-describing feature bindings.
//!
//! Every exposed feature answers `GetDescriptor` and `GetOperations` without
//! manual registration. Features are declared explicitly at construction
//! time; the host loops over the declarations and binds both operations per
//! feature, instead of discovering them through runtime type inspection.

use std::sync::Arc;

use gatewire_core::{FeatureDescriptor, OperationDescriptor, ParameterDescription};
use url::Url;

use super::registry::{OperationRegistry, OperationSpec};
use crate::error::OperationError;

/// One feature exposed by the owning adapter.
#[derive(Debug, Clone)]
pub struct FeatureDeclaration {
    pub uri: Url,
    pub description: Option<String>,
}

impl FeatureDeclaration {
    #[must_use]
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Binds the descriptor-query surface for a set of declared features.
pub struct ExtensionHost {
    registry: Arc<OperationRegistry>,
    features: Arc<Vec<FeatureDeclaration>>,
}

impl ExtensionHost {
    /// Binds `GetDescriptor` and `GetOperations` (both Invoke-kind) under
    /// every declared feature.
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] when a feature URI fails the
    /// registry's capability check or a feature is declared twice (the
    /// second set of bindings would collide).
    pub fn new(
        registry: Arc<OperationRegistry>,
        features: Vec<FeatureDeclaration>,
    ) -> Result<Self, OperationError> {
        let features = Arc::new(features);
        for feature in features.iter() {
            Self::bind_get_descriptor(&registry, &features, feature)?;
            Self::bind_get_operations(&registry, feature)?;
        }
        Ok(Self { registry, features })
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureDeclaration] {
        &self.features
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    fn bind_get_descriptor(
        registry: &Arc<OperationRegistry>,
        features: &Arc<Vec<FeatureDeclaration>>,
        feature: &FeatureDeclaration,
    ) -> Result<(), OperationError> {
        let known = Arc::clone(features);
        let own_uri = feature.uri.clone();
        let spec = OperationSpec::named("GetDescriptor")
            .with_description("Describes an extension feature exposed by this adapter")
            .with_inputs(vec![ParameterDescription::new("featureUri")
                .with_description("Feature to describe; defaults to the owning feature")]);
        let bound = registry.bind_invoke_typed(
            &feature.uri,
            spec,
            move |_ctx, (queried,): (Option<String>,)| {
                let known = Arc::clone(&known);
                let own_uri = own_uri.clone();
                async move {
                    let target = match queried {
                        Some(raw) => match Url::parse(&raw) {
                            Ok(url) => url,
                            Err(_) => {
                                return Err(OperationError::InvalidArgument(format!(
                                    "`{raw}` is not a valid feature uri"
                                )))
                            }
                        },
                        None => own_uri,
                    };
                    let found: Option<FeatureDescriptor> = known
                        .iter()
                        .find(|f| f.uri == target)
                        .map(|f| FeatureDescriptor {
                            uri: f.uri.clone(),
                            description: f.description.clone(),
                        });
                    Ok(found)
                }
            },
        )?;
        Self::require_bound(bound, feature)
    }

    fn bind_get_operations(
        registry: &Arc<OperationRegistry>,
        feature: &FeatureDeclaration,
    ) -> Result<(), OperationError> {
        // The handler holds a weak reference back to the registry that owns
        // it; a strong one would keep the registry alive through its own
        // table.
        let weak = Arc::downgrade(registry);
        let own_uri = feature.uri.clone();
        let spec = OperationSpec::named("GetOperations")
            .with_description("Lists operation descriptors, filtered by feature uri prefix")
            .with_inputs(vec![ParameterDescription::new("featureUri")
                .with_description("Prefix filter; defaults to the owning feature")]);
        let bound = registry.bind_invoke_typed(
            &feature.uri,
            spec,
            move |_ctx, (queried,): (Option<String>,)| {
                let weak = weak.clone();
                let own_uri = own_uri.clone();
                async move {
                    let Some(registry) = weak.upgrade() else {
                        return Ok(Vec::<OperationDescriptor>::new());
                    };
                    let prefix = match queried {
                        Some(raw) => match Url::parse(&raw) {
                            Ok(url) => url,
                            Err(_) => {
                                return Err(OperationError::InvalidArgument(format!(
                                    "`{raw}` is not a valid feature uri"
                                )))
                            }
                        },
                        None => own_uri,
                    };
                    Ok(registry.operations(Some(&prefix)))
                }
            },
        )?;
        Self::require_bound(bound, feature)
    }

    fn require_bound(bound: bool, feature: &FeatureDeclaration) -> Result<(), OperationError> {
        if bound {
            Ok(())
        } else {
            Err(OperationError::InvalidArgument(format!(
                "feature `{}` is already declared",
                feature.uri
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
