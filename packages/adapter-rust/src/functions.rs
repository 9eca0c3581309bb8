//! Custom-function registry: the companion, invoke-only registration path.
//!
//! Same keyed-by-URI pattern as the operation registry but without the
//! streaming kinds, plus an optional per-function authorize predicate that
//! runs before the handler.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use gatewire_core::{InvocationRequest, InvocationResponse, OperationDescriptor};
use url::Url;

use crate::context::CallContext;
use crate::error::OperationError;

/// Handler for a registered custom function.
#[async_trait]
pub trait CustomFunctionHandler: Send + Sync {
    async fn invoke(
        &self,
        ctx: CallContext,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, OperationError>;
}

/// Per-function authorization check, evaluated before invocation.
pub type AuthorizePredicate = Arc<dyn Fn(&CallContext) -> bool + Send + Sync>;

/// One registered custom function.
pub struct CustomFunctionRegistration {
    pub descriptor: OperationDescriptor,
    handler: Arc<dyn CustomFunctionHandler>,
    authorize: Option<AuthorizePredicate>,
}

impl CustomFunctionRegistration {
    #[must_use]
    pub fn new(descriptor: OperationDescriptor, handler: Arc<dyn CustomFunctionHandler>) -> Self {
        Self {
            descriptor,
            handler,
            authorize: None,
        }
    }

    #[must_use]
    pub fn with_authorize(mut self, authorize: AuthorizePredicate) -> Self {
        self.authorize = Some(authorize);
        self
    }
}

/// Registry of custom functions keyed by operation URI.
#[derive(Default)]
pub struct CustomFunctionRegistry {
    functions: DashMap<Url, CustomFunctionRegistration>,
}

impl CustomFunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under its descriptor's operation id. Returns
    /// `false` without replacing anything when the id is already taken.
    pub fn register(&self, registration: CustomFunctionRegistration) -> bool {
        let id = registration.descriptor.operation_id.clone();
        match self.functions.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::debug!(function = %slot.key(), "registered custom function");
                slot.insert(registration);
                true
            }
        }
    }

    /// Descriptor of a registered function, if any.
    #[must_use]
    pub fn descriptor(&self, operation_id: &Url) -> Option<OperationDescriptor> {
        self.functions
            .get(operation_id)
            .map(|entry| entry.descriptor.clone())
    }

    /// Invokes a registered function.
    ///
    /// # Errors
    ///
    /// [`OperationError::NotFound`] when no function is registered under the
    /// request's operation id, [`OperationError::Unauthorized`] when the
    /// function's predicate rejects the caller, plus whatever the handler
    /// returns.
    pub async fn invoke(
        &self,
        ctx: CallContext,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, OperationError> {
        let handler = {
            let entry = self.functions.get(&request.operation_id).ok_or(
                OperationError::NotFound {
                    operation_id: request.operation_id.clone(),
                },
            )?;
            if let Some(authorize) = &entry.authorize {
                if !authorize(&ctx) {
                    return Err(OperationError::Unauthorized {
                        reason: format!(
                            "predicate rejected caller of `{}`",
                            request.operation_id
                        ),
                    });
                }
            }
            Arc::clone(&entry.handler)
            // The map guard drops here, before the await below.
        };
        handler.invoke(ctx, request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
