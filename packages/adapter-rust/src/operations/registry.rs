//! Operation registry: binds operation URIs to descriptors and handlers.
//!
//! One registry instance holds three independent handler tables, one per
//! [`OperationKind`], plus the descriptor table shared by all kinds. The
//! tables live behind a single lock so a descriptor and its handler are
//! inserted atomically. Registration happens during the binding phase
//! (feature construction); afterwards the tables are read-mostly.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::BoxStream;
use gatewire_core::{
    build_operation_uri, CodecSet, ExtensionsRootValidator, FeatureUriValidator,
    InvocationRequest, InvocationResponse, OperationDescriptor, OperationKind,
    ParameterDescription, StreamFragment,
};
use parking_lot::RwLock;
use url::Url;

use crate::context::CallContext;
use crate::error::OperationError;

// ---------------------------------------------------------------------------
// Handler shapes
// ---------------------------------------------------------------------------

/// Boxed future returned by invoke handlers.
pub type BoxOpFuture =
    Pin<Box<dyn Future<Output = Result<InvocationResponse, OperationError>> + Send>>;

/// Outbound sequence of response envelopes. Lazy, possibly infinite, not
/// restartable; a faulted element terminates the sequence.
pub type ResponseStream = BoxStream<'static, Result<InvocationResponse, OperationError>>;

/// Inbound sequence of request fragments for a duplex call.
pub type FragmentStream = BoxStream<'static, StreamFragment>;

/// Handler for a unary operation.
pub type InvokeHandler =
    Arc<dyn Fn(CallContext, InvocationRequest) -> BoxOpFuture + Send + Sync>;

/// Handler for a server-streaming operation.
pub type StreamHandler = Arc<
    dyn Fn(CallContext, InvocationRequest) -> Result<ResponseStream, OperationError>
        + Send
        + Sync,
>;

/// Handler for a duplex-streaming operation. Receives the inbound fragment
/// sequence; the outbound sequence it returns is driven independently.
pub type DuplexHandler = Arc<
    dyn Fn(
            CallContext,
            InvocationRequest,
            FragmentStream,
        ) -> Result<ResponseStream, OperationError>
        + Send
        + Sync,
>;

// ---------------------------------------------------------------------------
// OperationSpec
// ---------------------------------------------------------------------------

/// Bind-time metadata for one operation: name plus optional documentation,
/// parameter descriptions, and request/response schema documents.
#[derive(Debug, Clone, Default)]
pub struct OperationSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_parameters: Vec<ParameterDescription>,
    pub output_parameters: Vec<ParameterDescription>,
    pub request_schema: Option<serde_json::Value>,
    pub response_schema: Option<serde_json::Value>,
}

impl OperationSpec {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<ParameterDescription>) -> Self {
        self.input_parameters = inputs;
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<ParameterDescription>) -> Self {
        self.output_parameters = outputs;
        self
    }

    #[must_use]
    pub fn with_schemas(
        mut self,
        request: Option<serde_json::Value>,
        response: Option<serde_json::Value>,
    ) -> Self {
        self.request_schema = request;
        self.response_schema = response;
        self
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// All tables behind one lock so descriptor + handler insertion is atomic.
#[derive(Default)]
struct Tables {
    descriptors: HashMap<Url, OperationDescriptor>,
    invoke: HashMap<Url, InvokeHandler>,
    stream: HashMap<Url, StreamHandler>,
    duplex: HashMap<Url, DuplexHandler>,
}

/// Registry of dynamically-bound operations.
///
/// An operation URI may appear in at most one kind's table; the same
/// unqualified name may be bound once per kind because the kind segment is
/// part of the identity. `bind_*` refuses collisions by returning `false`
/// without mutating any table.
pub struct OperationRegistry {
    tables: RwLock<Tables>,
    codecs: Arc<CodecSet>,
    validator: Arc<dyn FeatureUriValidator>,
}

impl OperationRegistry {
    /// Registry with the default codec set and the extensions-root feature
    /// check.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(CodecSet::default()),
            Arc::new(ExtensionsRootValidator),
        )
    }

    /// Registry with an explicit codec set and feature-URI capability check.
    #[must_use]
    pub fn with_parts(codecs: Arc<CodecSet>, validator: Arc<dyn FeatureUriValidator>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            codecs,
            validator,
        }
    }

    /// Codec set shared with binding helpers and the dispatcher.
    #[must_use]
    pub fn codecs(&self) -> Arc<CodecSet> {
        Arc::clone(&self.codecs)
    }

    /// Binds a unary operation.
    ///
    /// Returns `Ok(false)` without mutating state when the operation URI is
    /// already taken in either the descriptor or the invoke table.
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] when the name is empty or the
    /// feature URI fails the capability check.
    pub fn bind_invoke(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: InvokeHandler,
    ) -> Result<bool, OperationError> {
        let (id, descriptor) = self.prepare(feature, OperationKind::Invoke, &spec)?;
        let mut tables = self.tables.write();
        if tables.descriptors.contains_key(&id) || tables.invoke.contains_key(&id) {
            tracing::debug!(operation = %id, "bind refused: already registered");
            return Ok(false);
        }
        tables.invoke.insert(id.clone(), handler);
        tracing::debug!(operation = %id, "bound invoke operation");
        tables.descriptors.insert(id, descriptor);
        Ok(true)
    }

    /// Binds a server-streaming operation. Same collision contract as
    /// [`Self::bind_invoke`].
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] on a bad name or feature URI.
    pub fn bind_stream(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: StreamHandler,
    ) -> Result<bool, OperationError> {
        let (id, descriptor) = self.prepare(feature, OperationKind::Stream, &spec)?;
        let mut tables = self.tables.write();
        if tables.descriptors.contains_key(&id) || tables.stream.contains_key(&id) {
            tracing::debug!(operation = %id, "bind refused: already registered");
            return Ok(false);
        }
        tables.stream.insert(id.clone(), handler);
        tracing::debug!(operation = %id, "bound stream operation");
        tables.descriptors.insert(id, descriptor);
        Ok(true)
    }

    /// Binds a duplex-streaming operation. Same collision contract as
    /// [`Self::bind_invoke`].
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] on a bad name or feature URI.
    pub fn bind_duplex_stream(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: DuplexHandler,
    ) -> Result<bool, OperationError> {
        let (id, descriptor) = self.prepare(feature, OperationKind::DuplexStream, &spec)?;
        let mut tables = self.tables.write();
        if tables.descriptors.contains_key(&id) || tables.duplex.contains_key(&id) {
            tracing::debug!(operation = %id, "bind refused: already registered");
            return Ok(false);
        }
        tables.duplex.insert(id.clone(), handler);
        tracing::debug!(operation = %id, "bound duplex-stream operation");
        tables.descriptors.insert(id, descriptor);
        Ok(true)
    }

    /// Descriptor for the given operation URI, from any kind.
    #[must_use]
    pub fn descriptor(&self, operation_id: &Url) -> Option<OperationDescriptor> {
        self.tables.read().descriptors.get(operation_id).cloned()
    }

    /// All descriptors, optionally filtered to operations whose URI starts
    /// with the given feature prefix.
    #[must_use]
    pub fn operations(&self, feature_prefix: Option<&Url>) -> Vec<OperationDescriptor> {
        let tables = self.tables.read();
        let mut descriptors: Vec<OperationDescriptor> = tables
            .descriptors
            .values()
            .filter(|d| match feature_prefix {
                Some(prefix) => d.operation_id.as_str().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        descriptors.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        descriptors
    }

    #[must_use]
    pub fn invoke_handler(&self, operation_id: &Url) -> Option<InvokeHandler> {
        self.tables.read().invoke.get(operation_id).cloned()
    }

    #[must_use]
    pub fn stream_handler(&self, operation_id: &Url) -> Option<StreamHandler> {
        self.tables.read().stream.get(operation_id).cloned()
    }

    #[must_use]
    pub fn duplex_handler(&self, operation_id: &Url) -> Option<DuplexHandler> {
        self.tables.read().duplex.get(operation_id).cloned()
    }

    /// Builds the operation URI and descriptor for a bind call.
    fn prepare(
        &self,
        feature: &Url,
        kind: OperationKind,
        spec: &OperationSpec,
    ) -> Result<(Url, OperationDescriptor), OperationError> {
        let id = build_operation_uri(self.validator.as_ref(), feature, &spec.name, kind)?;
        let descriptor = OperationDescriptor {
            operation_id: id.clone(),
            kind,
            name: spec.name.trim().to_string(),
            description: spec.description.clone(),
            input_parameters: spec.input_parameters.clone(),
            output_parameters: spec.output_parameters.clone(),
            request_schema: spec.request_schema.clone(),
            response_schema: spec.response_schema.clone(),
        };
        Ok((id, descriptor))
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
