//! Operation dispatch: validate, resolve, invoke.
//!
//! One entry point per call kind. Dispatch itself is synchronous apart from
//! the bound handler's own suspension; the dispatcher buffers nothing beyond
//! what the handler does.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use gatewire_core::{CodecSet, InvocationRequest, InvocationResponse};
use tokio_util::sync::CancellationToken;

use super::registry::{FragmentStream, OperationRegistry, ResponseStream};
use crate::config::ExtensionsConfig;
use crate::context::CallContext;
use crate::error::OperationError;

/// Routes call envelopes to handlers resolved from the registry.
pub struct OperationDispatcher {
    registry: Arc<OperationRegistry>,
    config: ExtensionsConfig,
}

impl OperationDispatcher {
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self::with_config(registry, ExtensionsConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: Arc<OperationRegistry>, config: ExtensionsConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn codecs(&self) -> Arc<CodecSet> {
        self.registry.codecs()
    }

    /// Dispatches a unary call.
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] when the request fails structural
    /// validation, [`OperationError::NotFound`] when no invoke handler is
    /// bound, [`OperationError::Cancelled`] when the signal fires first,
    /// [`OperationError::Timeout`] past the configured deadline, plus
    /// whatever the handler itself returns.
    pub async fn invoke(
        &self,
        ctx: CallContext,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> Result<InvocationResponse, OperationError> {
        request
            .validate()
            .map_err(|e| OperationError::InvalidArgument(e.to_string()))?;
        let handler = self.registry.invoke_handler(&request.operation_id).ok_or(
            OperationError::NotFound {
                operation_id: request.operation_id.clone(),
            },
        )?;
        metrics::counter!("gatewire_operations_dispatched_total", "kind" => "invoke")
            .increment(1);
        tracing::debug!(operation = %request.operation_id, call = %ctx.call_id, "dispatching invoke");

        let call = handler(ctx, request);
        match self.config.invoke_timeout_ms {
            Some(timeout_ms) => tokio::select! {
                () = cancel.cancelled() => Err(OperationError::Cancelled),
                outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => {
                    outcome.map_err(|_| OperationError::Timeout { timeout_ms })?
                }
            },
            None => tokio::select! {
                () = cancel.cancelled() => Err(OperationError::Cancelled),
                outcome = call => outcome,
            },
        }
    }

    /// Dispatches a server-streaming call.
    ///
    /// The returned sequence is lazy, possibly infinite, and not
    /// restartable; it ends when the handler completes, faults, or the
    /// cancellation signal fires (the handler's producer is dropped at that
    /// point).
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] on a malformed request,
    /// [`OperationError::NotFound`] when no stream handler is bound, plus
    /// whatever the handler returns while opening the stream.
    pub fn open_stream(
        &self,
        ctx: CallContext,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, OperationError> {
        request
            .validate()
            .map_err(|e| OperationError::InvalidArgument(e.to_string()))?;
        let handler = self.registry.stream_handler(&request.operation_id).ok_or(
            OperationError::NotFound {
                operation_id: request.operation_id.clone(),
            },
        )?;
        metrics::counter!("gatewire_operations_dispatched_total", "kind" => "stream")
            .increment(1);
        tracing::debug!(operation = %request.operation_id, call = %ctx.call_id, "opening stream");

        let items = handler(ctx, request)?;
        Ok(items.take_until(cancel.cancelled_owned()).boxed())
    }

    /// Dispatches a duplex-streaming call.
    ///
    /// The inbound fragment sequence and the returned outbound sequence are
    /// driven independently: the outbound side may emit before any inbound
    /// fragment arrives, and consuming it never requires draining the
    /// inbound side first. One cancellation signal cuts both directions.
    ///
    /// # Errors
    ///
    /// [`OperationError::InvalidArgument`] on a malformed request,
    /// [`OperationError::NotFound`] when no duplex handler is bound, plus
    /// whatever the handler returns while opening the stream.
    pub fn open_duplex(
        &self,
        ctx: CallContext,
        request: InvocationRequest,
        inbound: FragmentStream,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, OperationError> {
        request
            .validate()
            .map_err(|e| OperationError::InvalidArgument(e.to_string()))?;
        let handler = self.registry.duplex_handler(&request.operation_id).ok_or(
            OperationError::NotFound {
                operation_id: request.operation_id.clone(),
            },
        )?;
        metrics::counter!("gatewire_operations_dispatched_total", "kind" => "duplexstream")
            .increment(1);
        tracing::debug!(operation = %request.operation_id, call = %ctx.call_id, "opening duplex stream");

        let inbound = inbound.take_until(cancel.clone().cancelled_owned()).boxed();
        let items = handler(ctx, request, inbound)?;
        Ok(items.take_until(cancel.cancelled_owned()).boxed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
