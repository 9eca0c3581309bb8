//! Typed duplex bridging.
//!
//! Adapts a typed, cancellable bidirectional call onto the dispatcher's
//! envelope-level duplex contract. Two forwarding loops run as independent
//! background tasks: the inbound loop marshals caller items into request
//! fragments, the outbound loop unmarshals response envelopes into typed
//! items. A fault in one direction closes that direction only; the shared
//! cancellation signal stops both.
//!
//! Of each outbound envelope only the *first* result reaches the typed
//! stream; a handler that emits several results per envelope loses the rest.
//! This mirrors the single-typed-output shape of the call and is relied upon
//! by callers, so it is intentional.

use std::sync::Arc;

use futures_util::{pin_mut, Stream, StreamExt};
use gatewire_core::{
    from_wire_value, to_wire_value, InvocationRequest, StreamFragment, WireValue,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::dispatcher::OperationDispatcher;
use crate::context::CallContext;
use crate::error::OperationError;
use crate::spawn::TaskSpawner;

/// Consumer half of a typed duplex call.
pub struct TypedDuplex<Out> {
    outbound: mpsc::UnboundedReceiver<Result<Out, OperationError>>,
}

impl<Out> TypedDuplex<Out> {
    /// Next typed output, or `None` once the outbound direction has closed.
    pub async fn next(&mut self) -> Option<Result<Out, OperationError>> {
        self.outbound.recv().await
    }

    /// The outbound direction as a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Out, OperationError>> + Send
    where
        Out: Send + 'static,
    {
        receiver_stream(self.outbound)
    }
}

/// Wraps a tokio unbounded receiver as a stream.
pub(crate) fn receiver_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<T>,
) -> impl Stream<Item = T> + Send + 'static {
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
}

/// Opens a duplex-stream operation with typed items in both directions.
///
/// `inbound` items are marshalled into single-argument request fragments;
/// the operation's response envelopes come back as typed outputs through
/// [`TypedDuplex`]. The outbound side may emit before `inbound` produces
/// anything, and neither direction waits for the other.
///
/// # Errors
///
/// Fails like [`OperationDispatcher::open_duplex`] (validation, lookup,
/// handler setup). Faults after setup arrive through the returned stream.
pub fn open_typed_duplex<In, Out, St>(
    dispatcher: &OperationDispatcher,
    spawner: &dyn TaskSpawner,
    ctx: CallContext,
    operation_id: Url,
    inbound: St,
    cancel: CancellationToken,
) -> Result<TypedDuplex<Out>, OperationError>
where
    In: Serialize + Send + 'static,
    Out: DeserializeOwned + Default + Send + 'static,
    St: Stream<Item = In> + Send + 'static,
{
    let codecs = dispatcher.codecs();
    let call_id = ctx.call_id;

    let (fragment_tx, fragment_rx) = mpsc::unbounded_channel::<StreamFragment>();
    let fragments = receiver_stream(fragment_rx).boxed();
    let request = InvocationRequest::new(operation_id, Vec::new());
    let responses = dispatcher.open_duplex(ctx, request, fragments, cancel.clone())?;

    // Inbound loop: typed item -> marshalled fragment. Dropping the sender
    // closes the request channel for writing, on completion, fault, or
    // cancellation alike.
    let inbound_codecs = Arc::clone(&codecs);
    let inbound_cancel = cancel.clone();
    spawner.spawn(Box::pin(async move {
        pin_mut!(inbound);
        loop {
            tokio::select! {
                () = inbound_cancel.cancelled() => break,
                item = inbound.next() => {
                    let Some(item) = item else { break };
                    match to_wire_value(&item, &inbound_codecs) {
                        Ok(value) => {
                            if fragment_tx.send(StreamFragment::single(value)).is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(call = %call_id, %error, "duplex inbound marshalling failed; closing request channel");
                            break;
                        }
                    }
                }
            }
        }
    }));

    // Outbound loop: response envelope -> first result -> typed item. A
    // handler fault or unmarshal failure is forwarded once, then the
    // consumer queue closes.
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Result<Out, OperationError>>();
    spawner.spawn(Box::pin(async move {
        pin_mut!(responses);
        while let Some(envelope) = responses.next().await {
            let forwarded = envelope.and_then(|response| {
                let first = response.first_result().cloned().unwrap_or(WireValue::Null);
                from_wire_value::<Out>(&first, &codecs).map_err(OperationError::from)
            });
            let faulted = forwarded.is_err();
            if out_tx.send(forwarded).is_err() || faulted {
                break;
            }
        }
        tracing::debug!(call = %call_id, "duplex outbound loop finished");
    }));

    Ok(TypedDuplex { outbound: out_rx })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use gatewire_core::InvocationResponse;

    use super::super::registry::{OperationRegistry, OperationSpec};
    use super::*;
    use crate::spawn::TokioSpawner;

    fn feature() -> Url {
        Url::parse("https://adapter.example/extensions/pump/").unwrap()
    }

    fn op(name: &str) -> Url {
        Url::parse(&format!(
            "https://adapter.example/extensions/pump/duplexstream/{name}/"
        ))
        .unwrap()
    }

    fn dispatcher_with<F>(bind: F) -> OperationDispatcher
    where
        F: FnOnce(&OperationRegistry),
    {
        let registry = Arc::new(OperationRegistry::new());
        bind(&registry);
        OperationDispatcher::new(registry)
    }

    #[tokio::test]
    async fn round_trips_typed_items() {
        let dispatcher = dispatcher_with(|registry| {
            registry
                .bind_duplex_typed(
                    &feature(),
                    OperationSpec::named("Double"),
                    |_ctx, inbound| Ok(inbound.map(|item| item.map(|n: i64| n * 2))),
                )
                .unwrap();
        });

        let inbound = futures_util::stream::iter(vec![1_i64, 2, 3]);
        let mut call = open_typed_duplex::<i64, i64, _>(
            &dispatcher,
            &TokioSpawner,
            CallContext::client("c1"),
            op("Double"),
            inbound,
            CancellationToken::new(),
        )
        .unwrap();

        let mut outputs = Vec::new();
        while let Some(item) = call.next().await {
            outputs.push(item.unwrap());
        }
        assert_eq!(outputs, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn output_flows_before_any_input() {
        // The handler emits immediately, without reading its inbound side.
        let dispatcher = dispatcher_with(|registry| {
            registry
                .bind_duplex_stream(
                    &feature(),
                    OperationSpec::named("Greeter"),
                    Arc::new(|_ctx, _request, _fragments| {
                        Ok(futures_util::stream::once(async {
                            Ok(InvocationResponse::single(WireValue::String(
                                "ready".to_string(),
                            )))
                        })
                        .boxed())
                    }),
                )
                .unwrap();
        });

        // An input producer that never sends anything.
        let inbound = futures_util::stream::pending::<String>();
        let mut call = open_typed_duplex::<String, String, _>(
            &dispatcher,
            &TokioSpawner,
            CallContext::client("c1"),
            op("Greeter"),
            inbound,
            CancellationToken::new(),
        )
        .unwrap();

        let first = tokio::time::timeout(std::time::Duration::from_secs(1), call.next())
            .await
            .expect("output must not wait for input");
        assert_eq!(first.unwrap().unwrap(), "ready");
    }

    #[tokio::test]
    async fn only_the_first_result_of_an_envelope_is_bridged() {
        let dispatcher = dispatcher_with(|registry| {
            registry
                .bind_duplex_stream(
                    &feature(),
                    OperationSpec::named("Multi"),
                    Arc::new(|_ctx, _request, _fragments| {
                        Ok(futures_util::stream::once(async {
                            Ok(InvocationResponse {
                                results: vec![WireValue::Int(1), WireValue::Int(99)],
                            })
                        })
                        .boxed())
                    }),
                )
                .unwrap();
        });

        let mut call = open_typed_duplex::<i64, i64, _>(
            &dispatcher,
            &TokioSpawner,
            CallContext::system(),
            op("Multi"),
            futures_util::stream::empty::<i64>(),
            CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(call.next().await.unwrap().unwrap(), 1);
        // The second result of the envelope was dropped, not queued.
        assert!(call.next().await.is_none());
    }

    #[tokio::test]
    async fn handler_fault_reaches_the_consumer_after_partial_results() {
        let dispatcher = dispatcher_with(|registry| {
            registry
                .bind_duplex_stream(
                    &feature(),
                    OperationSpec::named("Flaky"),
                    Arc::new(|_ctx, _request, _fragments| {
                        Ok(futures_util::stream::iter(vec![
                            Ok(InvocationResponse::single(WireValue::Int(5))),
                            Err(OperationError::Internal(anyhow::anyhow!("backend gone"))),
                        ])
                        .boxed())
                    }),
                )
                .unwrap();
        });

        let mut call = open_typed_duplex::<i64, i64, _>(
            &dispatcher,
            &TokioSpawner,
            CallContext::system(),
            op("Flaky"),
            futures_util::stream::empty::<i64>(),
            CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(call.next().await.unwrap().unwrap(), 5);
        assert!(call.next().await.unwrap().is_err());
        assert!(call.next().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_both_directions() {
        let dispatcher = dispatcher_with(|registry| {
            registry
                .bind_duplex_typed(
                    &feature(),
                    OperationSpec::named("EchoForever"),
                    |_ctx, inbound| Ok(inbound.map(|item| item.map(|s: String| s))),
                )
                .unwrap();
        });

        let cancel = CancellationToken::new();
        // Input producer that stays open: only cancellation can end the call.
        let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
        let mut call = open_typed_duplex::<String, String, _>(
            &dispatcher,
            &TokioSpawner,
            CallContext::system(),
            op("EchoForever"),
            receiver_stream(input_rx),
            cancel.clone(),
        )
        .unwrap();

        input_tx.send("tick".to_string()).unwrap();
        assert_eq!(call.next().await.unwrap().unwrap(), "tick");

        cancel.cancel();
        // After cancellation the outbound queue drains and closes, even
        // though the input producer is still alive.
        while call.next().await.is_some() {}
        drop(input_tx);
    }
}
