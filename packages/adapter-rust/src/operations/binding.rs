//! Typed binding helpers.
//!
//! The raw handler shapes in [`registry`](super::registry) exchange wire
//! envelopes. The helpers here let features register plain async functions
//! over typed arguments instead: positional arguments are extracted from the
//! request envelope through the marshalling layer, and a typed return value
//! is wrapped into a single-result response envelope. Handlers that need to
//! emit several results per envelope bind the raw handler shape directly and
//! their envelopes pass through unchanged.
//!
//! Argument extraction is tuple-based, one trait impl per arity up to eight,
//! generated by a macro rather than a ladder of public overloads.

use std::future::Future;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use gatewire_core::{
    from_wire_value, to_wire_value, CodecSet, InvocationResponse, MarshalError, WireValue,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::registry::{
    DuplexHandler, InvokeHandler, OperationRegistry, OperationSpec, StreamHandler,
};
use crate::context::CallContext;
use crate::error::OperationError;

/// Positional argument extraction from a request envelope.
pub trait FromCallArgs: Sized {
    /// Extracts `Self` from the argument list.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshalError`] when an argument is present but does not
    /// convert to the expected type. Absent arguments (index past the end of
    /// the list) extract as the type's default value, not an error.
    fn from_args(args: &[WireValue], codecs: &CodecSet) -> Result<Self, MarshalError>;
}

fn extract<T: DeserializeOwned + Default>(
    args: &[WireValue],
    index: usize,
    codecs: &CodecSet,
) -> Result<T, MarshalError> {
    match args.get(index) {
        Some(value) => from_wire_value(value, codecs),
        None => Ok(T::default()),
    }
}

impl FromCallArgs for () {
    fn from_args(_args: &[WireValue], _codecs: &CodecSet) -> Result<Self, MarshalError> {
        Ok(())
    }
}

macro_rules! impl_from_call_args {
    ($($index:tt => $ty:ident),+) => {
        impl<$($ty),+> FromCallArgs for ($($ty,)+)
        where
            $($ty: DeserializeOwned + Default,)+
        {
            fn from_args(args: &[WireValue], codecs: &CodecSet) -> Result<Self, MarshalError> {
                Ok(($(extract::<$ty>(args, $index, codecs)?,)+))
            }
        }
    };
}

impl_from_call_args!(0 => A0);
impl_from_call_args!(0 => A0, 1 => A1);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2, 3 => A3);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2, 3 => A3, 4 => A4);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2, 3 => A3, 4 => A4, 5 => A5);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2, 3 => A3, 4 => A4, 5 => A5, 6 => A6);
impl_from_call_args!(0 => A0, 1 => A1, 2 => A2, 3 => A3, 4 => A4, 5 => A5, 6 => A6, 7 => A7);

impl OperationRegistry {
    /// Binds a unary operation over typed arguments and a typed result.
    ///
    /// The result is marshalled into a single-result response envelope.
    ///
    /// # Errors
    ///
    /// Same contract as [`OperationRegistry::bind_invoke`].
    pub fn bind_invoke_typed<Args, R, F, Fut>(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: F,
    ) -> Result<bool, OperationError>
    where
        Args: FromCallArgs + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(CallContext, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, OperationError>> + Send + 'static,
    {
        let codecs = self.codecs();
        let handler = Arc::new(handler);
        let raw: InvokeHandler = Arc::new(move |ctx, request| {
            let codecs = Arc::clone(&codecs);
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let args = Args::from_args(&request.arguments, &codecs)?;
                let result = handler(ctx, args).await?;
                let wire = to_wire_value(&result, &codecs)?;
                Ok(InvocationResponse::single(wire))
            })
        });
        self.bind_invoke(feature, spec, raw)
    }

    /// Binds a server-streaming operation over typed arguments and a typed
    /// item stream. Each item is marshalled into its own single-result
    /// response envelope.
    ///
    /// # Errors
    ///
    /// Same contract as [`OperationRegistry::bind_stream`].
    pub fn bind_stream_typed<Args, R, St, F>(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: F,
    ) -> Result<bool, OperationError>
    where
        Args: FromCallArgs + Send + 'static,
        R: Serialize + Send + 'static,
        St: Stream<Item = Result<R, OperationError>> + Send + 'static,
        F: Fn(CallContext, Args) -> Result<St, OperationError> + Send + Sync + 'static,
    {
        let codecs = self.codecs();
        let raw: StreamHandler = Arc::new(move |ctx, request| {
            let args = Args::from_args(&request.arguments, &codecs)?;
            let items = handler(ctx, args)?;
            let codecs = Arc::clone(&codecs);
            Ok(items
                .map(move |item| {
                    let value = item?;
                    let wire = to_wire_value(&value, &codecs)?;
                    Ok(InvocationResponse::single(wire))
                })
                .boxed())
        });
        self.bind_stream(feature, spec, raw)
    }

    /// Binds a duplex-streaming operation over typed item streams in both
    /// directions. Each inbound fragment contributes its first argument,
    /// absent arguments extract as the default value; each outbound item
    /// becomes a single-result envelope.
    ///
    /// # Errors
    ///
    /// Same contract as [`OperationRegistry::bind_duplex_stream`].
    pub fn bind_duplex_typed<In, Out, St, F>(
        &self,
        feature: &Url,
        spec: OperationSpec,
        handler: F,
    ) -> Result<bool, OperationError>
    where
        In: DeserializeOwned + Default + Send + 'static,
        Out: Serialize + Send + 'static,
        St: Stream<Item = Result<Out, OperationError>> + Send + 'static,
        F: Fn(
                CallContext,
                futures_util::stream::BoxStream<'static, Result<In, OperationError>>,
            ) -> Result<St, OperationError>
            + Send
            + Sync
            + 'static,
    {
        let codecs = self.codecs();
        let raw: DuplexHandler = Arc::new(move |ctx, _request, fragments| {
            let in_codecs = Arc::clone(&codecs);
            let typed_in = fragments
                .map(move |fragment| {
                    let first = fragment
                        .arguments
                        .into_iter()
                        .next()
                        .unwrap_or(WireValue::Null);
                    from_wire_value::<In>(&first, &in_codecs).map_err(OperationError::from)
                })
                .boxed();
            let items = handler(ctx, typed_in)?;
            let out_codecs = Arc::clone(&codecs);
            Ok(items
                .map(move |item| {
                    let value = item?;
                    let wire = to_wire_value(&value, &out_codecs)?;
                    Ok(InvocationResponse::single(wire))
                })
                .boxed())
        });
        self.bind_duplex_stream(feature, spec, raw)
    }
}

#[cfg(test)]
mod tests {
    use gatewire_core::{InvocationRequest, ParameterDescription};

    use super::*;

    fn feature() -> Url {
        Url::parse("https://adapter.example/extensions/math/").unwrap()
    }

    fn codecs() -> CodecSet {
        CodecSet::default()
    }

    #[test]
    fn tuple_extraction_reads_positionally() {
        let set = codecs();
        let args = vec![
            WireValue::Int(2),
            WireValue::String("x".to_string()),
            WireValue::Bool(true),
        ];
        let (a, b, c): (i64, String, bool) = FromCallArgs::from_args(&args, &set).unwrap();
        assert_eq!((a, b.as_str(), c), (2, "x", true));
    }

    #[test]
    fn missing_arguments_extract_as_defaults() {
        let set = codecs();
        let args = vec![WireValue::Int(5)];
        let (a, b, c): (i64, String, Option<bool>) =
            FromCallArgs::from_args(&args, &set).unwrap();
        assert_eq!(a, 5);
        assert_eq!(b, "");
        assert_eq!(c, None);
    }

    #[test]
    fn null_arguments_extract_as_defaults() {
        let set = codecs();
        let args = vec![WireValue::Null];
        let (a,): (i64,) = FromCallArgs::from_args(&args, &set).unwrap();
        assert_eq!(a, 0);
    }

    #[test]
    fn mistyped_argument_is_an_error() {
        let set = codecs();
        let args = vec![WireValue::String("not a number".to_string())];
        let result: Result<(bool,), _> = FromCallArgs::from_args(&args, &set);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn typed_invoke_binding_wraps_a_single_result() {
        let registry = OperationRegistry::new();
        let bound = registry
            .bind_invoke_typed(
                &feature(),
                OperationSpec::named("Add")
                    .with_inputs(vec![
                        ParameterDescription::new("a"),
                        ParameterDescription::new("b"),
                    ]),
                |_ctx, (a, b): (i64, i64)| async move { Ok(a + b) },
            )
            .unwrap();
        assert!(bound);

        let id = Url::parse("https://adapter.example/extensions/math/invoke/Add/").unwrap();
        let handler = registry.invoke_handler(&id).unwrap();
        let request =
            InvocationRequest::new(id, vec![WireValue::Int(2), WireValue::Int(40)]);
        let response = handler(CallContext::system(), request).await.unwrap();
        assert_eq!(response.results, vec![WireValue::Int(42)]);
    }

    #[tokio::test]
    async fn typed_stream_binding_wraps_each_item() {
        let registry = OperationRegistry::new();
        registry
            .bind_stream_typed(
                &feature(),
                OperationSpec::named("CountTo"),
                |_ctx, (limit,): (i64,)| {
                    Ok(futures_util::stream::iter((1..=limit).map(Ok)))
                },
            )
            .unwrap();

        let id = Url::parse("https://adapter.example/extensions/math/stream/CountTo/").unwrap();
        let handler = registry.stream_handler(&id).unwrap();
        let request = InvocationRequest::new(id, vec![WireValue::Int(3)]);
        let stream = handler(CallContext::system(), request).unwrap();
        let envelopes: Vec<_> = stream.collect().await;
        let results: Vec<WireValue> = envelopes
            .into_iter()
            .map(|e| e.unwrap().results.remove(0))
            .collect();
        assert_eq!(
            results,
            vec![WireValue::Int(1), WireValue::Int(2), WireValue::Int(3)]
        );
    }
}
