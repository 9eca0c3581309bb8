//! Dynamic operations: registry, typed binding, dispatch, duplex bridging.

pub mod binding;
pub mod bridge;
pub mod dispatcher;
pub mod host;
pub mod registry;

pub use binding::FromCallArgs;
pub use bridge::{open_typed_duplex, TypedDuplex};
pub use dispatcher::OperationDispatcher;
pub use host::{ExtensionHost, FeatureDeclaration};
pub use registry::{
    DuplexHandler, FragmentStream, InvokeHandler, OperationRegistry, OperationSpec,
    ResponseStream, StreamHandler,
};
