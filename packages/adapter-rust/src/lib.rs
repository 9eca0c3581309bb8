//! `GateWire` Adapter: dynamic operations for data adapters. Registry,
//! dispatch, duplex bridging, and subscription fan-out.

pub mod config;
pub mod context;
pub mod error;
pub mod functions;
pub mod operations;
pub mod spawn;
pub mod subscriptions;

pub use config::ExtensionsConfig;
pub use context::{CallContext, CallerOrigin};
pub use error::OperationError;
pub use functions::{
    AuthorizePredicate, CustomFunctionHandler, CustomFunctionRegistration, CustomFunctionRegistry,
};
pub use operations::{
    open_typed_duplex, ExtensionHost, FeatureDeclaration, OperationDispatcher, OperationRegistry,
    OperationSpec, TypedDuplex,
};
pub use spawn::{BoxTask, TaskSpawner, TokioSpawner};
pub use subscriptions::{Subscription, SubscriptionManager, SubscriptionObserver};
