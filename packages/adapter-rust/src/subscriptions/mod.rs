//! Subscription fan-out: broadcast of produced events to many consumers.

pub mod manager;

pub use manager::{NoopObserver, Subscription, SubscriptionManager, SubscriptionObserver};
