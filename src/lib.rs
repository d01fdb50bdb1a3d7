//! Ownership-tracking handles for a heap-allocated resource.
//!
//! - [`Exclusive`]: one owner, transferable, never copied.
//! - [`Shared`]: reference-counted co-ownership; the last release destroys
//!   the value.
//! - [`Weak`]: observes a `Shared` value without keeping it alive.
//! - [`SyncShared`] / [`SyncWeak`]: the same policy with atomic counts.
//!
//! Lifecycle events of the demo [`Resource`] go to an injectable
//! [`LifecycleSink`].

pub mod config;
pub mod demo;
pub mod error;
pub mod exclusive;
pub mod resource;
pub mod shared;
pub mod sink;
pub mod sync;

pub use config::DemoConfig;
pub use error::{ConfigError, HandleError, HandleKind};
pub use exclusive::Exclusive;
pub use resource::Resource;
pub use shared::{Shared, Weak};
pub use sink::{LifecycleSink, RecordingSink, StdoutSink};
pub use sync::{SyncShared, SyncWeak};
