//! Sidetone Engine - bidirectional headset/call-control synchronization.
//!
//! Hardware button events and call-lifecycle events arrive concurrently
//! from independent threads; this crate serializes them into one
//! consistent view of what the headset shows and what the call is doing,
//! and marshals outbound call-control commands onto their designated
//! execution context.

pub mod dispatcher;
pub mod engine;
pub mod exec;
pub mod module;
pub mod mute;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testutil;

pub use dispatcher::CommandDispatcher;
pub use engine::{Collaborators, Engine, EngineSnapshot};
pub use exec::{CommandThread, ExecutionContext, Job};
pub use module::SidetoneModule;
pub use mute::EndpointMuteBridge;
pub use tracker::CallStateTracker;
