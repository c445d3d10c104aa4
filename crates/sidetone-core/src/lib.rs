//! Sidetone Core - call model, roster, and collaborator seams.
//!
//! This crate contains the domain types shared by the device layer and the
//! synchronization engine: call references and lifecycle events, the call
//! roster, command-chain descriptors, the traits behind which the host's
//! telephony subsystems sit, module options, and the serialized work queue.

pub mod call;
pub mod command;
pub mod error;
pub mod options;
pub mod queue;
pub mod roster;
pub mod telephony;

pub use call::{CallId, CallRef, CallState, EventKind, LifecycleEvent, MediaKind};
pub use command::{CommandChain, CommandParams, MakeCallType};
pub use error::{Error, Result};
pub use options::{Options, OptionsHandle};
pub use queue::WorkQueue;
pub use roster::{CallRoster, Removal};
pub use telephony::{
    CommandExecutor, EndpointDirectory, EndpointId, FirstSipVoiceMatch, InteractionSource,
    LifecycleHandler, MuteHandler, SipEndpoint, SubscriptionId, TokenResolver,
};
