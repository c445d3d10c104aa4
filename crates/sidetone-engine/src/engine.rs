//! Engine wiring.
//!
//! [`Engine::new`] assembles the whole pipeline from the host-provided
//! collaborators: work queue, device registry, control adapter, mute
//! bridge, call state tracker, and command dispatcher. [`Engine::start`]
//! connects the device event stream; lifecycle event handling is gated
//! separately on register/unregister so the host can tie it to agent
//! login.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use sidetone_core::{
    CallRoster, OptionsHandle, SubscriptionId, WorkQueue,
    telephony::{
        CommandExecutor, EndpointDirectory, FirstSipVoiceMatch, InteractionSource, TokenResolver,
    },
};
use sidetone_hid::{DeviceControlAdapter, DeviceEvent, DeviceRegistry};
use tokio::sync::mpsc;

use crate::dispatcher::CommandDispatcher;
use crate::exec::ExecutionContext;
use crate::mute::EndpointMuteBridge;
use crate::tracker::CallStateTracker;

/// The host-provided seams the engine is built around.
pub struct Collaborators {
    pub commands: Arc<dyn CommandExecutor>,
    pub interactions: Arc<dyn InteractionSource>,
    pub endpoints: Arc<dyn EndpointDirectory>,
    pub exec: Arc<dyn ExecutionContext>,
    /// Token-to-interaction strategy; defaults to the first live voice
    /// interaction when the host does not inject one.
    pub resolver: Option<Arc<dyn TokenResolver>>,
}

/// Serializable view of the engine's current state.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub roster: CallRoster,
    pub devices: Vec<String>,
    pub call_muted: bool,
}

pub struct Engine {
    queue: Arc<WorkQueue>,
    registry: Arc<DeviceRegistry>,
    adapter: Arc<DeviceControlAdapter>,
    tracker: Arc<CallStateTracker>,
    dispatcher: CommandDispatcher,
    interactions: Arc<dyn InteractionSource>,
    lifecycle_sub: Mutex<Option<SubscriptionId>>,
}

impl Engine {
    #[must_use]
    pub fn new(options: Arc<OptionsHandle>, collaborators: Collaborators) -> Arc<Self> {
        let queue = WorkQueue::spawn("sidetone-work");
        let registry = DeviceRegistry::new();
        let adapter = DeviceControlAdapter::new(Arc::clone(&registry));
        let roster = Arc::new(Mutex::new(CallRoster::new()));

        let mute_bridge = EndpointMuteBridge::new(
            collaborators.endpoints,
            Arc::clone(&adapter),
            Arc::clone(&queue),
            options,
        );
        let tracker = CallStateTracker::new(
            Arc::clone(&roster),
            Arc::clone(&adapter),
            Arc::clone(&queue),
            Arc::clone(&mute_bridge),
        );
        let resolver =
            collaborators.resolver.unwrap_or_else(|| Arc::new(FirstSipVoiceMatch));
        let dispatcher = CommandDispatcher::new(
            collaborators.exec,
            collaborators.commands,
            Arc::clone(&collaborators.interactions),
            resolver,
            roster,
            Arc::clone(&queue),
            mute_bridge,
            Arc::clone(&adapter),
        );

        Arc::new(Self {
            queue,
            registry,
            adapter,
            tracker,
            dispatcher,
            interactions: collaborators.interactions,
            lifecycle_sub: Mutex::new(None),
        })
    }

    /// Connect the device event stream and start routing button intents.
    pub fn start(&self, events: mpsc::UnboundedReceiver<DeviceEvent>) {
        info!("Starting device pipeline");
        let dispatcher = self.dispatcher.clone();
        self.registry.start(
            events,
            Arc::clone(&self.queue),
            Arc::clone(&self.adapter),
            Arc::new(move |input| dispatcher.handle_button(&input)),
        );
    }

    /// Subscribe the tracker to the lifecycle event stream. Idempotent.
    pub fn register_interaction_event_handler(&self) {
        let mut sub = self.lifecycle_sub.lock();
        if sub.is_some() {
            debug!("Lifecycle handler already registered");
            return;
        }
        info!("Registering lifecycle event handler");
        *sub = Some(self.interactions.subscribe(self.tracker.handler()));
    }

    /// Drop the lifecycle subscription; a no-op when never registered.
    pub fn unregister_interaction_event_handler(&self) {
        if let Some(id) = self.lifecycle_sub.lock().take() {
            info!("Unregistering lifecycle event handler");
            self.interactions.unsubscribe(id);
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            roster: self.tracker.roster_snapshot(),
            devices: self.registry.ids(),
            call_muted: self.adapter.is_call_muted(),
        }
    }
}
