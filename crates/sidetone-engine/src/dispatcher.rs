//! The command dispatcher.
//!
//! Routes headset button intents to call-control command chains and
//! exposes the same requests programmatically. Every chain invocation is
//! marshaled onto the execution context first; failures are logged and
//! swallowed, so a refused chain never unwinds into the device layer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use sidetone_core::{
    CallRef, CallRoster, CommandChain, CommandParams, WorkQueue,
    telephony::{CommandExecutor, InteractionSource, TokenResolver},
};
use sidetone_hid::{ButtonId, ButtonInput, DeviceControlAdapter};

use crate::exec::ExecutionContext;
use crate::mute::EndpointMuteBridge;

#[derive(Clone)]
pub struct CommandDispatcher {
    exec: Arc<dyn ExecutionContext>,
    commands: Arc<dyn CommandExecutor>,
    interactions: Arc<dyn InteractionSource>,
    resolver: Arc<dyn TokenResolver>,
    roster: Arc<Mutex<CallRoster>>,
    queue: Arc<WorkQueue>,
    mute_bridge: Arc<EndpointMuteBridge>,
    adapter: Arc<DeviceControlAdapter>,
}

impl CommandDispatcher {
    #[allow(clippy::too_many_arguments)] // wired once by the engine
    #[must_use]
    pub fn new(
        exec: Arc<dyn ExecutionContext>,
        commands: Arc<dyn CommandExecutor>,
        interactions: Arc<dyn InteractionSource>,
        resolver: Arc<dyn TokenResolver>,
        roster: Arc<Mutex<CallRoster>>,
        queue: Arc<WorkQueue>,
        mute_bridge: Arc<EndpointMuteBridge>,
        adapter: Arc<DeviceControlAdapter>,
    ) -> Self {
        Self { exec, commands, interactions, resolver, roster, queue, mute_bridge, adapter }
    }

    pub fn request_answer_call(&self, call: &CallRef) {
        self.trigger_chain(CommandChain::AnswerCall, call);
    }

    pub fn request_release_call(&self, call: &CallRef) {
        self.trigger_chain(CommandChain::ReleaseCall, call);
    }

    pub fn request_hold_call(&self, call: &CallRef) {
        self.trigger_chain(CommandChain::HoldCall, call);
    }

    pub fn request_retrieve_call(&self, call: &CallRef) {
        self.trigger_chain(CommandChain::RetrieveCall, call);
    }

    /// Place a new outbound call.
    pub fn request_make_call(&self, destination: &str, location: Option<&str>) {
        info!(destination, "Requesting make call");
        let commands = Arc::clone(&self.commands);
        let params = CommandParams::for_make_call(destination, location);
        self.exec.run_sync(Box::new(move || {
            if let Err(e) = commands.execute(CommandChain::MakeCall, params) {
                error!(error = %e, "Make call failed");
            }
        }));
    }

    pub fn request_answer_call_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_answer_call(&call);
        }
    }

    pub fn request_release_call_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_release_call(&call);
        }
    }

    pub fn request_hold_call_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_hold_call(&call);
        }
    }

    pub fn request_retrieve_call_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_retrieve_call(&call);
        }
    }

    /// Mute the call's software endpoint, from the execution context.
    pub fn request_mute_call_via_endpoint(&self, call: &CallRef) {
        let bridge = Arc::clone(&self.mute_bridge);
        let call = call.clone();
        self.exec.run_sync(Box::new(move || bridge.request_mute(&call)));
    }

    pub fn request_unmute_call_via_endpoint(&self, call: &CallRef) {
        let bridge = Arc::clone(&self.mute_bridge);
        let call = call.clone();
        self.exec.run_sync(Box::new(move || bridge.request_unmute(&call)));
    }

    pub fn request_mute_call_via_endpoint_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_mute_call_via_endpoint(&call);
        }
    }

    pub fn request_unmute_call_via_endpoint_by_token(&self, token: &str) {
        if let Some(call) = self.find_voice_interaction(token) {
            self.request_unmute_call_via_endpoint(&call);
        }
    }

    /// Route one headset button intent. Invoked on the device pump thread;
    /// anything that mutates state is deferred to the work queue.
    pub fn handle_button(&self, input: &ButtonInput) {
        debug!(device = %input.device, button = ?input.button, value = ?input.value, "Button");
        match input.button {
            ButtonId::MicMute => self.on_mic_mute(),
            ButtonId::Flash => self.on_flash(),
            ButtonId::RejectCall => self.on_reject(input.value),
            ButtonId::HookSwitch => self.on_hook_switch(input.value),
        }
    }

    /// Toggle: the software-side mute flag picks the direction.
    fn on_mic_mute(&self) {
        let dispatcher = self.clone();
        self.queue.enqueue(move || {
            let active = dispatcher.roster.lock().active().cloned();
            let Some(call) = active else {
                debug!("Mute button with no active call");
                return;
            };
            if dispatcher.adapter.is_call_muted() {
                dispatcher.request_unmute_call_via_endpoint(&call);
            } else {
                dispatcher.request_mute_call_via_endpoint(&call);
            }
        });
    }

    /// Flash: park the active call, or bring back the oldest held one.
    fn on_flash(&self) {
        let (active, oldest_held) = {
            let roster = self.roster.lock();
            (roster.active().cloned(), roster.held().first().cloned())
        };
        if let Some(call) = active {
            let dispatcher = self.clone();
            self.queue.enqueue(move || dispatcher.request_hold_call(&call));
        } else if let Some(call) = oldest_held {
            let dispatcher = self.clone();
            self.queue.enqueue(move || dispatcher.request_retrieve_call(&call));
        } else {
            debug!("Flash with no tracked call");
        }
    }

    /// Reject acts on the press only; releases carry no value either way.
    fn on_reject(&self, value: Option<bool>) {
        if value != Some(true) {
            return;
        }
        let dispatcher = self.clone();
        self.queue.enqueue(move || {
            let incoming = dispatcher.roster.lock().incoming().cloned();
            if let Some(call) = incoming {
                dispatcher.request_release_call(&call);
            } else {
                debug!("Reject with no incoming call");
            }
        });
    }

    /// Off-hook answers a ringing call; on-hook releases the active one.
    fn on_hook_switch(&self, value: Option<bool>) {
        let dispatcher = self.clone();
        self.queue.enqueue(move || {
            let (incoming, active) = {
                let roster = dispatcher.roster.lock();
                (roster.incoming().cloned(), roster.active().cloned())
            };
            match value {
                Some(true) => {
                    if let Some(call) = incoming {
                        dispatcher.request_answer_call(&call);
                    }
                }
                Some(false) => {
                    if let Some(call) = active {
                        dispatcher.request_release_call(&call);
                    }
                }
                None => {}
            }
        });
    }

    fn trigger_chain(&self, chain: CommandChain, call: &CallRef) {
        info!(chain = chain.chain_name(), call = %call.id, "Triggering command chain");
        let commands = Arc::clone(&self.commands);
        let params = CommandParams::for_call(call.id.clone());
        self.exec.run_sync(Box::new(move || {
            if let Err(e) = commands.execute(chain, params) {
                error!(chain = chain.chain_name(), error = %e, "Command chain failed");
            }
        }));
    }

    fn find_voice_interaction(&self, token: &str) -> Option<CallRef> {
        let live = self.interactions.interactions();
        let resolved = self.resolver.resolve(token, &live);
        if resolved.is_none() {
            debug!(token, "No live voice interaction for token");
        }
        resolved
    }
}
