//! The call state tracker.
//!
//! Consumes the lifecycle event stream, keeps the [`CallRoster`] current,
//! and drives the headset indicators through the control adapter. The
//! handler itself only filters and enqueues; all roster mutation and
//! device work runs on the work queue, in event arrival order.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use sidetone_core::{
    CallRoster, CallState, EventKind, LifecycleEvent, LifecycleHandler, WorkQueue,
};
use sidetone_hid::DeviceControlAdapter;

use crate::mute::EndpointMuteBridge;

pub struct CallStateTracker {
    roster: Arc<Mutex<CallRoster>>,
    adapter: Arc<DeviceControlAdapter>,
    queue: Arc<WorkQueue>,
    mute_bridge: Arc<EndpointMuteBridge>,
}

impl CallStateTracker {
    #[must_use]
    pub fn new(
        roster: Arc<Mutex<CallRoster>>,
        adapter: Arc<DeviceControlAdapter>,
        queue: Arc<WorkQueue>,
        mute_bridge: Arc<EndpointMuteBridge>,
    ) -> Arc<Self> {
        Arc::new(Self { roster, adapter, queue, mute_bridge })
    }

    /// The handler to register with the interaction source. Filters out
    /// non-voice media on the delivery thread, then defers to the queue.
    #[must_use]
    pub fn handler(self: &Arc<Self>) -> LifecycleHandler {
        let tracker = Arc::clone(self);
        Arc::new(move |event| {
            if !event.call.media.is_sip_voice() {
                trace!(call = %event.call.id, "Ignoring non-voice interaction");
                return;
            }
            let worker = Arc::clone(&tracker);
            tracker.queue.enqueue(move || worker.process(event));
        })
    }

    /// The shared roster; the dispatcher reads it for button routing.
    #[must_use]
    pub fn roster(&self) -> Arc<Mutex<CallRoster>> {
        Arc::clone(&self.roster)
    }

    #[must_use]
    pub fn roster_snapshot(&self) -> CallRoster {
        self.roster.lock().clone()
    }

    /// Apply one lifecycle event. Runs on the work queue only.
    fn process(&self, event: LifecycleEvent) {
        let call = event.call;
        if event.state.is_terminal() {
            info!(call = %call.id, state = ?event.state, "Call ended");
            self.mute_bridge.detach(&call);
            let removal = self.roster.lock().remove(&call);
            if !removal.was_present() {
                // Terminal events can arrive twice for the same interaction.
                debug!(call = %call.id, "Ended call was not tracked");
            }
            self.adapter.set_ringer(false, None);
            if removal.was_active {
                self.adapter.set_hook_state(false);
            }
            if removal.was_held && removal.held_now_empty {
                self.adapter.set_call_on_hold(false);
            }
            return;
        }

        match (event.state, event.kind) {
            (CallState::PresentedIn, EventKind::Ringing) => {
                info!(call = %call.id, "Incoming call ringing");
                self.mute_bridge.attach(&call);
                self.adapter.set_ringer(true, call.phone_number.as_deref());
                self.roster.lock().set_incoming(call);
            }
            (CallState::PresentedOut, EventKind::Dialing) => {
                info!(call = %call.id, "Outbound call dialing");
                self.mute_bridge.attach(&call);
            }
            (CallState::Connected, EventKind::Established) => {
                info!(call = %call.id, "Call established");
                self.adapter.set_ringer(false, None);
                self.adapter.set_hook_state(true);
                self.roster.lock().connect(call);
                // A new conversation always starts unmuted.
                self.adapter.set_microphone_muted(false);
            }
            (CallState::Connected, EventKind::Retrieved) => {
                info!(call = %call.id, "Call retrieved from hold");
                self.adapter.set_hook_state(true);
                let retrieval = self.roster.lock().retrieve(call);
                if retrieval.held_now_empty {
                    self.adapter.set_call_on_hold(false);
                }
                self.adapter.set_microphone_muted(false);
            }
            (CallState::Held, EventKind::Held) => {
                info!(call = %call.id, "Call parked on hold");
                self.adapter.set_call_on_hold(true);
                self.adapter.set_hook_state(false);
                self.roster.lock().hold(call);
            }
            (state, kind) => {
                trace!(call = %call.id, ?state, ?kind, "Lifecycle event with no device effect");
            }
        }
    }
}
