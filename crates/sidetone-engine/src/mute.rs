//! The SIP mute bridge.
//!
//! Keeps the software endpoint's microphone mute flag and the headset
//! mute indicator in agreement, both ways. On the way in, each tracked
//! call's endpoint gets at most one mute-changed subscription whose
//! handler enqueues a device-side mute write. On the way out, a mute
//! request originating from the headset button is written to the
//! endpoint, whose change notification then loops back through the
//! subscription and settles the device indicator.
//!
//! Everything here is gated on the software-endpoint option: agents on a
//! third-party phone have no endpoint the engine could mute, and the
//! bridge stays inert.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use sidetone_core::{CallRef, EndpointId, OptionsHandle, SubscriptionId, WorkQueue};
use sidetone_core::telephony::EndpointDirectory;
use sidetone_hid::DeviceControlAdapter;

pub struct EndpointMuteBridge {
    directory: Arc<dyn EndpointDirectory>,
    adapter: Arc<DeviceControlAdapter>,
    queue: Arc<WorkQueue>,
    options: Arc<OptionsHandle>,
    /// At most one live subscription per endpoint.
    subscriptions: Mutex<HashMap<EndpointId, SubscriptionId>>,
}

impl EndpointMuteBridge {
    #[must_use]
    pub fn new(
        directory: Arc<dyn EndpointDirectory>,
        adapter: Arc<DeviceControlAdapter>,
        queue: Arc<WorkQueue>,
        options: Arc<OptionsHandle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            directory,
            adapter,
            queue,
            options,
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to the call's endpoint mute changes, once per endpoint.
    pub fn attach(&self, call: &CallRef) {
        if !self.options.use_software_endpoint() {
            return;
        }
        let Some(endpoint) = self.directory.find_endpoint(call) else {
            debug!(call = %call.id, "No software endpoint for call");
            return;
        };

        let endpoint_id = endpoint.endpoint_id();
        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(&endpoint_id) {
            return;
        }

        let adapter = Arc::clone(&self.adapter);
        let queue = Arc::clone(&self.queue);
        let id = endpoint.subscribe_mute_changed(Arc::new(move |muted| {
            let adapter = Arc::clone(&adapter);
            queue.enqueue(move || adapter.set_microphone_muted(muted));
        }));
        info!(endpoint = %endpoint_id.0, "Subscribed to endpoint mute changes");
        subscriptions.insert(endpoint_id, id);
    }

    /// Drop the subscription for the call's endpoint. Idempotent: a call
    /// whose endpoint was never subscribed is a no-op.
    pub fn detach(&self, call: &CallRef) {
        let Some(endpoint) = self.directory.find_endpoint(call) else {
            return;
        };
        let endpoint_id = endpoint.endpoint_id();
        if let Some(id) = self.subscriptions.lock().remove(&endpoint_id) {
            endpoint.unsubscribe_mute_changed(id);
            info!(endpoint = %endpoint_id.0, "Unsubscribed from endpoint mute changes");
        }
    }

    /// Ask the call's endpoint to mute itself. The device indicator is
    /// settled by the resulting change notification, not here.
    pub fn request_mute(&self, call: &CallRef) {
        self.write_mute(call, true);
    }

    /// Ask the call's endpoint to unmute itself.
    pub fn request_unmute(&self, call: &CallRef) {
        self.write_mute(call, false);
    }

    fn write_mute(&self, call: &CallRef, muted: bool) {
        if !self.options.use_software_endpoint() {
            return;
        }
        let Some(endpoint) = self.directory.find_endpoint(call) else {
            debug!(call = %call.id, "No software endpoint for call, mute request dropped");
            return;
        };
        info!(call = %call.id, muted, "Requesting endpoint mute change");
        if let Err(e) = endpoint.set_microphone_muted(muted) {
            warn!(call = %call.id, error = %e, "Endpoint rejected mute change");
        }
    }
}
