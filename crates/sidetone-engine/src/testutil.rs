//! Shared fakes for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use sidetone_core::telephony::{
    EndpointDirectory, EndpointId, InteractionSource, LifecycleHandler, MuteHandler, SipEndpoint,
    SubscriptionId,
};
use sidetone_core::{CallId, CallRef, LifecycleEvent, MediaKind, WorkQueue};
use sidetone_hid::{HidResult, Indicators, TelephonyDevice};

pub(crate) fn voice(id: &str) -> CallRef {
    CallRef::new(id, MediaKind::SipVoice)
}

/// Enqueue a barrier item and wait for the consumer to reach it.
pub(crate) fn flush(queue: &WorkQueue) {
    let (tx, rx) = std::sync::mpsc::channel();
    queue.enqueue(move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).expect("queue did not drain");
}

/// In-memory device recording every hardware call in order.
pub(crate) struct RecordingDevice {
    id: String,
    indicators: Mutex<Indicators>,
    locked: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl RecordingDevice {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            indicators: Mutex::new(Indicators::default()),
            locked: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn log_of(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, call: String) {
        self.log.lock().push(call);
    }
}

impl TelephonyDevice for RecordingDevice {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
    fn lock(&self) -> HidResult<()> {
        self.record("lock".to_string());
        self.locked.store(true, Ordering::Release);
        Ok(())
    }
    fn unlock(&self) -> HidResult<()> {
        self.record("unlock".to_string());
        self.locked.store(false, Ordering::Release);
        Ok(())
    }
    fn is_off_hook(&self) -> bool {
        self.indicators.lock().off_hook
    }
    fn set_hook_state(&self, off_hook: bool) -> HidResult<()> {
        self.record(format!("hook:{off_hook}"));
        self.indicators.lock().off_hook = off_hook;
        Ok(())
    }
    fn is_ringing(&self) -> bool {
        self.indicators.lock().ringing
    }
    fn set_ringer(&self, ringing: bool, caller_id: Option<&str>) -> HidResult<()> {
        self.record(format!("ring:{ringing}:{}", caller_id.unwrap_or("-")));
        self.indicators.lock().ringing = ringing;
        Ok(())
    }
    fn is_on_hold(&self) -> bool {
        self.indicators.lock().on_hold
    }
    fn set_call_on_hold(&self, on_hold: bool) -> HidResult<()> {
        self.record(format!("hold:{on_hold}"));
        self.indicators.lock().on_hold = on_hold;
        Ok(())
    }
    fn is_microphone_muted(&self) -> bool {
        self.indicators.lock().microphone_muted
    }
    fn set_microphone_muted(&self, muted: bool) -> HidResult<()> {
        self.record(format!("mute:{muted}"));
        self.indicators.lock().microphone_muted = muted;
        Ok(())
    }
}

/// Software endpoint that records mute writes without self-notifying;
/// tests fire the change notification explicitly.
pub(crate) struct FakeEndpoint {
    id: EndpointId,
    muted: AtomicBool,
    writes: Mutex<Vec<bool>>,
    next_id: AtomicU64,
    handlers: Mutex<HashMap<u64, MuteHandler>>,
}

impl FakeEndpoint {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: EndpointId(id.to_string()),
            muted: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            handlers: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn writes(&self) -> Vec<bool> {
        self.writes.lock().clone()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Deliver a mute-changed notification to every subscriber.
    pub(crate) fn fire(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
        let handlers: Vec<MuteHandler> = self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(muted);
        }
    }
}

impl SipEndpoint for FakeEndpoint {
    fn endpoint_id(&self) -> EndpointId {
        self.id.clone()
    }
    fn is_microphone_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
    fn set_microphone_muted(&self, muted: bool) -> sidetone_core::Result<()> {
        self.writes.lock().push(muted);
        self.muted.store(muted, Ordering::Release);
        Ok(())
    }
    fn subscribe_mute_changed(&self, handler: MuteHandler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        self.handlers.lock().insert(id, handler);
        SubscriptionId(id)
    }
    fn unsubscribe_mute_changed(&self, id: SubscriptionId) {
        self.handlers.lock().remove(&id.0);
    }
}

/// Static call-to-endpoint mapping.
pub(crate) struct FakeDirectory {
    endpoints: HashMap<CallId, Arc<FakeEndpoint>>,
}

impl FakeDirectory {
    pub(crate) fn new(endpoints: &[(&str, &Arc<FakeEndpoint>)]) -> Arc<Self> {
        Arc::new(Self {
            endpoints: endpoints
                .iter()
                .map(|(call, endpoint)| (CallId::new(*call), Arc::clone(endpoint)))
                .collect(),
        })
    }
}

impl EndpointDirectory for FakeDirectory {
    fn find_endpoint(&self, call: &CallRef) -> Option<Arc<dyn SipEndpoint>> {
        self.endpoints.get(&call.id).map(|e| Arc::clone(e) as _)
    }
}

/// Interaction source with a fixed live set and manual event delivery.
pub(crate) struct FakeInteractions {
    live: Mutex<Vec<CallRef>>,
    next_id: AtomicU64,
    handlers: Mutex<HashMap<u64, LifecycleHandler>>,
}

impl FakeInteractions {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_live(Vec::new())
    }

    pub(crate) fn with_live(live: Vec<CallRef>) -> Arc<Self> {
        Arc::new(Self {
            live: Mutex::new(live),
            next_id: AtomicU64::new(0),
            handlers: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Deliver a lifecycle event to every subscriber.
    pub(crate) fn deliver(&self, event: &LifecycleEvent) {
        let handlers: Vec<LifecycleHandler> = self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(event.clone());
        }
    }
}

impl InteractionSource for FakeInteractions {
    fn interactions(&self) -> Vec<CallRef> {
        self.live.lock().clone()
    }
    fn subscribe(&self, handler: LifecycleHandler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        self.handlers.lock().insert(id, handler);
        SubscriptionId(id)
    }
    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.lock().remove(&id.0);
    }
}
