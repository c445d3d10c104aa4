//! The call roster: incoming, active, and held calls.
//!
//! Process-wide state for single-line telephony: at most one incoming and
//! one active call, plus any number of held calls. The container exposes
//! only transition operations; every insertion detaches the call from all
//! buckets first, so a call is never in two buckets at once.

use serde::Serialize;

use crate::call::CallRef;

/// Outcome of removing a call on a terminal event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub was_incoming: bool,
    pub was_active: bool,
    pub was_held: bool,
    /// True when the removal emptied the held set.
    pub held_now_empty: bool,
}

impl Removal {
    /// Whether the call was anywhere in the roster at all.
    #[must_use]
    pub fn was_present(self) -> bool {
        self.was_incoming || self.was_active || self.was_held
    }
}

/// Outcome of retrieving a held call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Retrieval {
    pub was_held: bool,
    pub held_now_empty: bool,
}

/// Tracked set of calls currently known to be incoming, active, or held.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallRoster {
    incoming: Option<CallRef>,
    active: Option<CallRef>,
    held: Vec<CallRef>,
}

impl CallRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn incoming(&self) -> Option<&CallRef> {
        self.incoming.as_ref()
    }

    #[must_use]
    pub fn active(&self) -> Option<&CallRef> {
        self.active.as_ref()
    }

    /// Held calls, oldest first.
    #[must_use]
    pub fn held(&self) -> &[CallRef] {
        &self.held
    }

    #[must_use]
    pub fn contains(&self, call: &CallRef) -> bool {
        self.incoming.as_ref() == Some(call)
            || self.active.as_ref() == Some(call)
            || self.held.contains(call)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incoming.is_none() && self.active.is_none() && self.held.is_empty()
    }

    /// A call started ringing.
    pub fn set_incoming(&mut self, call: CallRef) {
        self.detach(&call);
        self.incoming = Some(call);
    }

    /// A call was established: it stops being incoming and becomes active.
    pub fn connect(&mut self, call: CallRef) {
        self.detach(&call);
        // Single-line: an establish always consumes the incoming slot,
        // even if the event ordering got the ids out of step.
        self.incoming = None;
        self.active = Some(call);
    }

    /// A held call was retrieved and becomes active.
    pub fn retrieve(&mut self, call: CallRef) -> Retrieval {
        let was_held = self.held.iter().any(|c| c == &call);
        self.detach(&call);
        let held_now_empty = was_held && self.held.is_empty();
        self.active = Some(call);
        Retrieval { was_held, held_now_empty }
    }

    /// The active call was parked on hold.
    pub fn hold(&mut self, call: CallRef) {
        self.detach(&call);
        // The hold event always vacates the active slot.
        self.active = None;
        self.held.push(call);
    }

    /// A call reached a terminal state. Idempotent: removing a call that
    /// is not in any bucket reports an all-false [`Removal`].
    pub fn remove(&mut self, call: &CallRef) -> Removal {
        let was_incoming = self.incoming.as_ref() == Some(call);
        if was_incoming {
            self.incoming = None;
        }

        let was_active = self.active.as_ref() == Some(call);
        if was_active {
            self.active = None;
        }

        let before = self.held.len();
        self.held.retain(|c| c != call);
        let was_held = self.held.len() != before;

        Removal { was_incoming, was_active, was_held, held_now_empty: was_held && self.held.is_empty() }
    }

    /// Remove the call from every bucket without reporting; used before an
    /// insertion to uphold the single-bucket invariant.
    fn detach(&mut self, call: &CallRef) {
        if self.incoming.as_ref() == Some(call) {
            self.incoming = None;
        }
        if self.active.as_ref() == Some(call) {
            self.active = None;
        }
        self.held.retain(|c| c != call);
    }

    /// Number of buckets holding this call. The invariant keeps it <= 1;
    /// exposed for tests.
    #[doc(hidden)]
    #[must_use]
    pub fn bucket_count(&self, call: &CallRef) -> usize {
        usize::from(self.incoming.as_ref() == Some(call))
            + usize::from(self.active.as_ref() == Some(call))
            + self.held.iter().filter(|c| *c == call).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::MediaKind;

    fn call(id: &str) -> CallRef {
        CallRef::new(id, MediaKind::SipVoice)
    }

    #[test]
    fn test_incoming_then_connect() {
        let mut roster = CallRoster::new();
        roster.set_incoming(call("a"));
        assert_eq!(roster.incoming(), Some(&call("a")));

        roster.connect(call("a"));
        assert!(roster.incoming().is_none());
        assert_eq!(roster.active(), Some(&call("a")));
        assert_eq!(roster.bucket_count(&call("a")), 1);
    }

    #[test]
    fn test_hold_vacates_active() {
        let mut roster = CallRoster::new();
        roster.connect(call("a"));
        roster.hold(call("a"));

        assert!(roster.active().is_none());
        assert_eq!(roster.held(), &[call("a")]);
    }

    #[test]
    fn test_hold_is_duplicate_free() {
        let mut roster = CallRoster::new();
        roster.hold(call("a"));
        roster.hold(call("a"));

        assert_eq!(roster.held().len(), 1);
    }

    #[test]
    fn test_retrieve_reports_emptied_set() {
        let mut roster = CallRoster::new();
        roster.hold(call("a"));
        roster.hold(call("b"));

        let first = roster.retrieve(call("a"));
        assert!(first.was_held);
        assert!(!first.held_now_empty);

        roster.hold(call("a"));
        roster.retrieve(call("a"));
        let last = roster.retrieve(call("b"));
        assert!(last.was_held);
        assert!(last.held_now_empty);
        assert_eq!(roster.active(), Some(&call("b")));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut roster = CallRoster::new();
        roster.connect(call("a"));

        let first = roster.remove(&call("a"));
        assert!(first.was_active);

        let second = roster.remove(&call("a"));
        assert_eq!(second, Removal::default());
        assert!(!second.was_present());
    }

    #[test]
    fn test_remove_clears_dangling_incoming() {
        let mut roster = CallRoster::new();
        roster.set_incoming(call("a"));

        let removal = roster.remove(&call("a"));
        assert!(removal.was_incoming);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_held_order_is_oldest_first() {
        let mut roster = CallRoster::new();
        roster.hold(call("a"));
        roster.hold(call("b"));
        roster.hold(call("c"));

        assert_eq!(roster.held()[0], call("a"));

        roster.remove(&call("a"));
        assert_eq!(roster.held()[0], call("b"));
    }

    mod invariant {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            SetIncoming(u8),
            Connect(u8),
            Hold(u8),
            Retrieve(u8),
            Remove(u8),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            let id = 0u8..4;
            prop_oneof![
                id.clone().prop_map(Op::SetIncoming),
                id.clone().prop_map(Op::Connect),
                id.clone().prop_map(Op::Hold),
                id.clone().prop_map(Op::Retrieve),
                id.prop_map(Op::Remove),
            ]
        }

        proptest! {
            /// Any sequence of transitions leaves every call in at most
            /// one bucket, with no duplicates in the held set.
            #[test]
            fn single_bucket_invariant(ops in proptest::collection::vec(op_strategy(), 0..64)) {
                let mut roster = CallRoster::new();
                for op in ops {
                    match op {
                        Op::SetIncoming(n) => roster.set_incoming(call(&n.to_string())),
                        Op::Connect(n) => roster.connect(call(&n.to_string())),
                        Op::Hold(n) => roster.hold(call(&n.to_string())),
                        Op::Retrieve(n) => {
                            roster.retrieve(call(&n.to_string()));
                        }
                        Op::Remove(n) => {
                            roster.remove(&call(&n.to_string()));
                        }
                    }

                    for n in 0u8..4 {
                        prop_assert!(roster.bucket_count(&call(&n.to_string())) <= 1);
                    }
                }
            }
        }
    }
}
