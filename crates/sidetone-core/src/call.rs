//! Call references and lifecycle events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a voice interaction in the external interaction manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(String);

impl CallId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media carried by an interaction. Only SIP voice drives the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    SipVoice,
    Other,
}

impl MediaKind {
    #[must_use]
    pub fn is_sip_voice(self) -> bool {
        matches!(self, Self::SipVoice)
    }
}

/// A reference to a voice interaction owned by the external interaction
/// manager.
///
/// This is a weak handle: the interaction may be invalidated at any time
/// without notice, so every consumer tolerates a lookup miss. Equality and
/// hashing are by id only; the remaining fields are a snapshot taken when
/// the referencing event was delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRef {
    pub id: CallId,
    /// Remote party number, used as ringer caller id when present.
    pub phone_number: Option<String>,
    pub media: MediaKind,
}

impl CallRef {
    #[must_use]
    pub fn new(id: impl Into<String>, media: MediaKind) -> Self {
        Self { id: CallId::new(id), phone_number: None, media }
    }

    #[must_use]
    pub fn with_phone_number(mut self, number: impl Into<String>) -> Self {
        self.phone_number = Some(number.into());
        self
    }
}

impl PartialEq for CallRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CallRef {}

impl std::hash::Hash for CallRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// State tag carried by an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Inbound call presented to the agent
    PresentedIn,
    /// Outbound call presented (dialing)
    PresentedOut,
    /// Two-way audio established
    Connected,
    /// Parked on hold
    Held,
    /// Destination busy
    Busy,
    /// Destination could not be resolved
    InvalidDestination,
    Ended,
    Abandoned,
    Dropped,
    Redirected,
}

impl CallState {
    /// The Ended family: the interaction is gone and will not come back.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Abandoned | Self::Dropped | Self::Redirected)
    }
}

/// The low-level protocol event that moved the interaction into its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ringing,
    Dialing,
    Established,
    Retrieved,
    Held,
    NetworkReached,
    Released,
}

/// A call lifecycle notification: the interaction, its new state tag, and
/// the protocol event that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub call: CallRef,
    pub state: CallState,
    pub kind: EventKind,
}

impl LifecycleEvent {
    #[must_use]
    pub fn new(call: CallRef, state: CallState, kind: EventKind) -> Self {
        Self { call, state, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CallState::Ended.is_terminal());
        assert!(CallState::Abandoned.is_terminal());
        assert!(CallState::Dropped.is_terminal());
        assert!(CallState::Redirected.is_terminal());
        assert!(!CallState::Connected.is_terminal());
        assert!(!CallState::Held.is_terminal());
        assert!(!CallState::PresentedIn.is_terminal());
    }

    #[test]
    fn test_call_ref_equality_is_by_id() {
        let a = CallRef::new("call-1", MediaKind::SipVoice).with_phone_number("5551234");
        let b = CallRef::new("call-1", MediaKind::SipVoice);
        let c = CallRef::new("call-2", MediaKind::SipVoice);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_lifecycle_event_round_trips_through_json() {
        let event = LifecycleEvent::new(
            CallRef::new("call-7", MediaKind::SipVoice).with_phone_number("5550100"),
            CallState::PresentedIn,
            EventKind::Ringing,
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: LifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(json.contains("presented_in"));
    }
}
