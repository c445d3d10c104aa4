//! Seams to the host's telephony subsystems.
//!
//! The engine consumes four capabilities it does not own: the live
//! interaction set with its lifecycle event stream, the command executor,
//! the per-call SIP endpoint (software mute), and a token-to-interaction
//! resolver. All of them hand out explicit [`SubscriptionId`] handles on
//! subscribe, so teardown never depends on callback identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::call::{CallRef, LifecycleEvent};
use crate::command::{CommandChain, CommandParams};
use crate::error::Result;

/// Opaque handle returned by a subscribe call; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Identity of a SIP endpoint, used to keep at most one mute subscription
/// per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub String);

/// Callback invoked on the telephony-event delivery thread.
pub type LifecycleHandler = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Callback invoked when an endpoint's microphone mute flag changes.
pub type MuteHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// The external interaction manager's live set and event stream.
pub trait InteractionSource: Send + Sync {
    /// Snapshot of the currently live interactions, voice or otherwise.
    fn interactions(&self) -> Vec<CallRef>;

    fn subscribe(&self, handler: LifecycleHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// The opaque command-execution capability.
///
/// Implementations run on the designated command-execution context; the
/// dispatcher marshals every call there before invoking this.
pub trait CommandExecutor: Send + Sync {
    /// Execute a named command chain.
    ///
    /// # Errors
    /// Returns an error when the underlying chain fails. The dispatcher
    /// logs and swallows it; nothing propagates further.
    fn execute(&self, chain: CommandChain, params: CommandParams) -> Result<()>;
}

/// A software SIP endpoint carrying the call's microphone mute flag.
pub trait SipEndpoint: Send + Sync {
    fn endpoint_id(&self) -> EndpointId;

    fn is_microphone_muted(&self) -> bool;

    /// # Errors
    /// Returns an error when the endpoint rejects the write.
    fn set_microphone_muted(&self, muted: bool) -> Result<()>;

    fn subscribe_mute_changed(&self, handler: MuteHandler) -> SubscriptionId;

    fn unsubscribe_mute_changed(&self, id: SubscriptionId);
}

/// Resolves the software endpoint for a given call, if any.
pub trait EndpointDirectory: Send + Sync {
    fn find_endpoint(&self, call: &CallRef) -> Option<Arc<dyn SipEndpoint>>;
}

/// Strategy mapping an opaque lookup token onto a live interaction.
///
/// How a token should disambiguate between multiple simultaneous calls is
/// unresolved upstream (it could key off the interaction id, connection
/// id, ANI, or attached data). The strategy is therefore pluggable; hosts
/// with multi-call semantics must inject their own.
pub trait TokenResolver: Send + Sync {
    fn resolve(&self, token: &str, live: &[CallRef]) -> Option<CallRef>;
}

/// Default resolver: the first live SIP-voice interaction, ignoring the
/// token entirely. Correct for single-line telephony, ambiguous beyond it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstSipVoiceMatch;

impl TokenResolver for FirstSipVoiceMatch {
    fn resolve(&self, _token: &str, live: &[CallRef]) -> Option<CallRef> {
        live.iter().find(|c| c.media.is_sip_voice()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::MediaKind;

    #[test]
    fn test_first_sip_voice_match_skips_other_media() {
        let live = vec![
            CallRef::new("chat-1", MediaKind::Other),
            CallRef::new("call-1", MediaKind::SipVoice),
            CallRef::new("call-2", MediaKind::SipVoice),
        ];

        let resolved = FirstSipVoiceMatch.resolve("anything", &live).unwrap();
        assert_eq!(resolved.id.as_str(), "call-1");
    }

    #[test]
    fn test_first_sip_voice_match_empty_set() {
        assert!(FirstSipVoiceMatch.resolve("t", &[]).is_none());
        let only_other = vec![CallRef::new("chat-1", MediaKind::Other)];
        assert!(FirstSipVoiceMatch.resolve("t", &only_other).is_none());
    }
}
