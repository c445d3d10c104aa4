//! Outbound call-control command descriptors.
//!
//! The engine never talks to the telephony transport directly; it names a
//! chain of commands and hands the executor a parameter record. The
//! executor collaborator owns dispatch, retries, and transport details.

use serde::{Deserialize, Serialize};

use crate::call::CallId;

/// Named command chains exposed by the call-control layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandChain {
    AnswerCall,
    ReleaseCall,
    HoldCall,
    RetrieveCall,
    MakeCall,
}

impl CommandChain {
    /// The upstream chain identifier this maps to.
    #[must_use]
    pub fn chain_name(self) -> &'static str {
        match self {
            Self::AnswerCall => "InteractionVoiceAnswerCall",
            Self::ReleaseCall => "InteractionVoiceReleaseCall",
            Self::HoldCall => "InteractionVoiceHoldCall",
            Self::RetrieveCall => "InteractionVoiceRetrieveCall",
            Self::MakeCall => "MediaVoiceMakeCall",
        }
    }
}

/// How an outbound call is placed. Only regular calls are issued from the
/// headset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MakeCallType {
    #[default]
    Regular,
}

/// Parameter record for a command chain.
///
/// For per-call chains `command_parameter` carries the target interaction.
/// For make-call it is left empty: the agent's own voice media is the
/// command parameter, and resolving agent identity belongs to the
/// executor's side of the seam.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParams {
    pub command_parameter: Option<CallId>,
    pub destination: Option<String>,
    pub location: Option<String>,
    pub make_call_type: Option<MakeCallType>,
}

impl CommandParams {
    /// Parameters for a chain targeting one interaction.
    #[must_use]
    pub fn for_call(id: CallId) -> Self {
        Self { command_parameter: Some(id), ..Self::default() }
    }

    /// Parameters for placing a new call. A missing location maps to the
    /// empty string, matching the call-control layer's expectations.
    #[must_use]
    pub fn for_make_call(destination: impl Into<String>, location: Option<&str>) -> Self {
        Self {
            command_parameter: None,
            destination: Some(destination.into()),
            location: Some(location.unwrap_or("").to_string()),
            make_call_type: Some(MakeCallType::Regular),
        }
    }
}
