use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::gate::ActionKind;
use super::session::SessionInput;

/// Everything the reactor consumes. Produced by the transport, the timers,
/// the operator and the action tasks; consumed in arrival order.
#[derive(Debug)]
pub enum Event {
    Session(SessionInput),
    Operator {
        command: OperatorCommand,
        reply: Option<oneshot::Sender<CommandReply>>,
    },
    Action(ActionOutcome),
}

impl Event {
    pub fn operator(command: OperatorCommand) -> Self {
        Event::Operator { command, reply: None }
    }
}

impl From<SessionInput> for Event {
    fn from(input: SessionInput) -> Self {
        Event::Session(input)
    }
}

impl From<ActionOutcome> for Event {
    fn from(outcome: ActionOutcome) -> Self {
        Event::Action(outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Analyze,
    Speak,
    /// Raw requested intensity; clamped by the reactor.
    Haptic(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Accepted(ActionKind),
    /// Another action holds the gate.
    Busy(ActionKind),
    /// Nothing to do (e.g. no prompt to speak).
    Skipped,
}

/// Body of a haptic pulse response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechResult {
    Played,
    /// Upstream synthesis had nothing to return. Not an error.
    NoContent,
    EmptyAudio,
}

/// Results posted back by action tasks. Errors are already rendered to text.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Analyzed(Result<Value, String>),
    Pulsed {
        intensity: u8,
        result: Result<HapticAck, String>,
    },
    /// Audio began playing; the speech action is still in flight.
    PlaybackStarted,
    Spoken(Result<SpeechResult, String>),
}
