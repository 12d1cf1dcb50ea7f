use std::fmt;

use serde::{Deserialize, Serialize};

/// Operator-triggered one-shot actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Analyze,
    Speak,
    /// Already clamped to [0,255].
    Haptic(u8),
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Analyze => f.write_str("analyze"),
            ActionKind::Speak => f.write_str("speak"),
            ActionKind::Haptic(value) => write!(f, "haptic-{value}"),
        }
    }
}

/// Single-flight lock over operator actions.
/// Holds at most one token; the stream path never touches it.
#[derive(Debug, Default)]
pub struct ActionGate {
    in_flight: Option<ActionKind>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `kind`. Returns the holder on contention.
    pub fn try_acquire(&mut self, kind: ActionKind) -> Result<(), ActionKind> {
        match self.in_flight {
            Some(holder) => Err(holder),
            None => {
                self.in_flight = Some(kind);
                Ok(())
            }
        }
    }

    /// Always leaves the gate idle, whoever held it.
    pub fn release(&mut self) -> Option<ActionKind> {
        self.in_flight.take()
    }

    pub fn in_flight(&self) -> Option<ActionKind> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Lock token as shown to the operator, e.g. `haptic-255`.
    pub fn token(&self) -> Option<String> {
        self.in_flight.map(|kind| kind.to_string())
    }
}
