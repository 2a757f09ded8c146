//! Inbound requests to the command arbiter.
//!
//! Commands arrive from the broker (already discrete messages) or from the
//! debounced push-buttons.  Everything that mutates the motor outputs is
//! funnelled through a [`DoorRequest`] on the command queue.

use core::fmt;

use super::events::DoorState;

/// A motion request.  Idempotent: `Open` while already open is valid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Open,
    Close,
    Stop,
}

impl Command {
    /// Parse a command payload.  Tokens are case-sensitive and must match
    /// exactly; surrounding whitespace is not tolerated.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            b"OPEN" => Some(Self::Open),
            b"CLOSE" => Some(Self::Close),
            b"STOP" => Some(Self::Stop),
            _ => None,
        }
    }

    pub const fn as_token(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Stop => "STOP",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Where a command came from.  Decides whether the time-window guard applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Command topic on the broker.  Trusted, never window-gated.
    Remote,
    /// Local push-button.  `Open` is window-gated.
    Button,
}

/// Everything the control loop consumes from the command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorRequest {
    /// A motion command from either origin.
    Command { command: Command, origin: Origin },
    /// The sensor tracker derived a new state.  Used for end-stop cutoff.
    DoorStateChanged(DoorState),
    /// Unconditional pin reset (legacy state-topic echo, transport loss).
    SafetyReset,
}

impl DoorRequest {
    pub const fn remote(command: Command) -> Self {
        Self::Command {
            command,
            origin: Origin::Remote,
        }
    }

    pub const fn button(command: Command) -> Self {
        Self::Command {
            command,
            origin: Origin::Button,
        }
    }
}
