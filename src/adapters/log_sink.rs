//! Log-based state publisher.
//!
//! Implements [`StatePublisher`] by writing every state publish to the
//! logger (UART / USB-CDC in production).  Used in simulation, and on
//! target when no broker is configured.

use log::info;

use crate::app::events::{DoorState, StateChannel};
use crate::app::ports::StatePublisher;

/// Adapter that logs every state publish to the serial console.
#[derive(Debug, Default)]
pub struct LogStatePublisher {
    published: u32,
}

impl LogStatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publishes so far.
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl StatePublisher for LogStatePublisher {
    fn publish(&mut self, channel: StateChannel, state: DoorState) {
        self.published = self.published.wrapping_add(1);
        match channel {
            StateChannel::Realtime => info!("STATE | realtime={}", state),
            StateChannel::Latched => info!("STATE | latched={} (retained)", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_publishes() {
        let mut p = LogStatePublisher::new();
        p.publish(StateChannel::Realtime, DoorState::Running);
        p.publish(StateChannel::Latched, DoorState::Closed);
        assert_eq!(p.published(), 2);
    }
}
