//! Connection state machine

use crate::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport open, nothing sent yet
    Initial,

    /// Upgrading a plaintext transport to TLS (start-TLS mode)
    NegotiatingTls,

    /// Sending AUTH / SELECT / CLIENT SETNAME / activation PING
    Activating,

    /// Ready for commands
    Ready,

    /// Command written, reply pending
    Busy,

    /// Closed or unusable
    Closed,
}

impl ConnectionState {
    /// Whether `next` is reachable from this state
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Initial, NegotiatingTls)
                | (Initial, Activating)
                | (NegotiatingTls, Activating)
                | (Activating, Ready)
                | (Ready, Busy)
                | (Busy, Ready)
                | (_, Closed)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::NegotiatingTls => write!(f, "negotiating_tls"),
            Self::Activating => write!(f, "activating"),
            Self::Ready => write!(f, "ready"),
            Self::Busy => write!(f, "busy"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
