//! Error types for the mailbox-administration client.

use thiserror::Error;

use crate::types::{Capability, Status};

/// Errors that can occur during mailbox-administration operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket open/read/write failure or unexpected end of stream.
    #[error("Connection error: {0}")]
    Connection(#[from] mailadmin_wire::Error),

    /// Server refused the connection with a BYE greeting.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Login was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A command ended with NO or BAD.
    #[error("{command} failed with {status}: {text}")]
    Command {
        /// Command keyword.
        command: &'static str,
        /// Terminal status (NO or BAD).
        status: Status,
        /// Human-readable text from the terminal line.
        text: String,
    },

    /// A reply was accepted but did not have the expected shape.
    #[error("Malformed {reply} reply: {message}")]
    Decode {
        /// Which reply was being decoded.
        reply: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Protocol violation, such as a terminal line for a foreign tag.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server does not advertise a capability the operation needs.
    #[error("Server does not advertise {0}")]
    MissingCapability(Capability),

    /// A caller-supplied argument is not valid on the wire.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn decode(reply: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            reply,
            message: message.into(),
        }
    }

    /// Returns true if the error ended the connection.
    #[must_use]
    pub const fn is_fatal_to_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Bye(_) | Self::Protocol(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
