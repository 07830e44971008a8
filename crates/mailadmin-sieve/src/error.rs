//! Error types for the script-management client.

use thiserror::Error;

use crate::response::Status;

/// Errors that can occur during script-management operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket open/read/write failure or unexpected end of stream.
    #[error("Connection error: {0}")]
    Connection(#[from] mailadmin_wire::Error),

    /// The server is closing the connection.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// SASL authentication was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A command ended with NO.
    #[error("{command} failed with {status}: {text}")]
    Command {
        /// Command keyword.
        command: &'static str,
        /// Final status.
        status: Status,
        /// Human-readable text from the status line.
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

    /// A caller-supplied argument cannot be sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server did not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),
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
