//! Error types for the wire layer.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while moving bytes to and from the server.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connect did not complete in time.
    #[error("Connection to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// `host:port` that was being dialed.
        endpoint: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// The server closed the stream.
    #[error("Connection closed by server")]
    Closed,

    /// A response line exceeded the maximum length.
    #[error("Line too long (max {0} bytes)")]
    LineTooLong(usize),

    /// A literal announced more bytes than allowed.
    #[error("Literal too large: {size} bytes (max {max})")]
    LiteralTooLarge {
        /// Announced literal size.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    /// A response line was not valid UTF-8.
    #[error("Response is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Lexer error.
    #[error("Syntax error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },
}

impl Error {
    /// Returns true if the server ended the stream.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Result type alias using the wire error.
pub type Result<T> = std::result::Result<T, Error>;
