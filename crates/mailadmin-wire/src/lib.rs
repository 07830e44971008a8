//! # mailadmin-wire
//!
//! Transport and wire primitives shared by the mailadmin protocol clients.
//!
//! Both the mailbox-administration protocol (IMAP) and the
//! script-management protocol (`ManageSieve`) are line oriented: commands
//! and responses are CRLF-terminated text lines, and payloads that may
//! contain line breaks travel as byte-counted literals. This crate owns
//! the socket and gets those lines on and off the wire; it knows nothing
//! about tags or status words.
//!
//! ## Modules
//!
//! - [`config`]: endpoint and session configuration (host, port, security,
//!   connect timeout, credentials)
//! - [`stream`]: plain/TLS socket and [`open`]
//! - [`framed`]: literal-aware [`LineStream`]
//! - [`lexer`]: tokenizer for response lines
//! - [`serialize`]: astring / quoted-string writers for command arguments

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod framed;
pub mod lexer;
pub mod serialize;
pub mod stream;

pub use config::{DEFAULT_CONNECT_TIMEOUT, Endpoint, Security, SessionConfig};
pub use error::{Error, Result};
pub use framed::LineStream;
pub use lexer::{Lexer, Token};
pub use serialize::{astring, find_line_break, quoted};
pub use stream::{WireStream, open};
