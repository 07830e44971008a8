//! # mailadmin-sieve
//!
//! Client for the script-management protocol (ManageSieve, RFC 5804):
//! authenticate with SASL PLAIN, then list, download, upload and
//! activate filtering scripts.
//!
//! Replies are untagged. Each one is a run of data lines closed by a
//! status line starting with `OK`, `NO` or `BYE`; literal payloads
//! (`{n}` or `{n+}`) are read whole by the shared line engine, so script
//! bodies survive byte for byte, embedded CRLFs included.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailadmin_sieve::{DEFAULT_PORT, ScriptSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> mailadmin_sieve::Result<()> {
//!     let config = SessionConfig::new("sieve.example.com", DEFAULT_PORT, "jane", "secret");
//!     let mut session = ScriptSession::connect(&config).await?;
//!
//!     session.put_script("vacation", "require \"vacation\";\r\nvacation \"Away\";\r\n").await?;
//!     session.set_active("vacation").await?;
//!
//!     for (name, script) in session.list_scripts().await? {
//!         println!("{name} active={} ({} bytes)", script.active, script.body.len());
//!     }
//!
//!     session.logout().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod decode;
mod error;
pub mod response;
pub mod sasl;
mod session;

pub use decode::SieveCapabilities;
pub use error::{Error, Result};
pub use mailadmin_wire::{Security, SessionConfig};
pub use response::{Status, StatusLine};
pub use session::{ScriptRecord, ScriptSession};

/// Default script-management port.
pub const DEFAULT_PORT: u16 = 2000;
