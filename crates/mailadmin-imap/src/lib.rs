//! # mailadmin-imap
//!
//! Administrative IMAP client for Cyrus-style mail stores: log in as an
//! administrator, discover namespaces, and manage mailboxes, ACLs and
//! quotas over a single connection.
//!
//! ## Features
//!
//! - **Tag-correlated engine**: one command in flight; every line is
//!   classified against the outstanding tag, and lines for any other tag
//!   are protocol errors
//! - **Namespace-aware paths**: personal paths for mailbox management,
//!   shared paths (`user/<name>`) for per-account quota and counts
//! - **Typed replies**: [`Quota::Unset`] vs [`Quota::Set`], enumerated
//!   flags and STORE actions, validated ACL rights
//! - **Soft reads, hard writes**: NO on a read yields an empty result;
//!   NO on a mutation is an [`Error::Command`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailadmin_imap::{DEFAULT_PORT, MailboxSession, SessionConfig, SessionState};
//!
//! #[tokio::main]
//! async fn main() -> mailadmin_imap::Result<()> {
//!     let config = SessionConfig::new("imap.example.com", DEFAULT_PORT, "jane", "secret");
//!     let mut session = MailboxSession::connect(&config).await?;
//!
//!     if session.state() == SessionState::Ready {
//!         if let Some(quota) = session.get_quota_usage().await? {
//!             println!("{} of {} KB ({}%)", quota.used(), quota.total(), quota.percent());
//!         }
//!         for folder in session.list_folders().await? {
//!             println!("{folder}");
//!         }
//!     }
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! connect ─── login OK, STATUS OK ───→ Ready
//!    │
//!    ├─── login OK, STATUS NO ───→ AccountMissing (mutations only)
//!    │
//!    └─── login NO ───→ Error::Auth
//!
//! Ready / AccountMissing ─── connection lost or logout ───→ LoggedOut
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command serialization and tagging
//! - [`connection`]: tagged execution and the mailbox session
//! - [`parser`]: completion detection and reply decoders
//! - [`types`]: capabilities, namespaces, quotas, flags, ACL rights

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{Connection, MailboxSession, SessionState};
pub use error::{Error, Result};
pub use mailadmin_wire::{Security, SessionConfig};
pub use parser::{Completion, Reply};
pub use types::{
    AclPreset, AclRights, Capability, CapabilitySet, Flag, FolderState, Namespace, Namespaces,
    Quota, SequenceSet, Status, StoreAction,
};

/// Default mailbox-protocol port.
pub const DEFAULT_PORT: u16 = 143;
