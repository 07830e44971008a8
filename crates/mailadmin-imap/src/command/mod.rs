//! Commands sent by the mailbox session.

mod tag_generator;

pub use tag_generator::TagGenerator;

use mailadmin_wire::{astring, find_line_break, quoted};

use crate::error::{Error, Result};
use crate::types::{AclRights, Flag, SequenceSet, StoreAction};

/// Command sent to the server, without its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY
    Capability,
    /// LOGIN
    Login {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// LOGOUT
    Logout,
    /// NAMESPACE
    Namespace,
    /// STATUS requesting the message count.
    Status {
        /// Full mailbox path.
        mailbox: String,
    },
    /// GETQUOTAROOT
    GetQuotaRoot {
        /// Full mailbox path.
        mailbox: String,
    },
    /// SETQUOTA on the STORAGE resource; `None` clears the limit.
    SetQuota {
        /// Quota root.
        root: String,
        /// Storage limit.
        limit: Option<u64>,
    },
    /// LIST of every mailbox visible to the identity.
    List,
    /// SELECT
    Select {
        /// Full mailbox path.
        mailbox: String,
    },
    /// STORE of a single flag.
    Store {
        /// Messages to modify.
        set: SequenceSet,
        /// How the flag is combined.
        action: StoreAction,
        /// Flag to store.
        flag: Flag,
    },
    /// SETACL
    SetAcl {
        /// Full mailbox path.
        mailbox: String,
        /// Identity receiving the rights.
        identifier: String,
        /// Rights letters.
        rights: AclRights,
    },
    /// CREATE
    Create {
        /// Full mailbox path.
        mailbox: String,
    },
    /// DELETE
    Delete {
        /// Full mailbox path.
        mailbox: String,
    },
    /// SUBSCRIBE
    Subscribe {
        /// Full mailbox path.
        mailbox: String,
    },
}

impl Command {
    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Login { .. } => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Namespace => "NAMESPACE",
            Self::Status { .. } => "STATUS",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::SetQuota { .. } => "SETQUOTA",
            Self::List => "LIST",
            Self::Select { .. } => "SELECT",
            Self::Store { .. } => "STORE",
            Self::SetAcl { .. } => "SETACL",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Subscribe { .. } => "SUBSCRIBE",
        }
    }

    /// Serializes the command line, without tag or CRLF.
    #[must_use]
    pub fn to_line(&self) -> String {
        let name = self.name();
        match self {
            Self::Capability | Self::Logout | Self::Namespace => name.to_string(),
            Self::Login { username, password } => {
                format!("{name} {} {}", astring(username), astring(password))
            }
            Self::Status { mailbox } => format!("{name} {} (MESSAGES)", astring(mailbox)),
            Self::SetQuota { root, limit } => match limit {
                Some(limit) => format!("{name} {} (STORAGE {limit})", quoted(root)),
                None => format!("{name} {} ()", quoted(root)),
            },
            Self::List => format!("{name} \"\" \"*\""),
            Self::Store { set, action, flag } => format!("{name} {set} {action} ({flag})"),
            Self::SetAcl {
                mailbox,
                identifier,
                rights,
            } => format!(
                "{name} {} {} {}",
                astring(mailbox),
                astring(identifier),
                astring(rights.as_str())
            ),
            Self::GetQuotaRoot { mailbox }
            | Self::Select { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox } => format!("{name} {}", astring(mailbox)),
        }
    }

    /// Checks that every string argument fits on one command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an argument contains CR, LF
    /// or NUL. Credentials are not echoed in the message.
    pub fn validate(&self) -> Result<()> {
        let args: Vec<(&str, &str)> = match self {
            Self::Capability
            | Self::Logout
            | Self::Namespace
            | Self::List
            | Self::Store { .. } => Vec::new(),
            Self::Login { username, password } => {
                vec![("user name", username.as_str()), ("password", password.as_str())]
            }
            Self::SetQuota { root, .. } => vec![("quota root", root.as_str())],
            Self::SetAcl {
                mailbox,
                identifier,
                ..
            } => vec![("mailbox", mailbox.as_str()), ("identifier", identifier.as_str())],
            Self::Status { mailbox }
            | Self::GetQuotaRoot { mailbox }
            | Self::Select { mailbox }
            | Self::Create { mailbox }
            | Self::Delete { mailbox }
            | Self::Subscribe { mailbox } => vec![("mailbox", mailbox.as_str())],
        };

        for (what, value) in args {
            if let Some(c) = find_line_break(value) {
                return Err(if self.is_sensitive() {
                    Error::InvalidArgument(format!("{what} contains {c:?}"))
                } else {
                    Error::InvalidArgument(format!("{what} {value:?} contains {c:?}"))
                });
            }
        }
        Ok(())
    }

    /// Returns true if the line carries credentials and must not be logged.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Login { .. })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(Command::Capability.to_line(), "CAPABILITY");
        assert_eq!(Command::Namespace.to_line(), "NAMESPACE");
        assert_eq!(Command::Logout.to_line(), "LOGOUT");
        assert_eq!(Command::List.to_line(), "LIST \"\" \"*\"");
    }

    #[test]
    fn login_quotes_when_needed() {
        let cmd = Command::Login {
            username: "cyrus".to_string(),
            password: "p a\"ss".to_string(),
        };
        assert_eq!(cmd.to_line(), r#"LOGIN cyrus "p a\"ss""#);
        assert!(cmd.is_sensitive());
    }

    #[test]
    fn status_requests_messages() {
        let cmd = Command::Status {
            mailbox: "user/jane".to_string(),
        };
        assert_eq!(cmd.to_line(), "STATUS user/jane (MESSAGES)");
        assert!(!cmd.is_sensitive());
    }

    #[test]
    fn setquota_forms() {
        let set = Command::SetQuota {
            root: "user/jane".to_string(),
            limit: Some(5000),
        };
        assert_eq!(set.to_line(), r#"SETQUOTA "user/jane" (STORAGE 5000)"#);

        let clear = Command::SetQuota {
            root: "user/jane".to_string(),
            limit: None,
        };
        assert_eq!(clear.to_line(), r#"SETQUOTA "user/jane" ()"#);
    }

    #[test]
    fn store_line() {
        let cmd = Command::Store {
            set: "1:3".parse().unwrap(),
            action: StoreAction::AddSilent,
            flag: Flag::Seen,
        };
        assert_eq!(cmd.to_line(), r"STORE 1:3 +FLAGS.SILENT (\Seen)");
    }

    #[test]
    fn setacl_line() {
        let cmd = Command::SetAcl {
            mailbox: "INBOX/Shared Stuff".to_string(),
            identifier: "anyone".to_string(),
            rights: "read".parse().unwrap(),
        };
        assert_eq!(cmd.to_line(), r#"SETACL "INBOX/Shared Stuff" anyone lrs"#);
    }

    #[test]
    fn setacl_none_sends_empty_rights() {
        let cmd = Command::SetAcl {
            mailbox: "INBOX".to_string(),
            identifier: "bob".to_string(),
            rights: "none".parse().unwrap(),
        };
        assert_eq!(cmd.to_line(), r#"SETACL INBOX bob """#);
    }

    #[test]
    fn mailbox_commands() {
        let mailbox = "INBOX/Sent".to_string();
        assert_eq!(
            Command::Create {
                mailbox: mailbox.clone()
            }
            .to_line(),
            "CREATE INBOX/Sent"
        );
        assert_eq!(
            Command::Select {
                mailbox: mailbox.clone()
            }
            .to_line(),
            "SELECT INBOX/Sent"
        );
        assert_eq!(
            Command::GetQuotaRoot { mailbox }.to_line(),
            "GETQUOTAROOT INBOX/Sent"
        );
    }

    #[test]
    fn line_breaks_in_arguments_are_rejected() {
        let injected = Command::Create {
            mailbox: "evil\r\nA099 DELETE user/victim".to_string(),
        };
        let err = injected.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("mailbox")));

        let acl = Command::SetAcl {
            mailbox: "INBOX".to_string(),
            identifier: "bob\n".to_string(),
            rights: "read".parse().unwrap(),
        };
        assert!(acl.validate().is_err());

        let login = Command::Login {
            username: "cyrus".to_string(),
            password: "hunter2\0".to_string(),
        };
        let err = login.validate().unwrap_err();
        assert!(!err.to_string().contains("hunter2"));

        assert!(Command::Status {
            mailbox: "Sent Items".to_string()
        }
        .validate()
        .is_ok());
        assert!(Command::List.validate().is_ok());
    }
}
