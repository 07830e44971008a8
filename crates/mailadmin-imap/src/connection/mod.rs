//! Connection management.
//!
//! - [`Connection`]: tagged command execution over one line stream
//! - [`MailboxSession`]: the administrative conversation built on top

mod session;

pub use session::{MailboxSession, SessionState};

use mailadmin_wire::LineStream;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::{Command, TagGenerator};
use crate::error::{Error, Result};
use crate::parser::{Completion, Reply, ResponseLine};
use crate::types::Status;

/// One command in flight at a time over an exclusively owned stream.
#[derive(Debug)]
pub struct Connection<S> {
    stream: LineStream<S>,
    tags: TagGenerator,
    last_response: Option<String>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream. No bytes are exchanged.
    pub fn new(stream: S) -> Self {
        Self {
            stream: LineStream::new(stream),
            tags: TagGenerator::default(),
            last_response: None,
        }
    }

    /// Reads the server greeting and returns its status with the text.
    ///
    /// The status is [`Status::Ok`] or [`Status::PreAuth`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bye`] if the server refuses the connection and
    /// [`Error::Protocol`] if the first line is not an untagged status.
    pub async fn read_greeting(&mut self) -> Result<(Status, String)> {
        let line = self.read_line().await?;
        let parsed = ResponseLine::parse(&line);
        if !parsed.is_untagged() {
            return Err(Error::Protocol(format!("unexpected greeting {line:?}")));
        }

        match Status::parse(parsed.keyword) {
            Some(status @ (Status::Ok | Status::PreAuth)) => Ok((status, parsed.rest.to_string())),
            Some(Status::Bye) => Err(Error::Bye(parsed.rest.to_string())),
            _ => Err(Error::Protocol(format!("unexpected greeting {line:?}"))),
        }
    }

    /// Sends a command and collects its reply up to the terminal line.
    ///
    /// A NO or BAD completion is returned as a [`Reply`], not an error;
    /// callers choose whether it is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] without sending anything if an
    /// argument would break the command line. Otherwise returns an error
    /// if the stream fails, or if a line for another tag or an unexpected
    /// continuation request arrives.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply> {
        command.validate()?;
        let (tag, line) = self.tags.issue(&command.to_line());
        tracing::debug!(%tag, command = command.name(), "sending command");
        if !command.is_sensitive() {
            tracing::trace!(%line, ">>");
        }
        self.stream.write_line(&line).await?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            match Completion::classify(&line, &tag)? {
                Completion::Untagged => lines.push(line),
                Completion::ContinuationRequest => {
                    return Err(Error::Protocol(format!(
                        "unexpected continuation request for {}",
                        command.name()
                    )));
                }
                Completion::Done { status, text } => {
                    tracing::debug!(%tag, %status, "command completed");
                    return Ok(Reply {
                        tag,
                        status,
                        text,
                        lines,
                    });
                }
            }
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        let line = self.stream.read_line().await?;
        self.last_response = Some(line.clone());
        Ok(line)
    }

    /// Returns the most recent line read from the server.
    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Closes the write side of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
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
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn greeting_ok() {
        let mock = Builder::new()
            .read(b"* OK cyrus.example.com Cyrus IMAP server ready\r\n")
            .build();
        let mut conn = Connection::new(mock);
        let (status, text) = conn.read_greeting().await.unwrap();
        assert_eq!(status, Status::Ok);
        assert_eq!(text, "cyrus.example.com Cyrus IMAP server ready");
        assert_eq!(
            conn.last_response(),
            Some("* OK cyrus.example.com Cyrus IMAP server ready")
        );
    }

    #[tokio::test]
    async fn greeting_preauth() {
        let mock = Builder::new()
            .read(b"* PREAUTH logged in as cyrus\r\n")
            .build();
        let mut conn = Connection::new(mock);
        let (status, text) = conn.read_greeting().await.unwrap();
        assert_eq!(status, Status::PreAuth);
        assert_eq!(text, "logged in as cyrus");
    }

    #[tokio::test]
    async fn greeting_bye() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let mut conn = Connection::new(mock);
        assert!(matches!(
            conn.read_greeting().await,
            Err(Error::Bye(text)) if text == "too many connections"
        ));
    }

    #[tokio::test]
    async fn greeting_tagged_is_protocol_error() {
        let mock = Builder::new().read(b"A001 OK what\r\n").build();
        let mut conn = Connection::new(mock);
        assert!(matches!(conn.read_greeting().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn execute_collects_untagged_lines() {
        let mock = Builder::new()
            .write(b"A001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 QUOTA\r\n")
            .read(b"A001 OK done\r\n")
            .write(b"A002 NAMESPACE\r\n")
            .read(b"A002 NO not today\r\n")
            .build();
        let mut conn = Connection::new(mock);

        let reply = conn.execute(&Command::Capability).await.unwrap();
        assert_eq!(reply.tag, "A001");
        assert!(reply.is_ok());
        assert_eq!(reply.lines, vec!["* CAPABILITY IMAP4rev1 QUOTA"]);

        let reply = conn.execute(&Command::Namespace).await.unwrap();
        assert_eq!(reply.status, Status::No);
        assert_eq!(reply.text, "not today");
        assert!(reply.lines.is_empty());
        assert_eq!(conn.last_response(), Some("A002 NO not today"));
    }

    #[tokio::test]
    async fn execute_reads_literal_payload() {
        let mock = Builder::new()
            .write(b"A001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST () \"/\" {8}\r\nA001 OK \r\n")
            .read(b"A001 OK done\r\n")
            .build();
        let mut conn = Connection::new(mock);

        let reply = conn.execute(&Command::List).await.unwrap();
        assert_eq!(reply.lines, vec!["* LIST () \"/\" {8}\r\nA001 OK "]);
    }

    #[tokio::test]
    async fn foreign_tag_is_protocol_error() {
        let mock = Builder::new()
            .write(b"A001 LOGOUT\r\n")
            .read(b"B007 OK stray\r\n")
            .build();
        let mut conn = Connection::new(mock);
        assert!(matches!(
            conn.execute(&Command::Logout).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn eof_mid_reply_is_connection_error() {
        let mock = Builder::new()
            .write(b"A001 LOGOUT\r\n")
            .read(b"* BYE logging out\r\n")
            .build();
        let mut conn = Connection::new(mock);
        let err = conn.execute(&Command::Logout).await.unwrap_err();
        assert!(matches!(&err, Error::Connection(e) if e.is_closed()));
        assert!(err.is_fatal_to_connection());
    }
}
