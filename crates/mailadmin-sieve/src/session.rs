//! Script-management session.

use std::collections::BTreeMap;

use mailadmin_wire::{LineStream, SessionConfig, WireStream, find_line_break, quoted};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::decode::{self, SieveCapabilities};
use crate::error::{Error, Result};
use crate::response::{Status, StatusLine};
use crate::sasl;

/// A script's activation flag and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRecord {
    /// True for the one script the server runs on delivery.
    pub active: bool,
    /// Script source.
    pub body: String,
}

/// Authenticated session over one connection.
#[derive(Debug)]
pub struct ScriptSession<S = WireStream> {
    stream: LineStream<S>,
    capabilities: SieveCapabilities,
    last_response: Option<String>,
}

impl ScriptSession<WireStream> {
    /// Connects to the configured endpoint and authenticates.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the greeting is not OK,
    /// or authentication is rejected.
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        tracing::info!(
            host = %config.endpoint.host,
            port = config.endpoint.port,
            "connecting to script server"
        );
        let stream = mailadmin_wire::open(&config.endpoint).await?;
        Self::from_stream(stream, &config.username, &config.password).await
    }
}

impl<S> ScriptSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting and authenticates with SASL PLAIN over an
    /// already connected stream.
    ///
    /// On failure the connection is logged out (when still usable) and
    /// closed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bye`] or [`Error::Protocol`] if the greeting does
    /// not end in OK, [`Error::Decode`] if its capability lines are
    /// malformed, and [`Error::Auth`] if the credentials are rejected.
    pub async fn from_stream(stream: S, username: &str, password: &str) -> Result<Self> {
        let mut session = Self {
            stream: LineStream::new(stream),
            capabilities: SieveCapabilities::default(),
            last_response: None,
        };

        match session.handshake(username, password).await {
            Ok(()) => Ok(session),
            Err(e) => {
                tracing::warn!(error = %e, "session setup failed");
                if !e.is_fatal_to_connection() {
                    let _ = session.quit().await;
                }
                let _ = session.stream.shutdown().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self, username: &str, password: &str) -> Result<()> {
        let (lines, status) = self.read_reply().await?;
        match status.status {
            Status::Ok => {}
            Status::Bye => return Err(Error::Bye(status.text)),
            Status::No => {
                return Err(Error::Protocol(format!(
                    "greeting ended with NO: {}",
                    status.text
                )));
            }
        }

        self.capabilities = decode::capabilities(&lines)?;
        tracing::debug!(
            implementation = ?self.capabilities.implementation,
            sasl = ?self.capabilities.sasl,
            "server greeting"
        );
        if !self.capabilities.supports_sasl(sasl::PLAIN) {
            tracing::warn!(mechanisms = ?self.capabilities.sasl, "PLAIN not advertised");
        }

        self.authenticate(username, password).await
    }

    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        for (what, value) in [("user name", username), ("password", password)] {
            if let Some(c) = find_line_break(value) {
                return Err(Error::InvalidArgument(format!("{what} contains {c:?}")));
            }
        }
        let response = sasl::plain_response(username, password);
        tracing::debug!(mechanism = sasl::PLAIN, "sending command AUTHENTICATE");
        self.stream
            .write_line(&format!(
                "AUTHENTICATE {} {{{}+}}",
                quoted(sasl::PLAIN),
                response.len()
            ))
            .await?;
        self.stream.write_literal(response.as_bytes()).await?;

        let (_, status) = self.read_reply().await?;
        match status.status {
            Status::Ok => {
                tracing::info!(username, "authenticated");
                Ok(())
            }
            Status::Bye => Err(Error::Bye(status.text)),
            Status::No => Err(Error::Auth(status.text)),
        }
    }

    /// Reads data lines up to and including the status line.
    async fn read_reply(&mut self) -> Result<(Vec<String>, StatusLine)> {
        let mut lines = Vec::new();
        loop {
            let line = self.stream.read_line().await?;
            self.last_response = Some(line.clone());
            match StatusLine::parse(&line) {
                Some(status) => return Ok((lines, status)),
                None => lines.push(line),
            }
        }
    }

    async fn quit(&mut self) -> Result<StatusLine> {
        self.send("LOGOUT", "LOGOUT").await?;
        let (_, status) = self.read_reply().await?;
        Ok(status)
    }

    async fn send(&mut self, name: &'static str, line: &str) -> Result<()> {
        tracing::debug!(command = name, "sending command");
        tracing::trace!(%line, ">>");
        self.stream.write_line(line).await?;
        Ok(())
    }

    async fn finish(&mut self, name: &'static str) -> Result<Vec<String>> {
        let (lines, status) = self.read_reply().await?;
        tracing::debug!(command = name, status = %status.status, "command completed");
        match status.status {
            Status::Ok => Ok(lines),
            Status::Bye => Err(Error::Bye(status.text)),
            Status::No => Err(Error::Command {
                command: name,
                status: status.status,
                text: status.text,
            }),
        }
    }

    /// Lists script names with their activation flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the listing and
    /// [`Error::Decode`] if a line is malformed.
    pub async fn list_script_names(&mut self) -> Result<Vec<(String, bool)>> {
        self.send("LISTSCRIPTS", "LISTSCRIPTS").await?;
        let lines = self.finish("LISTSCRIPTS").await?;
        decode::scripts(&lines)
    }

    /// Lists every script and fetches its body.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or any fetch fails.
    pub async fn list_scripts(&mut self) -> Result<BTreeMap<String, ScriptRecord>> {
        let mut scripts = BTreeMap::new();
        for (name, active) in self.list_script_names().await? {
            let body = self.get_script(&name).await?;
            scripts.insert(name, ScriptRecord { active, body });
        }
        Ok(scripts)
    }

    /// Fetches a script body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the script does not exist.
    /// Returns [`Error::InvalidArgument`] without sending anything if the
    /// name contains CR, LF or NUL.
    pub async fn get_script(&mut self, name: &str) -> Result<String> {
        let name = script_name(name)?;
        self.send("GETSCRIPT", &format!("GETSCRIPT {name}")).await?;
        let lines = self.finish("GETSCRIPT").await?;
        decode::script_body(&lines)
    }

    /// Uploads a script, replacing any script of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the script.
    /// Returns [`Error::InvalidArgument`] without sending anything if the
    /// name contains CR, LF or NUL.
    pub async fn put_script(&mut self, name: &str, body: &str) -> Result<()> {
        let line = format!("PUTSCRIPT {} {{{}+}}", script_name(name)?, body.len());
        self.send("PUTSCRIPT", &line).await?;
        self.stream.write_literal(body.as_bytes()).await?;
        self.finish("PUTSCRIPT").await?;
        tracing::info!(script = name, bytes = body.len(), "script stored");
        Ok(())
    }

    /// Makes `name` the active script.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the activation.
    /// Returns [`Error::InvalidArgument`] without sending anything if the
    /// name contains CR, LF or NUL.
    pub async fn set_active(&mut self, name: &str) -> Result<()> {
        let name = script_name(name)?;
        self.send("SETACTIVE", &format!("SETACTIVE {name}")).await?;
        self.finish("SETACTIVE").await?;
        Ok(())
    }

    /// Capabilities from the greeting.
    #[must_use]
    pub const fn capabilities(&self) -> &SieveCapabilities {
        &self.capabilities
    }

    /// Most recent line read from the server.
    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails before the server answers.
    pub async fn logout(mut self) -> Result<()> {
        let status = self.quit().await?;
        let _ = self.stream.shutdown().await;
        tracing::info!(status = %status.status, "logged out");
        Ok(())
    }
}

/// Quotes a script name, refusing names that would split the line.
fn script_name(name: &str) -> Result<String> {
    match find_line_break(name) {
        Some(c) => Err(Error::InvalidArgument(format!(
            "script name {name:?} contains {c:?}"
        ))),
        None => Ok(quoted(name)),
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
    async fn exact_conversation() {
        let mock = Builder::new()
            .read(b"\"SASL\" \"PLAIN\"\r\nOK\r\n")
            .write(b"AUTHENTICATE \"PLAIN\" {28+}\r\n")
            .write(b"AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n")
            .read(b"OK\r\n")
            .write(b"SETACTIVE \"vacation\"\r\n")
            .read(b"OK\r\n")
            .write(b"LOGOUT\r\n")
            .read(b"OK \"Logout Complete\"\r\n")
            .build();

        let mut session = ScriptSession::from_stream(mock, "tim", "tanstaaftanstaaf")
            .await
            .unwrap();
        assert!(session.capabilities().supports_sasl("PLAIN"));

        session.set_active("vacation").await.unwrap();
        session.logout().await.unwrap();
    }

    #[test]
    fn script_names_are_quoted_or_refused() {
        assert_eq!(script_name("my \"rules\"").unwrap(), r#""my \"rules\"""#);
        assert!(matches!(
            script_name("x\"\r\nDELETESCRIPT \"main"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(script_name("nul\0").is_err());
    }

    #[tokio::test]
    async fn missing_plain_still_attempts_plain() {
        let mock = Builder::new()
            .read(b"\"SASL\" \"GSSAPI\"\r\nOK\r\n")
            .write(b"AUTHENTICATE \"PLAIN\" {28+}\r\n")
            .write(b"AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n")
            .read(b"NO \"Mechanism unavailable\"\r\n")
            .write(b"LOGOUT\r\n")
            .read(b"OK\r\n")
            .build();

        let err = ScriptSession::from_stream(mock, "tim", "tanstaaftanstaaf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(ref text) if text == "Mechanism unavailable"));
    }
}
