//! Administrative mailbox session.
//!
//! A session logs in, learns the server's capabilities and namespaces, and
//! checks whether the logged-in identity has its own account. Read
//! operations degrade to empty results when the session is not
//! [`SessionState::Ready`] or the server answers NO; mutations fail with
//! [`Error::Command`].

use std::collections::HashMap;

use mailadmin_wire::{SessionConfig, WireStream};
use tokio::io::{AsyncRead, AsyncWrite};

use super::Connection;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{Reply, decode};
use crate::types::{
    AclRights, Capability, CapabilitySet, Flag, FolderState, Namespaces, Quota, SequenceSet,
    Status, StoreAction,
};

/// Where the session stands after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Logged in and the identity's account exists.
    Ready,
    /// Logged in, but the identity has no account of its own. Mailbox
    /// creation and ACL changes still work.
    AccountMissing,
    /// The connection is gone; every further command fails.
    LoggedOut,
}

/// Logged-in administrative session over one connection.
#[derive(Debug)]
pub struct MailboxSession<S = WireStream> {
    conn: Connection<S>,
    username: String,
    state: SessionState,
    capabilities: CapabilitySet,
    namespaces: Namespaces,
    folders: HashMap<String, FolderState>,
}

impl MailboxSession<WireStream> {
    /// Connects to the configured endpoint and runs the login sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, capability or namespace
    /// step fails. A missing account is not an error; see
    /// [`SessionState::AccountMissing`].
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        tracing::info!(
            host = %config.endpoint.host,
            port = config.endpoint.port,
            "connecting to mailbox server"
        );
        let stream = mailadmin_wire::open(&config.endpoint).await?;
        Self::from_stream(stream, &config.username, &config.password).await
    }
}

impl<S> MailboxSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs the login sequence over an already connected stream: greeting,
    /// LOGIN, CAPABILITY, NAMESPACE, then a STATUS check of the identity's
    /// own mailbox in the shared namespace. A PREAUTH greeting skips LOGIN.
    ///
    /// On failure the connection is logged out (when still usable) and
    /// closed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the credentials contain CR, LF
    /// or NUL, [`Error::Auth`] if LOGIN is rejected, [`Error::Bye`] if the
    /// server refuses the connection, and [`Error::Command`] or
    /// [`Error::Decode`] if CAPABILITY or NAMESPACE fail.
    pub async fn from_stream(stream: S, username: &str, password: &str) -> Result<Self> {
        let mut conn = Connection::new(stream);

        match Self::handshake(&mut conn, username, password).await {
            Ok((state, capabilities, namespaces)) => Ok(Self {
                conn,
                username: username.to_string(),
                state,
                capabilities,
                namespaces,
                folders: HashMap::new(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "session setup failed");
                if !e.is_fatal_to_connection() {
                    let _ = conn.execute(&Command::Logout).await;
                }
                let _ = conn.shutdown().await;
                Err(e)
            }
        }
    }

    async fn handshake(
        conn: &mut Connection<S>,
        username: &str,
        password: &str,
    ) -> Result<(SessionState, CapabilitySet, Namespaces)> {
        let (status, greeting) = conn.read_greeting().await?;
        tracing::debug!(%greeting, "server greeting");

        if status == Status::PreAuth {
            tracing::info!(username, "pre-authenticated, skipping LOGIN");
        } else {
            let login = Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            };
            let reply = conn.execute(&login).await?;
            if !reply.is_ok() {
                return Err(Error::Auth(reply.text));
            }
            tracing::info!(username, "logged in");
        }

        let reply = conn
            .execute(&Command::Capability)
            .await?
            .into_result("CAPABILITY")?;
        let capabilities = decode::capabilities(&reply.lines)?;

        let reply = conn
            .execute(&Command::Namespace)
            .await?
            .into_result("NAMESPACE")?;
        let namespaces = decode::namespaces(&reply.lines)?;
        tracing::debug!(?namespaces, "namespaces");

        let account = Command::Status {
            mailbox: namespaces.shared.path(username),
        };
        let state = if conn.execute(&account).await?.is_ok() {
            SessionState::Ready
        } else {
            tracing::warn!(username, "account does not exist");
            SessionState::AccountMissing
        };

        Ok((state, capabilities, namespaces))
    }

    /// Runs a command, marking the session logged out if the connection
    /// is lost.
    async fn run(&mut self, command: &Command) -> Result<Reply> {
        if self.state == SessionState::LoggedOut {
            return Err(mailadmin_wire::Error::Closed.into());
        }

        let result = self.conn.execute(command).await;
        if let Err(e) = &result
            && e.is_fatal_to_connection()
        {
            tracing::warn!(error = %e, "connection lost");
            self.state = SessionState::LoggedOut;
        }
        result
    }

    /// Runs a read command. `None` means the session is not ready or the
    /// server said NO/BAD.
    async fn read(&mut self, command: Command) -> Result<Option<Reply>> {
        if self.state != SessionState::Ready {
            tracing::debug!(
                command = command.name(),
                state = ?self.state,
                "skipping read, session not ready"
            );
            return Ok(None);
        }

        let reply = self.run(&command).await?;
        if reply.is_ok() {
            Ok(Some(reply))
        } else {
            tracing::warn!(
                command = command.name(),
                status = %reply.status,
                text = %reply.text,
                "read command failed"
            );
            Ok(None)
        }
    }

    /// Runs a mutation, turning NO/BAD into [`Error::Command`].
    async fn mutate(&mut self, command: Command) -> Result<()> {
        self.run(&command).await?.into_result(command.name())?;
        Ok(())
    }

    /// Storage usage of the identity's quota root.
    ///
    /// `None` when the session is not ready or the server rejects the
    /// query. A root without a limit is [`Quota::Unset`].
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a malformed QUOTA line.
    pub async fn get_quota_usage(&mut self) -> Result<Option<Quota>> {
        let mailbox = self.namespaces.shared.path(&self.username);
        match self.read(Command::GetQuotaRoot { mailbox }).await? {
            Some(reply) => decode::quota(&reply.lines).map(Some),
            None => Ok(None),
        }
    }

    /// Number of messages in the identity's own mailbox, or 0 when the
    /// session is not ready or the server rejects the query.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a malformed STATUS line.
    pub async fn get_message_count(&mut self) -> Result<u32> {
        let mailbox = self.namespaces.shared.path(&self.username);
        match self.read(Command::Status { mailbox }).await? {
            Some(reply) => decode::message_count(&reply.lines),
            None => Ok(0),
        }
    }

    /// Every folder visible to the identity, as the server names them.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a malformed LIST line.
    pub async fn list_folders(&mut self) -> Result<Vec<String>> {
        match self.read(Command::List).await? {
            Some(reply) => decode::folders(&reply.lines),
            None => Ok(Vec::new()),
        }
    }

    /// Selects a folder in the personal namespace and records its
    /// [`FolderState`]. Returns false if the session is not ready or the
    /// server rejects the selection.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or if the reply lacks EXISTS.
    pub async fn select_folder(&mut self, name: &str) -> Result<bool> {
        let mailbox = self.namespaces.personal.path(name);
        let Some(reply) = self.read(Command::Select { mailbox }).await? else {
            return Ok(false);
        };

        let state = decode::folder_state(&reply.lines)?;
        tracing::debug!(
            folder = name,
            messages = state.message_count,
            recent = state.recent_count,
            "selected"
        );
        self.folders.insert(name.to_string(), state);
        Ok(true)
    }

    /// Stores a flag on the messages of the selected folder.
    ///
    /// A NO or BAD completion is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure.
    pub async fn store_flag(
        &mut self,
        set: &SequenceSet,
        action: StoreAction,
        flag: Flag,
    ) -> Result<()> {
        let command = Command::Store {
            set: set.clone(),
            action,
            flag,
        };
        let reply = self.run(&command).await?;
        if !reply.is_ok() {
            tracing::warn!(%set, %action, %flag, text = %reply.text, "STORE rejected");
        }
        Ok(())
    }

    /// Marks messages `\Deleted`, replacing their other flags.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure.
    pub async fn delete_message(&mut self, set: &SequenceSet) -> Result<()> {
        self.store_flag(set, StoreAction::Set, Flag::Deleted).await
    }

    /// Grants `rights` on `mailbox` to `identifier`.
    ///
    /// The mailbox is rooted at `prefix`, or at the personal namespace
    /// when `prefix` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the change.
    pub async fn set_acl(
        &mut self,
        identifier: &str,
        rights: &AclRights,
        mailbox: &str,
        prefix: Option<&str>,
    ) -> Result<()> {
        let prefix = prefix.unwrap_or(&self.namespaces.personal.prefix);
        let command = Command::SetAcl {
            mailbox: format!("{prefix}{mailbox}"),
            identifier: identifier.to_string(),
            rights: rights.clone(),
        };
        self.mutate(command).await
    }

    /// Sets the storage limit of a quota root in the personal namespace.
    /// `None` removes the limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapability`] before sending anything if the
    /// server lacks QUOTA, or [`Error::Command`] if it rejects the change.
    pub async fn set_quota(&mut self, limit: Option<u64>, mailbox: &str) -> Result<()> {
        if !self.has_capability(&Capability::Quota) {
            return Err(Error::MissingCapability(Capability::Quota));
        }
        let command = Command::SetQuota {
            root: self.namespaces.personal.path(mailbox),
            limit,
        };
        self.mutate(command).await
    }

    /// Removes the storage limit of a quota root.
    ///
    /// # Errors
    ///
    /// Same as [`set_quota`](Self::set_quota).
    pub async fn remove_quota(&mut self, mailbox: &str) -> Result<()> {
        self.set_quota(None, mailbox).await
    }

    /// Creates a mailbox in the personal namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the creation.
    pub async fn create_mailbox(&mut self, name: &str) -> Result<()> {
        let mailbox = self.namespaces.personal.path(name);
        self.mutate(Command::Create { mailbox }).await
    }

    /// Deletes a mailbox in the personal namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the deletion.
    pub async fn delete_mailbox(&mut self, name: &str) -> Result<()> {
        let mailbox = self.namespaces.personal.path(name);
        self.mutate(Command::Delete { mailbox }).await
    }

    /// Subscribes to a mailbox in the personal namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the server rejects the subscription.
    pub async fn subscribe_mailbox(&mut self, name: &str) -> Result<()> {
        let mailbox = self.namespaces.personal.path(name);
        self.mutate(Command::Subscribe { mailbox }).await
    }

    /// Personal hierarchy delimiter, or the shared one for identities
    /// without a personal namespace.
    #[must_use]
    pub fn get_folder_delimiter(&self) -> &str {
        self.namespaces.delimiter()
    }

    /// Returns true if the server advertised the capability.
    #[must_use]
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Capabilities advertised after login.
    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Namespaces reported after login.
    #[must_use]
    pub const fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// State recorded by the last successful [`select_folder`](Self::select_folder)
    /// of `name`.
    #[must_use]
    pub fn folder_state(&self, name: &str) -> Option<&FolderState> {
        self.folders.get(name)
    }

    /// Most recent line read from the server.
    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        self.conn.last_response()
    }

    /// Logged-in user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails before the server confirms.
    pub async fn logout(mut self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Ok(());
        }
        let reply = self.conn.execute(&Command::Logout).await;
        let _ = self.conn.shutdown().await;
        self.state = SessionState::LoggedOut;
        reply?;
        tracing::info!(username = %self.username, "logged out");
        Ok(())
    }
}
