//! Connection endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain TCP. Administrative daemons usually listen on loopback or a
    /// management network without TLS.
    #[default]
    None,
    /// TLS from the start.
    Implicit,
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Connection timeout.
    #[serde(
        default = "default_connect_timeout",
        rename = "connect_timeout_secs",
        with = "duration_secs"
    )]
    pub connect_timeout: Duration,
}

const fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl Endpoint {
    /// Creates a plaintext endpoint with the default connect timeout.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            security: Security::None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Endpoint and credentials for one administrative session.
///
/// The password is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where to connect.
    pub endpoint: Endpoint,
    /// User name to authenticate as.
    pub username: String,
    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl SessionConfig {
    /// Creates a plaintext configuration.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.endpoint = self.endpoint.port(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub fn security(mut self, security: Security) -> Self {
        self.endpoint = self.endpoint.security(security);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint = self.endpoint.connect_timeout(timeout);
        self
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// (De)serializes a [`Duration`] as whole seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes the duration as seconds.
    #[allow(clippy::missing_errors_doc)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    /// Deserializes seconds into a duration.
    #[allow(clippy::missing_errors_doc)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
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
    fn test_endpoint_new() {
        let endpoint = Endpoint::new("imap.example.com", 143);
        assert_eq!(endpoint.host, "imap.example.com");
        assert_eq!(endpoint.port, 143);
        assert_eq!(endpoint.security, Security::None);
        assert_eq!(endpoint.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(endpoint.address(), "imap.example.com:143");
    }

    #[test]
    fn test_endpoint_builder() {
        let endpoint = Endpoint::new("imap.example.com", 143)
            .port(993)
            .security(Security::Implicit)
            .connect_timeout(Duration::from_secs(10));

        assert_eq!(endpoint.port, 993);
        assert_eq!(endpoint.security, Security::Implicit);
        assert_eq!(endpoint.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_endpoint_deserialize_defaults() {
        let endpoint: Endpoint =
            serde_json::from_str(r#"{"host":"mail.example.com","port":2000}"#).unwrap();
        assert_eq!(endpoint, Endpoint::new("mail.example.com", 2000));
    }

    #[test]
    fn test_endpoint_deserialize_full() {
        let endpoint: Endpoint = serde_json::from_str(
            r#"{"host":"mail.example.com","port":993,"security":"implicit","connect_timeout_secs":12}"#,
        )
        .unwrap();
        assert_eq!(endpoint.security, Security::Implicit);
        assert_eq!(endpoint.connect_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_endpoint_serialize_roundtrip_seconds() {
        let endpoint = Endpoint::new("h", 1).connect_timeout(Duration::from_secs(7));
        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(json.contains("\"connect_timeout_secs\":7"));
    }

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::new("sieve.example.com", 2000, "cyrus", "secret")
            .port(4190)
            .security(Security::Implicit)
            .connect_timeout(Duration::from_secs(10));
        assert_eq!(config.endpoint.address(), "sieve.example.com:4190");
        assert_eq!(config.endpoint.security, Security::Implicit);
        assert_eq!(config.endpoint.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_session_config_debug_redacts_password() {
        let config = SessionConfig::new("h", 143, "cyrus", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("cyrus"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_session_config_password_not_serialized() {
        let config = SessionConfig::new("h", 143, "cyrus", "hunter2");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));

        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.username, "cyrus");
        assert!(back.password.is_empty());
    }

    #[test]
    fn test_session_config_deserialize_minimal() {
        let json = r#"{"endpoint":{"host":"h","port":1143},"username":"u","password":"p"}"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint.port, 1143);
        assert_eq!(config.endpoint.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.password, "p");
    }
}
