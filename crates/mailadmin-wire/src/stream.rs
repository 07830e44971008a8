//! Plain and TLS sockets.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::{Endpoint, Security};
use crate::{Error, Result};

/// Byte stream of an open connection.
pub enum WireStream {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS over TCP, boxed since the session state is large.
    Tls(Box<TlsStream<TcpStream>>),
}

/// Object-safe view of either variant.
trait Io: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> Io for T {}

impl WireStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn io(self: Pin<&mut Self>) -> Pin<&mut dyn Io> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp),
            Self::Tls(tls) => Pin::new(tls),
        }
    }
}

impl std::fmt::Debug for WireStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_tls() { "WireStream::Tls" } else { "WireStream::Plain" })
    }
}

impl AsyncRead for WireStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.io().poll_read(cx, buf)
    }
}

impl AsyncWrite for WireStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.io().poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.io().poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.io().poll_shutdown(cx)
    }
}

/// TLS connector trusting the bundled web PKI roots.
pub fn create_tls_connector() -> Result<TlsConnector> {
    let roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(rustls::RootCertStore { roots })
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Opens a connection to the endpoint.
///
/// Only the TCP connect is bounded by `connect_timeout`; once established,
/// reads block until the server answers or closes the stream.
pub async fn open(endpoint: &Endpoint) -> Result<WireStream> {
    let addr = endpoint.address();
    tracing::debug!(%addr, security = ?endpoint.security, "Connecting");

    let tcp = tokio::time::timeout(endpoint.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout {
            endpoint: addr.clone(),
            timeout: endpoint.connect_timeout,
        })??;

    match endpoint.security {
        Security::None => Ok(WireStream::Plain(tcp)),
        Security::Implicit => {
            let connector = create_tls_connector()?;
            let server_name = ServerName::try_from(endpoint.host.clone())?;
            let tls = connector.connect(server_name, tcp).await?;
            Ok(WireStream::Tls(Box::new(tls)))
        }
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
    fn tls_connector_builds() {
        assert!(create_tls_connector().is_ok());
    }

    #[tokio::test]
    async fn open_plain_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = open(&Endpoint::new("127.0.0.1", port)).await.unwrap();
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn refused_connect_is_io_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = open(&Endpoint::new("127.0.0.1", port)).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
