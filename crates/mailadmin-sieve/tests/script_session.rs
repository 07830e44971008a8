//! Integration tests for the script-management session.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use proptest::prelude::*;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailadmin_sieve::{Error, ScriptRecord, ScriptSession, Status};

/// Mock stream that returns predefined responses.
#[derive(Debug)]
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const GREETING: &str = "\"IMPLEMENTATION\" \"Cyrus timsieved v3.8\"\r\n\
                        \"SASL\" \"PLAIN LOGIN\"\r\n\
                        \"SIEVE\" \"fileinto reject vacation\"\r\n\
                        \"STARTTLS\"\r\n\
                        \"VERSION\" \"1.0\"\r\n\
                        OK\r\n";
const AUTH_OK: &str = "OK \"Authenticated.\"\r\n";

/// `AGphbmUAc2VjcmV0` is base64 of `\0jane\0secret`.
const AUTH_SENT: &str = "AUTHENTICATE \"PLAIN\" {16+}\r\nAGphbmUAc2VjcmV0\r\n";

async fn ready_session(rest: &str) -> (ScriptSession<MockStream>, Arc<Mutex<Vec<u8>>>) {
    init_tracing();
    let script = format!("{GREETING}{AUTH_OK}{rest}");
    let (stream, sent) = MockStream::new(script.as_bytes());
    let session = ScriptSession::from_stream(stream, "jane", "secret")
        .await
        .unwrap();
    sent.lock().unwrap().clear();
    (session, sent)
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

mod construction {
    use super::*;

    #[tokio::test]
    async fn greeting_and_plain_authentication() {
        init_tracing();
        let script = format!("{GREETING}{AUTH_OK}");
        let (stream, sent) = MockStream::new(script.as_bytes());

        let session = ScriptSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();

        assert_eq!(sent_text(&sent), AUTH_SENT);
        let caps = session.capabilities();
        assert_eq!(caps.implementation.as_deref(), Some("Cyrus timsieved v3.8"));
        assert!(caps.supports_sasl("plain"));
        assert!(caps.sieve.iter().any(|ext| ext == "vacation"));
        assert!(caps.starttls);
        assert_eq!(caps.version.as_deref(), Some("1.0"));
        assert_eq!(session.last_response(), Some("OK \"Authenticated.\""));
    }

    #[tokio::test]
    async fn rejected_credentials_log_out() {
        init_tracing();
        let script = format!("{GREETING}NO \"Authentication error\"\r\nOK\r\n");
        let (stream, sent) = MockStream::new(script.as_bytes());

        let err = ScriptSession::from_stream(stream, "jane", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(ref text) if text == "Authentication error"));
        assert!(sent_text(&sent).ends_with("LOGOUT\r\n"));
    }

    #[tokio::test]
    async fn bye_greeting() {
        init_tracing();
        let (stream, sent) = MockStream::new(b"BYE \"Too many connections\"\r\n");

        let err = ScriptSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Bye(ref text) if text == "Too many connections"));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_greeting_is_protocol_error() {
        init_tracing();
        let (stream, _sent) = MockStream::new(b"NO \"Service unavailable\"\r\n");

        let err = ScriptSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn line_break_in_credentials_is_never_sent() {
        init_tracing();
        let (stream, sent) = MockStream::new(format!("{GREETING}OK\r\n").as_bytes());

        let err = ScriptSession::from_stream(stream, "jane\r\nLOGOUT", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(sent_text(&sent), "LOGOUT\r\n");
    }

    #[tokio::test]
    async fn truncated_greeting() {
        init_tracing();
        let (stream, _sent) = MockStream::new(b"\"IMPLEMENTATION\" \"x\"\r\n");

        let err = ScriptSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Connection(ref e) if e.is_closed()));
    }
}

mod scripts {
    use super::*;

    #[tokio::test]
    async fn list_script_names() {
        let (mut session, sent) = ready_session(
            "\"summer_script\"\r\n\"vacation\" ACTIVE\r\n\"main\"\r\nOK\r\n",
        )
        .await;

        let names = session.list_script_names().await.unwrap();

        assert_eq!(sent_text(&sent), "LISTSCRIPTS\r\n");
        assert_eq!(
            names,
            vec![
                ("summer_script".to_string(), false),
                ("vacation".to_string(), true),
                ("main".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn empty_listing() {
        let (mut session, _sent) = ready_session("OK\r\n").await;
        assert!(session.list_script_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_scripts_fetches_bodies() {
        let (mut session, sent) = ready_session(
            "\"main\"\r\n\"vacation\" ACTIVE\r\nOK\r\n\
             {5}\r\nkeep;\r\nOK\r\n\
             {12}\r\nkeep;\r\nstop;\r\nOK\r\n",
        )
        .await;

        let scripts = session.list_scripts().await.unwrap();

        assert_eq!(
            sent_text(&sent),
            "LISTSCRIPTS\r\nGETSCRIPT \"main\"\r\nGETSCRIPT \"vacation\"\r\n"
        );
        assert_eq!(scripts.len(), 2);
        assert_eq!(
            scripts["main"],
            ScriptRecord {
                active: false,
                body: "keep;".to_string(),
            }
        );
        assert_eq!(
            scripts["vacation"],
            ScriptRecord {
                active: true,
                body: "keep;\r\nstop;".to_string(),
            }
        );
        assert_eq!(
            serde_json::to_value(&scripts).unwrap(),
            serde_json::json!({
                "main": { "active": false, "body": "keep;" },
                "vacation": { "active": true, "body": "keep;\r\nstop;" },
            })
        );
    }

    #[tokio::test]
    async fn get_missing_script() {
        let (mut session, _sent) =
            ready_session("NO (NONEXISTENT) \"There is no script by that name\"\r\n").await;

        let err = session.get_script("nope").await.unwrap_err();

        assert!(matches!(
            err,
            Error::Command { command: "GETSCRIPT", status: Status::No, ref text }
                if text == "There is no script by that name"
        ));
        assert_eq!(
            session.last_response(),
            Some("NO (NONEXISTENT) \"There is no script by that name\"")
        );
    }

    #[tokio::test]
    async fn put_script_sends_literal() {
        let (mut session, sent) = ready_session("OK\r\n").await;

        session
            .put_script("vacation", "require \"vacation\";\r\nvacation \"Away\";\r\n")
            .await
            .unwrap();

        assert_eq!(
            sent_text(&sent),
            "PUTSCRIPT \"vacation\" {39+}\r\nrequire \"vacation\";\r\nvacation \"Away\";\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn put_script_rejected() {
        let (mut session, _sent) =
            ready_session("NO \"line 1: parse error\"\r\n").await;

        let err = session.put_script("broken", "if {").await.unwrap_err();

        assert!(matches!(err, Error::Command { command: "PUTSCRIPT", .. }));
    }

    #[tokio::test]
    async fn set_active() {
        let (mut session, sent) = ready_session("OK\r\n").await;

        session.set_active("vacation").await.unwrap();

        assert_eq!(sent_text(&sent), "SETACTIVE \"vacation\"\r\n");
    }

    #[tokio::test]
    async fn line_break_in_script_name_is_never_sent() {
        let (mut session, sent) = ready_session("OK\r\n").await;

        let err = session
            .set_active("x\"\r\nDELETESCRIPT \"main")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!err.is_fatal_to_connection());

        assert!(session.get_script("a\nb").await.is_err());
        assert!(session.put_script("a\rb", "keep;").await.is_err());
        assert!(sent_text(&sent).is_empty());

        session.set_active("main").await.unwrap();
        assert_eq!(sent_text(&sent), "SETACTIVE \"main\"\r\n");
    }

    #[tokio::test]
    async fn oversized_literal_in_script_reply() {
        let (mut session, _sent) =
            ready_session("\"a{25}\r\n\"{18446744073709551615}\r\n\r\nOK\r\n").await;

        let err = session.get_script("main").await.unwrap_err();

        assert!(matches!(err, Error::Decode { reply: "GETSCRIPT", .. }));
    }

    #[tokio::test]
    async fn bye_mid_session() {
        let (mut session, _sent) = ready_session("BYE \"Idle timeout\"\r\n").await;

        let err = session.set_active("vacation").await.unwrap_err();

        assert!(matches!(err, Error::Bye(ref text) if text == "Idle timeout"));
        assert!(err.is_fatal_to_connection());
    }

    #[tokio::test]
    async fn lost_connection() {
        let (mut session, _sent) = ready_session("\"main\"\r\n").await;

        let err = session.list_script_names().await.unwrap_err();

        assert!(matches!(err, Error::Connection(ref e) if e.is_closed()));
    }

    #[tokio::test]
    async fn two_active_scripts_are_malformed() {
        let (mut session, _sent) =
            ready_session("\"a\" ACTIVE\r\n\"b\" ACTIVE\r\nOK\r\n").await;

        let err = session.list_script_names().await.unwrap_err();

        assert!(matches!(err, Error::Decode { reply: "LISTSCRIPTS", .. }));
    }

    #[tokio::test]
    async fn logout() {
        let (session, sent) = ready_session("OK \"Logout complete\"\r\n").await;

        session.logout().await.unwrap();

        assert_eq!(sent_text(&sent), "LOGOUT\r\n");
    }
}

proptest! {
    #[test]
    fn script_body_survives_upload_and_download(body in "[a-z ;{}\"\\\\\r\n]{0,64}") {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (sent, fetched) = rt.block_on(async {
            let rest = format!("OK\r\n{{{}}}\r\n{body}\r\nOK\r\n", body.len());
            let (mut session, sent) = ready_session(&rest).await;

            session.put_script("roundtrip", &body).await.unwrap();
            let fetched = session.get_script("roundtrip").await.unwrap();
            (sent_text(&sent), fetched)
        });

        let upload = format!("PUTSCRIPT \"roundtrip\" {{{}+}}\r\n{body}\r\n", body.len());
        prop_assert!(sent.starts_with(&upload));
        prop_assert_eq!(fetched, body);
    }
}
