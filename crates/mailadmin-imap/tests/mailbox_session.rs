//! Integration tests for the mailbox session.
//!
//! These tests script the server side with a mock stream and check both
//! the decoded results and the exact command lines the client sent.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpListener;

use mailadmin_imap::{
    AclPreset, AclRights, Capability, Error, Flag, MailboxSession, Quota, SequenceSet,
    SessionConfig, SessionState, Status, StoreAction,
};

/// Mock stream that returns predefined responses.
#[derive(Debug)]
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
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

const GREETING: &str = "* OK cyrus.example.com Cyrus IMAP v3.8 server ready\r\n";
const LOGIN_OK: &str = "A001 OK [CAPABILITY IMAP4rev1] User logged in\r\n";
const CAPABILITY: &str =
    "* CAPABILITY IMAP4rev1 LITERAL+ NAMESPACE QUOTA ACL AUTH=PLAIN\r\nA002 OK Completed\r\n";
const NAMESPACE: &str =
    "* NAMESPACE ((\"INBOX/\" \"/\")) ((\"user/\" \"/\")) ((\"\" \"/\"))\r\nA003 OK Completed\r\n";
const ACCOUNT_OK: &str = "* STATUS user/jane (MESSAGES 229)\r\nA004 OK Completed\r\n";
const ACCOUNT_NO: &str = "A004 NO Mailbox does not exist\r\n";

const HANDSHAKE_SENT: &str = "A001 LOGIN jane secret\r\n\
                              A002 CAPABILITY\r\n\
                              A003 NAMESPACE\r\n\
                              A004 STATUS user/jane (MESSAGES)\r\n";

/// Builds a session whose handshake succeeded, followed by `rest`.
async fn ready_session(rest: &str) -> (MailboxSession<MockStream>, Arc<Mutex<Vec<u8>>>) {
    init_tracing();
    let script = format!("{GREETING}{LOGIN_OK}{CAPABILITY}{NAMESPACE}{ACCOUNT_OK}{rest}");
    let (stream, sent) = MockStream::new(script.as_bytes());
    let session = MailboxSession::from_stream(stream, "jane", "secret")
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
    async fn handshake_reaches_ready() {
        init_tracing();
        let script = format!("{GREETING}{LOGIN_OK}{CAPABILITY}{NAMESPACE}{ACCOUNT_OK}");
        let (stream, sent) = MockStream::new(script.as_bytes());

        let session = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();

        assert_eq!(sent_text(&sent), HANDSHAKE_SENT);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.username(), "jane");
        assert!(session.has_capability(&Capability::Quota));
        assert!(session.has_capability(&Capability::Acl));
        assert!(!session.has_capability(&Capability::StartTls));
        assert!(session.capabilities().supports_auth("PLAIN"));
        assert_eq!(session.namespaces().personal.prefix, "INBOX/");
        assert_eq!(session.namespaces().shared.prefix, "user/");
        assert_eq!(session.get_folder_delimiter(), "/");
        assert_eq!(session.last_response(), Some("A004 OK Completed"));
    }

    #[tokio::test]
    async fn failed_account_status_means_account_missing() {
        init_tracing();
        let script = format!(
            "{GREETING}{LOGIN_OK}{CAPABILITY}{NAMESPACE}{ACCOUNT_NO}\
             A005 OK Completed\r\n"
        );
        let (stream, sent) = MockStream::new(script.as_bytes());

        let mut session = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::AccountMissing);
        sent.lock().unwrap().clear();

        // Reads are skipped without touching the wire.
        assert_eq!(session.get_message_count().await.unwrap(), 0);
        assert_eq!(session.get_quota_usage().await.unwrap(), None);
        assert!(session.list_folders().await.unwrap().is_empty());
        assert!(!session.select_folder("INBOX").await.unwrap());
        assert!(sent_text(&sent).is_empty());

        // Mutations still go out.
        session.create_mailbox("Sent").await.unwrap();
        assert_eq!(sent_text(&sent), "A005 CREATE INBOX/Sent\r\n");
    }

    #[tokio::test]
    async fn account_status_drains_untagged_lines() {
        init_tracing();
        let script = format!(
            "{GREETING}{LOGIN_OK}{CAPABILITY}{NAMESPACE}\
             * OK [ALERT] quota nearly exhausted\r\n\
             * STATUS user/jane (MESSAGES 3)\r\n\
             A004 OK Completed\r\n\
             * STATUS user/jane (MESSAGES 3)\r\nA005 OK Completed\r\n"
        );
        let (stream, _sent) = MockStream::new(script.as_bytes());

        let mut session = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.get_message_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn login_rejected_is_auth_error() {
        init_tracing();
        let script = format!("{GREETING}A001 NO Login failed: authentication failure\r\n");
        let (stream, sent) = MockStream::new(script.as_bytes());

        let err = MailboxSession::from_stream(stream, "jane", "wrong")
            .await
            .unwrap_err();

        assert!(
            matches!(&err, Error::Auth(text) if text == "Login failed: authentication failure")
        );
        assert!(!err.is_fatal_to_connection());
        // Best-effort LOGOUT before the socket is closed.
        assert_eq!(
            sent_text(&sent),
            "A001 LOGIN jane wrong\r\nA002 LOGOUT\r\n"
        );
    }

    #[tokio::test]
    async fn preauth_greeting_skips_login() {
        init_tracing();
        let script = "* PREAUTH cyrus.example.com logged in as jane\r\n\
                      * CAPABILITY IMAP4rev1 NAMESPACE QUOTA ACL\r\nA001 OK Completed\r\n\
                      * NAMESPACE ((\"INBOX/\" \"/\")) ((\"user/\" \"/\")) NIL\r\nA002 OK Completed\r\n\
                      * STATUS user/jane (MESSAGES 1)\r\nA003 OK Completed\r\n";
        let (stream, sent) = MockStream::new(script.as_bytes());

        let session = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();

        assert_eq!(
            sent_text(&sent),
            "A001 CAPABILITY\r\nA002 NAMESPACE\r\nA003 STATUS user/jane (MESSAGES)\r\n"
        );
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn line_break_in_password_is_never_sent() {
        init_tracing();
        let script = format!("{GREETING}A001 OK Completed\r\n");
        let (stream, sent) = MockStream::new(script.as_bytes());

        let err = MailboxSession::from_stream(stream, "jane", "secret\r\nA002 DELETE user/bob")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!err.to_string().contains("secret"));
        assert_eq!(sent_text(&sent), "A001 LOGOUT\r\n");
    }

    #[tokio::test]
    async fn bye_greeting_refuses_connection() {
        init_tracing();
        let (stream, sent) = MockStream::new(b"* BYE Too many open connections\r\n");

        let err = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Bye(_)));
        assert!(sent_text(&sent).is_empty());
    }

    #[tokio::test]
    async fn short_namespace_is_decode_error() {
        init_tracing();
        let script = format!(
            "{GREETING}{LOGIN_OK}{CAPABILITY}\
             * NAMESPACE ((\"INBOX/\" \"/\"))\r\nA003 OK Completed\r\n"
        );
        let (stream, _sent) = MockStream::new(script.as_bytes());

        let err = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                reply: "NAMESPACE",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn truncated_stream_is_connection_error() {
        init_tracing();
        let script = format!("{GREETING}{LOGIN_OK}* CAPABILITY IMAP4rev1\r\n");
        let (stream, _sent) = MockStream::new(script.as_bytes());

        let err = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Connection(e) if e.is_closed()));
    }

    #[tokio::test]
    async fn connect_over_tcp() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            writer.write_all(GREETING.as_bytes()).await.unwrap();

            let mut lines = BufReader::new(reader).lines();
            let mut received = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                let (tag, command) = line.split_once(' ').unwrap();
                let reply = match command.split(' ').next().unwrap() {
                    "CAPABILITY" => "* CAPABILITY IMAP4rev1 QUOTA\r\n".to_string(),
                    "NAMESPACE" => "* NAMESPACE NIL ((\"user/\" \"/\")) NIL\r\n".to_string(),
                    "LOGOUT" => "* BYE LOGOUT received\r\n".to_string(),
                    _ => String::new(),
                };
                let done = format!("{reply}{tag} OK Completed\r\n");
                writer.write_all(done.as_bytes()).await.unwrap();
                received.push(command.to_string());
                if command == "LOGOUT" {
                    break;
                }
            }
            received
        });

        let config = SessionConfig::new("127.0.0.1", port, "cyrus", "admin");
        let session = MailboxSession::connect(&config).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.namespaces().personal.prefix, "");
        assert_eq!(session.get_folder_delimiter(), "/");
        session.logout().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![
                "LOGIN cyrus admin",
                "CAPABILITY",
                "NAMESPACE",
                "STATUS user/cyrus (MESSAGES)",
                "LOGOUT",
            ]
        );
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn quota_usage() {
        let (mut session, sent) = ready_session(
            "* QUOTAROOT user/jane user/jane\r\n\
             * QUOTA user/jane (STORAGE 7 5000)\r\n\
             A005 OK Completed\r\n",
        )
        .await;

        let quota = session.get_quota_usage().await.unwrap().unwrap();
        assert_eq!(quota, Quota::Set { used: 7, total: 5000 });
        assert_eq!(quota.percent(), 0.14);
        assert_eq!(sent_text(&sent), "A005 GETQUOTAROOT user/jane\r\n");
    }

    #[tokio::test]
    async fn quota_rejected_is_none() {
        let (mut session, _sent) =
            ready_session("A005 NO Permission denied\r\n").await;
        assert_eq!(session.get_quota_usage().await.unwrap(), None);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn message_count() {
        let (mut session, sent) =
            ready_session("* STATUS user/jane (MESSAGES 231)\r\nA005 OK Completed\r\n").await;
        assert_eq!(session.get_message_count().await.unwrap(), 231);
        assert_eq!(sent_text(&sent), "A005 STATUS user/jane (MESSAGES)\r\n");
    }

    #[tokio::test]
    async fn malformed_message_count_is_decode_error() {
        let (mut session, _sent) =
            ready_session("* STATUS user/jane (UNSEEN 4)\r\nA005 OK Completed\r\n").await;
        assert!(matches!(
            session.get_message_count().await,
            Err(Error::Decode { reply: "STATUS", .. })
        ));
        // The session survives decode errors.
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn list_folders() {
        let (mut session, sent) = ready_session(
            "* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n\
             * LIST (\\HasNoChildren) \"/\" \"INBOX/Sent\"\r\n\
             A005 OK Completed\r\n",
        )
        .await;

        assert_eq!(
            session.list_folders().await.unwrap(),
            vec!["INBOX", "INBOX/Sent"]
        );
        assert_eq!(sent_text(&sent), "A005 LIST \"\" \"*\"\r\n");
    }

    #[tokio::test]
    async fn select_twice_is_stable() {
        let select = "* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen)\r\n\
                      * 18 EXISTS\r\n\
                      * 2 RECENT\r\n\
                      * OK [UIDVALIDITY 1700000000] Ok\r\n";
        let (mut session, sent) = ready_session(&format!(
            "{select}A005 OK [READ-WRITE] Completed\r\n{select}A006 OK [READ-WRITE] Completed\r\n"
        ))
        .await;

        assert!(session.select_folder("Sent").await.unwrap());
        let first = session.folder_state("Sent").unwrap().clone();
        assert!(session.select_folder("Sent").await.unwrap());
        let second = session.folder_state("Sent").unwrap();

        assert_eq!(first.message_count, 18);
        assert_eq!(first.recent_count, 2);
        assert_eq!(first.info.len(), 4);
        assert_eq!(first.message_count, second.message_count);
        assert_eq!(first.recent_count, second.recent_count);
        assert_eq!(
            sent_text(&sent),
            "A005 SELECT INBOX/Sent\r\nA006 SELECT INBOX/Sent\r\n"
        );
    }

    #[tokio::test]
    async fn select_rejected_returns_false() {
        let (mut session, _sent) =
            ready_session("A005 NO Mailbox does not exist\r\n").await;
        assert!(!session.select_folder("Nope").await.unwrap());
        assert!(session.folder_state("Nope").is_none());
        assert_eq!(
            session.last_response(),
            Some("A005 NO Mailbox does not exist")
        );
    }
}

mod mutations {
    use super::*;

    #[tokio::test]
    async fn store_and_delete_message() {
        let (mut session, sent) = ready_session(
            "* 3 FETCH (FLAGS (\\Seen))\r\nA005 OK Completed\r\n\
             A006 NO No mailbox selected\r\n",
        )
        .await;

        let set: SequenceSet = "3".parse().unwrap();
        session
            .store_flag(&set, StoreAction::Add, Flag::Seen)
            .await
            .unwrap();
        // A rejected STORE is not an error.
        session
            .delete_message(&SequenceSet::range(1, 4).unwrap())
            .await
            .unwrap();

        assert_eq!(
            sent_text(&sent),
            "A005 STORE 3 +FLAGS (\\Seen)\r\nA006 STORE 1:4 FLAGS (\\Deleted)\r\n"
        );
    }

    #[tokio::test]
    async fn set_acl_prefixes() {
        let (mut session, sent) =
            ready_session("A005 OK Completed\r\nA006 OK Completed\r\n").await;

        let read: AclRights = "read".parse().unwrap();
        session
            .set_acl("anyone", &read, "Shared", None)
            .await
            .unwrap();
        session
            .set_acl("bob", &AclPreset::All.into(), "bob/Trash", Some("user/"))
            .await
            .unwrap();

        assert_eq!(
            sent_text(&sent),
            "A005 SETACL INBOX/Shared anyone lrs\r\n\
             A006 SETACL user/bob/Trash bob lrswipcda\r\n"
        );
    }

    #[tokio::test]
    async fn remove_quota_then_read_is_unset() {
        let (mut session, sent) = ready_session(
            "A005 OK Completed\r\n\
             * QUOTAROOT user/jane user/jane\r\n\
             * QUOTA user/jane () \r\n\
             A006 OK Completed\r\n",
        )
        .await;

        session.remove_quota("jane").await.unwrap();
        let quota = session.get_quota_usage().await.unwrap().unwrap();

        assert_eq!(quota, Quota::Unset);
        assert_eq!((quota.used(), quota.total(), quota.percent()), (0, 0, 0.0));
        assert_eq!(
            sent_text(&sent),
            "A005 SETQUOTA \"INBOX/jane\" ()\r\nA006 GETQUOTAROOT user/jane\r\n"
        );
    }

    #[tokio::test]
    async fn set_quota_requires_capability() {
        init_tracing();
        let script = format!(
            "{GREETING}{LOGIN_OK}* CAPABILITY IMAP4rev1 ACL\r\nA002 OK Completed\r\n\
             {NAMESPACE}{ACCOUNT_OK}"
        );
        let (stream, sent) = MockStream::new(script.as_bytes());
        let mut session = MailboxSession::from_stream(stream, "jane", "secret")
            .await
            .unwrap();
        sent.lock().unwrap().clear();

        let err = session.set_quota(Some(5000), "jane").await.unwrap_err();
        assert!(matches!(err, Error::MissingCapability(Capability::Quota)));
        assert!(sent_text(&sent).is_empty());
    }

    #[tokio::test]
    async fn set_quota_sends_storage_limit() {
        let (mut session, sent) = ready_session("A005 OK Completed\r\n").await;
        session.set_quota(Some(5000), "jane").await.unwrap();
        assert_eq!(
            sent_text(&sent),
            "A005 SETQUOTA \"INBOX/jane\" (STORAGE 5000)\r\n"
        );
    }

    #[tokio::test]
    async fn rejected_mutation_is_command_error() {
        let (mut session, _sent) = ready_session(
            "A005 NO Mailbox already exists\r\n\
             A006 BAD Invalid mailbox name\r\n\
             A007 OK Completed\r\n",
        )
        .await;

        let err = session.create_mailbox("Sent").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Command {
                command: "CREATE",
                status: Status::No,
                ..
            }
        ));

        let err = session.delete_mailbox("bad%name").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Command {
                command: "DELETE",
                status: Status::Bad,
                ..
            }
        ));

        session.subscribe_mailbox("Sent").await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn line_break_in_mailbox_name_is_rejected() {
        let (mut session, sent) = ready_session("A005 OK Completed\r\n").await;

        let err = session
            .create_mailbox("evil\r\nA099 DELETE user/victim")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!err.is_fatal_to_connection());
        assert!(sent_text(&sent).is_empty());

        let err = session
            .set_acl("bob\nA098 DELETE INBOX", &AclPreset::Read.into(), "Shared", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(sent_text(&sent).is_empty());

        // The rejected commands consumed no tag.
        session.create_mailbox("Sent").await.unwrap();
        assert_eq!(sent_text(&sent), "A005 CREATE INBOX/Sent\r\n");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn lost_connection_logs_out() {
        let (mut session, sent) = ready_session("* 1 EXISTS\r\n").await;

        let err = session.select_folder("Sent").await.unwrap_err();
        assert!(err.is_fatal_to_connection());
        assert_eq!(session.state(), SessionState::LoggedOut);

        // Nothing more is sent once the connection is gone.
        sent.lock().unwrap().clear();
        assert!(session.list_folders().await.unwrap().is_empty());
        let err = session.create_mailbox("Sent").await.unwrap_err();
        assert!(matches!(&err, Error::Connection(e) if e.is_closed()));
        assert!(sent_text(&sent).is_empty());
        session.logout().await.unwrap();
    }

    #[tokio::test]
    async fn logout_sends_logout() {
        let (session, sent) =
            ready_session("* BYE LOGOUT received\r\nA005 OK Completed\r\n").await;
        session.logout().await.unwrap();
        assert_eq!(sent_text(&sent), "A005 LOGOUT\r\n");
    }
}
