//! SASL PLAIN (RFC 4616).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Mechanism name as sent in `AUTHENTICATE`.
pub const PLAIN: &str = "PLAIN";

/// Generates the PLAIN initial response.
///
/// The credentials are sent as an empty authorization identity, the
/// username and the password, separated by NUL bytes and base64-encoded.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let auth_string = format!("\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
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
    fn plain_response_format() {
        let response = plain_response("user@example.com", "secret");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(decoded, b"\0user@example.com\0secret");
    }

    #[test]
    fn plain_response_known_vector() {
        assert_eq!(plain_response("tim", "tanstaaftanstaaf"), "AHRpbQB0YW5zdGFhZnRhbnN0YWFm");
    }

    #[test]
    fn plain_response_non_ascii() {
        let response = plain_response("jörg", "pässwörd");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(decoded, "\0jörg\0pässwörd".as_bytes());
    }
}
