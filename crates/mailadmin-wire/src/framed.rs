//! Framed line I/O.
//!
//! Both administrative protocols exchange CRLF-terminated lines, with
//! byte-counted literals (`{n}` or `{n+}` at the end of a line) carrying
//! payloads that may themselves contain line breaks. [`LineStream`] reads
//! one logical line at a time: a line announcing a literal is extended with
//! the literal bytes and the rest of the line that follows them.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
pub const MAX_LITERAL_SIZE: usize = 32 * 1024 * 1024; // 32 MB

/// Maximum size of one logical line, literals and continuations included.
pub const MAX_LOGICAL_LINE_LENGTH: usize = MAX_LITERAL_SIZE + MAX_LINE_LENGTH;

/// Line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Framed connection with line reading and buffered writing.
pub struct LineStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    max_logical_line: usize,
}

impl<S> std::fmt::Debug for LineStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").finish_non_exhaustive()
    }
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            max_logical_line: MAX_LOGICAL_LINE_LENGTH,
        }
    }

    /// Reads one logical response line and strips its terminator.
    ///
    /// End of stream is reported as [`Error::Closed`], never as an empty line.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let mut raw = self.read_raw_line().await?;

            if let Some(literal_len) = parse_literal_length(&raw) {
                if literal_len > MAX_LITERAL_SIZE {
                    return Err(Error::LiteralTooLarge {
                        size: literal_len,
                        max: MAX_LITERAL_SIZE,
                    });
                }
                line.append(&mut raw);
                if literal_len > self.max_logical_line.saturating_sub(line.len()) {
                    return Err(Error::LineTooLong(self.max_logical_line));
                }

                let start = line.len();
                line.resize(start + literal_len, 0);
                self.reader
                    .read_exact(&mut line[start..])
                    .await
                    .map_err(closed_on_eof)?;
                // The line continues after the literal.
            } else {
                raw.truncate(raw.len() - CRLF.len());
                line.append(&mut raw);
                if line.len() > self.max_logical_line {
                    return Err(Error::LineTooLong(self.max_logical_line));
                }
                break;
            }
        }

        let line = String::from_utf8(line)?;
        tracing::trace!(line = %line, "S:");
        Ok(line)
    }

    /// Reads a single CRLF-terminated line, terminator included.
    async fn read_raw_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Closed);
            }

            // A CR may have ended the previous chunk.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                break;
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::LineTooLong(MAX_LINE_LENGTH));
            }
        }

        Ok(line)
    }

    /// Writes `text` followed by CRLF in a single write.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(text.as_bytes());
        self.write_buffer.extend_from_slice(CRLF);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Writes literal payload bytes followed by the CRLF that ends the command.
    pub async fn write_literal(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);
        self.write_buffer.extend_from_slice(CRLF);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Shuts down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

fn closed_on_eof(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Closed
    } else {
        Error::Io(err)
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
#[must_use]
pub fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(CRLF)?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
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

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
        assert_eq!(find_crlf(b"just\r"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"{123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"PUTSCRIPT \"x\" {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[tokio::test]
    async fn test_read_line_strips_crlf() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = LineStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "* OK ready");
    }

    #[tokio::test]
    async fn test_read_line_split_across_reads() {
        let mock = Builder::new()
            .read(b"A001 OK LOG")
            .read(b"IN completed\r")
            .read(b"\n* next\r\n")
            .build();
        let mut framed = LineStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "A001 OK LOGIN completed");
        assert_eq!(framed.read_line().await.unwrap(), "* next");
    }

    #[tokio::test]
    async fn test_read_line_with_literal() {
        let mock = Builder::new()
            .read(b"{12}\r\n")
            .read(b"keep;\r\nstop;")
            .read(b"\r\nOK\r\n")
            .build();
        let mut framed = LineStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "{12}\r\nkeep;\r\nstop;");
        assert_eq!(framed.read_line().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_read_line_literal_looking_like_status() {
        let mock = Builder::new().read(b"{4}\r\nOK\r\n\r\nOK\r\n").build();
        let mut framed = LineStream::new(mock);

        assert_eq!(framed.read_line().await.unwrap(), "{4}\r\nOK\r\n");
        assert_eq!(framed.read_line().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_read_line_eof_is_closed() {
        let mock = Builder::new().read(b"* partial").build();
        let mut framed = LineStream::new(mock);

        let err = framed.read_line().await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_read_line_eof_inside_literal_is_closed() {
        let mock = Builder::new().read(b"{10}\r\nshort").build();
        let mut framed = LineStream::new(mock);

        let err = framed.read_line().await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_write_line_appends_crlf() {
        let mock = Builder::new().write(b"A001 LOGIN user pass\r\n").build();
        let mut framed = LineStream::new(mock);

        framed.write_line("A001 LOGIN user pass").await.unwrap();
    }

    #[tokio::test]
    async fn test_write_literal() {
        let mock = Builder::new()
            .write(b"PUTSCRIPT \"a\" {5+}\r\n")
            .write(b"keep;\r\n")
            .build();
        let mut framed = LineStream::new(mock);

        framed.write_line("PUTSCRIPT \"a\" {5+}").await.unwrap();
        framed.write_literal(b"keep;").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("{{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = LineStream::new(mock);

        let err = framed.read_line().await.unwrap_err();
        assert!(err.to_string().contains("Literal too large"));
    }

    #[tokio::test]
    async fn test_chained_literals_are_capped() {
        let chunk = b"{10}\r\n0123456789";
        let mock = Builder::new()
            .read(chunk)
            .read(chunk)
            .read(chunk)
            .build();
        let mut framed = LineStream::new(mock);
        framed.max_logical_line = 32;

        let err = framed.read_line().await.unwrap_err();
        assert!(matches!(err, Error::LineTooLong(32)));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = LineStream::new(mock);

        let err = framed.read_line().await.unwrap_err();
        assert!(matches!(err, Error::LineTooLong(_)));
    }
}
