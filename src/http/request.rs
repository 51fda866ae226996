//! Request parsing.
//!
//! # Wire Format
//! ```text
//! METHOD SP TARGET SP VERSION CRLF
//! Name: Value CRLF
//! ...
//! CRLF
//! ```
//!
//! Only the head is parsed. Bytes after the blank line stay in the
//! buffered reader, either for the next parse or for a handler that reads
//! a body itself through [`Request::body`].

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader, ReadHalf};
use tokio::sync::OwnedMutexGuard;

use crate::config::LimitsConfig;
use crate::http::response::ResponseWriter;
use crate::net::{ConnectionId, Transport};

/// Buffered read side of a connection.
pub type BufferedReader = BufReader<ReadHalf<Transport>>;

/// Reasons a request head could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// End of stream before a complete request line.
    #[error("stream closed")]
    StreamClosed,
    /// Request line with fewer than three tokens.
    #[error("malformed request line: {line:?}")]
    MalformedRequestLine { line: String },
    /// End of stream inside the header block.
    #[error("stream closed before end of headers")]
    TruncatedHeaders,
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("more than {limit} header lines")]
    TooManyHeaders { limit: usize },
    #[error("timed out reading request head")]
    TimedOut,
    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// Whether this is an ordinary client disconnect between requests.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, ParseError::StreamClosed)
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ParseError::StreamClosed => "stream_closed",
            ParseError::MalformedRequestLine { .. } => "malformed_request_line",
            ParseError::TruncatedHeaders => "truncated_headers",
            ParseError::LineTooLong { .. } => "line_too_long",
            ParseError::TooManyHeaders { .. } => "too_many_headers",
            ParseError::TimedOut => "timed_out",
            ParseError::Io(_) => "io",
        }
    }
}

/// Limits applied while reading one request head.
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits {
    pub max_line_bytes: usize,
    pub max_headers: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for ParseLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_line_bytes: config.max_line_bytes,
            max_headers: config.max_headers,
        }
    }
}

/// Method, target, version and headers of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: String,
    /// Header names are kept as received; a repeated name keeps its last value.
    pub headers: HashMap<String, String>,
}

/// Read one request head from `reader`.
///
/// Header lines without a colon are skipped. Nothing past the blank line
/// that ends the head is consumed.
pub async fn parse_request<R>(reader: &mut R, limits: &ParseLimits) -> Result<RequestHead, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader, limits.max_line_bytes)
        .await?
        .ok_or(ParseError::StreamClosed)?;
    let line = line.trim();

    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 3 {
        return Err(ParseError::MalformedRequestLine {
            line: line.to_string(),
        });
    }

    let mut headers = HashMap::new();
    let mut header_lines = 0;
    loop {
        let line = read_line(reader, limits.max_line_bytes)
            .await?
            .ok_or(ParseError::TruncatedHeaders)?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        header_lines += 1;
        if header_lines > limits.max_headers {
            return Err(ParseError::TooManyHeaders {
                limit: limits.max_headers,
            });
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    Ok(RequestHead {
        method: parts[0].to_string(),
        target: parts[1].to_string(),
        version: parts[2].to_string(),
        headers,
    })
}

/// Read up to and including the next `\n`.
///
/// Returns `None` at end of stream, including when the stream ends
/// part-way through a line.
async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        if buf.len() > limit {
            return Err(ParseError::LineTooLong { limit });
        }
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// A parsed request bound to the connection it arrived on.
///
/// A `Request` holds the connection's buffered reader for as long as it
/// lives, so a handler can read a body without racing the next parse.
pub struct Request {
    head: RequestHead,
    connection_id: ConnectionId,
    peer_addr: SocketAddr,
    writer: ResponseWriter,
    reader: OwnedMutexGuard<BufferedReader>,
}

impl Request {
    pub(crate) fn new(
        head: RequestHead,
        writer: ResponseWriter,
        reader: OwnedMutexGuard<BufferedReader>,
    ) -> Self {
        Self {
            head,
            connection_id: writer.connection_id(),
            peer_addr: writer.peer_addr(),
            writer,
            reader,
        }
    }

    pub fn method(&self) -> &str {
        &self.head.method
    }

    pub fn target(&self) -> &str {
        &self.head.target
    }

    pub fn version(&self) -> &str {
        &self.head.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.head.headers
    }

    /// Look up a header by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).map(String::as_str)
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// A writer for the connection this request arrived on.
    pub fn writer(&self) -> ResponseWriter {
        self.writer.clone()
    }

    /// The connection's buffered reader, positioned right after the head.
    pub fn body(&mut self) -> &mut BufferedReader {
        &mut self.reader
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.head.method)
            .field("target", &self.head.target)
            .field("connection_id", &self.connection_id)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(input: &[u8]) -> Result<RequestHead, ParseError> {
        let mut reader = input;
        parse_request(&mut reader, &ParseLimits::default()).await
    }

    #[tokio::test]
    async fn parses_request_line_and_headers() {
        let head = parse(b"GET /hello HTTP/1.1\r\nHost: example\r\nAccept:  */* \r\n\r\n")
            .await
            .unwrap();

        assert_eq!(head.method, "GET");
        assert_eq!(head.target, "/hello");
        assert_eq!(head.version, "HTTP/1.1");
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.headers["Host"], "example");
        assert_eq!(head.headers["Accept"], "*/*");
    }

    #[tokio::test]
    async fn duplicate_header_keeps_last_value() {
        let head = parse(b"GET / HTTP/1.1\r\nX-Tag: one\r\nX-Tag: two\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(head.headers["X-Tag"], "two");
    }

    #[tokio::test]
    async fn header_names_are_case_sensitive() {
        let head = parse(b"GET / HTTP/1.1\r\nhost: a\r\nHost: b\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(head.headers["host"], "a");
        assert_eq!(head.headers["Host"], "b");
    }

    #[tokio::test]
    async fn value_keeps_colons_after_the_first() {
        let head = parse(b"GET / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(head.headers["Host"], "localhost:8080");
    }

    #[tokio::test]
    async fn line_without_colon_is_skipped() {
        let head = parse(b"POST /items HTTP/1.1\r\nHost: x\r\ngarbage line\r\nContent-Type: text/plain\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.headers["Host"], "x");
        assert_eq!(head.headers["Content-Type"], "text/plain");
    }

    #[tokio::test]
    async fn bare_newlines_are_accepted() {
        let head = parse(b"GET /x HTTP/1.0\nA: 1\n\n").await.unwrap();
        assert_eq!(head.target, "/x");
        assert_eq!(head.headers["A"], "1");
    }

    #[tokio::test]
    async fn too_few_tokens_is_malformed() {
        let err = parse(b"BAD\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine { ref line } if line == "BAD"));

        let err = parse(b"GET /\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine { .. }));
    }

    #[tokio::test]
    async fn extra_tokens_are_ignored() {
        let head = parse(b"GET / HTTP/1.1 trailing\r\n\r\n").await.unwrap();
        assert_eq!(head.version, "HTTP/1.1");
    }

    #[tokio::test]
    async fn empty_stream_is_stream_closed() {
        assert!(parse(b"").await.unwrap_err().is_clean_close());
    }

    #[tokio::test]
    async fn partial_request_line_is_stream_closed() {
        assert!(matches!(
            parse(b"GET / HTTP/1.1").await.unwrap_err(),
            ParseError::StreamClosed
        ));
    }

    #[tokio::test]
    async fn eof_inside_headers_is_truncated() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::TruncatedHeaders));
        assert!(!err.is_clean_close());
    }

    #[tokio::test]
    async fn leaves_body_and_next_request_unread() {
        let mut reader: &[u8] = b"POST /a HTTP/1.1\r\n\r\nbodyGET /b HTTP/1.1\r\n\r\n";
        let limits = ParseLimits::default();

        let first = parse_request(&mut reader, &limits).await.unwrap();
        assert_eq!(first.target, "/a");
        assert!(reader.starts_with(b"body"));

        let mut body = [0u8; 4];
        reader.read_exact(&mut body).await.unwrap();
        let second = parse_request(&mut reader, &limits).await.unwrap();
        assert_eq!(second.target, "/b");
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let limits = ParseLimits {
            max_line_bytes: 16,
            max_headers: 10,
        };
        let mut reader: &[u8] = b"GET /a-very-long-target-indeed HTTP/1.1\r\n\r\n";
        let err = parse_request(&mut reader, &limits).await.unwrap_err();
        assert!(matches!(err, ParseError::LineTooLong { limit: 16 }));
    }

    #[tokio::test]
    async fn header_count_is_bounded() {
        let limits = ParseLimits {
            max_line_bytes: 1024,
            max_headers: 2,
        };
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n";
        let err = parse_request(&mut reader, &limits).await.unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders { limit: 2 }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let head = parse(b"GET /caf\xe9 HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(head.target, "/caf\u{fffd}");
    }
}
