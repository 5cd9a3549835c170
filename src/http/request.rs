use crate::{
    errors::ErrorKind,
    http::{
        headers::Headers,
        types::{self, CRLF},
    },
    limits::ReqLimits,
};
use memchr::memmem;
use tokio::io::{AsyncRead, AsyncReadExt};

/// HTTP/1.1 request, built incrementally from raw bytes.
///
/// # Input data requirements
///
/// #### General designations
/// - `SP`: ASCII space (0x20), exactly one between fields
/// - `CRLF`: Carriage return + line feed (`"\r\n"`) - **exactly this sequence required**
///
/// ## First line
///
/// Template string:
/// ```text
/// [METHOD] SP [TARGET] SP "HTTP/1.1" CRLF
/// ```
/// Where:
/// - `[METHOD]`: one or more ASCII uppercase letters (`GET`, `POST`, `BREW`, ...)
/// - `[TARGET]`: any bytes without spaces, kept verbatim
///
/// ## Header
///
/// Template string:
/// ```text
/// [NAME] ":" [VALUE] CRLF
/// ```
/// Where:
/// - `[NAME]`: token characters only, no whitespace before the colon
/// - `[VALUE]`: trimmed of surrounding whitespace
///
/// Repeated names are merged into one value joined with `", "`.
///
/// ## Body
///
/// Only bodies framed by `Content-Length` are read. Without that header the
/// request ends right after the blank line.
///
/// **Not supported**: `Transfer-Encoding: chunked` request bodies.
///
/// # Examples
/// ```
/// use raw_http::{ParseState, Request};
///
/// let mut req = Request::new();
/// let data = b"POST /submit HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi";
///
/// assert_eq!(req.parse(&data[..10]), Ok(0)); // no full line yet
/// assert_eq!(req.parse(data), Ok(data.len()));
/// assert_eq!(req.state(), ParseState::Done);
/// assert_eq!(req.method(), "POST");
/// assert_eq!(req.body(), b"hi");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    request_line: RequestLine,
    headers: Headers,
    body: Vec<u8>,
    state: ParseState,
}

/// `<method> <request-target> HTTP/<version>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestLine {
    pub method: String,
    pub request_target: String,
    /// Always `"1.1"` for a parsed request.
    pub http_version: String,
}

/// Progress of a [`Request`] through its framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParseState {
    #[default]
    Start,
    Headers,
    Body,
    Done,
}

impl Request {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses one request from `reader` with default [`ReqLimits`].
    ///
    /// See [`Parser::read_request`].
    #[inline]
    pub async fn from_reader<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ErrorKind> {
        Parser::new(&ReqLimits::default()).read_request(reader).await
    }
}

// Public API
impl Request {
    #[inline(always)]
    pub const fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    #[inline(always)]
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    /// Raw request target, e.g. `/api/users?id=1`.
    #[inline(always)]
    pub fn target(&self) -> &str {
        &self.request_line.request_target
    }

    #[inline(always)]
    pub fn version(&self) -> &str {
        &self.request_line.http_version
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive header lookup.
    #[inline(always)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body, empty when no `Content-Length` was sent.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline(always)]
    pub const fn state(&self) -> ParseState {
        self.state
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }
}

// State machine
impl Request {
    /// Feeds the unconsumed bytes of the stream to the parser.
    ///
    /// Runs as many state transitions as `data` allows and returns how many
    /// bytes were consumed. `Ok(0)` means more input is needed; the caller
    /// must offer the same bytes again, followed by new ones.
    ///
    /// # Errors
    ///
    /// Any error is final. [`AlreadyDone`](ErrorKind::AlreadyDone) is
    /// returned when called after the request is complete.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        if self.state == ParseState::Done {
            return Err(ErrorKind::AlreadyDone);
        }

        let mut total = 0;
        while self.state != ParseState::Done {
            let n = self.parse_single(&data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }

        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        match self.state {
            ParseState::Start => {
                let Some((request_line, n)) = RequestLine::parse(data)? else {
                    return Ok(0);
                };

                self.request_line = request_line;
                self.state = ParseState::Headers;
                Ok(n)
            }
            ParseState::Headers => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.state = ParseState::Body;
                }
                Ok(n)
            }
            ParseState::Body => self.parse_body(data),
            ParseState::Done => Err(ErrorKind::AlreadyDone),
        }
    }

    #[inline]
    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ErrorKind> {
        let Some(expected) = self.content_length()? else {
            self.state = ParseState::Done;
            return Ok(0);
        };

        let available = self.body.len() + data.len();
        if available > expected {
            return Err(ErrorKind::BodyLengthMismatch {
                expected,
                available,
            });
        }

        self.body.extend_from_slice(data);
        if self.body.len() == expected {
            self.state = ParseState::Done;
        }

        Ok(data.len())
    }

    /// Declared body length. An empty `Content-Length` counts as absent.
    #[inline]
    pub fn content_length(&self) -> Result<Option<usize>, ErrorKind> {
        match self.headers.get("content-length") {
            None | Some("") => Ok(None),
            Some(value) => types::slice_to_usize(value.as_bytes())
                .map(Some)
                .ok_or(ErrorKind::InvalidContentLength),
        }
    }
}

impl RequestLine {
    /// Parses the start line, returning it with the bytes it spans
    /// (terminator included), or `None` if the terminator has not arrived.
    fn parse(data: &[u8]) -> Result<Option<(Self, usize)>, ErrorKind> {
        let Some(end) = memmem::find(data, CRLF) else {
            return Ok(None);
        };

        let line = simdutf8::basic::from_utf8(&data[..end]).map_err(|_| ErrorKind::InvalidEncoding)?;

        let mut parts = line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ErrorKind::MalformedStartLine);
        };

        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ErrorKind::InvalidMethod);
        }

        let mut version_parts = version.split('/');
        let http_version = match (version_parts.next(), version_parts.next(), version_parts.next()) {
            (Some("HTTP"), Some(number @ "1.1"), None) => number,
            _ => return Err(ErrorKind::UnsupportedVersion),
        };

        let request_line = RequestLine {
            method: method.to_owned(),
            request_target: target.to_owned(),
            http_version: http_version.to_owned(),
        };
        Ok(Some((request_line, end + CRLF.len())))
    }
}

//

/// Reads requests from a byte stream into a growable buffer.
///
/// Each read lands after the bytes the parser has not consumed yet. The
/// parser sees the whole unconsumed tail every time, then the consumed
/// prefix is shifted out. When the buffer is full it doubles, up to
/// [`ReqLimits::max_buffer_size`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parser {
    len: usize,
    received: usize,
    buffer: Vec<u8>,
    max_size: usize,
}

impl Parser {
    #[inline]
    pub fn new(limits: &ReqLimits) -> Self {
        let size = limits.initial_buffer_size.max(1);

        Parser {
            len: 0,
            received: 0,
            buffer: vec![0; size],
            max_size: limits.max_buffer_size.max(size),
        }
    }

    /// Total bytes read from the source so far.
    #[inline]
    pub const fn received(&self) -> usize {
        self.received
    }

    /// Current buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Reads from `source` until one request is complete.
    ///
    /// Bytes received after the end of the request stay in the buffer and are
    /// parsed first by the next call, before anything new is read.
    ///
    /// # Errors
    ///
    /// - [`IncompleteMessage`](ErrorKind::IncompleteMessage): the source ended first
    /// - [`RequestTooLarge`](ErrorKind::RequestTooLarge): the buffer would
    ///   grow past its limit
    /// - [`Io`](ErrorKind::Io): the source failed
    /// - any parse error from [`Request::parse`]
    pub async fn read_request<R: AsyncRead + Unpin>(
        &mut self,
        source: &mut R,
    ) -> Result<Request, ErrorKind> {
        let mut request = Request::new();

        loop {
            if self.len > 0 {
                let parsed = request.parse(&self.buffer[..self.len])?;
                self.consume(parsed);

                if request.is_done() {
                    return Ok(request);
                }
            }

            if self.len == self.buffer.len() {
                self.grow()?;
            }

            let n = source.read(&mut self.buffer[self.len..]).await?;
            if n == 0 {
                return Err(ErrorKind::IncompleteMessage);
            }
            self.len += n;
            self.received += n;
        }
    }

    #[inline]
    fn grow(&mut self) -> Result<(), ErrorKind> {
        if self.buffer.len() >= self.max_size {
            return Err(ErrorKind::RequestTooLarge);
        }

        let size = (self.buffer.len() * 2).min(self.max_size);
        self.buffer.resize(size, 0);
        Ok(())
    }

    #[inline]
    fn consume(&mut self, parsed: usize) {
        if parsed > 0 {
            self.buffer.copy_within(parsed..self.len, 0);
            self.len -= parsed;
        }
    }
}



#[cfg(test)]
mod parser_tests {
    use super::*;
    use crate::tools::*;

    const FULL: &[u8] =
        b"POST /api/items?x=1 HTTP/1.1\r\nHost: localhost:42069\r\nX-Tag: a\r\nx-tag: b\r\nContent-Length: 11\r\n\r\nhello world";

    #[tokio::test]
    async fn whole_input() {
        let mut source = FULL;
        let req = Request::from_reader(&mut source).await.unwrap();

        assert_eq!(req.method(), "POST");
        assert_eq!(req.target(), "/api/items?x=1");
        assert_eq!(req.header("x-tag"), Some("a, b"));
        assert_eq!(req.body(), b"hello world");
    }

    #[tokio::test]
    async fn same_result_for_any_split() {
        let mut whole = FULL;
        let expected = Request::from_reader(&mut whole).await.unwrap();

        for step in [1, 2, 3, 5, 7, 16, 64, FULL.len()] {
            let mut source = ChunkReader::new(FULL, step);
            let req = Request::from_reader(&mut source).await.unwrap();
            assert_eq!(req, expected, "step {step}");
        }
    }

    #[tokio::test]
    async fn same_result_for_any_initial_buffer() {
        let mut whole = FULL;
        let expected = Request::from_reader(&mut whole).await.unwrap();

        for size in [0, 1, 3, 8, 4096] {
            let limits = ReqLimits {
                initial_buffer_size: size,
                ..ReqLimits::default()
            };
            let mut parser = Parser::new(&limits);
            let mut source = ChunkReader::new(FULL, 3);

            assert_eq!(parser.read_request(&mut source).await, Ok(expected.clone()));
            assert_eq!(parser.received(), FULL.len());
        }
    }

    #[tokio::test]
    async fn buffer_doubles() {
        let mut parser = Parser::new(&ReqLimits::default());
        assert_eq!(parser.capacity(), 8);

        // the longest unconsumed run is the 36 byte request line
        let mut source = ChunkReader::new(
            b"GET /a/rather/long/target HTTP/1.1\r\n\r\n",
            1,
        );
        parser.read_request(&mut source).await.unwrap();
        assert_eq!(parser.capacity(), 64);
    }

    #[tokio::test]
    async fn incomplete() {
        let cases: [&[u8]; 4] = [
            b"",
            b"GET / HTTP/1.1",
            b"GET / HTTP/1.1\r\nHost: x\r\n",
            b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nabc",
        ];

        for data in cases {
            let mut source = ChunkReader::new(data, 2);
            assert_eq!(
                Request::from_reader(&mut source).await,
                Err(ErrorKind::IncompleteMessage),
                "{:?}",
                str_op(data)
            );
        }
    }

    #[tokio::test]
    async fn parse_error_aborts() {
        let mut source = ChunkReader::new(b"GET / HTTP/1.1\r\nHost : x\r\n\r\n", 4);
        assert_eq!(
            Request::from_reader(&mut source).await,
            Err(ErrorKind::InvalidHeaderKey)
        );

        let mut source =
            ChunkReader::new(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nabc", 64);
        assert_eq!(
            Request::from_reader(&mut source).await,
            Err(ErrorKind::BodyLengthMismatch {
                expected: 2,
                available: 3,
            })
        );
    }

    #[tokio::test]
    async fn too_large() {
        let limits = ReqLimits {
            initial_buffer_size: 4,
            max_buffer_size: 16,
            ..ReqLimits::default()
        };
        let mut parser = Parser::new(&limits);
        let mut source = ChunkReader::new(b"GET /far/too/long/for/sixteen HTTP/1.1\r\n\r\n", 5);

        assert_eq!(
            parser.read_request(&mut source).await,
            Err(ErrorKind::RequestTooLarge)
        );
        assert_eq!(parser.capacity(), 16);
    }

    #[tokio::test]
    async fn buffered_request_parsed_first() {
        let limits = ReqLimits {
            initial_buffer_size: 64,
            ..ReqLimits::default()
        };
        let data = b"GET /a HTTP/1.1\r\n\r\nPOST /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nok";
        let mut parser = Parser::new(&limits);
        let mut source = ChunkReader::new(data, data.len());

        let first = parser.read_request(&mut source).await.unwrap();
        assert_eq!(first.target(), "/a");
        assert_eq!(parser.received(), data.len());

        let second = parser.read_request(&mut source).await.unwrap();
        assert_eq!(second.target(), "/b");
        assert_eq!(second.body(), b"ok");
        assert_eq!(parser.received(), data.len());

        assert_eq!(
            parser.read_request(&mut source).await,
            Err(ErrorKind::IncompleteMessage)
        );
    }

    #[tokio::test]
    async fn source_error() {
        let mut source = FailingReader;
        let err = Request::from_reader(&mut source).await.unwrap_err();

        assert!(matches!(err, ErrorKind::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset));
    }
}
