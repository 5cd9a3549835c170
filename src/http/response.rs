//! Staged HTTP/1.1 response writer over any byte sink.

use crate::{
    errors::ErrorKind,
    http::{
        headers::Headers,
        types::{StatusCode, CRLF},
    },
};
use std::io::Write;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Position of a [`ResponseWriter`] in the response.
///
/// Stages only move forward:
/// `Init -> StatusWritten -> HeadersWritten -> BodyWritten`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    StatusWritten,
    HeadersWritten,
    BodyWritten,
}

/// Writes one HTTP/1.1 response to a sink in strict order.
///
/// Build responses by calling methods in this order:
/// - [`write_status_line()`](ResponseWriter::write_status_line) ->
///   [`write_headers()`](ResponseWriter::write_headers) ->
///   [`write_body()`](ResponseWriter::write_body), optionally followed by
///   [`write_trailers()`](ResponseWriter::write_trailers)
/// - or, for a streamed body: status line -> headers ->
///   any number of [`write_chunked_body()`](ResponseWriter::write_chunked_body) ->
///   [`write_chunked_body_done()`](ResponseWriter::write_chunked_body_done)
///
/// A call from the wrong stage returns
/// [`OrderingViolation`](ErrorKind::OrderingViolation) without touching the
/// sink. Every call hands its bytes to the sink in one `write_all`, and the
/// stage only advances once that succeeds.
///
/// The headers sent by `write_headers()` are the ones in
/// [`headers_mut()`](ResponseWriter::headers_mut) at that moment.
///
/// # Examples
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), raw_http::ErrorKind> {
/// use raw_http::{default_headers, ResponseWriter, StatusCode};
///
/// let body = b"Hello World!";
/// let mut writer = ResponseWriter::new(Vec::new());
///
/// writer.write_status_line(StatusCode::OK).await?;
/// writer.set_headers(default_headers(body.len()));
/// writer.write_headers().await?;
/// writer.write_body(body).await?;
///
/// assert!(writer.get_ref().starts_with(b"HTTP/1.1 200 OK\r\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    stage: Stage,
    headers: Headers,
    status: Option<StatusCode>,
    scratch: Vec<u8>,
}

impl<W> ResponseWriter<W> {
    #[inline]
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            stage: Stage::Init,
            headers: Headers::new(),
            status: None,
            scratch: Vec::with_capacity(256),
        }
    }

    #[inline(always)]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Status code sent by [`write_status_line()`](ResponseWriter::write_status_line).
    #[inline(always)]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[inline(always)]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Outgoing headers. Changes after `write_headers()` have no effect.
    #[inline(always)]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Replaces the outgoing headers.
    #[inline(always)]
    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    #[inline(always)]
    pub const fn get_ref(&self) -> &W {
        &self.sink
    }

    #[inline(always)]
    pub fn into_inner(self) -> W {
        self.sink
    }

    #[inline]
    fn expect_stage(&self, expected: Stage) -> Result<(), ErrorKind> {
        match self.stage == expected {
            true => Ok(()),
            false => Err(ErrorKind::OrderingViolation {
                expected,
                actual: self.stage,
            }),
        }
    }
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    /// Sends `HTTP/1.1 <code> <reason>\r\n`.
    ///
    /// Valid only as the first call.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), ErrorKind> {
        self.expect_stage(Stage::Init)?;

        self.scratch.clear();
        status.write_status_line(&mut self.scratch)?;
        self.sink.write_all(&self.scratch).await?;

        self.status = Some(status);
        self.stage = Stage::StatusWritten;
        Ok(())
    }

    /// Sends every outgoing header followed by the blank line.
    ///
    /// Valid only right after the status line.
    pub async fn write_headers(&mut self) -> Result<(), ErrorKind> {
        self.expect_stage(Stage::StatusWritten)?;

        self.scratch.clear();
        self.headers.write_fields(&mut self.scratch)?;
        self.scratch.extend_from_slice(CRLF);
        self.sink.write_all(&self.scratch).await?;

        self.stage = Stage::HeadersWritten;
        Ok(())
    }

    /// Sends `body` verbatim and completes the response.
    ///
    /// The caller is expected to have set a `Content-Length` equal to
    /// `body.len()`; see [`default_headers()`].
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, ErrorKind> {
        self.expect_stage(Stage::HeadersWritten)?;

        self.sink.write_all(body).await?;

        self.stage = Stage::BodyWritten;
        Ok(body.len())
    }

    /// Sends `chunk` as one chunk of a `Transfer-Encoding: chunked` body:
    /// `<hex-length>\r\n<payload>\r\n`.
    ///
    /// Can be called any number of times after the headers. An empty chunk
    /// writes nothing, since a zero-length chunk would end the body.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, ErrorKind> {
        self.expect_stage(Stage::HeadersWritten)?;

        if chunk.is_empty() {
            return Ok(0);
        }

        self.scratch.clear();
        write!(self.scratch, "{:x}\r\n", chunk.len())?;
        self.scratch.extend_from_slice(chunk);
        self.scratch.extend_from_slice(CRLF);
        self.sink.write_all(&self.scratch).await?;

        Ok(chunk.len())
    }

    /// Ends a chunked body with the zero-length chunk, the `trailers` and
    /// the blank line.
    ///
    /// The writer does not check that `Transfer-Encoding: chunked` was sent
    /// or that `Content-Length` was left out; announce the trailer names in a
    /// `Trailer` header.
    pub async fn write_chunked_body_done(&mut self, trailers: &Headers) -> Result<(), ErrorKind> {
        self.expect_stage(Stage::HeadersWritten)?;

        self.scratch.clear();
        self.scratch.extend_from_slice(b"0\r\n");
        trailers.write_fields(&mut self.scratch)?;
        self.scratch.extend_from_slice(CRLF);
        self.sink.write_all(&self.scratch).await?;

        self.stage = Stage::BodyWritten;
        Ok(())
    }

    /// Sends header fields after a fixed-length body, followed by a blank
    /// line.
    ///
    /// Independent of [`write_chunked_body_done()`](ResponseWriter::write_chunked_body_done),
    /// which writes its own trailers.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), ErrorKind> {
        self.expect_stage(Stage::BodyWritten)?;

        self.scratch.clear();
        trailers.write_fields(&mut self.scratch)?;
        self.scratch.extend_from_slice(CRLF);
        self.sink.write_all(&self.scratch).await?;

        Ok(())
    }

    /// Flushes the sink.
    #[inline]
    pub async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.sink.flush().await?;
        Ok(())
    }
}

/// Baseline headers for a response with a fixed-length body:
///
/// ```text
/// content-length: <content_length>
/// connection: close
/// content-type: text/plain
/// ```
///
/// Use [`Headers::replace`] to change the content type and
/// [`Headers::remove`] to drop `content-length` for a chunked body.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();

    headers.set("Content-Length", content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");

    headers
}



#[cfg(test)]
mod body_tests {
    use super::*;
    use crate::tools::*;

    #[tokio::test]
    async fn fixed_length() {
        let body = b"Your request was an absolute banger.";
        let mut writer = ResponseWriter::new(Vec::new());

        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.set_headers(default_headers(body.len()));
        writer.headers_mut().replace("Content-Type", "text/html");
        writer.write_headers().await.unwrap();
        assert_eq!(writer.stage(), Stage::HeadersWritten);

        assert_eq!(writer.write_body(body).await, Ok(body.len()));
        assert_eq!(writer.stage(), Stage::BodyWritten);
        assert_eq!(
            str_op(writer.get_ref()),
            "HTTP/1.1 200 OK\r\n\
             content-length: 36\r\n\
             connection: close\r\n\
             content-type: text/html\r\n\
             \r\n\
             Your request was an absolute banger."
        );
    }

    #[tokio::test]
    async fn empty_headers() {
        let mut writer = ResponseWriter::new(Vec::new());

        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers().await.unwrap();
        assert_eq!(str_op(writer.get_ref()), "HTTP/1.1 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn trailers_after_fixed_body() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.write_status_line(StatusCode::OK).await.unwrap();
        writer.write_headers().await.unwrap();
        writer.write_body(b"ab").await.unwrap();
        let start = writer.get_ref().len();

        let trailers: Headers = [("X-Checksum", "42")].into_iter().collect();
        writer.write_trailers(&trailers).await.unwrap();

        assert_eq!(str_op(&writer.get_ref()[start..]), "x-checksum: 42\r\n\r\n");
        assert_eq!(writer.stage(), Stage::BodyWritten);
    }
}


#[cfg(test)]
mod default_headers_tests {
    use super::*;

    #[test]
    fn basic() {
        let headers = default_headers(1234);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Content-Length"), Some("1234"));
        assert_eq!(headers.get("connection"), Some("close"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }
}
