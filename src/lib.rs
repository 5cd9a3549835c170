//! raw_http - HTTP/1.1 from the bytes up
//!
//! A small HTTP/1.1 server layer built directly on byte streams: an
//! incremental request parser that accepts input in arbitrary slices, a
//! case-insensitive header collection, and a response writer that enforces
//! the order of status line, headers, body and trailers.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1** only; every other version is rejected
//! - One request per connection; the connection is closed after the response
//! - Fixed-length bodies via `Content-Length` and streamed bodies via
//!   `Transfer-Encoding: chunked` with trailers
//!
//! # Building blocks
//!
//! - [`Request::parse`] - re-entrant parser, independent of any transport
//! - [`Parser`] - reads a [`Request`] from any [`AsyncRead`](tokio::io::AsyncRead)
//! - [`ResponseWriter`] - staged writer over any [`AsyncWrite`](tokio::io::AsyncWrite)
//! - [`Server`] - accept loop that runs a [`Handler`] per connection
//!
//! # Examples
//!
//! Streaming a chunked response:
//! ```no_run
//! use raw_http::{
//!     bind, default_headers, limits::ServerLimits, Handler, HandlerError, Headers, Request,
//!     ResponseWriter, Server, StatusCode,
//! };
//! use tokio::io::AsyncWrite;
//!
//! struct Countdown;
//!
//! impl Handler for Countdown {
//!     async fn handle<W>(&self, _: &Request, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
//!     where
//!         W: AsyncWrite + Unpin + Send,
//!     {
//!         let mut headers = default_headers(0);
//!         headers.remove("Content-Length");
//!         headers.set("Transfer-Encoding", "chunked");
//!
//!         w.write_status_line(StatusCode::OK).await?;
//!         w.set_headers(headers);
//!         w.write_headers().await?;
//!         for i in (1..=3).rev() {
//!             w.write_chunked_body(format!("{i}...\n").as_bytes()).await?;
//!         }
//!         w.write_chunked_body_done(&Headers::new()).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let limits = ServerLimits::default();
//!
//!     Server::builder()
//!         .listener(bind("127.0.0.1:42069".parse().unwrap(), &limits)?)
//!         .handler(Countdown)
//!         .build()
//!         .launch()
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! Parsing without any I/O:
//! ```
//! use raw_http::{ParseState, Request};
//!
//! let data = b"POST /submit HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi";
//! let mut req = Request::new();
//!
//! assert_eq!(req.parse(&data[..10]), Ok(0));
//! assert_eq!(req.parse(data), Ok(data.len()));
//! assert_eq!(req.state(), ParseState::Done);
//! assert_eq!(req.method(), "POST");
//! assert_eq!(req.body(), b"hi");
//! ```

pub(crate) mod http {
    pub(crate) mod headers;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;
mod log;

pub use crate::{
    errors::{ErrorKind, HandlerError, IoError},
    http::{
        headers::Headers,
        request::{ParseState, Parser, Request, RequestLine},
        response::{default_headers, ResponseWriter, Stage},
        types::StatusCode,
    },
    server::server_impl::{bind, Handler, Server, ServerBuilder, ServerHandle},
};

#[cfg(test)]
pub mod tools {
    use std::{
        io,
        pin::Pin,
        str::from_utf8,
        task::{Context, Poll},
    };
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    #[inline]
    pub fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }

    /// Hands out at most `step` bytes per read.
    pub struct ChunkReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl ChunkReader {
        pub fn new(data: &[u8], step: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                step: step.max(1),
            }
        }
    }

    impl AsyncRead for ChunkReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let end = self.data.len().min(self.pos + self.step);
            let n = (end - self.pos).min(buf.remaining());

            buf.put_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    pub struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::ConnectionReset.into()))
        }
    }

    /// Accepts `budget` bytes in total, then fails with `BrokenPipe`.
    pub struct LimitedSink {
        pub written: Vec<u8>,
        budget: usize,
    }

    impl LimitedSink {
        pub fn new(budget: usize) -> Self {
            Self {
                written: Vec::new(),
                budget,
            }
        }
    }

    impl AsyncWrite for LimitedSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
            }

            let n = self.budget.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    pub struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
