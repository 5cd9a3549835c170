use crate::{
    errors::ErrorKind,
    http::{
        request::Parser,
        response::{ResponseWriter, Stage},
    },
    limits::{ReqLimits, ServerLimits},
    log,
    server::server_impl::Handler,
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

pub(crate) struct HttpConnection<H: Handler> {
    handler: Arc<H>,
    parser: Parser,
    error_message: &'static str,
}

impl<H: Handler> HttpConnection<H> {
    #[inline]
    pub(crate) fn new(handler: Arc<H>, req_limits: &ReqLimits, server_limits: &ServerLimits) -> Self {
        Self {
            handler,
            parser: Parser::new(req_limits),
            error_message: server_limits.error_message,
        }
    }

    /// Serves one request, then shuts the write half of `stream` down.
    pub(crate) async fn run<S>(&mut self, stream: &mut S) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let result = self.impl_run(stream).await;
        let closed = stream.shutdown().await;

        result?;
        Ok(closed?)
    }

    #[inline(always)]
    async fn impl_run<S>(&mut self, stream: &mut S) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let request = match self.parser.read_request(stream).await {
            Ok(request) => request,
            Err(ErrorKind::IncompleteMessage) if self.parser.received() == 0 => return Ok(()),
            Err(err @ ErrorKind::Io(_)) => return Err(err),
            Err(err) => {
                log::debug!("rejecting request: {err}");
                return writer::send_error(stream, err, self.error_message).await;
            }
        };

        let mut response = ResponseWriter::new(&mut *stream);
        if let Err(err) = self.handler.handle(&request, &mut response).await {
            match response.stage() {
                Stage::Init => {
                    writer::write_message(&mut response, err.status, err.message.as_bytes()).await?
                }
                stage => {
                    log::error!("{} {}: handler failed at {stage:?}: {err}", request.method(), request.target());
                }
            }
        }

        response.flush().await
    }
}

pub(crate) mod writer {
    use crate::{
        errors::ErrorKind,
        http::{
            response::{default_headers, ResponseWriter},
            types::StatusCode,
        },
    };
    use tokio::io::AsyncWrite;

    /// Answers an unparsable request with the error's status and `message`.
    #[inline]
    pub(crate) async fn send_error<W: AsyncWrite + Unpin>(
        sink: W,
        error: ErrorKind,
        message: &str,
    ) -> Result<(), ErrorKind> {
        let mut response = ResponseWriter::new(sink);

        write_message(&mut response, error.status(), message.as_bytes()).await?;
        response.flush().await
    }

    /// Status line, `default_headers(body.len())` and `body`.
    #[inline]
    pub(crate) async fn write_message<W: AsyncWrite + Unpin>(
        response: &mut ResponseWriter<W>,
        status: StatusCode,
        body: &[u8],
    ) -> Result<(), ErrorKind> {
        response.write_status_line(status).await?;
        response.set_headers(default_headers(body.len()));
        response.write_headers().await?;
        response.write_body(body).await?;
        Ok(())
    }
}
