use crate::{
    errors::HandlerError,
    http::{request::Request, response::ResponseWriter},
    limits::{ReqLimits, ServerLimits},
    log,
    server::connection::HttpConnection,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    io::AsyncWrite,
    net::{TcpListener, TcpStream},
    sync::Notify,
    task::JoinHandle,
};

/// A trait for answering parsed HTTP requests.
///
/// The handler receives the complete [`Request`] and a [`ResponseWriter`]
/// bound to the connection. Use `&self` for shared immutable data such as
/// routing tables; one handler instance serves every connection.
///
/// # Errors
///
/// If the handler returns a [`HandlerError`] before writing anything, the
/// connection answers with its status, the
/// [`default_headers()`](crate::default_headers) and its message as the body.
/// Once the status line is out, the error is only logged.
///
/// # Examples
///
/// ```
/// use raw_http::{default_headers, Handler, HandlerError, Request, ResponseWriter, StatusCode};
/// use tokio::io::AsyncWrite;
///
/// struct Echo;
///
/// impl Handler for Echo {
///     async fn handle<W>(
///         &self,
///         request: &Request,
///         writer: &mut ResponseWriter<W>,
///     ) -> Result<(), HandlerError>
///     where
///         W: AsyncWrite + Unpin + Send,
///     {
///         if request.target() != "/echo" {
///             return Err(HandlerError::new(StatusCode::BAD_REQUEST, "Not found :(\n"));
///         }
///
///         writer.write_status_line(StatusCode::OK).await?;
///         writer.set_headers(default_headers(request.body().len()));
///         writer.write_headers().await?;
///         writer.write_body(request.body()).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler
where
    Self: Sync + Send + 'static,
{
    /// Writes the response for `request` through `writer`.
    fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// Builds a listener with `SO_REUSEADDR` and the backlog from `limits`.
///
/// Must be called inside a tokio runtime.
///
/// # Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> std::io::Result<()> {
/// use raw_http::{bind, limits::ServerLimits};
///
/// let listener = bind("0.0.0.0:42069".parse().unwrap(), &ServerLimits::default())?;
/// # Ok(())
/// # }
/// ```
pub fn bind(addr: SocketAddr, limits: &ServerLimits) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(limits.reuse_address)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(limits.backlog)?;

    TcpListener::from_std(socket.into())
}

#[derive(Debug, Default)]
struct Shutdown {
    closed: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    #[inline]
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[inline]
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// An HTTP server answering one request per connection.
///
/// Every accepted connection runs on its own tokio task: the request is read
/// completely, passed to the [`Handler`], and the connection is closed after
/// the response.
///
/// # Examples
///
/// ```no_run
/// use raw_http::{bind, limits::ServerLimits, Handler, HandlerError, Request, ResponseWriter, Server, StatusCode};
/// use tokio::io::AsyncWrite;
///
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn handle<W>(&self, _: &Request, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
///     where
///         W: AsyncWrite + Unpin + Send,
///     {
///         w.write_status_line(StatusCode::OK).await?;
///         w.set_headers(raw_http::default_headers(12));
///         w.write_headers().await?;
///         w.write_body(b"Hello world!").await?;
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let limits = ServerLimits::default();
///
///     Server::builder()
///         .listener(bind("127.0.0.1:42069".parse().unwrap(), &limits).unwrap())
///         .handler(Hello)
///         .server_limits(limits)
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server<H: Handler> {
    listener: TcpListener,
    handler: Arc<H>,
    request_limits: ReqLimits,
    server_limits: ServerLimits,
    shutdown: Arc<Shutdown>,
}

impl<H: Handler> Server<H> {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder<H> {
        ServerBuilder {
            listener: None,
            handler: None,
            server_limits: None,
            request_limits: None,
        }
    }

    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections in the current task until
    /// [`ServerHandle::close()`] is called.
    ///
    /// Accept errors are logged and the loop keeps going.
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            log::info!("listening on {addr}");
        }

        loop {
            if self.shutdown.is_closed() {
                break;
            }

            tokio::select! {
                _ = self.shutdown.notify.notified() => continue,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_connection(stream, addr),
                    Err(_) if self.shutdown.is_closed() => break,
                    Err(err) => {
                        log::warning!("accept failed: {err}");
                    }
                },
            }
        }

        log::info!("server stopped");
    }

    /// Runs [`launch()`](Server::launch) on a new tokio task.
    pub fn spawn(self) -> ServerHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.launch());

        ServerHandle { shutdown, task }
    }

    #[inline]
    fn spawn_connection(&self, mut stream: TcpStream, addr: SocketAddr) {
        let mut conn = HttpConnection::new(
            self.handler.clone(),
            &self.request_limits,
            &self.server_limits,
        );

        tokio::spawn(async move {
            if let Err(err) = conn.run(&mut stream).await {
                log::error!("connection {addr}: {err}");
            }
        });
    }
}

/// Stops a server started with [`Server::spawn()`].
#[derive(Debug)]
pub struct ServerHandle {
    shutdown: Arc<Shutdown>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Stops accepting connections. Connections already accepted run to
    /// completion.
    #[inline]
    pub fn close(&self) {
        self.shutdown.close();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Waits for the accept loop to exit.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            log::error!("accept loop failed: {err}");
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder<H: Handler> {
    listener: Option<TcpListener>,
    handler: Option<Arc<H>>,

    server_limits: Option<ServerLimits>,
    request_limits: Option<ReqLimits>,
}

impl<H: Handler> ServerBuilder<H> {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.** See [`bind()`].
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the request handler that will process incoming requests.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Configures the error response for unparsable requests.
    ///
    /// The listener settings in [`ServerLimits`] only apply through [`bind()`].
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures the request buffer of each connection.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Creates the server.
    ///
    /// # Panics
    ///
    /// If [`listener()`](ServerBuilder::listener) or
    /// [`handler()`](ServerBuilder::handler) was not called.
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server<H> {
        Server {
            listener: self
                .listener
                .expect("The `listener` method must be called to create"),
            handler: self
                .handler
                .expect("The `handler` method must be called to create"),
            request_limits: self.request_limits.unwrap_or_default(),
            server_limits: self.server_limits.unwrap_or_default(),
            shutdown: Arc::new(Shutdown::default()),
        }
    }
}
