//! Parser buffer limits and listener settings
//!
//! Both structs are plain data with conservative [`Default`] values. Override
//! the fields you care about and keep the rest with `..Default::default()`.
//!
//! # Examples
//!
//! ```no_run
//! # struct MyHandler;
//! # impl raw_http::Handler for MyHandler {
//! #     async fn handle<W>(
//! #         &self, _: &raw_http::Request, _: &mut raw_http::ResponseWriter<W>,
//! #     ) -> Result<(), raw_http::HandlerError>
//! #     where W: tokio::io::AsyncWrite + Unpin + Send { Ok(()) }
//! # }
//! use raw_http::{bind, limits::{ReqLimits, ServerLimits}, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server_limits = ServerLimits {
//!         backlog: 4096,
//!         ..ServerLimits::default()
//!     };
//!
//!     Server::builder()
//!         .listener(bind("127.0.0.1:42069".parse().unwrap(), &server_limits)?)
//!         .handler(MyHandler)
//!         .server_limits(server_limits)
//!         .request_limits(ReqLimits {
//!             max_buffer_size: 64 * 1024,
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! There are no read or write timeouts. A peer that stops sending in the
//! middle of a request keeps its connection task parked until it disconnects.

/// Controls how the request buffer of a connection grows.
///
/// # Memory allocation strategy
///
/// The buffer starts at `initial_buffer_size` bytes and doubles every time
/// it fills up before the request is complete. Bytes the parser has consumed
/// are shifted out, so only the unparsed tail and the request body occupy it.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Size of the first read buffer in bytes (default: `8`).
    ///
    /// The small default keeps idle connections cheap; values below `1`
    /// are treated as `1`.
    pub initial_buffer_size: usize,

    /// Largest size the buffer may grow to (default: `1 MiB`).
    ///
    /// A request that needs more fails with
    /// [`RequestTooLarge`](crate::ErrorKind::RequestTooLarge).
    pub max_buffer_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            initial_buffer_size: 8,
            max_buffer_size: 1024 * 1024,

            _priv: (),
        }
    }
}

/// Listener and error-response settings.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Length of the pending-connection queue passed to `listen` (default: `1024`).
    ///
    /// Only used by [`bind`](crate::bind).
    pub backlog: i32,

    /// Sets `SO_REUSEADDR` on the listening socket (default: `true`).
    ///
    /// Only used by [`bind`](crate::bind).
    pub reuse_address: bool,

    /// Body sent with the `400 Bad Request` answer to an unparsable request
    /// (default: `"Invalid Request\n"`).
    pub error_message: &'static str,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            backlog: 1024,
            reuse_address: true,
            error_message: "Invalid Request\n",

            _priv: (),
        }
    }
}
