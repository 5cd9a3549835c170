use crate::http::{response::Stage, types::StatusCode};
use std::{error, fmt, io};

/// Every failure the parser, the writer and the connection layer can report.
///
/// Parse errors abort the whole read-and-parse operation; the connection
/// answers them with [`status()`](ErrorKind::status) before closing.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    MalformedStartLine,
    InvalidMethod,
    UnsupportedVersion,
    InvalidEncoding,

    MalformedHeaderLine,
    InvalidHeaderKey,
    InvalidContentLength,

    BodyLengthMismatch {
        expected: usize,
        available: usize,
    },
    RequestTooLarge,
    IncompleteMessage,
    AlreadyDone,

    /// A writer method was called from the wrong stage. No bytes were written.
    OrderingViolation {
        expected: Stage,
        actual: Stage,
    },

    /// The byte source or the sink failed.
    Io(IoError),
}

macro_rules! http_errors {
    ($($name:ident: $status:ident => $text:literal; )*) => {
        /// Status code of the response that reports this error to the peer.
        #[inline]
        pub const fn status(&self) -> StatusCode {
            match self { $(
                Self::$name { .. } => StatusCode::$status,
            )* }
        }

        #[inline]
        const fn description(&self) -> &'static str {
            match self { $(
                Self::$name { .. } => $text,
            )* }
        }
    };
}

impl ErrorKind {
    http_errors! {
        MalformedStartLine: BAD_REQUEST => "malformed request line";
        InvalidMethod: BAD_REQUEST => "invalid method";
        UnsupportedVersion: BAD_REQUEST => "unsupported HTTP version";
        InvalidEncoding: BAD_REQUEST => "request line is not valid UTF-8";

        MalformedHeaderLine: BAD_REQUEST => "malformed header line";
        InvalidHeaderKey: BAD_REQUEST => "invalid header key";
        InvalidContentLength: BAD_REQUEST => "invalid Content-Length";

        BodyLengthMismatch: BAD_REQUEST => "body length exceeds Content-Length";
        RequestTooLarge: BAD_REQUEST => "request too large";
        IncompleteMessage: BAD_REQUEST => "incomplete request";
        AlreadyDone: INTERNAL_SERVER_ERROR => "request is already fully parsed";

        OrderingViolation: INTERNAL_SERVER_ERROR => "response written out of order";

        Io: INTERNAL_SERVER_ERROR => "I/O error";
    }

    /// `true` for errors caused by the bytes the peer sent.
    #[inline]
    pub const fn is_parse_error(&self) -> bool {
        self.status().as_u16() == StatusCode::BAD_REQUEST.as_u16()
    }
}

impl error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ErrorKind::Io(err) => Some(&err.0),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::BodyLengthMismatch {
                expected,
                available,
            } => write!(
                f,
                "{}: expected {expected} bytes, got {available}",
                self.description()
            ),
            ErrorKind::OrderingViolation { expected, actual } => write!(
                f,
                "{}: expected stage {expected:?}, writer is at {actual:?}",
                self.description()
            ),
            ErrorKind::Io(err) => write!(f, "{}: {}", self.description(), err.0),
            _ => f.write_str(self.description()),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

/// An [`io::Error`] that compares equal by [`kind()`](io::Error::kind).
#[derive(Debug)]
pub struct IoError(pub(crate) io::Error);

impl IoError {
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }

    #[inline]
    pub fn into_inner(self) -> io::Error {
        self.0
    }
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

/// Error returned by a [`Handler`](crate::Handler).
///
/// If the handler fails before writing anything, the connection answers
/// with `status` and `message` as a `text/plain` body. Once the handler
/// has started the response the error can only be logged.
///
/// # Examples
/// ```
/// use raw_http::{HandlerError, StatusCode};
///
/// let err = HandlerError::new(StatusCode::BAD_REQUEST, "missing user id\n");
/// assert_eq!(err.status, StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    #[inline]
    pub fn new<M: Into<String>>(status: StatusCode, message: M) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl error::Error for HandlerError {}
impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message.trim_end())
    }
}

impl From<ErrorKind> for HandlerError {
    fn from(err: ErrorKind) -> Self {
        HandlerError::new(err.status(), err.to_string())
    }
}
