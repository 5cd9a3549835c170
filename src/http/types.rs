#![allow(rustdoc::bare_urls)]

//! Core HTTP protocol types and byte tables

use std::{fmt, io};

pub(crate) const CRLF: &[u8] = b"\r\n";

// TOKEN CHARACTERS

/// token = 1*tchar
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*"
///       / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"
///       / DIGIT / ALPHA
#[inline(always)]
pub(crate) const fn is_token(byte: u8) -> bool {
    matches!(
        byte,
        | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*'
        | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z'
    )
}

/// Token characters mapped to their lowercase form, everything else to `0`.
const TOKEN_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let byte = i as u8;
        if is_token(byte) {
            table[i] = byte.to_ascii_lowercase();
        }
        i += 1;
    }
    table
};

/// Lowercases `src`, or returns `None` if any byte is not a token character.
#[inline]
pub(crate) fn lowercase_token(src: &[u8]) -> Option<String> {
    let mut result = String::with_capacity(src.len());
    for &byte in src {
        match TOKEN_TABLE[byte as usize] {
            0 => return None,
            lower => result.push(lower as char),
        }
    }
    Some(result)
}

/// Strips leading and trailing spaces and tabs.
#[inline]
pub(crate) fn trim_ows(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

/// Field values are taken as UTF-8 when valid, otherwise byte by byte as
/// Latin-1 (`obs-text`), so no input byte is lost.
#[inline]
pub(crate) fn decode_value(bytes: &[u8]) -> String {
    match simdutf8::basic::from_utf8(bytes) {
        Ok(value) => value.to_owned(),
        Err(_) => bytes.iter().map(|&byte| byte as char).collect(),
    }
}

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as usize)?;
    }

    Some(result)
}

// STATUS_CODE

/// HTTP status code.
///
/// Any three-digit code can be written; only the codes with an associated
/// constant carry a reason phrase; the rest are sent with an empty one
/// (`HTTP/1.1 404 \r\n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

macro_rules! set_status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:literal, $str:literal);
    )+) => {
        impl StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $(#[$docs])+
            pub const $name: StatusCode = StatusCode($num);
        )+

            /// Reason phrase of the status line, empty for codes without one.
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self.0 { $(
                    $num => $str,
                )+
                    _ => "",
                }
            }
        }
    }
}

set_status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    OK = (200, "OK");
    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BAD_REQUEST = (400, "Bad Request");
    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    INTERNAL_SERVER_ERROR = (500, "Internal Server Error");
}

impl StatusCode {
    #[inline]
    pub const fn from_u16(code: u16) -> Self {
        StatusCode(code)
    }

    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    // `HTTP/1.1 <code> <reason>\r\n`
    #[inline]
    pub(crate) fn write_status_line<W: io::Write>(&self, buffer: &mut W) -> io::Result<()> {
        write!(buffer, "HTTP/1.1 {} {}\r\n", self.0, self.reason())
    }
}

impl From<u16> for StatusCode {
    #[inline]
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            "" => write!(f, "{}", self.0),
            reason => write!(f, "{} {}", self.0, reason),
        }
    }
}
