//! Case-insensitive header collection and its incremental line parser.

use crate::{
    errors::ErrorKind,
    http::types::{self, CRLF},
};
use memchr::{memchr, memmem};
use std::io;

/// Collection of HTTP header fields.
///
/// Names are stored lowercased and every accessor normalizes the name it is
/// given, so `Content-Type`, `content-type` and `CONTENT-TYPE` address the
/// same entry. Repeated fields are merged into one comma-separated value.
///
/// Entries keep their insertion order, but nothing on the wire depends on it.
///
/// # Examples
/// ```
/// use raw_http::Headers;
///
/// let mut headers = Headers::new();
/// headers.set("Accept", "text/html");
/// headers.set("ACCEPT", "text/plain");
/// assert_eq!(headers.get("accept"), Some("text/html, text/plain"));
///
/// headers.replace("Accept", "*/*");
/// assert_eq!(headers.get("Accept"), Some("*/*"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Header {
    name: String,
    value: String,
}

impl Headers {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one header line from the start of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line that
    /// ends the header section was reached. `(0, false)` means no complete
    /// line is available yet.
    ///
    /// # Errors
    /// - [`MalformedHeaderLine`](ErrorKind::MalformedHeaderLine): no colon
    /// - [`InvalidHeaderKey`](ErrorKind::InvalidHeaderKey): empty name,
    ///   whitespace around the name, or a byte outside the token set
    ///
    /// The value may carry any bytes. Invalid UTF-8 is read as Latin-1.
    ///
    /// Nothing is consumed on error.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ErrorKind> {
        let Some(end) = memmem::find(data, CRLF) else {
            return Ok((0, false));
        };
        if end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..end];
        let colon = memchr(b':', line).ok_or(ErrorKind::MalformedHeaderLine)?;

        // token characters exclude whitespace, so a padded name fails here too
        let (raw_name, value) = (&line[..colon], &line[colon + 1..]);
        let name = match types::lowercase_token(raw_name) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ErrorKind::InvalidHeaderKey),
        };

        self.append(name, &types::decode_value(types::trim_ows(value)));
        Ok((end + CRLF.len(), false))
    }

    /// Returns the value stored under `name`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].value.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Adds a value, joining it to an existing one with `", "`.
    #[inline]
    pub fn set<V: AsRef<str>>(&mut self, name: &str, value: V) {
        self.append(name.to_ascii_lowercase(), value.as_ref());
    }

    /// Stores a value, discarding whatever was there before.
    pub fn replace<V: Into<String>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.position(name) {
            Some(i) => self.entries[i].value = value,
            None => self.entries.push(Header {
                name: name.to_ascii_lowercase(),
                value,
            }),
        }
    }

    /// Removes the entry for `name`, returning its value.
    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs. Names are lowercase.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }

    // `name` must already be lowercase
    fn append(&mut self, name: String, value: &str) {
        match self.entries.iter_mut().find(|h| h.name == name) {
            Some(header) => {
                header.value.push_str(", ");
                header.value.push_str(value);
            }
            None => self.entries.push(Header {
                name,
                value: value.to_owned(),
            }),
        }
    }

    /// Writes every field as `name: value\r\n`, without the closing blank line.
    pub(crate) fn write_fields<W: io::Write>(&self, buffer: &mut W) -> io::Result<()> {
        for (name, value) in self.iter() {
            write!(buffer, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<N: AsRef<str>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name.as_ref(), value);
        }
        headers
    }
}

impl<N: AsRef<str>, V: AsRef<str>> Extend<(N, V)> for Headers {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name.as_ref(), value);
        }
    }
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn valid_single_header() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";

        let (n, done) = headers.parse(data).unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 23);
        assert!(!done);

        let (n, done) = headers.parse(&data[n..]).unwrap();
        assert_eq!(n, 2);
        assert!(done);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn done_only_after_blank_line() {
        let mut headers = Headers::new();

        assert_eq!(headers.parse(b"Host: localhost:42069\r\n"), Ok((23, false)));
        assert_eq!(headers.parse(b"\r\n"), Ok((2, true)));
        assert_eq!(headers.get("HOST"), Some("localhost:42069"));
    }

    #[test]
    fn surrounding_whitespace_in_value() {
        let mut headers = Headers::new();

        let (n, done) = headers.parse(b"Host:    localhost:42069   \r\n\r\n").unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 29);
        assert!(!done);
    }

    #[test]
    fn existing_headers_are_kept() {
        let mut headers = Headers::new();
        headers.set("User-Agent", "curl/8.0");

        let (n, _) = headers.parse(b"Accept: */*\r\n\r\n").unwrap();
        assert_eq!(n, 13);
        assert_eq!(headers.get("user-agent"), Some("curl/8.0"));
        assert_eq!(headers.get("accept"), Some("*/*"));
    }

    #[test]
    fn repeated_keys_merge() {
        let mut headers = Headers::new();
        let data = b"Host: a\r\nHost: b\r\n\r\n";

        let mut offset = 0;
        loop {
            let (n, done) = headers.parse(&data[offset..]).unwrap();
            offset += n;
            if done {
                break;
            }
        }

        assert_eq!(offset, data.len());
        assert_eq!(headers.get("host"), Some("a, b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn incomplete_line() {
        let mut headers = Headers::new();

        assert_eq!(headers.parse(b""), Ok((0, false)));
        assert_eq!(headers.parse(b"Host: local"), Ok((0, false)));
        assert_eq!(headers.parse(b"Host: localhost\r"), Ok((0, false)));
        assert!(headers.is_empty());
    }

    #[test]
    fn invalid() {
        #[rustfmt::skip]
        let cases: [(&[u8], ErrorKind); 7] = [
            (b"Host : x\r\n",               ErrorKind::InvalidHeaderKey),
            (b"       Host : localhost\r\n", ErrorKind::InvalidHeaderKey),
            (b": no-name\r\n",              ErrorKind::InvalidHeaderKey),
            (b"H\xc2\xa9st: localhost\r\n", ErrorKind::InvalidHeaderKey),
            (b"Ho(st: localhost\r\n",       ErrorKind::InvalidHeaderKey),
            (b"Ho st: localhost\r\n",       ErrorKind::InvalidHeaderKey),
            (b"no colon at all\r\n",        ErrorKind::MalformedHeaderLine),
        ];

        for (data, expected) in cases {
            let mut headers = Headers::new();
            assert_eq!(headers.parse(data), Err(expected), "{:?}", data);
            assert!(headers.is_empty());
        }
    }

    #[test]
    fn token_symbols_in_name() {
        let mut headers = Headers::new();

        let (n, _) = headers.parse(b"X-!#$%&'*+-.^_`|~: ok\r\n").unwrap();
        assert_eq!(n, 23);
        assert_eq!(headers.get("x-!#$%&'*+-.^_`|~"), Some("ok"));
    }

    #[test]
    fn non_utf8_value() {
        let mut headers = Headers::new();

        assert_eq!(headers.parse(b"X-Name: caf\xe9\r\n"), Ok((14, false)));
        assert_eq!(headers.get("x-name"), Some("caf\u{e9}"));

        assert_eq!(headers.parse(b"X-Raw: \xff\xfe\r\n"), Ok((11, false)));
        assert_eq!(headers.get("x-raw"), Some("\u{ff}\u{fe}"));
    }

    #[test]
    fn empty_value() {
        let mut headers = Headers::new();

        assert_eq!(headers.parse(b"X-Empty:\r\n"), Ok((10, false)));
        assert_eq!(headers.get("x-empty"), Some(""));
    }
}
