//! URL splitting
//!
//! Splits a `scheme://host:port?query` style URL into its components without
//! allocating. Transport URLs have no path component; anything after a `/`
//! in the authority is ignored, and the query begins at the first `?`.

use thiserror::Error;

/// URL splitting errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid port in '{0}'")]
    InvalidPort(String),

    #[error("unterminated '[' in host of '{0}'")]
    UnterminatedBracket(String),
}

/// Components of a split URL
///
/// All fields borrow from the input string. `host` is empty when the URL
/// carries no hostname (e.g. `udp://:5000` or `udp://?localport=5000`), and
/// `query` is empty when there is no `?` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    /// Scheme, without the `://`, if one was present
    pub scheme: Option<&'a str>,
    /// Hostname, with IPv6 brackets stripped; may be empty
    pub host: &'a str,
    /// Port number, if one was present and parseable
    pub port: Option<u16>,
    /// Query string after `?`, without the `?` itself; may be empty
    pub query: &'a str,
}

/// Split a URL into scheme, host, port and query.
///
/// IPv6 literals must be bracketed (`udp://[ff02::1]:5000`). A missing port
/// is reported as `None`; a present but non-numeric port is an error.
pub fn split_url(uri: &str) -> Result<UrlParts<'_>, UrlError> {
    let (scheme, rest) = match uri.find("://") {
        Some(idx) => (Some(&uri[..idx]), &uri[idx + 3..]),
        None => (None, uri),
    };

    let (authority, query) = match rest.find('?') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };

    // transport URLs carry no path; stop the authority at the first '/'
    let authority = match authority.find('/') {
        Some(idx) => &authority[..idx],
        None => authority,
    };

    let (host, port_str) = if let Some(stripped) = authority.strip_prefix('[') {
        let end = stripped
            .find(']')
            .ok_or_else(|| UrlError::UnterminatedBracket(uri.to_string()))?;
        let host = &stripped[..end];
        let after = &stripped[end + 1..];
        match after.strip_prefix(':') {
            Some(p) => (host, Some(p)),
            None => (host, None),
        }
    } else {
        match authority.rfind(':') {
            Some(idx) => (&authority[..idx], Some(&authority[idx + 1..])),
            None => (authority, None),
        }
    };

    let port = match port_str {
        Some("") | None => None,
        Some(p) => Some(
            p.parse::<u16>()
                .map_err(|_| UrlError::InvalidPort(uri.to_string()))?,
        ),
    };

    Ok(UrlParts {
        scheme,
        host,
        port,
        query,
    })
}
