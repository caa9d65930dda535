//! Reference resolution against a page URL.
//!
//! Pure functions: no state, no I/O. Everything that turns an attribute value
//! into an absolute or proxied URL goes through here.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

/// Path of the proxy endpoint on this server.
pub const PROXY_PATH: &str = "/proxy";

/// Characters left alone by `encodeURIComponent`; everything else is escaped.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid URL '{reference}': {reason}")]
    InvalidUrl { reference: String, reason: String },
}

impl ResolveError {
    fn invalid(reference: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// True when the reference starts with an RFC 3986 scheme (`https:`, `data:`, ...).
pub fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// True for references beginning with `/` (including protocol-relative `//host`).
pub fn is_path_absolute(reference: &str) -> bool {
    reference.trim_start().starts_with('/')
}

/// Resolve `reference` against `base`.
///
/// Scheme-qualified references come back byte-identical.
pub fn resolve(reference: &str, base: &Url) -> Result<String, ResolveError> {
    if has_scheme(reference) {
        return Ok(reference.to_string());
    }
    base.join(reference.trim())
        .map(String::from)
        .map_err(|e| ResolveError::invalid(reference, e))
}

/// `/proxy?url=<percent-encoded absolute_url>`.
pub fn to_proxied(absolute_url: &str) -> String {
    format!(
        "{}?url={}",
        PROXY_PATH,
        utf8_percent_encode(absolute_url, URI_COMPONENT)
    )
}

/// Proxied form anchored at this server's origin.
pub fn to_proxied_at(proxy_origin: &str, absolute_url: &str) -> String {
    format!("{}{}", proxy_origin.trim_end_matches('/'), to_proxied(absolute_url))
}

/// Validate a user-supplied proxy target: must parse and use `http` or `https`.
pub fn parse_target(raw: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(raw.trim()).map_err(|e| ResolveError::invalid(raw, e))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        "http" | "https" => Err(ResolveError::invalid(raw, "missing host")),
        other => Err(ResolveError::invalid(
            raw,
            format!("scheme '{}' is not allowed", other),
        )),
    }
}
