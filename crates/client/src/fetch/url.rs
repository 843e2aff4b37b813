//! URL resolution against the controller's scope.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for aide_core::Error {
    fn from(err: UrlError) -> Self {
        aide_core::Error::InvalidUrl(err.to_string())
    }
}

/// Whether requests for this URL can be intercepted at all.
pub fn is_fetchable_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Parse an absolute scope URL.
pub fn parse_scope(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut scope = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if !is_fetchable_scheme(&scope) {
        return Err(UrlError::UnsupportedScheme(scope.scheme().to_string()));
    }
    scope.set_fragment(None);
    Ok(scope)
}

/// Resolve a possibly relative URL against `scope`.
///
/// Resolution steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references onto the scope (absolute URLs pass through)
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
///
/// Any scheme is accepted here; interception decides what to do with
/// non-http(s) URLs.
pub fn resolve(scope: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = scope.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}

/// Resolve a manifest entry, which must stay on http(s).
pub fn resolve_fetchable(scope: &Url, input: &str) -> Result<Url, UrlError> {
    let url = resolve(scope, input)?;
    if !is_fetchable_scheme(&url) {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}
