use core::fmt;

/// Relative API path with an optional query string, e.g.
/// `/entries?from=2024-05-01&to=2024-05-01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPath(String);

impl AsRef<str> for ApiPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ApiPath {
    pub fn new(path: &str) -> Self {
        Self(format!("/{}", path.trim_start_matches('/')))
    }

    /// Append the given path segment(s).
    pub fn append_path(&self, path: &str) -> Self {
        let (base, query) = match self.0.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.0.as_str(), None),
        };
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        match query {
            Some(query) => Self(format!("{}?{}", joined, query)),
            None => Self(joined),
        }
    }

    /// Append a percent-encoded `key=value` pair to the query string.
    pub fn with_query(&self, key: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        let separator = if self.0.contains('?') { '&' } else { '?' };
        Self(format!(
            "{}{}{}={}",
            self.0,
            separator,
            urlencoding::encode(key),
            urlencoding::encode(&value)
        ))
    }
}
