//! URL decomposition into the pieces a connection race needs.
//!
//! Only `http`, `https` and `file` URLs are accepted. When the URL carries no
//! port, `http` defaults to 80 and everything else to 443.

use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use url::Url;

/// The parts of a URL relevant to connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: String,
    /// The URL as given.
    pub url: String,
    /// Host with `:port` appended when the URL names a non-default port.
    pub host_and_port: String,
    /// Host without brackets or port. Empty for `file:///...` URLs.
    pub host: String,
    pub port: u16,
    /// Everything after the authority: path, then `?query` and `#fragment`
    /// when present. Always starts with `/`.
    pub path: String,
}

impl Endpoint {
    /// Parse `raw` into an [`Endpoint`].
    pub fn parse(raw: &str) -> Result<Self, NetError> {
        let url = Url::parse(raw).map_err(|_| NetError::InvalidUrl)?;

        let scheme = url.scheme();
        if !matches!(scheme, "http" | "https" | "file") {
            return Err(NetError::UnknownUrlScheme);
        }

        let host = match url.host_str() {
            Some(h) => h.trim_start_matches('[').trim_end_matches(']').to_string(),
            None if scheme == "file" => String::new(),
            None => return Err(NetError::InvalidUrl),
        };

        let port = url.port().unwrap_or(default_port(scheme));
        let host_and_port = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => String::new(),
        };

        let mut path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            path.push('#');
            path.push_str(fragment);
        }

        Ok(Self {
            scheme: scheme.to_string(),
            url: raw.to_string(),
            host_and_port,
            host,
            port,
            path,
        })
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }
}

/// Shorthand for [`Endpoint::parse`].
pub fn parse_url(raw: &str) -> Result<Endpoint, NetError> {
    Endpoint::parse(raw)
}

/// Port used when a URL does not name one.
pub fn default_port(scheme: &str) -> u16 {
    if scheme == "http" {
        80
    } else {
        443
    }
}
