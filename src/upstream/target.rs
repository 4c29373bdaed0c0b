//! Upstream target descriptors.
//!
//! A [`BackendTarget`] is resolved once at startup from a configured URL and
//! never changes afterwards. It knows how to turn an inbound request URI into
//! the URI the upstream should see.

use std::fmt;

use axum::http::uri::{Authority, InvalidUri, PathAndQuery, Scheme};
use axum::http::Uri;
use thiserror::Error;
use url::Url;

/// Which of the two backends a target describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendRole {
    Primary,
    Secondary,
}

impl BackendRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendRole::Primary => "primary",
            BackendRole::Secondary => "secondary",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a backend URL cannot be used as an upstream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("URL is empty")]
    Empty,

    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme {0:?}, expected http")]
    Scheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("invalid authority {0:?}")]
    Authority(String),
}

/// An immutable upstream descriptor.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    role: BackendRole,
    url: Url,
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
}

impl BackendTarget {
    /// Resolve a configured URL. Only absolute `http` URLs with a host are
    /// accepted.
    pub fn parse(role: BackendRole, raw: &str) -> Result<Self, TargetError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TargetError::Empty);
        }

        let url = Url::parse(raw)?;
        if url.scheme() != "http" {
            return Err(TargetError::Scheme(url.scheme().to_string()));
        }

        let host = url.host().ok_or(TargetError::MissingHost)?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|_| TargetError::Authority(authority))?;

        Ok(Self {
            role,
            base_path: url.path().to_string(),
            base_query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
            authority,
            url,
        })
    }

    pub fn role(&self) -> BackendRole {
        self.role
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The base URL itself, used as the liveness probe destination.
    pub fn probe_uri(&self) -> Result<Uri, InvalidUri> {
        self.url.as_str().parse()
    }

    /// Compose the upstream URI for an inbound request.
    ///
    /// The base path and the request path are joined with exactly one slash
    /// between them; the base query and the request query are joined with
    /// `&` when both are present.
    pub fn rewrite_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(&self.base_path, inbound.path());
        let path_and_query = match (self.base_query.as_deref(), inbound.query()) {
            (Some(base), Some(query)) if !query.is_empty() => {
                format!("{}?{}&{}", path, base, query)
            }
            (Some(base), _) => format!("{}?{}", path, base),
            (None, Some(query)) => format!("{}?{}", path, query),
            (None, None) => path,
        };

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::try_from(path_and_query)?)
            .build()
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
