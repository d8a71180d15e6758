//! Trackable resource validation.
//!
//! Turns the URL of an activated tab into the normalized domain a session is
//! keyed by, and normalizes user-typed domains for limit editing the same way
//! so both sides agree on the record key.

use thiserror::Error;
use url::{Host, Url};

/// Schemes whose pages never host an activity probe and are never tracked.
const PRIVILEGED_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "devtools",
    "edge",
    "moz-extension",
    "view-source",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("no URL")]
    Missing,
    #[error("unparseable URL: {0}")]
    Unparseable(String),
    #[error("privileged scheme: {0}")]
    Privileged(String),
    #[error("URL has no host: {0}")]
    NoHost(String),
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

/// A validated, trackable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub url: Url,
    pub domain: String,
}

impl Resource {
    pub fn parse(candidate: Option<&str>) -> Result<Self, ResourceError> {
        let raw = candidate.map(str::trim).filter(|s| !s.is_empty()).ok_or(ResourceError::Missing)?;
        let url = Url::parse(raw).map_err(|e| ResourceError::Unparseable(format!("{raw} ({e})")))?;

        if PRIVILEGED_SCHEMES.contains(&url.scheme()) {
            return Err(ResourceError::Privileged(url.scheme().to_string()));
        }

        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| ResourceError::NoHost(raw.to_string()))?;
        let domain = strip_www(host).to_string();

        Ok(Resource { url, domain })
    }
}

/// Normalizes a user-typed domain: lowercase, no scheme, no `www.`, no path, no port.
pub fn normalize_domain(input: &str) -> Result<String, ResourceError> {
    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered.split_once("://").map_or(lowered.as_str(), |(_, rest)| rest);
    let without_path = without_scheme.split(['/', '?', '#']).next().unwrap_or_default();
    let without_port = match without_path.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => without_path,
    };
    let cleaned = strip_www(without_port);

    match Host::parse(cleaned) {
        Ok(Host::Ipv4(_)) => Ok(cleaned.to_string()),
        Ok(Host::Domain(domain)) if is_dns_name(&domain) => Ok(domain),
        _ => Err(ResourceError::InvalidDomain(input.to_string())),
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn is_dns_name(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };
    labels.len() >= 2
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_host_without_www() {
        let resource = Resource::parse(Some("https://www.Example.com:8443/watch?v=1")).unwrap();
        assert_eq!(resource.domain, "example.com");
    }

    #[test]
    fn parse_rejects_privileged_and_hostless() {
        assert_eq!(
            Resource::parse(Some("chrome://settings")),
            Err(ResourceError::Privileged("chrome".to_string()))
        );
        assert!(matches!(Resource::parse(Some("about:blank")), Err(ResourceError::Privileged(_))));
        assert!(matches!(Resource::parse(Some("file:///tmp/x.html")), Err(ResourceError::NoHost(_))));
        assert!(matches!(Resource::parse(Some("not a url")), Err(ResourceError::Unparseable(_))));
        assert_eq!(Resource::parse(None), Err(ResourceError::Missing));
    }

    #[test]
    fn normalize_domain_cleans_user_input() {
        assert_eq!(normalize_domain(" HTTPS://www.YouTube.com/feed ").unwrap(), "youtube.com");
        assert_eq!(normalize_domain("news.ycombinator.com:443").unwrap(), "news.ycombinator.com");
        assert_eq!(normalize_domain("192.168.0.1").unwrap(), "192.168.0.1");
        assert!(normalize_domain("localhost").is_err());
        assert!(normalize_domain("-bad.com").is_err());
        assert!(normalize_domain("").is_err());
    }
}
