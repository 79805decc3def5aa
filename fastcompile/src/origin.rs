use regex::Regex;

use crate::{error::Error, Result};

/// Origin allow-list: configured production origins plus any loopback origin
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    loopback: Regex,
}

impl OriginPolicy {
    pub fn new<I, S>(allowed: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let loopback = Regex::new(r"^https?://(localhost|127\.0\.0\.1|\[::1\])(:\d{1,5})?/?$")
            .map_err(|e| Error::Config(format!("Invalid loopback pattern: {}", e)))?;
        Ok(Self {
            allowed: allowed
                .into_iter()
                .map(|origin| origin.into().trim_end_matches('/').to_string())
                .collect(),
            loopback,
        })
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.loopback.is_match(origin) || self.allowed.iter().any(|a| a == origin)
    }

    /// Accept the declared origin or fail with `OriginNotAllowed`.
    /// A request without an `Origin` header is rejected.
    pub fn check(&self, origin: Option<&str>) -> Result<()> {
        match origin {
            Some(origin) if self.is_allowed(origin) => Ok(()),
            Some(origin) => Err(Error::OriginNotAllowed(origin.to_string())),
            None => Err(Error::OriginNotAllowed("<missing>".to_string())),
        }
    }
}
