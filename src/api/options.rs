use std::collections::HashMap;
use std::mem::discriminant;

use crate::client::ClientConfig;
use crate::error::{Error, Result};

/// Cache behaviour requested for a single call, folded into `Cache-Control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Default,
    NoCache,
    CacheFirst,
}

/// A per-call option. Options are combined as a set union keyed by variant,
/// not an ordered override: the first inserted value for a variant wins.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOption {
    /// Elevate the call with the primary (master) key. Fails at header-fold
    /// time if the client was built without one.
    UsePrimaryKey,
    SessionToken(String),
    CachePolicy(CachePolicy),
    MimeType(String),
    Metadata(HashMap<String, String>),
    Tags(HashMap<String, String>),
    Custom(String, String),
}

/// Set of [`RequestOption`]s attached to a command, a query, or a call site.
///
/// Several save/track call sites insert a cache policy before unioning in the
/// caller's options; because first-insert-wins per variant, a caller-supplied
/// cache policy is ignored at those sites. That is long-standing behaviour
/// callers depend on, so it is kept and pinned by tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    options: Vec<RequestOption>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an option; a no-op when an option of the same variant is
    /// already present (`Custom` options are keyed by header name instead).
    pub fn insert(&mut self, option: RequestOption) {
        let exists = self.options.iter().any(|existing| match (existing, &option) {
            (RequestOption::Custom(a, _), RequestOption::Custom(b, _)) => a == b,
            (a, b) => discriminant(a) == discriminant(b),
        });
        if !exists {
            self.options.push(option);
        }
    }

    pub fn with(mut self, option: RequestOption) -> Self {
        self.insert(option);
        self
    }

    /// Union another set into this one; existing entries win.
    pub fn union(&mut self, other: &RequestOptions) {
        for option in &other.options {
            self.insert(option.clone());
        }
    }

    pub fn contains_primary_key(&self) -> bool {
        self.options
            .iter()
            .any(|o| matches!(o, RequestOption::UsePrimaryKey))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestOption> {
        self.options.iter()
    }

    /// Fold the option set into header pairs using the client configuration.
    pub fn headers(&self, config: &ClientConfig) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        for option in &self.options {
            match option {
                RequestOption::UsePrimaryKey => {
                    let key = config.primary_key.as_deref().ok_or_else(|| {
                        Error::Unauthorized(
                            "this call requires a primary key, but none is configured".to_string(),
                        )
                    })?;
                    headers.push(("X-Meridian-Primary-Key".to_string(), key.to_string()));
                }
                RequestOption::SessionToken(token) => {
                    headers.push(("X-Meridian-Session-Token".to_string(), token.clone()));
                }
                RequestOption::CachePolicy(policy) => match policy {
                    CachePolicy::Default => {}
                    CachePolicy::NoCache => {
                        headers.push(("Cache-Control".to_string(), "no-cache".to_string()));
                    }
                    CachePolicy::CacheFirst => {
                        headers.push(("Cache-Control".to_string(), "max-stale".to_string()));
                    }
                },
                RequestOption::MimeType(mime) => {
                    headers.push(("Content-Type".to_string(), mime.clone()));
                }
                RequestOption::Metadata(map) => {
                    headers.push((
                        "X-Meridian-Metadata".to_string(),
                        serde_json::to_string(map).map_err(Error::decode)?,
                    ));
                }
                RequestOption::Tags(map) => {
                    headers.push((
                        "X-Meridian-Tags".to_string(),
                        serde_json::to_string(map).map_err(Error::decode)?,
                    ));
                }
                RequestOption::Custom(name, value) => {
                    headers.push((name.clone(), value.clone()));
                }
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_first_insert_wins() {
        let mut options = RequestOptions::new();
        options.insert(RequestOption::CachePolicy(CachePolicy::NoCache));

        let mut user = RequestOptions::new();
        user.insert(RequestOption::CachePolicy(CachePolicy::CacheFirst));
        user.insert(RequestOption::SessionToken("tok".to_string()));

        options.union(&user);

        let cache: Vec<_> = options
            .iter()
            .filter(|o| matches!(o, RequestOption::CachePolicy(_)))
            .collect();
        assert_eq!(
            cache,
            vec![&RequestOption::CachePolicy(CachePolicy::NoCache)]
        );
        assert!(options
            .iter()
            .any(|o| matches!(o, RequestOption::SessionToken(_))));
    }

    #[test]
    fn test_custom_options_keyed_by_header_name() {
        let mut options = RequestOptions::new();
        options.insert(RequestOption::Custom("X-A".to_string(), "1".to_string()));
        options.insert(RequestOption::Custom("X-B".to_string(), "2".to_string()));
        options.insert(RequestOption::Custom("X-A".to_string(), "3".to_string()));
        assert_eq!(options.iter().count(), 2);
    }
}
