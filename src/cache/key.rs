//! Cache key derivation.

use std::fmt;

use crate::http::Method;

/// Deterministic fingerprint of a cacheable unit of work.
///
/// Built from the handler name, HTTP method, request path and the handler's
/// positional arguments, each converted with plain `Display`. No
/// normalization happens, so `"01"` and `"1"` yield different keys, and two
/// inputs that happen to render the same string share an entry.
///
/// # Examples
///
/// ```
/// use vitrina::cache::CacheKey;
/// use vitrina::http::Method;
///
/// let key = CacheKey::derive("health_check", &Method::Get, "/api/health", &[] as &[&str]);
/// assert_eq!(key.as_str(), "health_check_GET_/api/health_[]");
///
/// let key = CacheKey::derive("user", &Method::Get, "/users/42", &["42"]);
/// assert_eq!(key.as_str(), "user_GET_/users/42_[42]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for one invocation of `handler`.
    pub fn derive<A: fmt::Display>(handler: &str, method: &Method, path: &str, args: &[A]) -> Self {
        let args = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self(format!("{handler}_{method}_{path}_[{args}]"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
