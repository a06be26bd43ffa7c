//! Per-request context handed to middleware and handlers.
//!
//! A [`Context`] is built once the router has resolved a request: it carries
//! the [`Request`], the path parameters captured by the matched pattern, and
//! the matched route's endpoint name.

use crate::Request;

/// Path parameters captured by the matched route, in pattern order.
///
/// Order matters: cached handlers stringify the parameters positionally to
/// derive their cache key, so the same route must always yield the same
/// sequence.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured parameter. A repeated name overwrites in place.
    pub fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Captured values in pattern order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-request context.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: PathParams,
    endpoint: Option<String>,
}

impl Context {
    /// Creates a context for a request that matched no route.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            params: PathParams::new(),
            endpoint: None,
        }
    }

    /// Creates a context carrying the parameters a route pattern captured.
    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self {
            request,
            params,
            endpoint: None,
        }
    }

    /// Tags the context with the name of the route that will serve it.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Name of the matched route, if it was registered with one.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_keep_insertion_order() {
        let mut params = PathParams::new();
        params.insert("user".into(), "7".into());
        params.insert("post".into(), "99".into());
        params.insert("user".into(), "8".into());

        assert_eq!(params.values().collect::<Vec<_>>(), vec!["8", "99"]);
        assert_eq!(params.get("post"), Some("99"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn json_body() {
        let raw = b"POST /api/data HTTP/1.1\r\nContent-Length: 8\r\n\r\n{\"a\": 1}";
        let request = Request::parse(raw).unwrap().request;
        let ctx = Context::new(request).with_endpoint(Some("process_data".into()));

        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(ctx.endpoint(), Some("process_data"));
    }
}
