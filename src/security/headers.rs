//! Security and caching response headers.

use std::pin::Pin;

use crate::{
    Response,
    context::Context,
    middleware::{Middleware, Next},
};

/// `Cache-Control` for endpoints listed as publicly cacheable.
pub const PUBLIC_CACHE_CONTROL: &str = "public, max-age=300";

/// `Cache-Control` for everything else, error responses included.
pub const NO_STORE_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// After-request middleware that stamps every response with hardening
/// headers, a `Cache-Control` policy chosen by endpoint name, and an
/// `X-Powered-By` marker.
///
/// Headers are set, not appended, so a handler cannot weaken them.
///
/// # Examples
///
/// ```rust
/// use vitrina::security::SecurityHeaders;
///
/// let headers = SecurityHeaders::new("vitrina")
///     .cacheable("home")
///     .cacheable("health_check");
/// ```
pub struct SecurityHeaders {
    powered_by: String,
    cacheable_endpoints: Vec<String>,
}

impl SecurityHeaders {
    pub fn new(powered_by: impl Into<String>) -> Self {
        Self {
            powered_by: powered_by.into(),
            cacheable_endpoints: Vec::new(),
        }
    }

    /// Marks `endpoint` as safe for shared caches.
    #[must_use]
    pub fn cacheable(mut self, endpoint: impl Into<String>) -> Self {
        self.cacheable_endpoints.push(endpoint.into());
        self
    }

    fn cache_control_for(&self, endpoint: Option<&str>) -> &'static str {
        match endpoint {
            Some(name) if self.cacheable_endpoints.iter().any(|e| e == name) => PUBLIC_CACHE_CONTROL,
            _ => NO_STORE_CACHE_CONTROL,
        }
    }
}

impl Middleware for SecurityHeaders {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let cache_control = self.cache_control_for(ctx.endpoint());
        let powered_by = self.powered_by.clone();

        Box::pin(async move {
            let mut response = next.run(ctx).await;
            response.set_header("X-Content-Type-Options", "nosniff");
            response.set_header("X-Frame-Options", "DENY");
            response.set_header("X-XSS-Protection", "1; mode=block");
            response.set_header("Referrer-Policy", "strict-origin-when-cross-origin");
            response.set_header("Cache-Control", cache_control);
            response.set_header("X-Powered-By", powered_by);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::middleware::{MiddlewareHandler, from_middleware};
    use crate::router::BoxFuture;
    use crate::{Request, StatusCode};

    async fn run(endpoint: Option<&str>) -> Response {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let ctx = Context::new(Request::parse(raw).unwrap().request)
            .with_endpoint(endpoint.map(str::to_owned));
        let layer = SecurityHeaders::new("vitrina").cacheable("home");
        let terminal: MiddlewareHandler = Arc::new(|_ctx: Context, _next: Next| -> BoxFuture<Response> {
            Box::pin(async { Response::new(StatusCode::Ok).header("Cache-Control", "private") })
        });
        Next::new(vec![from_middleware(Arc::new(layer)), terminal])
            .run(ctx)
            .await
    }

    #[tokio::test]
    async fn hardening_headers_always_present() {
        let res = run(None).await;
        let h = res.headers();
        assert_eq!(h.get("x-content-type-options"), Some("nosniff"));
        assert_eq!(h.get("x-frame-options"), Some("DENY"));
        assert_eq!(h.get("x-xss-protection"), Some("1; mode=block"));
        assert_eq!(h.get("referrer-policy"), Some("strict-origin-when-cross-origin"));
        assert_eq!(h.get("x-powered-by"), Some("vitrina"));
    }

    #[tokio::test]
    async fn cacheable_endpoint_is_public() {
        let res = run(Some("home")).await;
        let values: Vec<_> = res.headers().get_all("cache-control").collect();
        assert_eq!(values, vec![PUBLIC_CACHE_CONTROL]);
    }

    #[tokio::test]
    async fn other_endpoints_are_not_stored() {
        for endpoint in [Some("test_endpoint"), None] {
            let res = run(endpoint).await;
            assert_eq!(res.headers().get("cache-control"), Some(NO_STORE_CACHE_CONTROL));
        }
    }
}
