//! Cross-Origin Resource Sharing.

use std::pin::Pin;

use crate::{
    Method, Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const MAX_AGE_SECS: u32 = 3600;

/// CORS middleware — injects `Access-Control-*` headers and answers
/// preflight (`OPTIONS`) requests.
///
/// # Behavior
///
/// - Requests outside the configured [`scope`](Self::scope) pass through untouched.
/// - Every in-scope response is decorated with the wildcard origin, whether
///   or not the client sent an `Origin` header.
/// - In-scope `OPTIONS` requests are answered with `204 No Content` and an
///   `Access-Control-Max-Age`; the downstream handler is not called.
///
/// | Header                          | Value                           |
/// |---------------------------------|---------------------------------|
/// | `Access-Control-Allow-Origin`   | `*`                             |
/// | `Access-Control-Allow-Methods`  | `GET, POST, OPTIONS`            |
/// | `Access-Control-Allow-Headers`  | `Content-Type, Authorization`   |
/// | `Access-Control-Max-Age`        | `3600` (preflight only)         |
///
/// # Examples
///
/// ```rust
/// use vitrina::security::CorsMiddleware;
///
/// let cors = CorsMiddleware::new().scope("/api/");
/// ```
#[derive(Debug, Default)]
pub struct CorsMiddleware {
    scope: Option<String>,
}

impl CorsMiddleware {
    /// Creates a policy covering every path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the policy to paths starting with `prefix`.
    #[must_use]
    pub fn scope(mut self, prefix: impl Into<String>) -> Self {
        self.scope = Some(prefix.into());
        self
    }

    fn in_scope(&self, path: &str) -> bool {
        self.scope
            .as_deref()
            .is_none_or(|prefix| path.starts_with(prefix))
    }
}

fn apply(response: &mut Response) {
    response.set_header("Access-Control-Allow-Origin", ALLOW_ORIGIN);
    response.set_header("Access-Control-Allow-Methods", ALLOW_METHODS);
    response.set_header("Access-Control-Allow-Headers", ALLOW_HEADERS);
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let request = ctx.request();
        let in_scope = self.in_scope(request.path());
        let is_preflight = request.method() == &Method::Options;

        Box::pin(async move {
            if !in_scope {
                return next.run(ctx).await;
            }

            if is_preflight {
                let mut response = Response::new(StatusCode::NoContent)
                    .header("Access-Control-Max-Age", MAX_AGE_SECS.to_string());
                apply(&mut response);
                return response;
            }

            let mut response = next.run(ctx).await;
            apply(&mut response);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Request;
    use crate::middleware::{MiddlewareHandler, from_middleware};
    use crate::router::BoxFuture;

    fn context(method: &str, path: &str, origin: Option<&str>) -> Context {
        let origin = origin
            .map(|o| format!("Origin: {o}\r\n"))
            .unwrap_or_default();
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n{origin}\r\n");
        Context::new(Request::parse(raw.as_bytes()).unwrap().request)
    }

    fn ok_terminal() -> MiddlewareHandler {
        Arc::new(|_ctx: Context, _next: Next| -> BoxFuture<Response> {
            Box::pin(async { Response::new(StatusCode::Ok) })
        })
    }

    async fn run(cors: CorsMiddleware, ctx: Context) -> Response {
        Next::new(vec![from_middleware(Arc::new(cors)), ok_terminal()])
            .run(ctx)
            .await
    }

    #[tokio::test]
    async fn wildcard_decorates_without_origin() {
        let res = run(CorsMiddleware::new().scope("/api/"), context("GET", "/api/test", None)).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(
            res.headers().get("access-control-allow-headers"),
            Some("Content-Type, Authorization")
        );
        assert!(!res.headers().contains("access-control-max-age"));
    }

    #[tokio::test]
    async fn unscoped_policy_covers_every_path() {
        let res = run(CorsMiddleware::new(), context("GET", "/", Some("https://a.example"))).await;
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn out_of_scope_is_untouched() {
        let res = run(CorsMiddleware::new().scope("/api/"), context("GET", "/", Some("https://a.example"))).await;
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn out_of_scope_options_reaches_the_handler() {
        let res = run(CorsMiddleware::new().scope("/api/"), context("OPTIONS", "/", None)).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn preflight_short_circuits() {
        let res = run(CorsMiddleware::new().scope("/api/"), context("OPTIONS", "/api/data", None)).await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(res.headers().get("access-control-max-age"), Some("3600"));
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
    }
}
