//! Middleware pipeline — composable before/after request logic.
//!
//! Each middleware wraps the next layer, so it can inspect the request,
//! short-circuit with its own response, or decorate the downstream response.
//! The application appends the matched route as the innermost layer, which
//! keeps handlers unaware of logging, security headers and CORS.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining chain; call [`Next::run`] to advance.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] — converts a [`Middleware`] into a [`MiddlewareHandler`].
//! - [`LoggerMiddleware`] — one log line per request.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;

use crate::{Response, context::Context, http::HttpError};

/// A type-erased, reference-counted middleware function.
///
/// ```rust
/// use std::sync::Arc;
/// use vitrina::{Response, context::Context, middleware::{MiddlewareHandler, Next}, router::BoxFuture};
///
/// let handler: MiddlewareHandler = Arc::new(|ctx: Context, next: Next| -> BoxFuture<Response> {
///     Box::pin(async move { next.run(ctx).await })
/// });
/// ```
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each layer can forward the
/// request at most once.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    index: usize,
}

impl Next {
    /// Creates a cursor positioned at the start of `middlewares`.
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next layer and returns its response.
    ///
    /// If the chain is exhausted without any layer producing a response, a
    /// JSON `500` is returned.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = Arc::clone(&self.middlewares[self.index]);
            self.index += 1;
            handler(ctx, self).await
        } else {
            HttpError::Internal("middleware chain ended without a response".to_owned())
                .into_response()
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors may pass through (`next.run(ctx).await`), short-circuit by
/// returning a [`Response`] without calling `next`, or decorate the
/// downstream response.
///
/// Middleware is shared across Tokio tasks, so implementations must be
/// `Send + Sync` and return a `Send` future.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next layer.
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs each request's method, path, endpoint, status, and duration.
///
/// Client errors are logged at `warn`, server errors at `error`, everything
/// else at `info`.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();
            let endpoint = ctx.endpoint().unwrap_or("-").to_owned();

            let response = next.run(ctx).await;

            let elapsed = start.elapsed();
            let status = response.status().as_u16();
            if status >= 500 {
                tracing::error!(%method, %path, %endpoint, status, ?elapsed, "request failed");
            } else if status >= 400 {
                tracing::warn!(%method, %path, %endpoint, status, ?elapsed, "request rejected");
            } else {
                tracing::info!(%method, %path, %endpoint, status, ?elapsed, "request served");
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::BoxFuture;
    use crate::{Request, StatusCode};

    fn context() -> Context {
        let raw = b"GET /x HTTP/1.1\r\nHost: localhost\r\n\r\n";
        Context::new(Request::parse(raw).unwrap().request)
    }

    fn terminal(status: StatusCode) -> MiddlewareHandler {
        Arc::new(move |_ctx: Context, _next: Next| -> BoxFuture<Response> {
            Box::pin(async move { Response::new(status) })
        })
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            let tag = self.0;
            Box::pin(async move {
                let mut response = next.run(ctx).await;
                response.add_header("X-Layer", tag);
                response
            })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn handle(&self, _ctx: Context, _next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            Box::pin(async { Response::new(StatusCode::NoContent) })
        }
    }

    #[tokio::test]
    async fn empty_chain_yields_500() {
        let response = Next::new(vec![]).run(context()).await;
        assert_eq!(response.status(), StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn layers_unwind_inside_out() {
        let chain = vec![
            from_middleware(Arc::new(Tag("outer"))),
            from_middleware(Arc::new(Tag("inner"))),
            terminal(StatusCode::Ok),
        ];
        let response = Next::new(chain).run(context()).await;

        assert_eq!(response.status(), StatusCode::Ok);
        let layers: Vec<_> = response.headers().get_all("x-layer").collect();
        assert_eq!(layers, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_rest() {
        let chain = vec![
            from_middleware(Arc::new(ShortCircuit)),
            terminal(StatusCode::Ok),
        ];
        let response = Next::new(chain).run(context()).await;
        assert_eq!(response.status(), StatusCode::NoContent);
    }

    #[tokio::test]
    async fn logger_passes_response_through() {
        let chain = vec![
            from_middleware(Arc::new(LoggerMiddleware)),
            terminal(StatusCode::NotFound),
        ];
        let response = Next::new(chain).run(context()).await;
        assert_eq!(response.status(), StatusCode::NotFound);
    }
}
