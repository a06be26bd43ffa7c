//! Route-level memoization.

use std::sync::Arc;
use std::time::Duration;

use super::{CacheKey, ResponseCache};
use crate::context::Context;
use crate::http::Response;
use crate::router::IntoHandler;

/// Wraps `handler` so its responses are served from `cache` for `ttl`.
///
/// The key is derived from `endpoint`, the request method and path, and the
/// route's captured path parameters in pattern order. Query strings and
/// bodies are not part of the key. An `Err` from the handler is returned
/// as-is and leaves the cache untouched.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use vitrina::cache::{ResponseCache, cached};
/// use vitrina::{Response, Router};
///
/// let cache = Arc::new(ResponseCache::new());
/// let mut router = Router::new();
/// router
///     .get(
///         "/",
///         cached(Arc::clone(&cache), "home", Duration::from_secs(600), |_ctx| async {
///             Ok(Response::html("<h1>hi</h1>"))
///         }),
///     )
///     .name("home");
/// ```
pub fn cached<H>(
    cache: Arc<ResponseCache<Response>>,
    endpoint: &'static str,
    ttl: Duration,
    handler: H,
) -> impl IntoHandler
where
    H: IntoHandler,
{
    let handler = Arc::new(handler);

    move |ctx: Context| {
        let cache = Arc::clone(&cache);
        let handler = Arc::clone(&handler);

        async move {
            let key = {
                let request = ctx.request();
                let args: Vec<&str> = ctx.params().values().collect();
                CacheKey::derive(endpoint, request.method(), request.path(), &args)
            };
            cache
                .get_or_compute_async(&key, ttl, move || handler.call(ctx))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::context::PathParams;
    use crate::http::{HttpError, Request, StatusCode};

    fn context(method: &str, path: &str, params: &[(&str, &str)]) -> Context {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let request = Request::parse(raw.as_bytes()).unwrap().request;
        let mut captured = PathParams::new();
        for (k, v) in params {
            captured.insert((*k).to_owned(), (*v).to_owned());
        }
        Context::with_params(request, captured)
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> impl IntoHandler {
        move |_ctx: Context| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Response::new(StatusCode::Ok).body(n.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let cache = Arc::new(ResponseCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = cached(
            Arc::clone(&cache),
            "home",
            Duration::from_secs(60),
            counting_handler(Arc::clone(&calls)),
        );

        let first = handler.call(context("GET", "/", &[])).await.unwrap();
        let second = handler.call(context("GET", "/", &[])).await.unwrap();

        assert_eq!(first.body_ref(), b"1");
        assert_eq!(second.body_ref(), b"1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&CacheKey::from("home_GET_/_[]")));
    }

    #[tokio::test]
    async fn path_params_separate_entries() {
        let cache = Arc::new(ResponseCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = cached(
            Arc::clone(&cache),
            "user",
            Duration::from_secs(60),
            counting_handler(Arc::clone(&calls)),
        );

        handler
            .call(context("GET", "/users/1", &[("id", "1")]))
            .await
            .unwrap();
        handler
            .call(context("GET", "/users/2", &[("id", "2")]))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains(&CacheKey::from("user_GET_/users/1_[1]")));
        assert!(cache.contains(&CacheKey::from("user_GET_/users/2_[2]")));
    }

    #[tokio::test]
    async fn handler_errors_are_not_cached() {
        let cache = Arc::new(ResponseCache::new());
        let handler = cached(
            Arc::clone(&cache),
            "flaky",
            Duration::from_secs(60),
            |_ctx: Context| async { Err(HttpError::Internal("backend down".to_owned())) },
        );

        let result = handler.call(context("GET", "/flaky", &[])).await;
        assert!(matches!(result, Err(HttpError::Internal(_))));
        assert!(cache.is_empty());
    }
}
