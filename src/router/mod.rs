//! Request routing — map URL patterns and HTTP methods to handler functions.
//!
//! This module provides [`Router`], which resolves an incoming method and
//! path to a registered handler. Two pattern styles are supported:
//!
//! | Pattern              | Example match              | Captured params              |
//! |----------------------|----------------------------|------------------------------|
//! | `/users`             | `/users`                   | *(none)*                     |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                  |
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so
//! `/users/` and `/users` are treated as equivalent.
//!
//! Routes are matched in registration order; the first route whose method and
//! pattern both match wins. When the path matches but the method does not,
//! resolution reports the methods that would have matched so the caller can
//! answer `405` instead of `404`.

use std::collections::{BTreeMap, BTreeSet};
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::http::{HttpError, Method, Response};

/// What a route handler produces: a response, or an error rendered as JSON.
pub type HandlerResult = Result<Response, HttpError>;

/// A boxed, `Send` future, the return type of every type-erased handler.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Type-erased, heap-allocated async handler.
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be cloned into a
/// per-request middleware chain without copying the underlying closure. Use
/// [`Router::get`] and friends rather than building one by hand.
pub type Handler = Arc<dyn Fn(Context) -> BoxFuture<HandlerResult> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = HandlerResult> + Send` that is
/// also `Send + Sync + 'static` implements this trait through the blanket
/// impl below, so plain `async fn`s and closures both register directly.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> BoxFuture<HandlerResult>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<HandlerResult> {
        Box::pin((self)(ctx))
    }
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    // Matches one exact path string, e.g. `/users`.
    Exact(String),
    // Matches a fixed number of segments where some may be named captures, e.g. `/users/:id`.
    Parameterized { segments: Vec<Segment> },
}

fn trim_trailing_slash(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

impl Pattern {
    /// Parse a route pattern string into a `Pattern`.
    ///
    /// A pattern containing `:` is `Parameterized`, with one or more named
    /// captures. Anything else is `Exact`, a literal path match.
    fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_string()),
                    None => Segment::Static(s.to_string()),
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    // Try to match `path`, returning the captured parameters on success.
    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => {
                            params.insert(name.clone(), path_seg.to_string());
                        }
                    }
                }
                Some(params)
            }
        }
    }
}

/// A registered route binding a method and pattern to a handler.
///
/// Returned by the registration helpers so a name can be attached:
///
/// ```rust
/// use vitrina::{Response, Router};
///
/// let mut router = Router::new();
/// router
///     .get("/api/health", |_ctx| async { Ok(Response::default()) })
///     .name("health_check");
/// ```
pub struct Route {
    method: Method,
    path: String,
    pattern: Pattern,
    handler: Handler,
    name: Option<String>,
}

impl Route {
    fn new(method: Method, path: &str, handler: Handler) -> Self {
        Self {
            method,
            path: trim_trailing_slash(path).to_string(),
            pattern: Pattern::parse(path),
            handler,
            name: None,
        }
    }

    fn serves(&self, method: &Method) -> bool {
        &self.method == method || (*method == Method::Head && self.method == Method::Get)
    }

    /// Names the route's endpoint. Middleware sees the name through
    /// [`Context::endpoint`].
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of resolving a method and path against the registered routes.
pub enum Resolution {
    /// A route matched; its handler should serve the request.
    Matched {
        handler: Handler,
        params: PathParams,
        endpoint: Option<String>,
    },
    /// The path is known but not under this method.
    MethodNotAllowed { allowed: Vec<Method> },
    /// Nothing matches the path.
    NotFound,
}

/// HTTP request router.
///
/// # Examples
///
/// ```rust
/// use vitrina::{Response, Router};
/// use vitrina::context::Context;
///
/// let mut router = Router::new();
///
/// router.get("/ping", |_ctx| async { Ok(Response::default()) });
///
/// router.get("/users/:id", |ctx: Context| async move {
///     let id = ctx.params().get("id").unwrap_or("unknown").to_owned();
///     Ok(Response::default().body(id))
/// });
/// assert_eq!(router.len(), 2);
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create a new, empty `Router`.
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Get, path, handler)
    }

    /// Register a handler for `POST` requests matching `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Post, path, handler)
    }

    // Erase the concrete handler type and store it as a `Handler` trait object.
    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) -> &mut Route {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route::new(method, path, handler));
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve `method` and `path` to a handler.
    ///
    /// The first route whose method and pattern both match wins. `HEAD` is
    /// served by the matching `GET` route. Otherwise
    /// every route whose pattern matches contributes its method to
    /// [`Resolution::MethodNotAllowed`]; if none does, the path is
    /// [`Resolution::NotFound`].
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let mut allowed = BTreeSet::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if route.serves(method) {
                return Resolution::Matched {
                    handler: Arc::clone(&route.handler),
                    params,
                    endpoint: route.name.clone(),
                };
            }
            allowed.insert(route.method.clone());
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed {
                allowed: allowed.into_iter().collect(),
            }
        }
    }

    /// Registered route paths grouped by method name, for 404 bodies.
    pub fn endpoints(&self) -> BTreeMap<String, Vec<String>> {
        let mut endpoints: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for route in &self.routes {
            let paths = endpoints.entry(route.method.to_string()).or_default();
            if !paths.contains(&route.path) {
                paths.push(route.path.clone());
            }
        }
        endpoints
    }
}
