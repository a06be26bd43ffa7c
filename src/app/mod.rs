//! The demo application: routes, shared state and the middleware stack.
//!
//! | Method | Path          | Endpoint        | Cached for |
//! |--------|---------------|-----------------|------------|
//! | GET    | `/`           | `home`          | 600 s      |
//! | GET    | `/api/health` | `health_check`  | 60 s       |
//! | GET    | `/api/test`   | `test_endpoint` | never      |
//! | POST   | `/api/data`   | `process_data`  | never      |

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{ResponseCache, cached};
use crate::config::Config;
use crate::context::Context;
use crate::http::{HttpError, Method, Request, Response, StatusCode};
use crate::middleware::{LoggerMiddleware, MiddlewareHandler, Next, from_middleware};
use crate::router::{BoxFuture, Resolution, Router};
use crate::security::{CorsMiddleware, SecurityHeaders};

pub const HOME_TTL: Duration = Duration::from_secs(600);
pub const HEALTH_TTL: Duration = Duration::from_secs(60);

/// State shared by every request.
pub struct AppState {
    pub config: Config,
    pub cache: Arc<ResponseCache<Response>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: Arc::new(ResponseCache::new()),
            started_at: Instant::now(),
        }
    }
}

/// A routed application that turns requests into responses.
///
/// # Examples
///
/// ```rust,no_run
/// use vitrina::{App, Request};
/// use vitrina::config::Config;
///
/// #[tokio::main]
/// async fn main() {
///     let app = App::new(Config::default());
///     let request = Request::parse(b"GET /api/health HTTP/1.1\r\n\r\n").unwrap().request;
///     let response = app.handle(request).await;
///     println!("{}", response.status().as_u16());
/// }
/// ```
pub struct App {
    router: Router,
    middlewares: Vec<MiddlewareHandler>,
    state: Arc<AppState>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let state = Arc::new(AppState::new(config));
        let cache = Arc::clone(&state.cache);
        let mut router = Router::new();

        router
            .get("/", cached(Arc::clone(&cache), "home", HOME_TTL, handlers::home))
            .name("home");

        let health_state = Arc::clone(&state);
        router
            .get(
                "/api/health",
                cached(cache, "health_check", HEALTH_TTL, move |ctx: Context| {
                    handlers::health_check(ctx, Arc::clone(&health_state))
                }),
            )
            .name("health_check");

        let test_state = Arc::clone(&state);
        router
            .get("/api/test", move |ctx: Context| {
                handlers::test_endpoint(ctx, Arc::clone(&test_state))
            })
            .name("test_endpoint");

        router.post("/api/data", handlers::process_data).name("process_data");

        let middlewares = vec![
            from_middleware(Arc::new(LoggerMiddleware)),
            from_middleware(Arc::new(
                SecurityHeaders::new(env!("CARGO_PKG_NAME"))
                    .cacheable("home")
                    .cacheable("health_check"),
            )),
            from_middleware(Arc::new(CorsMiddleware::new().scope("/api/"))),
        ];

        Self {
            router,
            middlewares,
            state,
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Routes `request` through the middleware stack.
    ///
    /// Unknown paths become `404`, known paths under the wrong method `405`.
    /// Both still pass through every middleware layer. `OPTIONS` on a known
    /// path is answered with its `Allow` list, and `HEAD` replies carry the
    /// `GET` headers without the body.
    pub async fn handle(&self, request: Request) -> Response {
        let is_head = *request.method() == Method::Head;
        let (ctx, terminal) = match self.router.resolve(request.method(), request.path()) {
            Resolution::Matched {
                handler,
                params,
                endpoint,
            } => {
                let ctx = Context::with_params(request, params).with_endpoint(endpoint);
                let terminal: MiddlewareHandler = Arc::new(move |ctx: Context, _next: Next| -> BoxFuture<Response> {
                    let handler = Arc::clone(&handler);
                    Box::pin(async move {
                        handler(ctx).await.unwrap_or_else(HttpError::into_response)
                    })
                });
                (ctx, terminal)
            }
            Resolution::MethodNotAllowed { allowed } if *request.method() == Method::Options => {
                (Context::new(request), fixed(allow_response(&allowed)))
            }
            Resolution::MethodNotAllowed { allowed } => {
                let error = HttpError::MethodNotAllowed {
                    method: request.method().clone(),
                    path: request.path().to_owned(),
                    allowed,
                };
                (Context::new(request), fixed(error.into_response()))
            }
            Resolution::NotFound => {
                let error = HttpError::NotFound {
                    path: request.path().to_owned(),
                    available: self.router.endpoints(),
                };
                (Context::new(request), fixed(error.into_response()))
            }
        };

        let mut chain = self.middlewares.clone();
        chain.push(terminal);
        let response = Next::new(chain).run(ctx).await;
        if is_head { response.head_only() } else { response }
    }
}

// `200` with an `Allow` header listing what the path accepts.
fn allow_response(allowed: &[Method]) -> Response {
    let mut methods: Vec<&str> = allowed.iter().map(Method::as_str).collect();
    if allowed.contains(&Method::Get) {
        methods.push("HEAD");
    }
    methods.push("OPTIONS");
    Response::new(StatusCode::Ok).header("Allow", methods.join(", "))
}

// Innermost layer answering with a prepared response.
fn fixed(response: Response) -> MiddlewareHandler {
    Arc::new(move |_ctx: Context, _next: Next| -> BoxFuture<Response> {
        let response = response.clone();
        Box::pin(async move { response })
    })
}
