//! Security middleware.
//!
//! - [`CorsMiddleware`] — Cross-Origin Resource Sharing headers and preflight
//!   short-circuiting, optionally scoped to a path prefix.
//! - [`SecurityHeaders`] — hardening headers, per-endpoint `Cache-Control`,
//!   and `X-Powered-By` on every response.

mod cors;
mod headers;

pub use cors::CorsMiddleware;
pub use headers::{NO_STORE_CACHE_CONTROL, PUBLIC_CACHE_CONTROL, SecurityHeaders};
