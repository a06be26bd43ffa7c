//! # vitrina
//!
//! A small async HTTP/1.1 demo service with a bounded, time-expiring
//! response cache in front of its read-only endpoints.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use vitrina::{App, Request, Server};
//! use vitrina::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = Server::bind(config.bind_addr()).await?;
//!     let app = Arc::new(App::new(config));
//!     server
//!         .run(move |req: Request| {
//!             let app = Arc::clone(&app);
//!             async move { app.handle(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

pub use app::App;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
