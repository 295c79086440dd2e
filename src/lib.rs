//! # pagedata
//!
//! Page-data loaders for a server-rendered market data front end.
//!
//! Each page route owns one [`PageLoader`](loaders::PageLoader): it reads
//! the injected request locals and route params, makes a single JSON call
//! to the financial-data API or the internal service, shapes the result,
//! and returns it under one named key. [`PageApp`](app::PageApp) mounts the
//! loaders on the HTTP/1.1 [`Server`](server::Server).
//!
//! ```rust,no_run
//! use pagedata::{app::PageApp, config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let router = std::sync::Arc::new(PageApp::from_config(&config).router());
//!     let server = Server::bind(&config.bind_addr).await?;
//!     server
//!         .run(move |req| {
//!             let router = router.clone();
//!             async move { router.route(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod loaders;
pub mod router;
pub mod server;
pub mod upstream;

pub use error::LoadError;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
