//! # stowage
//!
//! A small file upload service for deployments behind a reverse proxy.
//!
//! Files arrive as `multipart/form-data`, are validated against an extension
//! and MIME allow-list, and are streamed to disk under a per-file byte cap.
//! A file that breaks any rule, or whose client disconnects halfway, leaves
//! nothing behind in the storage directory.
//!
//! ## Layers
//!
//! - [`upload`]: the storage core. Sanitizing, validation, unique naming,
//!   bounded writes, retrieval and deletion. Usable without HTTP.
//! - [`routes`]: the `/upload/*` handlers on top of it.
//! - [`Router`], [`Server`]: a thin routing and serving layer over hyper,
//!   with graceful shutdown on SIGTERM / Ctrl-C.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stowage::config::UploadConfig;
//! use stowage::upload::Uploads;
//! use stowage::{Server, routes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stowage::Error> {
//!     let uploads = Uploads::open(UploadConfig::new("/var/lib/stowage")).await?;
//!     let app = routes::app(Arc::new(uploads));
//!
//!     Server::bind("0.0.0.0:3000".parse().unwrap()).serve(app).await
//! }
//! ```

pub mod config;
pub mod health;
pub mod routes;
pub mod upload;

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub use error::Error;
pub use handler::Handler;
pub use request::{Body, BoxError, Request};
pub use response::{IntoResponse, Json, Response, ResponseBody, ResponseBuilder};
pub use router::Router;
pub use server::Server;
