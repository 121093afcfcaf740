//! Synchronous client core for the Prodex REST API.
//!
//! # Overview
//! Compiles a small query vocabulary (filter triples, field projections,
//! ordering) into query parameters, normalizes write payloads, reconciles
//! many-to-many updates, and classifies response status codes into
//! `ApiError`. Requests and responses are plain data (host-does-IO pattern);
//! `transport::UreqTransport` and `session::Prodex` provide a ready-made
//! blocking round trip on top.
//!
//! # Design
//! - `ProdexClient` is stateless apart from the session token.
//! - Every model-scoped operation resolves its model through
//!   `models::Endpoint::resolve` first.
//! - The operator table and model registry are immutable constants.
//! - Compilation failures return before any request exists, so nothing is
//!   ever half-sent.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod m2m;
pub mod models;
mod multipart;
pub mod normalize;
pub mod operators;
pub mod query;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ProdexClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use m2m::{M2MMode, M2MModes};
pub use models::Endpoint;
pub use query::{compile_filters, compile_order, compile_projection, Filter, FindQuery, Operators, Order, ProjectionAction, QueryParams};
pub use session::Prodex;
pub use transport::{Transport, UreqTransport};
pub use types::{Session, Thumbnail};
