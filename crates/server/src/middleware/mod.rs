//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and the Sentry scope)
//!
//! Admin handlers additionally take the [`RequireAdmin`] extractor.

pub mod admin_auth;
pub mod request_id;

pub use admin_auth::RequireAdmin;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
