/// Middleware modules for the API server
///
/// This module contains custom middleware for:
/// - Security headers (production only)
/// - Global rate limiting
///
/// CORS, tracing and request timeouts come from tower-http and are wired in
/// [`crate::app::build_router`].

pub mod rate_limit;
pub mod security;
