//! # TaskFlow API Server Library
//!
//! This library provides the HTTP side of TaskFlow: a JSON API for accounts
//! and tasks plus a handful of server-rendered pages.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and server lifecycle
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Rate limiting and security headers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
