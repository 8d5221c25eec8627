//! # Hourglass API Server Library
//!
//! HTTP layer for the Hourglass project, task and timesheet tracker.
//!
//! ## Modules
//!
//! - `app`: Application state, router and authentication layer
//! - `bootstrap`: First-run admin account
//! - `config`: Configuration from the environment
//! - `error`: Error type and HTTP response mapping
//! - `extract`: Validating request extractors
//! - `middleware`: Security headers
//! - `response`: Success envelope and pagination
//! - `routes`: Route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
