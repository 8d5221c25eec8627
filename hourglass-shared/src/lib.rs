//! # Hourglass Shared Library
//!
//! Domain types and rules for the Hourglass project, task and timesheet
//! tracker. Nothing here knows about HTTP; the API crate maps
//! [`error::DomainError`] and [`report::ReportError`] onto responses.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, tasks, timesheets and their repository functions
//! - `access`: Role-based row visibility applied before count and pagination
//! - `auth`: Actor, capability checks, JWT and password primitives
//! - `lifecycle`: Timesheet validation and the approval state machine
//! - `report`: Aggregation and CSV/Excel/PDF rendering
//! - `db`: Connection pool and migrations
//! - `error`: Domain error type

pub mod access;
pub mod auth;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod report;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
