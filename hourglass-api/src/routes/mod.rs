/// API route handlers, one module per resource
///
/// - `health`: service and database status
/// - `auth`: register, login, refresh, current user
/// - `users`: user administration and per-user timesheets/stats
/// - `projects`, `tasks`: project and task CRUD
/// - `timesheets`: time entries, summary and approval workflow
/// - `reports`: daily/weekly/monthly reports in JSON, CSV, Excel or PDF

pub mod auth;
pub mod health;
pub mod projects;
pub mod reports;
pub mod tasks;
pub mod timesheets;
pub mod users;
