/// Middleware for the API server
///
/// - `security`: security response headers
///
/// JWT authentication lives in [`crate::app`] because it needs `AppState`.

pub mod security;
