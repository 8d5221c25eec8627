/// Database layer
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations
///
/// Repository functions live next to their types in [`crate::models`].

pub mod migrations;
pub mod pool;
