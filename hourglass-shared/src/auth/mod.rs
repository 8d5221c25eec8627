/// Authentication and authorization
///
/// # Modules
///
/// - [`actor`]: The authenticated caller passed to every rule
/// - [`authorization`]: One capability check per action
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`password`]: Argon2id hashing and strength rules
///
/// # Example
///
/// ```
/// use hourglass_shared::auth::actor::Actor;
/// use hourglass_shared::auth::authorization::can_list_users;
/// use hourglass_shared::auth::password::{hash_password, verify_password};
/// use hourglass_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Password1")?;
/// assert!(verify_password("Password1", &hash)?);
///
/// let actor = Actor::new(Uuid::new_v4(), UserRole::Employee);
/// assert!(!can_list_users(&actor));
/// # Ok(())
/// # }
/// ```

pub mod actor;
pub mod authorization;
pub mod jwt;
pub mod password;
