/// The authenticated caller
///
/// Every capability check and visibility filter takes an explicit [`Actor`]
/// instead of reading ambient request state. The API layer builds one per
/// request from the bearer token and the freshly loaded user row.
///
/// # Example
///
/// ```
/// use hourglass_shared::auth::actor::Actor;
/// use hourglass_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let actor = Actor::new(Uuid::new_v4(), UserRole::Manager);
/// assert!(actor.is_privileged());
/// assert!(!actor.is_admin());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// Identity and role of the user performing an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User ID
    pub id: Uuid,

    /// Role at the time of the request
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    /// Builds an actor from a loaded user row
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins and managers
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// True when the actor is the given user
    pub fn is(&self, user_id: Uuid) -> bool {
        self.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);
        let manager = Actor::new(Uuid::new_v4(), UserRole::Manager);
        let employee = Actor::new(Uuid::new_v4(), UserRole::Employee);

        assert!(admin.is_admin() && admin.is_privileged());
        assert!(!manager.is_admin() && manager.is_privileged());
        assert!(!employee.is_admin() && !employee.is_privileged());
    }

    #[test]
    fn test_is_self() {
        let id = Uuid::new_v4();
        let actor = Actor::new(id, UserRole::Employee);
        assert!(actor.is(id));
        assert!(!actor.is(Uuid::new_v4()));
    }
}
