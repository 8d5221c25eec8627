/// Role-based row visibility
///
/// Employees see only their own rows; admins and managers see everything.
/// "Own" means a different column per entity:
///
/// | Entity    | Alias | Own rows                                   |
/// |-----------|-------|--------------------------------------------|
/// | timesheet | `t`   | `t.user_id = actor`                        |
/// | task      | `k`   | `k.assigned_to = actor`                    |
/// | project   | `p`   | `p.manager_id = actor OR p.created_by = actor` |
///
/// The `push_*` functions append the predicate to a query that already has a
/// `WHERE` clause. Repository list functions apply the same predicates to
/// both their `COUNT(*)` and their page query, so pagination totals always
/// match the visible subset.
///
/// # Example
///
/// ```
/// use hourglass_shared::access::{push_timesheet_scope, RowScope};
/// use hourglass_shared::auth::actor::Actor;
/// use hourglass_shared::models::user::UserRole;
/// use sqlx::{Postgres, QueryBuilder};
/// use uuid::Uuid;
///
/// let actor = Actor::new(Uuid::new_v4(), UserRole::Employee);
/// let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM timesheets t WHERE TRUE");
/// push_timesheet_scope(&mut qb, &RowScope::for_actor(&actor));
/// assert!(qb.sql().ends_with("AND t.user_id = $1"));
/// ```

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::actor::Actor;
use crate::models::{project::Project, task::Task, timesheet::Timesheet};

/// Row visibility derived from an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope {
    /// Every row is visible
    Unrestricted,

    /// Only rows owned by this user are visible
    Own(Uuid),
}

impl RowScope {
    pub fn for_actor(actor: &Actor) -> Self {
        if actor.is_privileged() {
            RowScope::Unrestricted
        } else {
            RowScope::Own(actor.id)
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, RowScope::Unrestricted)
    }

    pub fn allows_timesheet(&self, timesheet: &Timesheet) -> bool {
        match self {
            RowScope::Unrestricted => true,
            RowScope::Own(id) => timesheet.user_id == *id,
        }
    }

    pub fn allows_task(&self, task: &Task) -> bool {
        match self {
            RowScope::Unrestricted => true,
            RowScope::Own(id) => task.assigned_to == Some(*id),
        }
    }

    pub fn allows_project(&self, project: &Project) -> bool {
        match self {
            RowScope::Unrestricted => true,
            RowScope::Own(id) => project.manager_id == Some(*id) || project.created_by == *id,
        }
    }
}

/// Appends ` AND t.user_id = $n` for restricted scopes
pub fn push_timesheet_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &RowScope) {
    if let RowScope::Own(id) = scope {
        qb.push(" AND t.user_id = ").push_bind(*id);
    }
}

/// Appends ` AND k.assigned_to = $n` for restricted scopes
pub fn push_task_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &RowScope) {
    if let RowScope::Own(id) = scope {
        qb.push(" AND k.assigned_to = ").push_bind(*id);
    }
}

/// Appends ` AND (p.manager_id = $n OR p.created_by = $m)` for restricted scopes
pub fn push_project_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &RowScope) {
    if let RowScope::Own(id) = scope {
        qb.push(" AND (p.manager_id = ")
            .push_bind(*id)
            .push(" OR p.created_by = ")
            .push_bind(*id)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn base() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new("SELECT 1 WHERE TRUE")
    }

    #[test]
    fn test_scope_for_roles() {
        let id = Uuid::new_v4();
        assert_eq!(
            RowScope::for_actor(&Actor::new(id, UserRole::Employee)),
            RowScope::Own(id)
        );
        assert!(RowScope::for_actor(&Actor::new(id, UserRole::Manager)).is_unrestricted());
        assert!(RowScope::for_actor(&Actor::new(id, UserRole::Admin)).is_unrestricted());
    }

    #[test]
    fn test_unrestricted_adds_nothing() {
        let mut qb = base();
        push_timesheet_scope(&mut qb, &RowScope::Unrestricted);
        push_task_scope(&mut qb, &RowScope::Unrestricted);
        push_project_scope(&mut qb, &RowScope::Unrestricted);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn test_restricted_predicates() {
        let scope = RowScope::Own(Uuid::new_v4());

        let mut qb = base();
        push_timesheet_scope(&mut qb, &scope);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE AND t.user_id = $1");

        let mut qb = base();
        push_task_scope(&mut qb, &scope);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE AND k.assigned_to = $1");

        let mut qb = base();
        push_project_scope(&mut qb, &scope);
        assert_eq!(
            qb.sql(),
            "SELECT 1 WHERE TRUE AND (p.manager_id = $1 OR p.created_by = $2)"
        );
    }
}
