/// First-run admin account
///
/// When `BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD` are set and no
/// active admin exists, an admin is created (or an existing account with
/// that email is promoted). Registration only ever creates employees, so
/// this is the only way to obtain the first admin.

use hourglass_shared::{
    auth::password,
    models::user::{CreateUser, UpdateUser, User, UserRole},
};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::BootstrapAdmin;

pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    if User::admin_exists(pool).await? {
        debug!("Admin account present, skipping bootstrap");
        return Ok(());
    }

    let problems = password::password_problems(&admin.password);
    if !problems.is_empty() {
        anyhow::bail!("BOOTSTRAP_ADMIN_PASSWORD is too weak: {}", problems.join("; "));
    }

    if let Some(existing) = User::find_by_email(pool, &admin.email).await? {
        User::update(
            pool,
            existing.id,
            UpdateUser {
                role: Some(UserRole::Admin),
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await?;
        info!(user_id = %existing.id, "Promoted existing user to admin");
        return Ok(());
    }

    let user = User::create(
        pool,
        CreateUser {
            first_name: "System".to_string(),
            last_name: "Administrator".to_string(),
            email: admin.email.clone(),
            password_hash: password::hash_password(&admin.password)?,
            role: UserRole::Admin,
        },
    )
    .await?;
    info!(user_id = %user.id, "Created bootstrap admin account");

    Ok(())
}
