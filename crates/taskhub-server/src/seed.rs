//! First-run seeding of a root account.

use taskhub_shared::protocol::{NewUser, User};
use taskhub_shared::types::{Role, UserStatus};
use taskhub_store::Database;
use tracing::info;

use crate::auth::hash_password;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Placeholder number for the seeded account; edit it from the profile screen.
const ROOT_TEL: &str = "+10000000000";

/// Create the `ROOT_EMAIL` / `ROOT_PASSWORD` account when the store has no
/// users yet. Returns the created user, if any.
pub fn seed_root_user(db: &Database, config: &ServerConfig) -> Result<Option<User>, ServerError> {
    let (Some(email), Some(password)) = (&config.root_email, &config.root_password) else {
        return Ok(None);
    };
    if db.count_users()? > 0 {
        return Ok(None);
    }

    let root = NewUser {
        name: "Root".into(),
        email: email.clone(),
        tel: ROOT_TEL.into(),
        role: Role::Root,
        location: None,
        status: UserStatus::Active,
        password: password.clone(),
    };
    let user = db.create_user(&root, &hash_password(password)?)?;
    info!(id = user.id, email = %user.email, "seeded root user");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_only_an_empty_store() {
        let db = Database::open_in_memory().unwrap();
        let config = ServerConfig {
            root_email: Some("root@example.com".into()),
            root_password: Some("rootpass1".into()),
            ..ServerConfig::default()
        };

        let created = seed_root_user(&db, &config).unwrap().unwrap();
        assert_eq!(created.role, Role::Root);
        assert!(seed_root_user(&db, &config).unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn nothing_without_credentials() {
        let db = Database::open_in_memory().unwrap();
        assert!(seed_root_user(&db, &ServerConfig::default()).unwrap().is_none());
    }
}
