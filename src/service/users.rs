//! Accounts: signup/login upserts, role administration and admin seeding.

use super::authorize;
use super::validation::{default_name, non_empty, required_email};
use crate::error::AppError;
use crate::identity::TokenKeys;
use crate::model::{Capability, Role, User};
use crate::store::{NameMerge, Store};

pub struct UserService;

impl UserService {
    /// Upsert by email. A provided name replaces the stored one; the role never changes here.
    pub async fn signup(
        store: &dyn Store,
        keys: &TokenKeys,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<(User, String), AppError> {
        let email = required_email(email, "email")?;
        let user = match non_empty(name) {
            Some(name) => store.upsert_user(&email, &name, NameMerge::PreferIncoming).await?,
            None => store.upsert_user(&email, &default_name(&email), NameMerge::KeepExisting).await?,
        };
        let token = keys.issue(&user)?;
        tracing::info!(user_id = user.id, "signup");
        Ok((user, token))
    }

    /// Logs in, creating a plain user on first sight.
    pub async fn login(store: &dyn Store, keys: &TokenKeys, email: Option<&str>) -> Result<(User, String), AppError> {
        let email = required_email(email, "email")?;
        let user = store
            .upsert_user(&email, &default_name(&email), NameMerge::KeepExisting)
            .await?;
        let token = keys.issue(&user)?;
        Ok((user, token))
    }

    pub async fn me(store: &dyn Store, actor: &User) -> Result<User, AppError> {
        store
            .user_by_id(actor.id)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn list(store: &dyn Store, actor: &User) -> Result<Vec<User>, AppError> {
        authorize(actor, Capability::Administer)?;
        store.list_users().await
    }

    pub async fn change_role(store: &dyn Store, actor: &User, id: i64, role: Option<&str>) -> Result<User, AppError> {
        authorize(actor, Capability::Administer)?;
        let role: Role = role
            .ok_or_else(|| AppError::BadRequest("role must be one of: user, driver, admin".into()))?
            .parse()?;
        let user = store.set_role(id, role).await?.ok_or_else(user_not_found)?;
        tracing::info!(user_id = id, role = %role, admin_id = actor.id, "role changed");
        Ok(user)
    }

    /// Makes `email` a driver, creating the account if needed. Repeating it changes nothing.
    pub async fn approve_driver(store: &dyn Store, actor: &User, email: Option<&str>) -> Result<User, AppError> {
        authorize(actor, Capability::Administer)?;
        let email = required_email(email, "email")?;
        if let Some(existing) = store.user_by_email(&email).await? {
            if existing.is_admin() {
                return Err(AppError::BadRequest("Refusing to change an admin via this endpoint".into()));
            }
        }
        let user = store.upsert_driver(&email, &default_name(&email)).await?;
        tracing::info!(user_id = user.id, admin_id = actor.id, "driver approved");
        Ok(user)
    }

    pub async fn revoke_driver(store: &dyn Store, actor: &User, email: Option<&str>) -> Result<User, AppError> {
        authorize(actor, Capability::Administer)?;
        let email = required_email(email, "email")?;
        let existing = store.user_by_email(&email).await?.ok_or_else(user_not_found)?;
        if existing.is_admin() {
            return Err(AppError::BadRequest("Refusing to revoke admin via this endpoint".into()));
        }
        let user = store
            .set_role(existing.id, Role::User)
            .await?
            .ok_or_else(user_not_found)?;
        tracing::info!(user_id = user.id, admin_id = actor.id, "driver revoked");
        Ok(user)
    }

    /// Creates missing admin accounts. Existing accounts keep their role.
    pub async fn seed_admins(store: &dyn Store, emails: &[String]) -> Result<usize, AppError> {
        let mut created = 0;
        for email in emails {
            if store.seed_admin(email, &default_name(email)).await? {
                tracing::info!(email = %email, "seeded admin");
                created += 1;
            }
        }
        Ok(created)
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn keys() -> TokenKeys {
        TokenKeys::new("test", chrono::Duration::hours(1))
    }

    async fn admin(store: &MemoryStore) -> User {
        UserService::seed_admins(store, &["root@example.com".to_string()]).await.unwrap();
        store.user_by_email("root@example.com").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn signup_ignores_role_and_keeps_name_without_one() {
        let store = MemoryStore::new();
        let (user, token) = UserService::signup(&store, &keys(), Some(" Pat@Example.com "), Some("Pat"))
            .await
            .unwrap();
        assert_eq!(user.email, "pat@example.com");
        assert_eq!(user.role, Role::User);
        assert!(!token.is_empty());

        let (again, _) = UserService::signup(&store, &keys(), Some("pat@example.com"), None).await.unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(again.name.as_deref(), Some("Pat"));
    }

    #[tokio::test]
    async fn login_creates_with_default_name() {
        let store = MemoryStore::new();
        let (user, _) = UserService::login(&store, &keys(), Some("kim@example.com")).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("kim"));
        assert!(UserService::login(&store, &keys(), None).await.is_err());
    }

    #[tokio::test]
    async fn approve_driver_is_idempotent() {
        let store = MemoryStore::new();
        let admin = admin(&store).await;
        let first = UserService::approve_driver(&store, &admin, Some("d@example.com")).await.unwrap();
        let second = UserService::approve_driver(&store, &admin, Some("d@example.com")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.role, Role::Driver);
    }

    #[tokio::test]
    async fn admins_cannot_be_revoked_or_demoted_when_last() {
        let store = MemoryStore::new();
        let admin = admin(&store).await;
        let err = UserService::revoke_driver(&store, &admin, Some("root@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Refusing to revoke admin via this endpoint");
        let err = UserService::change_role(&store, &admin, admin.id, Some("user")).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot remove the last admin");
    }

    #[tokio::test]
    async fn seeding_twice_creates_once() {
        let store = MemoryStore::new();
        let emails = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        assert_eq!(UserService::seed_admins(&store, &emails).await.unwrap(), 2);
        assert_eq!(UserService::seed_admins(&store, &emails).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_admins_cannot_list_users() {
        let store = MemoryStore::new();
        let (user, _) = UserService::login(&store, &keys(), Some("u@example.com")).await.unwrap();
        assert!(matches!(UserService::list(&store, &user).await, Err(AppError::Forbidden(_))));
    }
}
