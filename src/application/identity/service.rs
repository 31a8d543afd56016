//! User management service
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::application::ports::PasswordEncoder;
use crate::domain::{
    DomainError, DomainResult, NewUser, RepositoryError, User, UserRepository, UserRole,
};

/// Orchestrates the identity use cases: registration, lookups, password
/// changes and credential checks.
///
/// Both collaborators are injected so tests can swap in the in-memory
/// repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    encoder: Arc<dyn PasswordEncoder>,
    /// Compared against when the username is unknown, so both login paths
    /// pay for one hash check.
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self {
            repo,
            encoder,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Register a new account. The plaintext password is hashed before the
    /// record reaches the repository.
    pub async fn create(&self, user: NewUser) -> DomainResult<User> {
        let password = self.encode(&user.password)?;
        let username = user.username.clone();

        let created = self
            .repo
            .insert(NewUser { password, ..user })
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueViolation(_) => DomainError::UsernameConflict(format!(
                    "Username '{}' is already registered",
                    username
                )),
                other => DomainError::Repository(other),
            })?;

        info!(user_id = created.id, username = %created.username, "New user registered");
        Ok(created)
    }

    /// Replace a user's password after checking the confirmation and the
    /// current password.
    pub async fn change_password(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> DomainResult<User> {
        if new_password != confirm_password {
            return Err(DomainError::InvalidPassword(
                "New password does not match the password confirmation".into(),
            ));
        }

        let mut user = self.get_by_id(id).await?;
        if !self.encoder.matches(current_password, &user.password) {
            return Err(DomainError::InvalidPassword(
                "Current password does not match".into(),
            ));
        }

        user.password = self.encode(new_password)?;
        let updated = self.repo.update(user).await?;

        info!(user_id = id, "Password changed");
        Ok(updated)
    }

    /// Create the bootstrap administrator unless the username is taken.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> DomainResult<Option<User>> {
        if self.repo.find_by_username(username).await?.is_some() {
            debug!(username, "Admin account already present");
            return Ok(None);
        }

        let admin = NewUser::new(username, password).with_role(UserRole::Admin);
        match self.create(admin).await {
            Ok(user) => Ok(Some(user)),
            // Lost a race with another instance creating the same account.
            Err(DomainError::UsernameConflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get_by_id(&self, id: i64) -> DomainResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User id={} not found", id)))
    }

    /// All users, in whatever order the repository returns them.
    pub async fn get_all(&self) -> DomainResult<Vec<User>> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn get_by_username(&self, username: &str) -> DomainResult<User> {
        self.repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| username_not_found(username))
    }

    /// Role projection of a username lookup. Unknown usernames are `NotFound`.
    pub async fn get_role_by_username(&self, username: &str) -> DomainResult<UserRole> {
        self.repo
            .find_role_by_username(username)
            .await?
            .ok_or_else(|| username_not_found(username))
    }

    /// Check a username/password pair. Unknown users and wrong passwords
    /// are reported identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> DomainResult<User> {
        let user = match self.repo.find_by_username(username).await? {
            Some(user) if self.encoder.matches(password, &user.password) => user,
            Some(_) => return Err(invalid_credentials()),
            None => {
                if let Some(dummy) = self.dummy_hash() {
                    self.encoder.matches(password, dummy);
                }
                return Err(invalid_credentials());
            }
        };

        debug!(user_id = user.id, "Credentials verified");
        Ok(user)
    }

    fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash
            .get_or_init(|| self.encoder.encode("unknown-user-placeholder").ok())
            .as_deref()
    }

    fn encode(&self, raw_password: &str) -> DomainResult<String> {
        self.encoder
            .encode(raw_password)
            .map_err(|e| DomainError::Hashing(e.to_string()))
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::AccessDenied("Invalid credentials".into())
}

fn username_not_found(username: &str) -> DomainError {
    DomainError::NotFound(format!("User with username '{}' not found", username))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::ports::PasswordHashError;
    use crate::infrastructure::crypto::password::{BcryptPasswordEncoder, MAX_PASSWORD_BYTES};
    use crate::infrastructure::storage::InMemoryUserRepository;

    /// Reads hit the in-memory store; every write fails like a dropped
    /// database connection.
    struct FailingWrites {
        inner: InMemoryUserRepository,
    }

    fn storage_down() -> RepositoryError {
        RepositoryError::Database("connection reset".into())
    }

    #[async_trait]
    impl UserRepository for FailingWrites {
        async fn insert(&self, _user: NewUser) -> Result<User, RepositoryError> {
            Err(storage_down())
        }

        async fn update(&self, _user: User) -> Result<User, RepositoryError> {
            Err(storage_down())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
            self.inner.find_by_username(username).await
        }

        async fn find_role_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRole>, RepositoryError> {
            self.inner.find_role_by_username(username).await
        }

        async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
            self.inner.find_all().await
        }
    }

    /// Counts `matches` calls on top of real bcrypt.
    struct CountingEncoder {
        inner: BcryptPasswordEncoder,
        checks: AtomicUsize,
    }

    impl PasswordEncoder for CountingEncoder {
        fn encode(&self, raw_password: &str) -> Result<String, PasswordHashError> {
            self.inner.encode(raw_password)
        }

        fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.inner.matches(raw_password, encoded_password)
        }
    }

    fn service() -> (UserService, Arc<InMemoryUserRepository>, Arc<BcryptPasswordEncoder>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let encoder = Arc::new(BcryptPasswordEncoder::new(crate::infrastructure::crypto::password::BCRYPT_MIN_COST));
        (UserService::new(repo.clone(), encoder.clone()), repo, encoder)
    }

    async fn alice(service: &UserService) -> User {
        service
            .create(NewUser::new("alice", "pw123"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_hashes_password_and_assigns_id() {
        let (service, repo, encoder) = service();
        let user = alice(&service).await;

        assert!(user.id > 0);
        assert_ne!(user.password, "pw123");
        assert!(encoder.matches("pw123", &user.password));

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password, user.password);
        assert_eq!(stored.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict_naming_the_user() {
        let (service, _, _) = service();
        alice(&service).await;

        let err = service
            .create(NewUser::new("alice", "other"))
            .await
            .unwrap_err();

        match err {
            DomainError::UsernameConflict(msg) => assert!(msg.contains("alice")),
            other => panic!("expected UsernameConflict, got {other:?}"),
        }
        assert_eq!(service.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mismatched_confirmation_never_touches_the_store() {
        let (service, repo, _) = service();
        let user = alice(&service).await;

        for current in ["pw123", "wrong"] {
            let err = service
                .change_password(user.id, current, "newpw", "different")
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidPassword(_)));
        }

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password, user.password);
        assert_eq!(stored.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn mismatched_confirmation_is_checked_before_lookup() {
        let (service, _, _) = service();
        let err = service
            .change_password(404, "pw123", "newpw", "different")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPassword(_)));
    }

    #[tokio::test]
    async fn wrong_current_password_is_rejected() {
        let (service, _, encoder) = service();
        let user = alice(&service).await;

        let err = service
            .change_password(user.id, "wrong", "newpw", "newpw")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPassword(_)));

        let stored = service.get_by_id(user.id).await.unwrap();
        assert!(encoder.matches("pw123", &stored.password));
    }

    #[tokio::test]
    async fn change_password_replaces_the_hash() {
        let (service, _, encoder) = service();
        let user = alice(&service).await;

        let updated = service
            .change_password(user.id, "pw123", "newpw", "newpw")
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);

        let stored = service.get_by_id(user.id).await.unwrap();
        assert!(encoder.matches("newpw", &stored.password));
        assert!(!encoder.matches("pw123", &stored.password));

        assert!(service.authenticate("alice", "newpw").await.is_ok());
        assert!(matches!(
            service.authenticate("alice", "pw123").await,
            Err(DomainError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn change_password_past_bcrypt_limit_keeps_old_password() {
        let (service, _, encoder) = service();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let user = service
            .create(NewUser::new("carol", prefix.clone()))
            .await
            .unwrap();

        let err = service
            .change_password(
                user.id,
                &prefix,
                &format!("{prefix}new-secret"),
                &format!("{prefix}new-secret"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Hashing(_)));

        let stored = service.get_by_id(user.id).await.unwrap();
        assert!(encoder.matches(&prefix, &stored.password));
        assert!(matches!(
            service.authenticate("carol", &format!("{prefix}old-secret")).await,
            Err(DomainError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn create_propagates_storage_failures_unchanged() {
        let repo = Arc::new(FailingWrites {
            inner: InMemoryUserRepository::new(),
        });
        let encoder = Arc::new(BcryptPasswordEncoder::new(crate::infrastructure::crypto::password::BCRYPT_MIN_COST));
        let service = UserService::new(repo, encoder);

        let err = service
            .create(NewUser::new("alice", "pw123"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, DomainError::Repository(RepositoryError::Database(_))),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn change_password_propagates_update_failures_unchanged() {
        let encoder = BcryptPasswordEncoder::new(crate::infrastructure::crypto::password::BCRYPT_MIN_COST);
        let inner = InMemoryUserRepository::new();
        let user = inner
            .insert(NewUser::new("alice", encoder.encode("pw123").unwrap()))
            .await
            .unwrap();
        let service = UserService::new(Arc::new(FailingWrites { inner }), Arc::new(encoder));

        let err = service
            .change_password(user.id, "pw123", "newpw", "newpw")
            .await
            .unwrap_err();
        assert!(
            matches!(err, DomainError::Repository(RepositoryError::Database(_))),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn unknown_user_still_costs_a_hash_check() {
        let encoder = Arc::new(CountingEncoder {
            inner: BcryptPasswordEncoder::new(crate::infrastructure::crypto::password::BCRYPT_MIN_COST),
            checks: AtomicUsize::new(0),
        });
        let service = UserService::new(Arc::new(InMemoryUserRepository::new()), encoder.clone());

        assert!(matches!(
            service.authenticate("nobody", "pw").await,
            Err(DomainError::AccessDenied(_))
        ));
        assert!(matches!(
            service.authenticate("nobody", "pw").await,
            Err(DomainError::AccessDenied(_))
        ));
        assert_eq!(encoder.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn change_password_for_unknown_user_is_not_found() {
        let (service, _, _) = service();
        let err = service
            .change_password(7, "pw123", "newpw", "newpw")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn lookups_on_missing_keys_are_not_found() {
        let (service, _, _) = service();

        assert!(matches!(service.get_by_id(1).await, Err(DomainError::NotFound(_))));
        assert!(matches!(
            service.get_by_username("ghost").await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            service.get_role_by_username("ghost").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lookups_return_stored_records() {
        let (service, _, _) = service();
        let user = alice(&service).await;

        assert_eq!(service.get_by_username("alice").await.unwrap().id, user.id);
        assert_eq!(
            service.get_role_by_username("alice").await.unwrap(),
            UserRole::Customer
        );
    }

    #[tokio::test]
    async fn get_all_returns_every_user() {
        let (service, _, _) = service();
        alice(&service).await;
        service.create(NewUser::new("bob", "pw456")).await.unwrap();

        let mut names: Vec<_> = service
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        names.sort();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let (service, _, _) = service();

        let admin = service.ensure_admin("admin", "admin123").await.unwrap();
        assert_eq!(admin.unwrap().role, UserRole::Admin);
        assert!(service.ensure_admin("admin", "admin123").await.unwrap().is_none());
        assert_eq!(service.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_user() {
        let (service, _, _) = service();
        assert!(matches!(
            service.authenticate("nobody", "pw").await,
            Err(DomainError::AccessDenied(_))
        ));
    }
}
