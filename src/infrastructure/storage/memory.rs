//! In-memory storage implementation

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{NewUser, RepositoryError, User, UserRepository, UserRole};

/// In-memory user storage for development and testing.
///
/// The `usernames` index plays the role of the unique constraint: the
/// username slot is claimed through the map entry, so concurrent inserts of
/// the same name cannot both succeed.
pub struct InMemoryUserRepository {
    users: DashMap<i64, User>,
    usernames: DashMap<String, i64>,
    id_counter: AtomicI64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            id_counter: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::UniqueViolation(format!(
                "users.username = {}",
                user.username
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = User {
                    id: self.id_counter.fetch_add(1, Ordering::SeqCst),
                    username: user.username,
                    password: user.password,
                    role: user.role,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn update(&self, mut user: User) -> Result<User, RepositoryError> {
        let Some(mut stored) = self.users.get_mut(&user.id) else {
            return Err(RepositoryError::Database(format!(
                "no user row with id {}",
                user.id
            )));
        };

        user.updated_at = Utc::now();
        *stored = user.clone();
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let Some(id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_role_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRole>, RepositoryError> {
        Ok(self.find_by_username(username).await?.map(|u| u.role))
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let repo = InMemoryUserRepository::new();
        let a = repo.insert(NewUser::new("a", "hash-a")).await.unwrap();
        let b = repo.insert(NewUser::new("b", "hash-b")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let repo = InMemoryUserRepository::new();
        repo.insert(NewUser::new("alice", "h1")).await.unwrap();

        let err = repo.insert(NewUser::new("alice", "h2")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
        assert_eq!(repo.find_by_username("alice").await.unwrap().unwrap().password, "h1");
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_username_admit_exactly_one() {
        let repo = Arc::new(InMemoryUserRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert(NewUser::new("race", format!("hash-{i}"))).await
                })
            })
            .collect();

        let mut ok = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RepositoryError::UniqueViolation(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_user_fails() {
        let repo = InMemoryUserRepository::new();
        let mut user = repo.insert(NewUser::new("a", "h")).await.unwrap();
        user.id = 99;

        assert!(matches!(
            repo.update(user).await,
            Err(RepositoryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn role_projection_follows_stored_role() {
        let repo = InMemoryUserRepository::new();
        repo.insert(NewUser::new("root", "h").with_role(UserRole::Admin))
            .await
            .unwrap();

        assert_eq!(
            repo.find_role_by_username("root").await.unwrap(),
            Some(UserRole::Admin)
        );
        assert_eq!(repo.find_role_by_username("nobody").await.unwrap(), None);
    }
}
