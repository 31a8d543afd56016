use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::domain::{NewUser, RepositoryError, User, UserRepository, UserRole};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::Customer => UserRole::Customer,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::Customer => user::UserRole::Customer,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        password: model.password,
        role: entity_role_to_domain(model.role),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: DbErr) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Surface the unique index on `username` as its own variant.
fn write_err(e: DbErr) -> RepositoryError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => RepositoryError::UniqueViolation(detail),
        _ => db_err(e),
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, dto: NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now();
        let new_user = user::ActiveModel {
            username: Set(dto.username),
            password: Set(dto.password),
            role: Set(domain_role_to_entity(dto.role)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let txn = self.db.begin().await.map_err(db_err)?;
        let model = new_user.insert(&txn).await.map_err(write_err)?;
        txn.commit().await.map_err(db_err)?;

        debug!(user_id = model.id, "User row inserted");
        Ok(user_model_to_domain(model))
    }

    async fn update(&self, dto: User) -> Result<User, RepositoryError> {
        let active = user::ActiveModel {
            id: Set(dto.id),
            username: Set(dto.username),
            password: Set(dto.password),
            role: Set(domain_role_to_entity(dto.role)),
            created_at: Set(dto.created_at),
            updated_at: Set(Utc::now()),
        };

        let txn = self.db.begin().await.map_err(db_err)?;
        let model = active.update(&txn).await.map_err(write_err)?;
        txn.commit().await.map_err(db_err)?;

        Ok(user_model_to_domain(model))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_role_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRole>, RepositoryError> {
        let role = user::Entity::find()
            .select_only()
            .column(user::Column::Role)
            .filter(user::Column::Username.eq(username))
            .into_tuple::<user::UserRole>()
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(role.map(entity_role_to_domain))
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(user_model_to_domain).collect())
    }
}
