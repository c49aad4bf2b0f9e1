use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::entity::user::{self, ActiveModel, Column, Entity as UserEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, User};

/// User repository for database operations
pub struct UserRepository;

impl UserRepository {
    pub async fn create(
        db: &DatabaseConnection,
        input: &CreateUser,
        password_hash: &str,
    ) -> AppResult<User> {
        let now = time::OffsetDateTime::now_utc();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(input.email.clone()),
            password_hash: Set(password_hash.to_string()),
            name: Set(input.name.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model.insert(db).await.map_err(|e| {
            if e.to_string().contains("duplicate key") || e.to_string().contains("unique") {
                AppError::Conflict("Email already exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        Ok(result.into())
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(model.into())
    }

    /// Find user by email (for login)
    pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> AppResult<User> {
        let model = UserEntity::find()
            .filter(Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(model.into())
    }

    pub async fn email_exists(db: &DatabaseConnection, email: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(Column::Email.eq(email))
            .count(db)
            .await?;

        Ok(count > 0)
    }
}

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            password_hash: m.password_hash,
            name: m.name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
