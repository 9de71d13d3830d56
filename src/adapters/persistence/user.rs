use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::auth::UserRepo,
    domain::entities::user::{User, UserStatus},
};

// User row as stored in the db.
#[derive(sqlx::FromRow, Debug)]
pub struct UserDb {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub status: String,
    pub roles: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<UserDb> for User {
    fn from(r: UserDb) -> Self {
        // A status string the enum does not know means the row was
        // written by something newer or was corrupted. Pending is the
        // least privileged state, so fall back to it and make noise.
        let status = UserStatus::from_str(&r.status).unwrap_or_else(|| {
            tracing::warn!(
                user_id = %r.id,
                status = %r.status,
                "unknown user status in database, treating account as pending"
            );
            UserStatus::Pending
        });
        User {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            status,
            roles: r.roles,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, status, roles, created_at, updated_at";

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn create(
        &self,
        email: &str,
        password_hash: Option<&str>,
        roles: &[String],
    ) -> AppResult<User> {
        let rec = sqlx::query_as::<_, UserDb>(&format!(
            "INSERT INTO users (id, email, password_hash, status, roles)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(UserStatus::Pending.as_str())
        .bind(roles)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.into())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let rec = sqlx::query_as::<_, UserDb>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.map(User::from))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let rec = sqlx::query_as::<_, UserDb>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.map(User::from))
    }
}
