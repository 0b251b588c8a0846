use crate::model::user::User;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    pub pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, user_id, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, user_id, password_hash, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, user_id, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
