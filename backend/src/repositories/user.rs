//! User repository for database operations
//!
//! This is the whole contract the auth core has with the credential store:
//! lookups by handle / email / blinded email token / id, plus two narrow
//! writes (password hash replacement and last-active touch).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// User record from database
///
/// `email` holds the stored form; when encryption at rest is enabled it is
/// opaque ciphertext and `email_token` carries the blinded lookup value.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub email_token: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, handle, email, email_token, password_hash, is_admin, \
                            last_active_at, created_at, updated_at";

/// User repository for database operations
pub struct UserRepository;

impl UserRepository {
    /// Create a new user
    ///
    /// Callers pass the email in its stored form, with the blinded lookup
    /// token when the deployment encrypts emails at rest.
    pub async fn create(
        pool: &PgPool,
        handle: &str,
        email: &str,
        email_token: Option<&str>,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<UserRecord, sqlx::Error> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (handle, email, email_token, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(handle)
        .bind(email)
        .bind(email_token)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Find user by handle (case-insensitive; callers pass a normalized value)
    pub async fn find_by_handle(
        pool: &PgPool,
        handle: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(handle) = $1
            "#,
        ))
        .bind(handle)
        .fetch_optional(pool)
        .await
    }

    /// Find user by plaintext email (plaintext-indexed deployments only)
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Find user by blinded email lookup token
    pub async fn find_by_email_token(
        pool: &PgPool,
        email_token: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email_token = $1
            "#,
        ))
        .bind(email_token)
        .fetch_optional(pool)
        .await
    }

    /// Find user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Replace a user's password hash (used after rehash and password change)
    pub async fn update_password_hash(
        pool: &PgPool,
        id: Uuid,
        new_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Update a user's last-active timestamp
    pub async fn touch_last_active(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_active_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Set the admin flag (used by operational tooling and tests)
    pub async fn set_admin(pool: &PgPool, id: Uuid, is_admin: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_admin = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(is_admin)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Count all users
    pub async fn count_users(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Count admin users
    pub async fn count_admins(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_admin")
            .fetch_one(pool)
            .await
    }
}
