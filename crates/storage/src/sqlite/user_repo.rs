use chrono::Utc;
use edu_core::model::{Role, User, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_user_row};
use crate::repository::{StorageError, UserProfile, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn ensure_user(&self, profile: &UserProfile) -> Result<User, StorageError> {
        let created_role = if profile.make_admin {
            Role::Admin
        } else {
            Role::Student
        };

        // Existing roles are only ever promoted here, never demoted.
        let row = sqlx::query(
            r"
            INSERT INTO users (id, email, name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                role = CASE WHEN ?6 THEN 'ADMIN' ELSE users.role END
            RETURNING id, email, name, role
            ",
        )
        .bind(profile.id.as_str())
        .bind(profile.email.as_str())
        .bind(profile.name.as_deref())
        .bind(created_role.as_str())
        .bind(Utc::now())
        .bind(profile.make_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        map_user_row(&row)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT id, email, name, role FROM users WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_user_row).transpose()
    }
}
