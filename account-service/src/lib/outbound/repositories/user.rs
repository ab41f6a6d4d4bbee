use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::crud::models::ListQuery;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PasswordSelection;
use crate::domain::user::models::PendingReset;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserName;
use crate::domain::user::models::UserPatch;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const COLUMNS_WITH_PASSWORD: &str = "id, name, email, password_hash, role, active, \
     password_changed_at, password_reset_token_digest, password_reset_expires_at, created_at";

const COLUMNS_WITHOUT_PASSWORD: &str = "id, name, email, NULL::text AS password_hash, role, \
     active, password_changed_at, password_reset_token_digest, password_reset_expires_at, \
     created_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn columns(selection: PasswordSelection) -> &'static str {
        match selection {
            PasswordSelection::Include => COLUMNS_WITH_PASSWORD,
            PasswordSelection::Omit => COLUMNS_WITHOUT_PASSWORD,
        }
    }

    fn row_to_user(row: &PgRow) -> Result<User, UserError> {
        let role: String = row.get("role");
        let digest: Option<String> = row.get("password_reset_token_digest");
        let expires_at: Option<DateTime<Utc>> = row.get("password_reset_expires_at");

        let pending_reset = match (digest, expires_at) {
            (Some(token_digest), Some(expires_at)) => Some(PendingReset {
                token_digest,
                expires_at,
            }),
            _ => None,
        };

        Ok(User {
            id: UserId(row.get("id")),
            name: UserName::new(row.get("name"))?,
            email: EmailAddress::new(row.get("email"))?,
            password_hash: row.get("password_hash"),
            role: role.parse::<Role>()?,
            active: row.get("active"),
            password_changed_at: row.get("password_changed_at"),
            pending_reset,
            created_at: row.get("created_at"),
        })
    }

    fn write_error(e: sqlx::Error, email: &str) -> UserError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                return UserError::EmailAlreadyExists(email.to_string());
            }
        }
        UserError::DatabaseError(e.to_string())
    }

    fn order_by(query: &ListQuery) -> String {
        let mut clauses: Vec<String> = query
            .sort
            .iter()
            .filter_map(|key| {
                let column = match key.field.as_str() {
                    "name" => "name",
                    "email" => "email",
                    "role" => "role",
                    "createdAt" => "created_at",
                    _ => return None,
                };
                let direction = if key.descending { "DESC" } else { "ASC" };
                Some(format!("{} {}", column, direction))
            })
            .collect();

        if clauses.is_empty() {
            clauses.push("created_at DESC".to_string());
        }
        clauses.push("id ASC".to_string());
        clauses.join(", ")
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, active,
                               password_changed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.0)
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_deref())
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.password_changed_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(e, user.email.as_str()))?;

        Ok(user)
    }

    async fn find_by_id(
        &self,
        id: &UserId,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", Self::columns(selection));

        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_by_email(
        &self,
        email: &str,
        selection: PasswordSelection,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = $1 AND active",
            Self::columns(selection)
        );

        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {} FROM users \
             WHERE password_reset_token_digest = $1 \
               AND password_reset_expires_at > $2 \
               AND active",
            COLUMNS_WITHOUT_PASSWORD
        );

        let row = sqlx::query(&sql)
            .bind(digest)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn update_partial(
        &self,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 role = COALESCE($4, role), \
                 active = COALESCE($5, active) \
             WHERE id = $1 \
             RETURNING {}",
            COLUMNS_WITHOUT_PASSWORD
        );
        let email = patch.email.as_ref().map(|e| e.as_str().to_string());

        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(patch.name.as_ref().map(|n| n.as_str()))
            .bind(email.as_deref())
            .bind(patch.role.map(|r| r.as_str()))
            .bind(patch.active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::write_error(e, email.as_deref().unwrap_or_default()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn store_pending_reset(
        &self,
        id: &UserId,
        reset: &PendingReset,
    ) -> Result<bool, UserError> {
        let result = sqlx::query(
            "UPDATE users SET \
                 password_reset_token_digest = $2, \
                 password_reset_expires_at = $3 \
             WHERE id = $1 AND active",
        )
        .bind(id.0)
        .bind(reset.token_digest.as_str())
        .bind(reset.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_pending_reset(&self, id: &UserId, digest: &str) -> Result<(), UserError> {
        sqlx::query(
            "UPDATE users SET \
                 password_reset_token_digest = NULL, \
                 password_reset_expires_at = NULL \
             WHERE id = $1 AND password_reset_token_digest = $2",
        )
        .bind(id.0)
        .bind(digest)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn redeem_reset(
        &self,
        digest: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        // The digest match and the clear happen in one statement, so a
        // secret can be exchanged at most once.
        let sql = format!(
            "UPDATE users SET \
                 password_hash = $2, \
                 password_changed_at = $3, \
                 password_reset_token_digest = NULL, \
                 password_reset_expires_at = NULL \
             WHERE password_reset_token_digest = $1 \
               AND password_reset_expires_at > $3 \
               AND active \
             RETURNING {}",
            COLUMNS_WITHOUT_PASSWORD
        );

        let row = sqlx::query(&sql)
            .bind(digest)
            .bind(password_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn replace_password(
        &self,
        id: &UserId,
        current_hash: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "UPDATE users SET \
                 password_hash = $3, \
                 password_changed_at = $4, \
                 password_reset_token_digest = NULL, \
                 password_reset_expires_at = NULL \
             WHERE id = $1 AND password_hash = $2 AND active \
             RETURNING {}",
            COLUMNS_WITHOUT_PASSWORD
        );

        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(current_hash)
            .bind(new_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn list_active(&self, query: &ListQuery) -> Result<Vec<User>, UserError> {
        // Sort columns come from a fixed mapping, never from raw input.
        let sql = format!(
            "SELECT {} FROM users WHERE active ORDER BY {} LIMIT $1 OFFSET $2",
            COLUMNS_WITHOUT_PASSWORD,
            Self::order_by(query)
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_user).collect()
    }

    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let sql = format!(
            "DELETE FROM users WHERE id = $1 RETURNING {}",
            COLUMNS_WITHOUT_PASSWORD
        );

        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crud::models::Resource;

    #[test]
    fn test_order_by_defaults_to_newest_first() {
        assert_eq!(
            PostgresUserRepository::order_by(&ListQuery::default()),
            "created_at DESC, id ASC"
        );
    }

    #[test]
    fn test_order_by_maps_public_fields_to_columns() {
        let query = ListQuery::parse(None, None, Some("role,-createdAt"), User::SORTABLE).unwrap();
        assert_eq!(
            PostgresUserRepository::order_by(&query),
            "role ASC, created_at DESC, id ASC"
        );
    }
}
