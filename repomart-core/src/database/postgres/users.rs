use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repomart_model::user::UserFilter;
use repomart_model::{User, UserId, UserRole};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::rows::{USER_COLUMNS, UserRow};
use crate::database::ports::users::{Credentials, UsersRepository};
use crate::error::{CoreError, Result};

/// PostgreSQL-backed implementation of the `UsersRepository` port.
#[derive(Clone, Debug)]
pub struct PostgresUsersRepository {
    pool: PgPool,
}

impl PostgresUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_one(
        &self,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<()> {
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("User"));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UsersRepository for PostgresUsersRepository {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, display_name, role, is_banned,
                password_hash, created_at, updated_at, last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.to_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user.id, username = %user.username, "created user");
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users \
             WHERE lower(username) = lower($1) OR lower(email) = lower($1) \
             LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(Credentials {
                user: User::try_from(r.user)?,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>> {
        Ok(
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(id.to_uuid())
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<()> {
        self.update_one(
            sqlx::query(
                "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id.to_uuid())
            .bind(password_hash),
        )
        .await
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
                .bind(id.to_uuid())
                .bind(at),
        )
        .await
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<()> {
        self.update_one(
            sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.to_uuid())
                .bind(role.as_str()),
        )
        .await
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<()> {
        self.update_one(
            sqlx::query(
                "UPDATE users SET is_banned = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(id.to_uuid())
            .bind(banned),
        )
        .await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if let Some(role) = filter.role {
            qb.push(" AND role = ");
            qb.push_bind(role.as_str());
        }
        if let Some(banned) = filter.banned {
            qb.push(" AND is_banned = ");
            qb.push_bind(banned);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", crate::catalog::filter::escape_like(search));
            qb.push(" AND (username ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR email ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR display_name ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        qb.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        qb.push_bind(filter.limit.unwrap_or(50));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset.unwrap_or(0));

        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(User::try_from).collect()
    }
}
