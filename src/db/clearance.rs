//! Clearance repository backing the `user_admin` table.

use super::{Database, DbError, to_sql};
use async_trait::async_trait;
use car::enums::ClearanceLevel;
use car::model::UserId;
use car::{CarError, ClearanceStore};
use sqlx::SqlitePool;

/// Repository for per-user clearance levels.
pub struct ClearanceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ClearanceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored clearance, `None` when the user has no row.
    pub async fn get(&self, user: UserId) -> Result<Option<i64>, DbError> {
        let level = sqlx::query_scalar::<_, i64>(
            "SELECT clearance FROM user_admin WHERE user_id = ?",
        )
        .bind(to_sql(user.0))
        .fetch_optional(self.pool)
        .await?;
        Ok(level)
    }

    pub async fn insert_default(&self, user: UserId) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO user_admin (user_id, clearance) VALUES (?, ?)")
            .bind(to_sql(user.0))
            .bind(ClearanceLevel::DEFAULT)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Insert or overwrite the user's clearance.
    pub async fn set(&self, user: UserId, level: i64) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO user_admin (user_id, clearance) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET clearance = excluded.clearance
            "#,
        )
        .bind(to_sql(user.0))
        .bind(level)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ClearanceStore for Database {
    async fn clearance(&self, user: UserId) -> Result<Option<i64>, CarError> {
        Ok(self.clearances().get(user).await?)
    }

    async fn insert_default(&self, user: UserId) -> Result<(), CarError> {
        Ok(self.clearances().insert_default(user).await?)
    }

    async fn set_clearance(&self, user: UserId, level: i64) -> Result<(), CarError> {
        Ok(self.clearances().set(user, level).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_creates_default_row() {
        let db = Database::new(":memory:").await.unwrap();
        assert_eq!(db.clearances().get(UserId(5)).await.unwrap(), None);
        assert_eq!(db.ensure(UserId(5)).await.unwrap(), ClearanceLevel::DEFAULT);
        assert_eq!(
            db.clearances().get(UserId(5)).await.unwrap(),
            Some(ClearanceLevel::DEFAULT)
        );
    }

    #[tokio::test]
    async fn test_set_overwrites_and_default_does_not() {
        let db = Database::new(":memory:").await.unwrap();
        db.set_clearance(UserId(7), ClearanceLevel::ADMIN).await.unwrap();
        db.clearances().insert_default(UserId(7)).await.unwrap();
        assert_eq!(db.ensure(UserId(7)).await.unwrap(), ClearanceLevel::ADMIN);

        db.set_clearance(UserId(7), ClearanceLevel::BANNED).await.unwrap();
        assert_eq!(
            db.clearances().get(UserId(7)).await.unwrap(),
            Some(ClearanceLevel::BANNED)
        );
    }
}
