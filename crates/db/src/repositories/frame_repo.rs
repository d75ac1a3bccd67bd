//! Repository for the `frames` table.

use layerhub_core::filter::Filter;
use sqlx::{PgExecutor, PgPool};

use crate::models::frame::FrameRow;
use crate::repositories::filter::{bind_rows, bind_scalar, filter_clause, FilterColumns};

const COLUMNS: &str = "id, name, visibility, width, height, unit, preview";

const FILTER_COLUMNS: FilterColumns = FilterColumns {
    short_id: false,
    user_id: false,
    visibility: true,
};

/// Provides upsert, query and delete operations for frames.
pub struct FrameRepo;

impl FrameRepo {
    /// Insert or replace a frame by id.
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        frame: &FrameRow,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO frames ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                visibility = EXCLUDED.visibility, \
                width = EXCLUDED.width, \
                height = EXCLUDED.height, \
                unit = EXCLUDED.unit, \
                preview = EXCLUDED.preview"
        );
        sqlx::query(&query)
            .bind(&frame.id)
            .bind(&frame.name)
            .bind(&frame.visibility)
            .bind(frame.width)
            .bind(frame.height)
            .bind(&frame.unit)
            .bind(&frame.preview)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Find a frame by id.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: &str,
    ) -> Result<Option<FrameRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM frames WHERE id = $1");
        sqlx::query_as::<_, FrameRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List frames matching `filter`, ordered by id.
    pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<FrameRow>, sqlx::Error> {
        let clause = filter_clause("frames", filter, FILTER_COLUMNS);
        let query = format!(
            "SELECT {COLUMNS} FROM frames {} ORDER BY frames.id {}",
            clause.where_clause, clause.pagination
        );
        bind_rows(sqlx::query_as::<_, FrameRow>(&query), clause.binds)
            .fetch_all(pool)
            .await
    }

    /// Count frames matching `filter`, ignoring pagination.
    pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, sqlx::Error> {
        let clause = filter_clause("frames", &filter.without_pagination(), FILTER_COLUMNS);
        let query = format!("SELECT COUNT(*) FROM frames {}", clause.where_clause);
        bind_scalar(sqlx::query_scalar::<_, i64>(&query), clause.binds)
            .fetch_one(pool)
            .await
    }

    /// Delete a frame by id. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM frames WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
