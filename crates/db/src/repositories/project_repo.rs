//! Repository for the `projects` table.

use layerhub_core::filter::Filter;
use sqlx::PgPool;

use crate::models::frame::FrameRow;
use crate::models::project::ProjectRow;
use crate::repositories::filter::{bind_rows, bind_scalar, filter_clause, FilterColumns};
use crate::repositories::FrameRepo;

const COLUMNS: &str = "id, short_id, name, type, user_id, description, preview, \
     created_at, updated_at";

const FILTER_COLUMNS: FilterColumns = FilterColumns {
    short_id: true,
    user_id: true,
    visibility: false,
};

/// Provides upsert, query and delete operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Upsert the project row and its owned frame in one transaction.
    pub async fn put(pool: &PgPool, row: &ProjectRow, frame: &FrameRow) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                short_id = EXCLUDED.short_id, \
                name = EXCLUDED.name, \
                type = EXCLUDED.type, \
                user_id = EXCLUDED.user_id, \
                description = EXCLUDED.description, \
                preview = EXCLUDED.preview, \
                updated_at = EXCLUDED.updated_at"
        );
        sqlx::query(&query)
            .bind(&row.id)
            .bind(&row.short_id)
            .bind(&row.name)
            .bind(&row.kind)
            .bind(&row.user_id)
            .bind(&row.description)
            .bind(&row.preview)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;

        FrameRepo::upsert(&mut *tx, frame).await?;

        tx.commit().await?;
        Ok(())
    }

    /// List project rows matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<ProjectRow>, sqlx::Error> {
        let clause = filter_clause("projects", filter, FILTER_COLUMNS);
        let query = format!(
            "SELECT {COLUMNS} FROM projects {} \
             ORDER BY projects.created_at DESC, projects.id {}",
            clause.where_clause, clause.pagination
        );
        bind_rows(sqlx::query_as::<_, ProjectRow>(&query), clause.binds)
            .fetch_all(pool)
            .await
    }

    /// Count projects matching `filter`, ignoring pagination.
    pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, sqlx::Error> {
        let clause = filter_clause("projects", &filter.without_pagination(), FILTER_COLUMNS);
        let query = format!("SELECT COUNT(*) FROM projects {}", clause.where_clause);
        bind_scalar(sqlx::query_scalar::<_, i64>(&query), clause.binds)
            .fetch_one(pool)
            .await
    }

    /// Delete a project and its owned frame in one transaction.
    /// Returns `true` if the project row existed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        FrameRepo::delete(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
