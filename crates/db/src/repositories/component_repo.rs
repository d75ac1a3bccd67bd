//! Repository for the `components` table.

use layerhub_core::filter::Filter;
use sqlx::PgPool;

use crate::models::component::ComponentRow;
use crate::repositories::filter::{bind_rows, bind_scalar, filter_clause, FilterColumns};

const COLUMNS: &str = "id, short_id, name, description, preview, user_id, metadata, \
     created_at, updated_at";

const FILTER_COLUMNS: FilterColumns = FilterColumns {
    short_id: true,
    user_id: true,
    visibility: false,
};

/// Provides upsert, query and delete operations for components.
pub struct ComponentRepo;

impl ComponentRepo {
    /// Insert or update a component by id. Ownership is fixed at creation.
    pub async fn upsert(pool: &PgPool, row: &ComponentRow) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO components ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                description = EXCLUDED.description, \
                preview = EXCLUDED.preview, \
                metadata = EXCLUDED.metadata, \
                updated_at = EXCLUDED.updated_at"
        );
        sqlx::query(&query)
            .bind(&row.id)
            .bind(&row.short_id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.preview)
            .bind(&row.user_id)
            .bind(&row.metadata)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// List component rows matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<ComponentRow>, sqlx::Error> {
        let clause = filter_clause("components", filter, FILTER_COLUMNS);
        let query = format!(
            "SELECT {COLUMNS} FROM components {} \
             ORDER BY components.created_at DESC, components.id {}",
            clause.where_clause, clause.pagination
        );
        bind_rows(sqlx::query_as::<_, ComponentRow>(&query), clause.binds)
            .fetch_all(pool)
            .await
    }

    /// Count components matching `filter`, ignoring pagination.
    pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, sqlx::Error> {
        let clause = filter_clause("components", &filter.without_pagination(), FILTER_COLUMNS);
        let query = format!("SELECT COUNT(*) FROM components {}", clause.where_clause);
        bind_scalar(sqlx::query_scalar::<_, i64>(&query), clause.binds)
            .fetch_one(pool)
            .await
    }

    /// Delete a component by id. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
