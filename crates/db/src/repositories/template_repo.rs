//! Repository for the `templates` table and its dependents
//! (`template_tags`, `template_colors`, `template_metadata`).

use layerhub_core::filter::Filter;
use layerhub_core::ids;
use sqlx::{PgConnection, PgPool};

use crate::models::frame::FrameRow;
use crate::models::template::{TemplateMetadataRow, TemplateRow};
use crate::repositories::filter::{bind_rows, bind_scalar, filter_clause, FilterColumns};
use crate::repositories::FrameRepo;

const COLUMNS: &str = "id, short_id, name, type, description, published, preview, \
     created_at, updated_at";

const FILTER_COLUMNS: FilterColumns = FilterColumns {
    short_id: true,
    user_id: false,
    visibility: false,
};

/// Everything written for one template put.
#[derive(Debug)]
pub struct TemplateWrite<'a> {
    pub row: &'a TemplateRow,
    pub frame: &'a FrameRow,
    pub tags: &'a [String],
    pub colors: &'a [String],
    pub metadata: &'a TemplateMetadataRow,
}

/// Provides upsert, query and delete operations for templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Upsert the template row, its owned frame, tags, colors and metadata
    /// in one transaction.
    pub async fn put(pool: &PgPool, write: TemplateWrite<'_>) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO templates ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                short_id = EXCLUDED.short_id, \
                name = EXCLUDED.name, \
                type = EXCLUDED.type, \
                description = EXCLUDED.description, \
                published = EXCLUDED.published, \
                preview = EXCLUDED.preview, \
                updated_at = EXCLUDED.updated_at"
        );
        let row = write.row;
        sqlx::query(&query)
            .bind(&row.id)
            .bind(&row.short_id)
            .bind(&row.name)
            .bind(&row.kind)
            .bind(&row.description)
            .bind(row.published)
            .bind(&row.preview)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;

        FrameRepo::upsert(&mut *tx, write.frame).await?;
        Self::replace_tags(&mut tx, &row.id, write.tags).await?;
        Self::replace_colors(&mut tx, &row.id, write.colors).await?;
        Self::upsert_metadata(&mut tx, write.metadata).await?;

        tx.commit().await?;
        Ok(())
    }

    /// List template rows matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &Filter) -> Result<Vec<TemplateRow>, sqlx::Error> {
        let clause = filter_clause("templates", filter, FILTER_COLUMNS);
        let query = format!(
            "SELECT {COLUMNS} FROM templates {} \
             ORDER BY templates.created_at DESC, templates.id {}",
            clause.where_clause, clause.pagination
        );
        bind_rows(sqlx::query_as::<_, TemplateRow>(&query), clause.binds)
            .fetch_all(pool)
            .await
    }

    /// Count templates matching `filter`, ignoring pagination.
    pub async fn count(pool: &PgPool, filter: &Filter) -> Result<i64, sqlx::Error> {
        let clause = filter_clause("templates", &filter.without_pagination(), FILTER_COLUMNS);
        let query = format!("SELECT COUNT(*) FROM templates {}", clause.where_clause);
        bind_scalar(sqlx::query_scalar::<_, i64>(&query), clause.binds)
            .fetch_one(pool)
            .await
    }

    /// Tags of a template in position order.
    pub async fn tags(pool: &PgPool, template_id: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT tag FROM template_tags WHERE template_id = $1 ORDER BY position",
        )
        .bind(template_id)
        .fetch_all(pool)
        .await
    }

    /// Palette of a template in position order.
    pub async fn colors(pool: &PgPool, template_id: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT color FROM template_colors WHERE template_id = $1 ORDER BY position",
        )
        .bind(template_id)
        .fetch_all(pool)
        .await
    }

    pub async fn metadata(
        pool: &PgPool,
        template_id: &str,
    ) -> Result<Option<TemplateMetadataRow>, sqlx::Error> {
        sqlx::query_as::<_, TemplateMetadataRow>(
            "SELECT id, license, orientation FROM template_metadata WHERE id = $1",
        )
        .bind(template_id)
        .fetch_optional(pool)
        .await
    }

    /// Delete a template, its dependents and its owned frame in one
    /// transaction. Returns `true` if the template row existed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for table in ["template_tags", "template_colors"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE template_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM template_metadata WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        FrameRepo::delete(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_tags(
        conn: &mut PgConnection,
        template_id: &str,
        tags: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM template_tags WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut *conn)
            .await?;
        for (position, tag) in tags.iter().enumerate() {
            sqlx::query(
                "INSERT INTO template_tags (id, template_id, tag, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(ids::unique_id("tag"))
            .bind(template_id)
            .bind(tag)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn replace_colors(
        conn: &mut PgConnection,
        template_id: &str,
        colors: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM template_colors WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut *conn)
            .await?;
        for (position, color) in colors.iter().enumerate() {
            sqlx::query(
                "INSERT INTO template_colors (id, template_id, color, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(ids::unique_id("color"))
            .bind(template_id)
            .bind(color)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn upsert_metadata(
        conn: &mut PgConnection,
        metadata: &TemplateMetadataRow,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO template_metadata (id, license, orientation) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                license = EXCLUDED.license, \
                orientation = EXCLUDED.orientation",
        )
        .bind(&metadata.id)
        .bind(&metadata.license)
        .bind(&metadata.orientation)
        .execute(conn)
        .await?;
        Ok(())
    }
}
