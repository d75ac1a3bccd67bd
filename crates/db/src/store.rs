//! [`DesignStore`] adapter over the repositories.

use async_trait::async_trait;
use layerhub_core::design::{Component, Frame, Project, Template};
use layerhub_core::error::StoreError;
use layerhub_core::filter::Filter;
use layerhub_core::store::DesignStore;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::component::ComponentRow;
use crate::models::frame::{owned_frame, FrameRow};
use crate::models::project::ProjectRow;
use crate::models::template::{TemplateMetadataRow, TemplateParts, TemplateRow};
use crate::repositories::template_repo::TemplateWrite;
use crate::repositories::{ComponentRepo, FrameRepo, ProjectRepo, TemplateRepo};

/// PostgreSQL-backed structured store.
#[derive(Debug, Clone)]
pub struct PgDesignStore {
    pool: PgPool,
}

impl PgDesignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn template_parts(&self, id: &str) -> Result<TemplateParts, sqlx::Error> {
        Ok(TemplateParts {
            frame: FrameRepo::find_by_id(&self.pool, id).await?.map(Frame::from),
            tags: TemplateRepo::tags(&self.pool, id).await?,
            colors: TemplateRepo::colors(&self.pool, id).await?,
            metadata: TemplateRepo::metadata(&self.pool, id).await?,
        })
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Structured store query failed");
    StoreError::Database(err.to_string())
}

#[async_trait]
impl DesignStore for PgDesignStore {
    async fn put_template(&self, template: &Template) -> Result<(), StoreError> {
        let row = TemplateRow {
            id: template.id.clone(),
            short_id: template.short_id.clone(),
            name: template.name.clone(),
            kind: template.kind.clone(),
            description: template.description.clone(),
            published: template.published,
            preview: template.preview.clone(),
            created_at: template.created_at,
            updated_at: template.updated_at,
        };
        let frame = owned_frame(&template.id, &template.frame);
        let metadata = TemplateMetadataRow {
            id: template.id.clone(),
            license: template.metadata.license.clone(),
            orientation: template.metadata.orientation.clone(),
        };

        TemplateRepo::put(
            &self.pool,
            TemplateWrite {
                row: &row,
                frame: &frame,
                tags: &template.tags,
                colors: &template.colors,
                metadata: &metadata,
            },
        )
        .await
        .map_err(db_error)
    }

    async fn find_templates(&self, filter: &Filter) -> Result<Vec<Template>, StoreError> {
        let rows = TemplateRepo::list(&self.pool, filter).await.map_err(db_error)?;

        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            let parts = self.template_parts(&row.id).await.map_err(db_error)?;
            templates.push(row.into_template(parts));
        }
        Ok(templates)
    }

    async fn count_templates(&self, filter: &Filter) -> Result<i64, StoreError> {
        TemplateRepo::count(&self.pool, filter).await.map_err(db_error)
    }

    async fn delete_template(&self, id: &str) -> Result<bool, StoreError> {
        TemplateRepo::delete(&self.pool, id).await.map_err(db_error)
    }

    async fn put_project(&self, project: &Project) -> Result<(), StoreError> {
        let row = ProjectRow {
            id: project.id.clone(),
            short_id: project.short_id.clone(),
            name: project.name.clone(),
            kind: project.kind.clone(),
            user_id: project.user_id.clone(),
            description: project.description.clone(),
            preview: project.preview.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        };
        let frame = owned_frame(&project.id, &project.frame);

        ProjectRepo::put(&self.pool, &row, &frame)
            .await
            .map_err(db_error)
    }

    async fn find_projects(&self, filter: &Filter) -> Result<Vec<Project>, StoreError> {
        let rows = ProjectRepo::list(&self.pool, filter).await.map_err(db_error)?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            let frame = FrameRepo::find_by_id(&self.pool, &row.id)
                .await
                .map_err(db_error)?
                .map(Frame::from);
            projects.push(row.into_project(frame));
        }
        Ok(projects)
    }

    async fn count_projects(&self, filter: &Filter) -> Result<i64, StoreError> {
        ProjectRepo::count(&self.pool, filter).await.map_err(db_error)
    }

    async fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        ProjectRepo::delete(&self.pool, id).await.map_err(db_error)
    }

    async fn put_component(&self, component: &Component) -> Result<(), StoreError> {
        let row = ComponentRow {
            id: component.id.clone(),
            short_id: component.short_id.clone(),
            name: component.name.clone(),
            description: component.description.clone(),
            preview: component.preview.clone(),
            user_id: component.user_id.clone(),
            metadata: Value::Object(component.metadata.clone()),
            created_at: component.created_at,
            updated_at: component.updated_at,
        };

        ComponentRepo::upsert(&self.pool, &row).await.map_err(db_error)
    }

    async fn find_components(&self, filter: &Filter) -> Result<Vec<Component>, StoreError> {
        let rows = ComponentRepo::list(&self.pool, filter)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Component::from).collect())
    }

    async fn count_components(&self, filter: &Filter) -> Result<i64, StoreError> {
        ComponentRepo::count(&self.pool, filter).await.map_err(db_error)
    }

    async fn delete_component(&self, id: &str) -> Result<bool, StoreError> {
        ComponentRepo::delete(&self.pool, id).await.map_err(db_error)
    }

    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        FrameRepo::upsert(&self.pool, &FrameRow::from(frame))
            .await
            .map_err(db_error)
    }

    async fn find_frames(&self, filter: &Filter) -> Result<Vec<Frame>, StoreError> {
        let rows = FrameRepo::list(&self.pool, filter).await.map_err(db_error)?;
        Ok(rows.into_iter().map(Frame::from).collect())
    }

    async fn count_frames(&self, filter: &Filter) -> Result<i64, StoreError> {
        FrameRepo::count(&self.pool, filter).await.map_err(db_error)
    }

    async fn delete_frame(&self, id: &str) -> Result<bool, StoreError> {
        FrameRepo::delete(&self.pool, id).await.map_err(db_error)
    }
}
