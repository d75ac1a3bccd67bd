//! Design orchestration over the structured store, blob storage and the
//! renderer.

use std::sync::Arc;
use std::time::Instant;

use layerhub_core::blob::BlobStore;
use layerhub_core::design::{storage_key, Component, Design, Frame, Project, Template};
use layerhub_core::error::{CodecError, CoreError};
use layerhub_core::filter::Filter;
use layerhub_core::render::{RenderParams, Renderer};
use layerhub_core::store::DesignStore;
use serde_json::Value;

use crate::resources::ResourcePersister;
use crate::stored::StoredDesign;
use crate::writer::DocumentWriter;

pub struct DesignService {
    store: Arc<dyn DesignStore>,
    blobs: Arc<dyn BlobStore>,
    renderer: Arc<dyn Renderer>,
    resources: ResourcePersister,
    writer: DocumentWriter,
}

impl DesignService {
    pub fn new(
        store: Arc<dyn DesignStore>,
        blobs: Arc<dyn BlobStore>,
        renderer: Arc<dyn Renderer>,
        resources: ResourcePersister,
        writer: DocumentWriter,
    ) -> Self {
        Self {
            store,
            blobs,
            renderer,
            resources,
            writer,
        }
    }

    // ---- Generic design operations

    /// Make `design` durable: rehost images, render and attach the preview,
    /// write the summary, then queue the full document.
    ///
    /// A failure in any of the first three steps returns before anything
    /// is written. The document upload happens in the background.
    pub async fn put<D: StoredDesign>(&self, design: &mut D) -> Result<(), CoreError> {
        let start = Instant::now();

        let rehosted = self.resources.persist(design.layers_mut()).await?;
        let document = design.render_document()?;
        let preview = self.renderer.render(&document, &RenderParams::new()).await?;
        design.set_preview(preview);
        let body = serde_json::to_vec(&*design)?;
        let rendered = start.elapsed();

        D::put(self.store.as_ref(), design).await?;
        let stored = start.elapsed() - rendered;

        self.writer.enqueue(design.key(), body);

        tracing::info!(
            entity = D::ENTITY,
            id = design.id(),
            rehosted,
            preview = design.preview(),
            render_ms = rendered.as_millis() as u64,
            store_ms = stored.as_millis() as u64,
            "Design saved",
        );
        Ok(())
    }

    /// Load the summary for `id` and overlay its full document.
    pub async fn get<D: StoredDesign>(&self, id: &str) -> Result<D, CoreError> {
        let summary = D::find(self.store.as_ref(), &D::lookup(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound {
                entity: D::ENTITY,
                id: id.to_string(),
            })?;

        let content = self.blobs.get(&summary.key()).await?;
        merge_document(summary, &content)
    }

    /// One page of summaries plus the total matching the filter. Layers
    /// are never loaded.
    pub async fn find<D: StoredDesign>(&self, filter: &Filter) -> Result<(Vec<D>, i64), CoreError> {
        let items = D::find(self.store.as_ref(), filter).await?;
        let total = D::count(self.store.as_ref(), &filter.without_pagination()).await?;
        Ok((items, total))
    }

    /// Remove the summary, then the stored document on a best-effort basis.
    pub async fn delete<D: StoredDesign>(&self, id: &str) -> Result<(), CoreError> {
        if !D::delete(self.store.as_ref(), id).await? {
            return Err(CoreError::NotFound {
                entity: D::ENTITY,
                id: id.to_string(),
            });
        }

        let key = storage_key(id);
        if let Err(e) = self.blobs.delete(&key).await {
            tracing::warn!(entity = D::ENTITY, key = %key, error = %e, "Failed to delete design document");
        }
        tracing::info!(entity = D::ENTITY, id, "Design deleted");
        Ok(())
    }

    /// Wait for queued document uploads.
    pub async fn flush_documents(&self) {
        self.writer.flush().await;
    }

    // ---- Templates

    pub async fn put_template(&self, template: &mut Template) -> Result<(), CoreError> {
        self.put(template).await
    }

    pub async fn get_template(&self, id: &str) -> Result<Template, CoreError> {
        self.get(id).await
    }

    pub async fn find_templates(&self, filter: &Filter) -> Result<(Vec<Template>, i64), CoreError> {
        self.find(filter).await
    }

    pub async fn delete_template(&self, id: &str) -> Result<(), CoreError> {
        self.delete::<Template>(id).await
    }

    // ---- Projects

    pub async fn put_project(&self, project: &mut Project) -> Result<(), CoreError> {
        self.put(project).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, CoreError> {
        self.get(id).await
    }

    pub async fn find_projects(&self, filter: &Filter) -> Result<(Vec<Project>, i64), CoreError> {
        self.find(filter).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), CoreError> {
        self.delete::<Project>(id).await
    }

    // ---- Components

    pub async fn put_component(&self, component: &mut Component) -> Result<(), CoreError> {
        self.put(component).await
    }

    pub async fn get_component(&self, id: &str) -> Result<Component, CoreError> {
        self.get(id).await
    }

    pub async fn find_components(
        &self,
        filter: &Filter,
    ) -> Result<(Vec<Component>, i64), CoreError> {
        self.find(filter).await
    }

    pub async fn delete_component(&self, id: &str) -> Result<(), CoreError> {
        self.delete::<Component>(id).await
    }

    // ---- Frames

    pub async fn put_frame(&self, frame: &Frame) -> Result<(), CoreError> {
        if frame.id.is_empty() {
            return Err(CoreError::Validation("frame id is required".into()));
        }
        self.store.put_frame(frame).await?;
        Ok(())
    }

    pub async fn get_frame(&self, id: &str) -> Result<Frame, CoreError> {
        self.store
            .find_frames(&Filter::by_id(id).with_limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound {
                entity: "Frame",
                id: id.to_string(),
            })
    }

    pub async fn find_frames(&self, filter: &Filter) -> Result<(Vec<Frame>, i64), CoreError> {
        let frames = self.store.find_frames(filter).await?;
        let total = self.store.count_frames(&filter.without_pagination()).await?;
        Ok((frames, total))
    }

    pub async fn delete_frame(&self, id: &str) -> Result<(), CoreError> {
        if !self.store.delete_frame(id).await? {
            return Err(CoreError::NotFound {
                entity: "Frame",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ---- Rendering

    /// Render the template or project addressed by `id` (regular or short)
    /// with `params`, returning PNG bytes. Nothing is persisted.
    pub async fn render_design(&self, id: &str, params: &RenderParams) -> Result<Vec<u8>, CoreError> {
        let document = if self.exists::<Template>(id).await? {
            self.get::<Template>(id).await?.render_document()?
        } else if self.exists::<Project>(id).await? {
            self.get::<Project>(id).await?.render_document()?
        } else {
            return Err(CoreError::NotFound {
                entity: "Template or project",
                id: id.to_string(),
            });
        };

        Ok(self.renderer.raw_render(&document, params).await?)
    }

    /// Render an unsaved design as-is.
    pub async fn render_document(
        &self,
        design: &(impl Design + Sync),
        params: &RenderParams,
    ) -> Result<Vec<u8>, CoreError> {
        let document = design.render_document()?;
        Ok(self.renderer.raw_render(&document, params).await?)
    }

    async fn exists<D: StoredDesign>(&self, id: &str) -> Result<bool, CoreError> {
        Ok(D::count(self.store.as_ref(), &D::lookup(id).without_pagination()).await? > 0)
    }
}

/// Overlay the stored document's fields onto the summary.
fn merge_document<D: StoredDesign>(summary: D, content: &[u8]) -> Result<D, CoreError> {
    let mut merged = serde_json::to_value(&summary)?;
    let document: Value = serde_json::from_slice(content)?;

    match (merged.as_object_mut(), document) {
        (Some(fields), Value::Object(overlay)) => fields.extend(overlay),
        _ => {
            return Err(CodecError::Malformed(format!(
                "stored document {} is not an object",
                summary.key()
            ))
            .into())
        }
    }

    Ok(serde_json::from_value(merged)?)
}
