//! Structured store seam.
//!
//! Holds the relational summary of each design (everything except its
//! layers) plus frames. `put_*` are upserts keyed by id; `delete_*` report
//! whether a row was removed.

use async_trait::async_trait;

use crate::design::{Component, Frame, Project, Template};
use crate::error::StoreError;
use crate::filter::Filter;

#[async_trait]
pub trait DesignStore: Send + Sync {
    /// Upsert the template row, its private frame, tags, colors and metadata.
    async fn put_template(&self, template: &Template) -> Result<(), StoreError>;
    async fn find_templates(&self, filter: &Filter) -> Result<Vec<Template>, StoreError>;
    async fn count_templates(&self, filter: &Filter) -> Result<i64, StoreError>;
    /// Remove the template row, its dependents and its private frame.
    async fn delete_template(&self, id: &str) -> Result<bool, StoreError>;

    /// Upsert the project row and its private frame.
    async fn put_project(&self, project: &Project) -> Result<(), StoreError>;
    async fn find_projects(&self, filter: &Filter) -> Result<Vec<Project>, StoreError>;
    async fn count_projects(&self, filter: &Filter) -> Result<i64, StoreError>;
    async fn delete_project(&self, id: &str) -> Result<bool, StoreError>;

    async fn put_component(&self, component: &Component) -> Result<(), StoreError>;
    async fn find_components(&self, filter: &Filter) -> Result<Vec<Component>, StoreError>;
    async fn count_components(&self, filter: &Filter) -> Result<i64, StoreError>;
    async fn delete_component(&self, id: &str) -> Result<bool, StoreError>;

    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError>;
    async fn find_frames(&self, filter: &Filter) -> Result<Vec<Frame>, StoreError>;
    async fn count_frames(&self, filter: &Filter) -> Result<i64, StoreError>;
    async fn delete_frame(&self, id: &str) -> Result<bool, StoreError>;
}
