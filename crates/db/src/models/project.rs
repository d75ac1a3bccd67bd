//! Project row model.

use layerhub_core::design::{Frame, Project};
use layerhub_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub short_id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub user_id: String,
    pub description: String,
    pub preview: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectRow {
    pub fn into_project(self, frame: Option<Frame>) -> Project {
        Project {
            id: self.id,
            short_id: self.short_id,
            kind: self.kind,
            name: self.name,
            user_id: self.user_id,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            layers: Vec::new(),
            frame: frame.unwrap_or_default(),
            preview: self.preview,
        }
    }
}
