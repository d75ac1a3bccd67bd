//! Template row models.

use layerhub_core::design::{Frame, Template, TemplateMetadata};
use layerhub_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: String,
    pub short_id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub description: String,
    pub published: bool,
    pub preview: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `template_metadata` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct TemplateMetadataRow {
    pub id: String,
    pub license: String,
    pub orientation: String,
}

/// Relational parts of a template gathered from its dependent tables.
#[derive(Debug, Default)]
pub struct TemplateParts {
    pub frame: Option<Frame>,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
    pub metadata: Option<TemplateMetadataRow>,
}

impl TemplateRow {
    /// Assemble the summary view of a template. Layers stay empty.
    pub fn into_template(self, parts: TemplateParts) -> Template {
        let metadata = parts
            .metadata
            .map(|row| TemplateMetadata {
                license: row.license,
                orientation: row.orientation,
            })
            .unwrap_or_default();

        Template {
            id: self.id,
            short_id: self.short_id,
            kind: self.kind,
            name: self.name,
            description: self.description,
            published: self.published,
            tags: parts.tags,
            colors: parts.colors,
            created_at: self.created_at,
            updated_at: self.updated_at,
            layers: Vec::new(),
            frame: parts.frame.unwrap_or_default(),
            metadata,
            preview: self.preview,
        }
    }
}
