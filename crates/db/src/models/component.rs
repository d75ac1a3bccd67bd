//! Component row model.

use layerhub_core::design::Component;
use layerhub_core::types::Timestamp;
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `components` table.
#[derive(Debug, Clone, FromRow)]
pub struct ComponentRow {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub description: String,
    pub preview: String,
    pub user_id: String,
    pub metadata: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ComponentRow> for Component {
    fn from(row: ComponentRow) -> Self {
        let metadata = match row.metadata {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        Component {
            id: row.id,
            short_id: row.short_id,
            name: row.name,
            description: row.description,
            preview: row.preview,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            layers: Vec::new(),
            metadata,
        }
    }
}
