//! Frame row model.

use layerhub_core::design::{Frame, FrameUnit, FrameVisibility};
use sqlx::FromRow;

/// A row from the `frames` table. Unset unit and visibility are `''`.
#[derive(Debug, Clone, FromRow)]
pub struct FrameRow {
    pub id: String,
    pub name: String,
    pub visibility: String,
    pub width: f64,
    pub height: f64,
    pub unit: String,
    pub preview: String,
}

impl From<FrameRow> for Frame {
    fn from(row: FrameRow) -> Self {
        Frame {
            id: row.id,
            name: row.name,
            visibility: FrameVisibility::parse(&row.visibility),
            width: row.width,
            height: row.height,
            unit: FrameUnit::parse(&row.unit),
            preview: row.preview,
        }
    }
}

impl From<&Frame> for FrameRow {
    fn from(frame: &Frame) -> Self {
        FrameRow {
            id: frame.id.clone(),
            name: frame.name.clone(),
            visibility: frame.visibility.map(FrameVisibility::as_str).unwrap_or_default().to_string(),
            width: frame.width,
            height: frame.height,
            unit: frame.unit.map(FrameUnit::as_str).unwrap_or_default().to_string(),
            preview: frame.preview.clone(),
        }
    }
}

/// The private frame row owned by a template or project.
pub fn owned_frame(design_id: &str, frame: &Frame) -> FrameRow {
    FrameRow {
        id: design_id.to_string(),
        visibility: FrameVisibility::Private.as_str().to_string(),
        ..FrameRow::from(frame)
    }
}
