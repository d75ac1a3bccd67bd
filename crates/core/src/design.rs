//! Design aggregate: templates, projects, components and their frames.
//!
//! Every design has a relational summary (stored in the structured store)
//! and a full-fidelity JSON document addressed by [`Design::key`] in blob
//! storage. The renderer receives [`Design::render_document`].

use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::ids;
use crate::layer::Layer;
use crate::types::{now, null_as_default, Timestamp};

/// Suffix of the blob key holding a design's full document.
pub const STORAGE_SUFFIX: &str = ".layerhub";

/// Blob key of the full document of design `id`.
pub fn storage_key(id: &str) -> String {
    format!("{id}{STORAGE_SUFFIX}")
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameUnit {
    Cm,
    Px,
    In,
}

impl FrameUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameUnit::Cm => "cm",
            FrameUnit::Px => "px",
            FrameUnit::In => "in",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cm" => Some(FrameUnit::Cm),
            "px" => Some(FrameUnit::Px),
            "in" => Some(FrameUnit::In),
            _ => None,
        }
    }
}

impl FromStr for FrameUnit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unknown frame unit '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameVisibility {
    Public,
    Private,
}

impl FrameVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameVisibility::Public => "public",
            FrameVisibility::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(FrameVisibility::Public),
            "private" => Some(FrameVisibility::Private),
            _ => None,
        }
    }
}

impl FromStr for FrameVisibility {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unknown frame visibility '{value}'"))
    }
}

/// The editor sends `""` for an unset unit or visibility.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Canvas geometry. Public frames are presets offered to users; every
/// template and project also owns a private frame row keyed by its own id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub visibility: Option<FrameVisibility>,
    pub width: f64,
    pub height: f64,
    #[serde(deserialize_with = "blank_as_none")]
    pub unit: Option<FrameUnit>,
    pub preview: String,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            id: ids::unique_id(ids::FRAME_PREFIX),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Design trait
// ---------------------------------------------------------------------------

/// Behaviour shared by templates, projects and components.
pub trait Design {
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    fn id(&self) -> &str;

    fn key(&self) -> String {
        storage_key(self.id())
    }

    fn layers(&self) -> &[Layer];

    fn layers_mut(&mut self) -> &mut Vec<Layer>;

    fn preview(&self) -> &str;

    fn set_preview(&mut self, url: String);

    /// The document handed to the renderer.
    fn render_document(&self) -> Result<Value, CoreError>;
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateMetadata {
    pub license: String,
    pub orientation: String,
}

/// A publishable design offered in the template catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: String,
    pub short_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub published: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub colors: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub layers: Vec<Layer>,
    pub frame: Frame,
    pub metadata: TemplateMetadata,
    /// URL of the rendered preview.
    pub preview: String,
}

impl Template {
    pub fn new() -> Self {
        let now = now();
        Self {
            id: ids::unique_id(ids::TEMPLATE_PREFIX),
            short_id: ids::short_id(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Design for Template {
    const ENTITY: &'static str = "Template";

    fn id(&self) -> &str {
        &self.id
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    fn preview(&self) -> &str {
        &self.preview
    }

    fn set_preview(&mut self, url: String) {
        self.preview = url;
    }

    fn render_document(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A user's working design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub short_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub user_id: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub layers: Vec<Layer>,
    pub frame: Frame,
    pub preview: String,
}

impl Project {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: ids::unique_id(ids::PROJECT_PREFIX),
            short_id: ids::short_id(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Design for Project {
    const ENTITY: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    fn preview(&self) -> &str {
        &self.preview
    }

    fn set_preview(&mut self, url: String) {
        self.preview = url;
    }

    fn render_document(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A reusable fragment of layers. Has no frame of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub short_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub preview: String,
    pub user_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub layers: Vec<Layer>,
    #[serde(skip_serializing_if = "Map::is_empty", deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

impl Component {
    pub fn new() -> Self {
        let now = now();
        Self {
            id: ids::unique_id(ids::COMPONENT_PREFIX),
            short_id: ids::short_id(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Design for Component {
    const ENTITY: &'static str = "Component";

    fn id(&self) -> &str {
        &self.id
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    fn preview(&self) -> &str {
        &self.preview
    }

    fn set_preview(&mut self, url: String) {
        self.preview = url;
    }

    /// Renders on a frame sized after the first layer.
    fn render_document(&self) -> Result<Value, CoreError> {
        let first = self.layers.first().ok_or_else(|| {
            CoreError::Validation(format!("Component {} has no layers to render", self.id))
        })?;
        let frame = Frame {
            width: first.base.width,
            height: first.base.height,
            ..Default::default()
        };

        let mut document = Map::new();
        document.insert("id".into(), Value::String(self.id.clone()));
        document.insert("frame".into(), serde_json::to_value(&frame)?);
        document.insert("layers".into(), serde_json::to_value(&self.layers)?);
        Ok(Value::Object(document))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::is_short_id;
    use crate::layer::{BaseLayer, LayerKind};
    use assert_matches::assert_matches;
    use chrono::Timelike;

    #[test]
    fn constructors_generate_prefixed_ids() {
        let template = Template::new();
        assert!(template.id.starts_with("temp_"));
        assert!(is_short_id(&template.short_id));
        assert_eq!(template.created_at, template.updated_at);
        assert_eq!(template.created_at.nanosecond(), 0);

        let project = Project::new("user_1");
        assert!(project.id.starts_with("proj_"));
        assert_eq!(project.user_id, "user_1");

        assert!(Component::new().id.starts_with("comp_"));
        assert!(Frame::new().id.starts_with("frame_"));
    }

    #[test]
    fn storage_key_appends_suffix() {
        let template = Template {
            id: "temp_abc".into(),
            ..Default::default()
        };
        assert_eq!(template.key(), "temp_abc.layerhub");
    }

    #[test]
    fn template_json_field_names() {
        let mut template = Template::new();
        template.kind = "poster".into();
        template.frame.unit = Some(FrameUnit::Cm);
        template.frame.visibility = Some(FrameVisibility::Private);
        let value = serde_json::to_value(&template).unwrap();

        assert_eq!(value["type"], "poster");
        assert!(value.get("short_id").is_some());
        assert!(value.get("created_at").is_some());
        assert_eq!(value["frame"]["unit"], "cm");
        assert_eq!(value["frame"]["visibility"], "private");
        assert_eq!(value["tags"], serde_json::json!([]));
    }

    #[test]
    fn template_json_round_trip() {
        let mut template = Template::new();
        template.layers = crate::layer::tests::sample_layers();
        template.metadata.license = "CC0".into();
        template.colors = vec!["#fff".into(), "#000".into()];

        let bytes = serde_json::to_vec(&template).unwrap();
        let decoded: Template = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, template);
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let template: Template = serde_json::from_str(
            r#"{"id":"temp_a","name":"Sale","tags":null,"colors":null,"layers":null}"#,
        )
        .unwrap();
        assert_eq!(template.name, "Sale");
        assert!(template.tags.is_empty());
        assert!(template.colors.is_empty());
        assert!(template.layers.is_empty());

        let project: Project = serde_json::from_str(r#"{"id":"proj_a","layers":null}"#).unwrap();
        assert!(project.layers.is_empty());

        let component: Component =
            serde_json::from_str(r#"{"id":"comp_a","layers":null,"metadata":null}"#).unwrap();
        assert!(component.layers.is_empty());
        assert!(component.metadata.is_empty());
    }

    #[test]
    fn component_render_document_synthesizes_frame() {
        let mut component = Component::new();
        component.layers.push(Layer::new(
            BaseLayer {
                width: 200.0,
                height: 80.0,
                ..Default::default()
            },
            LayerKind::StaticText,
        ));

        let document = component.render_document().unwrap();
        assert_eq!(document["id"], component.id.as_str());
        assert_eq!(document["frame"]["width"], 200.0);
        assert_eq!(document["frame"]["height"], 80.0);
        assert_eq!(document["layers"][0]["type"], "StaticText");
    }

    #[test]
    fn empty_component_cannot_render() {
        assert_matches!(Component::new().render_document(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn template_render_document_is_the_full_design() {
        let mut template = Template::new();
        template.frame.width = 1080.0;
        let document = template.render_document().unwrap();
        assert_eq!(document["id"], template.id.as_str());
        assert_eq!(document["frame"]["width"], 1080.0);
        assert!(document["layers"].is_array());
    }

    #[test]
    fn blank_frame_unit_decodes_as_unset() {
        let frame: Frame =
            serde_json::from_str(r#"{"width":10,"height":20,"unit":"","visibility":""}"#).unwrap();
        assert_eq!(frame.unit, None);
        assert_eq!(frame.visibility, None);

        let err = serde_json::from_str::<Frame>(r#"{"unit":"mm"}"#).unwrap_err();
        assert!(err.to_string().contains("mm"));
    }

    #[test]
    fn frame_enums_parse_their_wire_names() {
        assert_eq!(FrameUnit::parse("in"), Some(FrameUnit::In));
        assert_eq!(FrameUnit::parse("mm"), None);
        assert_eq!(
            FrameVisibility::parse(FrameVisibility::Public.as_str()),
            Some(FrameVisibility::Public)
        );
    }
}
