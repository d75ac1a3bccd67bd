//! Layer tagged union and its JSON codec.
//!
//! A [`Layer`] is a [`BaseLayer`] plus [`GroupMetadata`] plus exactly one
//! [`Payload`]. The kind is never stored separately: it is derived from the
//! payload, so a layer whose kind and payload disagree cannot exist.
//!
//! On the wire a layer is one flat object: the `type` discriminator, the
//! base fields, the group metadata and the payload fields are all
//! siblings. Decoding therefore reads the record twice: once for the
//! header (base + group + `type`) and, after the kind is resolved, once
//! more for the payload shape of that kind.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::types::null_as_default;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// Closed set of layer kinds that carry a payload.
///
/// The editor vocabulary also knows `StaticGroup`, `DynamicGroup`,
/// `DynamicPath` and `Frame`; those have no payload here and are rejected
/// by [`LayerKind::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    StaticText,
    DynamicText,
    StaticImage,
    DynamicImage,
    StaticVideo,
    StaticAudio,
    StaticVector,
    StaticPath,
    Background,
    Group,
}

impl LayerKind {
    pub const ALL: [LayerKind; 10] = [
        LayerKind::StaticText,
        LayerKind::DynamicText,
        LayerKind::StaticImage,
        LayerKind::DynamicImage,
        LayerKind::StaticVideo,
        LayerKind::StaticAudio,
        LayerKind::StaticVector,
        LayerKind::StaticPath,
        LayerKind::Background,
        LayerKind::Group,
    ];

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::StaticText => "StaticText",
            LayerKind::DynamicText => "DynamicText",
            LayerKind::StaticImage => "StaticImage",
            LayerKind::DynamicImage => "DynamicImage",
            LayerKind::StaticVideo => "StaticVideo",
            LayerKind::StaticAudio => "StaticAudio",
            LayerKind::StaticVector => "StaticVector",
            LayerKind::StaticPath => "StaticPath",
            LayerKind::Background => "Background",
            LayerKind::Group => "Group",
        }
    }

    /// Resolve a wire name. Anything outside the closed set is an error.
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| CodecError::UnknownKind(name.to_string()))
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Shared attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Shadow {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub affect_stroke: bool,
    pub non_scaling: bool,
    pub enabled: bool,
}

/// Attributes every layer carries regardless of kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseLayer {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub top: f64,
    pub left: f64,
    pub angle: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub origin_x: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub origin_y: String,
    pub scale_x: f64,
    pub scale_y: f64,
    pub opacity: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub skew_x: f64,
    pub skew_y: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stroke: String,
    pub stroke_width: f64,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Map::is_empty", deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

/// Palette metadata for layers offered as reusable groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMetadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(rename = "previewURL", skip_serializing_if = "String::is_empty")]
    pub preview_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Typography shared by static and dynamic text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text_align: String,
    #[serde(rename = "fontURL", skip_serializing_if = "String::is_empty")]
    pub font_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub font_family: String,
    pub font_size: f64,
    /// Numeric (`700`) or named (`"bold"`), as the editor sends either.
    pub font_weight: Value,
    pub charspacing: f64,
    pub lineheight: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticTextProps {
    #[serde(flatten)]
    pub style: TextStyle,
    pub text: String,
}

/// A substitution slot of a dynamic text layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DynamicTextProps {
    #[serde(flatten)]
    pub style: TextStyle,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub key_values: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticImageProps {
    pub src: String,
    pub crop_x: f64,
    pub crop_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicImageProps {
    /// Substitution key resolved at render time.
    pub key: String,
}

/// Bounds may be seconds or timecode strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRange {
    pub from: Value,
    pub to: Value,
}

/// Payload of video and audio layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaProps {
    pub src: String,
    pub speed_factor: f64,
    /// Trim window of the source.
    pub between: TimeRange,
    /// Playback window on the timeline.
    pub cut: TimeRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticVectorProps {
    pub src: String,
    /// Logical color slot -> replacement color.
    #[serde(deserialize_with = "null_as_default")]
    pub color_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPathProps {
    /// Drawing commands, e.g. `["M", 0, 0]`.
    #[serde(deserialize_with = "null_as_default")]
    pub path: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundProps {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupProps {
    pub objects: Vec<Layer>,
}

/// Kind-specific layer content. Serializes as its inner struct so the
/// fields can be flattened next to the base attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    StaticText(StaticTextProps),
    DynamicText(DynamicTextProps),
    StaticImage(StaticImageProps),
    DynamicImage(DynamicImageProps),
    StaticVideo(MediaProps),
    StaticAudio(MediaProps),
    StaticVector(StaticVectorProps),
    StaticPath(StaticPathProps),
    Background(BackgroundProps),
    Group(GroupProps),
}

impl Payload {
    /// Empty payload for `kind`.
    pub fn empty(kind: LayerKind) -> Self {
        match kind {
            LayerKind::StaticText => Payload::StaticText(StaticTextProps::default()),
            LayerKind::DynamicText => Payload::DynamicText(DynamicTextProps::default()),
            LayerKind::StaticImage => Payload::StaticImage(StaticImageProps::default()),
            LayerKind::DynamicImage => Payload::DynamicImage(DynamicImageProps::default()),
            LayerKind::StaticVideo => Payload::StaticVideo(MediaProps::default()),
            LayerKind::StaticAudio => Payload::StaticAudio(MediaProps::default()),
            LayerKind::StaticVector => Payload::StaticVector(StaticVectorProps::default()),
            LayerKind::StaticPath => Payload::StaticPath(StaticPathProps::default()),
            LayerKind::Background => Payload::Background(BackgroundProps::default()),
            LayerKind::Group => Payload::Group(GroupProps::default()),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Payload::StaticText(_) => LayerKind::StaticText,
            Payload::DynamicText(_) => LayerKind::DynamicText,
            Payload::StaticImage(_) => LayerKind::StaticImage,
            Payload::DynamicImage(_) => LayerKind::DynamicImage,
            Payload::StaticVideo(_) => LayerKind::StaticVideo,
            Payload::StaticAudio(_) => LayerKind::StaticAudio,
            Payload::StaticVector(_) => LayerKind::StaticVector,
            Payload::StaticPath(_) => LayerKind::StaticPath,
            Payload::Background(_) => LayerKind::Background,
            Payload::Group(_) => LayerKind::Group,
        }
    }

    /// Decode the payload shape of `kind` from a full layer record.
    ///
    /// Fields belonging to the header are ignored. A group comes back with
    /// no children; callers decode `objects` themselves so each child goes
    /// through the layer codec of the same wire format.
    pub(crate) fn decode_shape<'de, D>(kind: LayerKind, record: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match kind {
            LayerKind::StaticText => Payload::StaticText(StaticTextProps::deserialize(record)?),
            LayerKind::DynamicText => Payload::DynamicText(DynamicTextProps::deserialize(record)?),
            LayerKind::StaticImage => Payload::StaticImage(StaticImageProps::deserialize(record)?),
            LayerKind::DynamicImage => {
                Payload::DynamicImage(DynamicImageProps::deserialize(record)?)
            }
            LayerKind::StaticVideo => Payload::StaticVideo(MediaProps::deserialize(record)?),
            LayerKind::StaticAudio => Payload::StaticAudio(MediaProps::deserialize(record)?),
            LayerKind::StaticVector => {
                Payload::StaticVector(StaticVectorProps::deserialize(record)?)
            }
            LayerKind::StaticPath => Payload::StaticPath(StaticPathProps::deserialize(record)?),
            LayerKind::Background => Payload::Background(BackgroundProps::deserialize(record)?),
            LayerKind::Group => Payload::Group(GroupProps::default()),
        })
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// A single canvas layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub base: BaseLayer,
    pub group: GroupMetadata,
    pub payload: Payload,
}

/// Header pass of the decode: everything except the payload.
#[derive(Deserialize)]
pub(crate) struct LayerHeader {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(flatten)]
    pub(crate) base: BaseLayer,
    #[serde(flatten)]
    pub(crate) group: GroupMetadata,
}

impl LayerHeader {
    pub(crate) fn resolve_kind(&self) -> Result<LayerKind, CodecError> {
        match self.kind.as_deref() {
            None | Some("") => Err(CodecError::MissingKind),
            Some(name) => LayerKind::parse(name),
        }
    }
}

/// Header fields for encoding, without the payload.
#[derive(Serialize)]
pub(crate) struct LayerHeaderRef<'a> {
    #[serde(flatten)]
    pub(crate) base: &'a BaseLayer,
    #[serde(rename = "type")]
    pub(crate) kind: LayerKind,
    #[serde(flatten)]
    pub(crate) group: &'a GroupMetadata,
}

#[derive(Serialize)]
struct FlatLayer<'a> {
    #[serde(flatten)]
    header: LayerHeaderRef<'a>,
    #[serde(flatten)]
    payload: &'a Payload,
}

impl Layer {
    /// Build a layer of `kind` with an empty payload.
    pub fn new(base: BaseLayer, kind: LayerKind) -> Self {
        Self {
            base,
            group: GroupMetadata::default(),
            payload: Payload::empty(kind),
        }
    }

    pub fn with_payload(base: BaseLayer, payload: Payload) -> Self {
        Self {
            base,
            group: GroupMetadata::default(),
            payload,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.payload.kind()
    }

    /// Nested layers of a group; empty for every other kind.
    pub fn children(&self) -> &[Layer] {
        match &self.payload {
            Payload::Group(group) => &group.objects,
            _ => &[],
        }
    }

    pub(crate) fn header(&self) -> LayerHeaderRef<'_> {
        LayerHeaderRef {
            base: &self.base,
            kind: self.kind(),
            group: &self.group,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_json_value(&value)
    }

    /// Decode a layer from an already-parsed JSON record.
    pub fn from_json_value(record: &Value) -> Result<Self, CodecError> {
        let header = LayerHeader::deserialize(record)?;
        let kind = header.resolve_kind()?;
        let mut payload = Payload::decode_shape(kind, record)?;

        if let Payload::Group(group) = &mut payload {
            group.objects = match record.get("objects") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(Layer::from_json_value)
                    .collect::<Result<_, _>>()?,
                Some(_) => {
                    return Err(CodecError::Malformed(
                        "group objects must be an array".into(),
                    ))
                }
            };
        }

        Ok(Self {
            base: header.base,
            group: header.group,
            payload,
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FlatLayer {
            header: self.header(),
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Value::deserialize(deserializer)?;
        Layer::from_json_value(&record).map_err(de::Error::custom)
    }
}

/// Mutable access to every static image in `layers`, including those
/// nested inside groups.
pub fn static_images_mut(layers: &mut [Layer]) -> Vec<&mut StaticImageProps> {
    fn collect<'a>(layers: &'a mut [Layer], out: &mut Vec<&'a mut StaticImageProps>) {
        for layer in layers {
            match &mut layer.payload {
                Payload::StaticImage(props) => out.push(props),
                Payload::Group(group) => collect(&mut group.objects, out),
                _ => {}
            }
        }
    }

    let mut images = Vec::new();
    collect(layers, &mut images);
    images
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
