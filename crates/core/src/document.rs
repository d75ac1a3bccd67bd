//! Document-format (BSON) codec for layers and designs.
//!
//! The document store keys records by `_id` rather than `id`. The BSON
//! serializer has no field-splatting for a payload chosen at runtime, so a
//! layer is encoded as its header document with the separately encoded
//! payload document merged in as siblings.

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::design::Design;
use crate::error::CodecError;
use crate::layer::{Layer, LayerHeader, Payload};

/// Identity key used by the document store.
pub const DOCUMENT_ID: &str = "_id";

const JSON_ID: &str = "id";
const OBJECTS: &str = "objects";
const LAYERS: &str = "layers";

/// Encode a layer as one flat document.
pub fn layer_to_document(layer: &Layer) -> Result<Document, CodecError> {
    let header = bson::to_document(&layer.header())?;

    let mut document = Document::new();
    document.insert(DOCUMENT_ID, Bson::String(layer.base.id.clone()));
    for (key, value) in header {
        if key != JSON_ID {
            document.insert(key, value);
        }
    }

    match &layer.payload {
        Payload::Group(group) => {
            let children = group
                .objects
                .iter()
                .map(|child| layer_to_document(child).map(Bson::Document))
                .collect::<Result<Vec<_>, _>>()?;
            document.insert(OBJECTS, Bson::Array(children));
        }
        payload => {
            for (key, value) in bson::to_document(payload)? {
                document.insert(key, value);
            }
        }
    }

    Ok(document)
}

/// Decode a layer document, resolving its kind from the header pass.
pub fn layer_from_document(document: &Document) -> Result<Layer, CodecError> {
    let record = rename_key(document, DOCUMENT_ID, JSON_ID);

    let header: LayerHeader = bson::from_document(record.clone())?;
    let kind = header.resolve_kind()?;
    let mut payload = Payload::decode_shape(kind, bson::Deserializer::new(Bson::Document(record)))?;

    if let Payload::Group(group) = &mut payload {
        group.objects = match document.get(OBJECTS) {
            None | Some(Bson::Null) => Vec::new(),
            Some(Bson::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(child) => layer_from_document(child),
                    other => Err(CodecError::Malformed(format!(
                        "group object must be a document, got {:?}",
                        other.element_type()
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(CodecError::Malformed(
                    "group objects must be an array".into(),
                ))
            }
        };
    }

    Ok(Layer {
        base: header.base,
        group: header.group,
        payload,
    })
}

/// Encode a whole design; layers go through the layer codec.
pub fn design_to_document<D: Design + Serialize>(design: &D) -> Result<Document, CodecError> {
    let mut encoded = bson::to_document(design)?;
    encoded.remove(LAYERS);

    let mut document = Document::new();
    document.insert(DOCUMENT_ID, Bson::String(design.id().to_string()));
    for (key, value) in encoded {
        if key != JSON_ID {
            document.insert(key, value);
        }
    }

    let layers = design
        .layers()
        .iter()
        .map(|layer| layer_to_document(layer).map(Bson::Document))
        .collect::<Result<Vec<_>, _>>()?;
    document.insert(LAYERS, Bson::Array(layers));

    Ok(document)
}

/// Decode a design document produced by [`design_to_document`].
pub fn design_from_document<D>(document: &Document) -> Result<D, CodecError>
where
    D: Design + DeserializeOwned,
{
    let mut record = rename_key(document, DOCUMENT_ID, JSON_ID);
    let layers = match record.remove(LAYERS) {
        None | Some(Bson::Null) => Vec::new(),
        Some(Bson::Array(items)) => items
            .iter()
            .map(|item| match item {
                Bson::Document(layer) => layer_from_document(layer),
                _ => Err(CodecError::Malformed("layer must be a document".into())),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(CodecError::Malformed("layers must be an array".into())),
    };

    let mut design = D::deserialize(bson::Deserializer::new(Bson::Document(record)))?;
    *design.layers_mut() = layers;
    Ok(design)
}

impl Layer {
    pub fn to_document(&self) -> Result<Document, CodecError> {
        layer_to_document(self)
    }

    pub fn from_document(document: &Document) -> Result<Self, CodecError> {
        layer_from_document(document)
    }
}

macro_rules! design_document_codec {
    ($($design:ty),+) => {$(
        impl $design {
            pub fn to_document(&self) -> Result<Document, CodecError> {
                design_to_document(self)
            }

            pub fn from_document(document: &Document) -> Result<Self, CodecError> {
                design_from_document(document)
            }
        }
    )+};
}

design_document_codec!(
    crate::design::Template,
    crate::design::Project,
    crate::design::Component
);

fn rename_key(document: &Document, from: &str, to: &str) -> Document {
    let mut renamed = Document::new();
    for (key, value) in document {
        let key = if key == from { to } else { key.as_str() };
        renamed.insert(key, value.clone());
    }
    renamed
}
