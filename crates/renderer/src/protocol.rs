//! Renderer wire types.

use base64ct::{Base64, Encoding};
use layerhub_core::error::RenderError;
use layerhub_core::render::RenderParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request written to the renderer socket.
#[derive(Debug, Serialize)]
pub struct RenderRequest<'a> {
    pub template: &'a Value,
    pub params: &'a RenderParams,
}

/// Response read back from the renderer socket.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderResponse {
    pub error: String,
    /// Standard base64 (padded) PNG.
    pub image: String,
}

impl RenderResponse {
    /// The decoded image, or the renderer's error.
    pub fn into_image(self) -> Result<Vec<u8>, RenderError> {
        if !self.error.is_empty() {
            return Err(RenderError::Renderer(self.error));
        }
        if self.image.is_empty() {
            return Err(RenderError::Image("response carried no image".into()));
        }
        Base64::decode_vec(&self.image).map_err(|e| RenderError::Image(e.to_string()))
    }
}

pub fn encode_request(document: &Value, params: &RenderParams) -> Result<Vec<u8>, RenderError> {
    serde_json::to_vec(&RenderRequest {
        template: document,
        params,
    })
    .map_err(RenderError::Encode)
}

/// Decode the first JSON value of a response; trailing bytes are ignored.
pub fn decode_response(bytes: &[u8]) -> Result<Vec<u8>, RenderError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    RenderResponse::deserialize(&mut deserializer)
        .map_err(RenderError::Decode)?
        .into_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn request_shape() {
        let document = json!({ "id": "temp_1", "layers": [] });
        let mut params = RenderParams::new();
        params.insert("name".into(), json!("Ada"));

        let body = encode_request(&document, &params).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "template": document, "params": { "name": "Ada" } }));
    }

    #[test]
    fn empty_params_encode_as_object() {
        let body = encode_request(&json!({}), &RenderParams::new()).unwrap();
        assert_eq!(body, br#"{"template":{},"params":{}}"#);
    }

    #[test]
    fn decodes_image() {
        let image = Base64::encode_string(b"\x89PNG fake");
        let response = json!({ "error": "", "image": image }).to_string();
        assert_eq!(decode_response(response.as_bytes()).unwrap(), b"\x89PNG fake");
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let image = Base64::encode_string(b"png");
        let response = format!("{{\"image\":\"{image}\"}}\n");
        assert_eq!(decode_response(response.as_bytes()).unwrap(), b"png");
    }

    #[test]
    fn renderer_error_wins() {
        let response = br#"{"error":"unknown font","image":""}"#;
        assert_matches!(
            decode_response(response),
            Err(RenderError::Renderer(message)) if message == "unknown font"
        );
    }

    #[test]
    fn invalid_base64_is_an_image_error() {
        let response = br#"{"error":"","image":"not base64!"}"#;
        assert_matches!(decode_response(response), Err(RenderError::Image(_)));
    }

    #[test]
    fn empty_response_is_a_decode_error() {
        assert_matches!(decode_response(b""), Err(RenderError::Decode(_)));
    }
}
