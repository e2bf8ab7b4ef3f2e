//! Model response payload variants.

use serde::{Deserialize, Serialize};

/// The payload of one model response.
///
/// Providers answer with either plain text or a structured mapping (the
/// function-call style of response). Each variant has an explicit renderer;
/// callers never inspect the shape at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelResponse {
    PlainText(String),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl ModelResponse {
    /// Render the response as the text that enters the conversation.
    ///
    /// Plain text passes through verbatim; structured payloads render as
    /// canonical JSON so they survive the checkpoint round-trip unchanged.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            ModelResponse::PlainText(text) => text.clone(),
            ModelResponse::Structured(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| String::new())
            }
        }
    }

    /// True when the rendered response carries no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ModelResponse::PlainText(text) => text.trim().is_empty(),
            ModelResponse::Structured(map) => map.is_empty(),
        }
    }
}

impl From<&str> for ModelResponse {
    fn from(text: &str) -> Self {
        ModelResponse::PlainText(text.to_string())
    }
}

impl From<String> for ModelResponse {
    fn from(text: String) -> Self {
        ModelResponse::PlainText(text)
    }
}

#[cfg(test)]
mod tests {
    use super::ModelResponse;

    #[test]
    fn plain_text_renders_verbatim() {
        let resp = ModelResponse::from("keep\n  indentation\n");
        assert_eq!(resp.render(), "keep\n  indentation\n");
    }

    #[test]
    fn structured_renders_as_json() {
        let mut map = serde_json::Map::new();
        map.insert("files".to_string(), serde_json::json!(["a.rs"]));
        let resp = ModelResponse::Structured(map);
        assert_eq!(resp.render(), r#"{"files":["a.rs"]}"#);
    }

    #[test]
    fn emptiness_per_variant() {
        assert!(ModelResponse::from("   ").is_empty());
        assert!(ModelResponse::Structured(serde_json::Map::new()).is_empty());
        assert!(!ModelResponse::from("x").is_empty());
    }
}
