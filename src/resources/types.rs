//! Wire types for the resources feature.
//!
//! All types serialise with camelCase member names and omit absent optional
//! members, matching what `resources/*` clients expect.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// A resource listed by `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    /// URI uniquely identifying the resource.
    pub uri: String,

    /// Human-readable name.
    pub name: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Optional size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ResourceItem {
    /// Creates a resource with only the required members.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            size: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the size in bytes.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// A parameterised resource advertised by `resources/templates/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    /// RFC 6570 URI template.
    pub uri_template: String,

    /// Human-readable name.
    pub name: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional MIME type of resources produced from the template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    /// Creates a template with only the required members.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One content block returned by `resources/read`.
///
/// Exactly one of `text` and `blob` is set, via [`ResourceContent::text`]
/// or [`ResourceContent::binary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    /// URI of the resource this content belongs to.
    pub uri: String,

    /// Optional MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Base64-encoded binary content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContent {
    /// Creates text content, defaulting the MIME type to `text/plain`.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: Some(text.into()),
            blob: None,
        }
    }

    /// Creates binary content from raw bytes, base64-encoding them and
    /// defaulting the MIME type to `application/octet-stream`.
    #[must_use]
    pub fn binary(uri: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("application/octet-stream".to_string()),
            text: None,
            blob: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }

    /// Replaces the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serialises_camel_case_and_skips_absent() {
        let item = ResourceItem::new("memo://greeting", "Greeting").with_mime_type("text/plain");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["uri"], "memo://greeting");
        assert_eq!(json["mimeType"], "text/plain");
        assert!(json.get("description").is_none());
        assert!(json.get("size").is_none());
    }

    #[test]
    fn template_serialises_uri_template_member() {
        let template = ResourceTemplate::new("memo://{name}", "Memo");
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["uriTemplate"], "memo://{name}");
        assert_eq!(json["name"], "Memo");
    }

    #[test]
    fn text_content_defaults_mime_type() {
        let content = ResourceContent::text("memo://greeting", "hello");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["mimeType"], "text/plain");
        assert_eq!(json["text"], "hello");
        assert!(json.get("blob").is_none());
    }

    #[test]
    fn binary_content_is_base64_encoded() {
        let content = ResourceContent::binary("data://raw", &[0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["mimeType"], "application/octet-stream");
        assert_eq!(json["blob"], "3q2+7w==");
        assert!(json.get("text").is_none());
    }
}
