//! ACP content blocks → internal prompt format. Grounded directly on
//! `original_source/acp/content_converter.py`'s `AcpToAmplifierContentConverter`;
//! the Python `isinstance` probes become a match over the typed
//! `agent_client_protocol::ContentBlock` enum (§9's design note).

use agent_client_protocol::{ContentBlock, EmbeddedResourceResource};
use serde_json::{Value, json};

const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];
const FALLBACK_TEXT: &str = "Please provide content with text or images.";
const AUDIO_UNSUPPORTED: &str = "Audio content is not currently supported.";
const RESOURCE_LINK_UNSUPPORTED: &str =
    "External resource links cannot be fetched. Please embed content directly.";

#[derive(Debug, Default)]
pub struct ConversionResult {
    pub blocks: Vec<Value>,
    pub text_prompt: String,
    pub warnings: Vec<String>,
}

impl ConversionResult {
    pub fn has_images(&self) -> bool {
        self.blocks.iter().any(|b| b.get("type").and_then(|t| t.as_str()) == Some("image"))
    }

    pub fn has_multimodal(&self) -> bool {
        self.has_images()
    }
}

/// Convert an ordered list of ACP content blocks into the internal prompt
/// format, per §4.3.
pub fn convert(blocks: &[ContentBlock]) -> ConversionResult {
    let mut result = ConversionResult::default();
    let mut text_parts = Vec::new();

    for block in blocks {
        process_block(block, &mut result.blocks, &mut text_parts, &mut result.warnings);
    }

    result.text_prompt = text_parts.join("\n").trim().to_string();

    if result.text_prompt.is_empty() && !result.has_images() {
        result.text_prompt = FALLBACK_TEXT.to_string();
    }

    result
}

fn process_block(block: &ContentBlock, out: &mut Vec<Value>, text_parts: &mut Vec<String>, warnings: &mut Vec<String>) {
    match block {
        ContentBlock::Text(text) => {
            out.push(json!({"type": "text", "text": text.text}));
            text_parts.push(text.text.clone());
        }
        ContentBlock::Image(image) => {
            if SUPPORTED_IMAGE_TYPES.contains(&image.mime_type.as_str()) {
                out.push(json!({
                    "type": "image",
                    "source": {"type": "base64", "media_type": image.mime_type, "data": image.data},
                }));
            } else {
                warnings.push(unsupported_image_warning(&image.mime_type));
            }
        }
        ContentBlock::Audio(_) => {
            warnings.push(AUDIO_UNSUPPORTED.to_string());
        }
        ContentBlock::ResourceLink(_) => {
            warnings.push(RESOURCE_LINK_UNSUPPORTED.to_string());
        }
        ContentBlock::Resource(embedded) => match &embedded.resource {
            EmbeddedResourceResource::TextResourceContents(text_res) => {
                let text = if !text_res.uri.is_empty() {
                    format!("[Resource: {}]\n{}", text_res.uri, text_res.text)
                } else {
                    text_res.text.clone()
                };
                out.push(json!({"type": "text", "text": text}));
                text_parts.push(text);
            }
            EmbeddedResourceResource::BlobResourceContents(blob_res) => {
                let mime = blob_res.mime_type.clone().unwrap_or_default();
                if SUPPORTED_IMAGE_TYPES.contains(&mime.as_str()) {
                    out.push(json!({
                        "type": "image",
                        "source": {"type": "base64", "media_type": mime, "data": blob_res.blob},
                    }));
                } else {
                    warnings.push(unsupported_image_warning(&mime));
                }
            }
        },
    }
}

fn unsupported_image_warning(mime_type: &str) -> String {
    format!(
        "Unsupported image type '{mime_type}'. Supported types: {}",
        SUPPORTED_IMAGE_TYPES.join(", ")
    )
}
