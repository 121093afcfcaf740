//! `multipart/form-data` encoding for writes that carry a thumbnail.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::Thumbnail;

pub(crate) const THUMBNAIL_FIELD: &str = "thumbnail";

/// Encode `data` plus the thumbnail file part.
///
/// Returns the content-type header value (with its boundary) and the body.
/// Array values become one part per element, objects are sent as JSON text.
/// Form encoding has no way to express an empty list, so an empty array
/// produces no part and the server keeps its current value for that field.
pub(crate) fn encode(data: &Map<String, Value>, thumbnail: &Thumbnail) -> (String, Vec<u8>) {
    let boundary = format!("prodex-{}", Uuid::new_v4().simple());
    let mut body = Vec::new();

    for (name, value) in data {
        if name == THUMBNAIL_FIELD {
            continue;
        }
        match value {
            Value::Array(items) if items.is_empty() => {
                tracing::warn!(field = %name, "empty list cannot be sent as form data, field omitted");
            }
            Value::Array(items) => {
                for item in items {
                    text_part(&mut body, &boundary, name, item);
                }
            }
            other => text_part(&mut body, &boundary, name, other),
        }
    }

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{THUMBNAIL_FIELD}\"; filename=\"{}\"\r\n",
            escape_quotes(&thumbnail.file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", thumbnail.content_type).as_bytes());
    body.extend_from_slice(&thumbnail.bytes);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn text_part(body: &mut Vec<u8>, boundary: &str, name: &str, value: &Value) {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape_quotes(name)).as_bytes());
    body.extend_from_slice(text.as_bytes());
    body.extend_from_slice(b"\r\n");
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "%22")
}
