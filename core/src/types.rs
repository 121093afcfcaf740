//! Values exchanged with the Prodex API beyond plain JSON records.
//!
//! Records themselves stay `serde_json::Value`: the set of fields depends on
//! the model and on the projection requested by the caller.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Outcome of the token exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

/// Credentials posted to the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// An image uploaded as the `thumbnail` field of a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Thumbnail {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a thumbnail from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ApiError::Thumbnail(format!("{} doesn't exist", path.display())));
        }
        let bytes = std::fs::read(path).map_err(|e| ApiError::Thumbnail(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "thumbnail".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
