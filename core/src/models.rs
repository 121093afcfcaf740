//! Registry of the models exposed by the Prodex API.
//!
//! # Design
//! The registry is a closed, immutable table. `Endpoint::resolve` is the
//! guard every model-scoped operation goes through first: it either returns
//! a validated handle carrying the endpoint path segment or fails with
//! `UnknownModel` before anything else runs.

use crate::error::{ApiError, Result};

/// Logical model names paired with their REST path segment, sorted by name.
pub const MODELS: &[(&str, &str)] = &[
    ("Asset", "assets"),
    ("AssetType", "asset-types"),
    ("Group", "groups"),
    ("Note", "notes"),
    ("Playlist", "playlists"),
    ("Project", "projects"),
    ("Sequence", "sequences"),
    ("Shot", "shots"),
    ("Status", "status"),
    ("Step", "steps"),
    ("Tag", "tags"),
    ("Task", "tasks"),
    ("User", "users"),
    ("Version", "versions"),
];

/// A model name that has been checked against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    model: &'static str,
    path: &'static str,
}

impl Endpoint {
    pub fn resolve(model: &str) -> Result<Self> {
        MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(model, path)| Endpoint { model, path })
            .ok_or_else(|| ApiError::UnknownModel {
                model: model.to_string(),
                allowed: model_names().map(str::to_string).collect(),
            })
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

pub fn model_names() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|(name, _)| *name)
}
