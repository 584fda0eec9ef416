//! The shared artifact shape: a circuit plus metadata, and its gallery entry.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A circuit published to the content store.
///
/// `id` is assigned by the store and is not part of the stored bytes, so
/// identical content always hashes to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCircuit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub code: String,
}

impl SharedCircuit {
    /// A new unpublished circuit stamped with the current time.
    pub fn new(title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            author: String::new(),
            created_at: Utc::now(),
            tags: BTreeSet::new(),
            code: code.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Canonical stored bytes: the artifact without its identifier.
    pub fn content_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut content = self.clone();
        content.id = None;
        serde_json::to_vec(&content)
    }

    /// Copy of this artifact carrying `id`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A published circuit as listed in the gallery, with popularity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
}

impl GalleryEntry {
    /// A fresh entry with zeroed counters. `id` is the artifact's content id.
    pub fn from_circuit(id: impl Into<String>, circuit: &SharedCircuit) -> Self {
        Self {
            id: id.into(),
            title: circuit.title.clone(),
            description: circuit.description.clone(),
            author: circuit.author.clone(),
            created_at: circuit.created_at,
            tags: circuit.tags.clone(),
            code: circuit.code.clone(),
            views: 0,
            likes: 0,
        }
    }

    /// Replace the artifact fields, keeping the counters.
    pub fn update_from(&mut self, circuit: &SharedCircuit) {
        self.title = circuit.title.clone();
        self.description = circuit.description.clone();
        self.author = circuit.author.clone();
        self.created_at = circuit.created_at;
        self.tags = circuit.tags.clone();
        self.code = circuit.code.clone();
    }

    pub fn popularity(&self) -> u64 {
        self.views.saturating_add(self.likes)
    }

    /// Case-insensitive substring match over title, description and tags.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}
