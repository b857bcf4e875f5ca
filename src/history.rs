//! History - Saved Icons of the Current Process
//!
//! At most one entry per id. Kept newest-first; updates stay where they are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::compositor::SourceImage;
use crate::label::LabelText;
use crate::region::CropRegion;

/// Opaque entry identifier, assigned at first save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(String);

impl HistoryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HistoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Everything needed to show an entry and reopen it for editing.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub source: SourceImage,
    pub artifact: Artifact,
    pub label: LabelText,
    pub crop: CropRegion,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub source: SourceImage,
    pub artifact: Artifact,
    pub label: LabelText,
    pub crop: CropRegion,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            id: self.id.clone(),
            label: self.label.clone(),
            crop: self.crop,
            created_at: self.created_at,
            source_sha256: self.source.sha256().to_string(),
            artifact_sha256: self.artifact.sha256().to_string(),
            preview_url: self.artifact.to_data_url(),
        }
    }
}

/// Serializable view for list rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: HistoryId,
    pub label: LabelText,
    pub crop: CropRegion,
    pub created_at: DateTime<Utc>,
    pub source_sha256: String,
    pub artifact_sha256: String,
    pub preview_url: String,
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert. An id already present is replaced in place; no id (or an id
    /// not present) inserts at the front. Returns the entry's id.
    pub fn save(&mut self, id: Option<HistoryId>, record: HistoryRecord) -> HistoryId {
        let id = id.unwrap_or_else(HistoryId::generate);
        let entry = HistoryEntry {
            id: id.clone(),
            source: record.source,
            artifact: record.artifact,
            label: record.label,
            crop: record.crop,
            created_at: Utc::now(),
        };

        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => {
                tracing::debug!("Updated history entry {}", id);
                *existing = entry;
            }
            None => {
                tracing::debug!("Added history entry {}", id);
                self.entries.insert(0, entry);
            }
        }
        id
    }

    /// Remove the entry with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: &HistoryId) -> bool {
        match self.entries.iter().position(|e| &e.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &HistoryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn summaries(&self) -> Vec<HistorySummary> {
        self.entries.iter().map(HistoryEntry::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
