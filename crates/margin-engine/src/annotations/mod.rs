//! Notes anchored to ranges of a document's flat-offset space.
//!
//! An annotation does not own the text it points at. The store only keeps
//! ranges consistent by dropping annotations whose text has been deleted;
//! see [`listener`] for how deletions are detected.

pub mod listener;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::FlatRange;

/// Body of the annotation stored when a fact-check request fails
pub const FACT_CHECK_FAILED: &str =
    "Fact check failed. Please make sure the backend server is running.";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Annotation id already in use: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    /// Annotation body
    pub text: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    /// Copy of the covered text at creation time
    pub anchor_text: String,
    pub range: FlatRange,
}

impl Annotation {
    /// A manual comment
    pub fn comment(
        text: impl Into<String>,
        author: impl Into<String>,
        anchor_text: impl Into<String>,
        range: FlatRange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            author: author.into(),
            confidence: None,
            sources: None,
            created_at,
            anchor_text: anchor_text.into(),
            range,
        }
    }

    /// An AI fact-check result. Confidence is clamped into `[0, 1]`.
    pub fn fact_check(
        result: impl Into<String>,
        confidence: f64,
        sources: Option<Vec<String>>,
        author: impl Into<String>,
        anchor_text: impl Into<String>,
        range: FlatRange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            confidence: Some(clamp_confidence(confidence)),
            sources,
            ..Self::comment(result, author, anchor_text, range, created_at)
        }
    }

    /// Visible record of a failed fact-check request
    pub fn fact_check_failed(
        author: impl Into<String>,
        anchor_text: impl Into<String>,
        range: FlatRange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::fact_check(
            FACT_CHECK_FAILED,
            0.0,
            None,
            author,
            anchor_text,
            range,
            created_at,
        )
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Annotations of the open document, in insertion order
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, annotation: Annotation) -> Result<(), AnnotationError> {
        if self.get(&annotation.id).is_some() {
            return Err(AnnotationError::DuplicateId(annotation.id));
        }
        self.annotations.push(annotation);
        Ok(())
    }

    /// Remove by id; `None` if no such annotation
    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(index))
    }

    /// Drop every annotation whose range overlaps `deleted`, returning them.
    ///
    /// Overlap is open-interval, so annotations that merely touch the
    /// deleted range are kept.
    pub fn prune_overlapping(&mut self, deleted: FlatRange) -> Vec<Annotation> {
        let (pruned, kept) = std::mem::take(&mut self.annotations)
            .into_iter()
            .partition(|annotation| annotation.range.overlaps(&deleted));
        self.annotations = kept;
        pruned
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}
