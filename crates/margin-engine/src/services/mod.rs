//! Collaborators the editing core talks to: page storage and fact checking.

pub mod fact_check;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;

use crate::models::{Page, PageUpdate};

pub use fact_check::{FactCheckError, FactCheckResponse, FactChecker, FallbackFactChecker};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("No public page for share token: {0}")]
    SharedNotFound(String),
    #[error("Invalid page id: {0}")]
    InvalidId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid pages directory: {0}")]
    InvalidStorageDir(PathBuf),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Page persistence as seen by the editor
pub trait PageStorage {
    /// All pages, most recently updated first
    fn list(&self) -> Result<Vec<Page>, StorageError>;
    fn get(&self, id: &str) -> Result<Page, StorageError>;
    /// A page by share token; only public pages are returned
    fn get_by_share_token(&self, token: &str) -> Result<Page, StorageError>;
    fn create(&mut self, title: &str) -> Result<Page, StorageError>;
    fn update(&mut self, id: &str, update: PageUpdate) -> Result<Page, StorageError>;
    fn delete(&mut self, id: &str) -> Result<(), StorageError>;
    /// Publish a page, returning a freshly minted share token
    fn set_public(&mut self, id: &str) -> Result<String, StorageError>;
    fn unset_public(&mut self, id: &str) -> Result<(), StorageError>;
}

pub(crate) fn sort_by_recent(pages: &mut [Page]) {
    pages.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// In-process page store
#[derive(Debug, Clone, Default)]
pub struct MemoryPageStorage {
    pages: BTreeMap<String, Page>,
}

impl MemoryPageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing page, replacing any with the same id
    pub fn insert(&mut self, page: Page) {
        self.pages.insert(page.id.clone(), page);
    }

    fn page_mut(&mut self, id: &str) -> Result<&mut Page, StorageError> {
        self.pages
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}

impl PageStorage for MemoryPageStorage {
    fn list(&self) -> Result<Vec<Page>, StorageError> {
        let mut pages: Vec<Page> = self.pages.values().cloned().collect();
        sort_by_recent(&mut pages);
        Ok(pages)
    }

    fn get(&self, id: &str) -> Result<Page, StorageError> {
        self.pages
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn get_by_share_token(&self, token: &str) -> Result<Page, StorageError> {
        self.pages
            .values()
            .find(|page| page.is_shared_as(token))
            .cloned()
            .ok_or_else(|| StorageError::SharedNotFound(token.to_string()))
    }

    fn create(&mut self, title: &str) -> Result<Page, StorageError> {
        let page = Page::new(title, Utc::now());
        self.insert(page.clone());
        Ok(page)
    }

    fn update(&mut self, id: &str, update: PageUpdate) -> Result<Page, StorageError> {
        let page = self.page_mut(id)?;
        page.apply_update(update, Utc::now());
        Ok(page.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        self.pages
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn set_public(&mut self, id: &str) -> Result<String, StorageError> {
        Ok(self.page_mut(id)?.publish(Utc::now()))
    }

    fn unset_public(&mut self, id: &str) -> Result<(), StorageError> {
        self.page_mut(id)?.unpublish(Utc::now());
        Ok(())
    }
}
