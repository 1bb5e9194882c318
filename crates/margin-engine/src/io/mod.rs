use crate::models::{Page, PageUpdate};
use crate::services::{PageStorage, StorageError, sort_by_recent};
use chrono::Utc;
use log::debug;
use relative_path::RelativePathBuf;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Pages stored as one `<id>.json` file each in a single directory
#[derive(Debug, Clone)]
pub struct FilePageStorage {
    root: PathBuf,
}

impl FilePageStorage {
    /// Open an existing pages directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        validate_pages_dir(&root)?;
        Ok(Self { root })
    }

    /// Open a pages directory, creating it if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a page file, relative to the pages directory.
    ///
    /// Ids must be uuids so that an id can never address a file outside the
    /// directory.
    fn page_path(id: &str) -> Result<RelativePathBuf, StorageError> {
        Uuid::parse_str(id).map_err(|_| StorageError::InvalidId(id.to_string()))?;
        Ok(RelativePathBuf::from(format!("{id}.json")))
    }

    fn read_page(&self, id: &str) -> Result<Page, StorageError> {
        let absolute_path = Self::page_path(id)?.to_path(&self.root);
        if !absolute_path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&absolute_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_page(&self, page: &Page) -> Result<(), StorageError> {
        let absolute_path = Self::page_path(&page.id)?.to_path(&self.root);
        let content = serde_json::to_string_pretty(page)?;
        fs::write(&absolute_path, content)?;
        Ok(())
    }

    fn modify<T>(
        &mut self,
        id: &str,
        change: impl FnOnce(&mut Page) -> T,
    ) -> Result<(Page, T), StorageError> {
        let mut page = self.read_page(id)?;
        let out = change(&mut page);
        self.write_page(&page)?;
        Ok((page, out))
    }

    fn scan_pages(&self) -> Result<Vec<Page>, StorageError> {
        let mut pages = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Page>(&content) {
                Ok(page) => pages.push(page),
                Err(e) => debug!("Skipping unreadable page file {}: {e}", path.display()),
            }
        }
        Ok(pages)
    }
}

impl PageStorage for FilePageStorage {
    fn list(&self) -> Result<Vec<Page>, StorageError> {
        let mut pages = self.scan_pages()?;
        sort_by_recent(&mut pages);
        Ok(pages)
    }

    fn get(&self, id: &str) -> Result<Page, StorageError> {
        self.read_page(id)
    }

    fn get_by_share_token(&self, token: &str) -> Result<Page, StorageError> {
        self.scan_pages()?
            .into_iter()
            .find(|page| page.is_shared_as(token))
            .ok_or_else(|| StorageError::SharedNotFound(token.to_string()))
    }

    fn create(&mut self, title: &str) -> Result<Page, StorageError> {
        let page = Page::new(title, Utc::now());
        self.write_page(&page)?;
        Ok(page)
    }

    fn update(&mut self, id: &str, update: PageUpdate) -> Result<Page, StorageError> {
        let (page, ()) = self.modify(id, |page| page.apply_update(update, Utc::now()))?;
        Ok(page)
    }

    fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        let absolute_path = Self::page_path(id)?.to_path(&self.root);
        if !absolute_path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        fs::remove_file(&absolute_path)?;
        Ok(())
    }

    fn set_public(&mut self, id: &str) -> Result<String, StorageError> {
        let (_, token) = self.modify(id, |page| page.publish(Utc::now()))?;
        Ok(token)
    }

    fn unset_public(&mut self, id: &str) -> Result<(), StorageError> {
        self.modify(id, |page| page.unpublish(Utc::now()))?;
        Ok(())
    }
}

pub fn validate_pages_dir(path: &Path) -> Result<(), StorageError> {
    if !path.exists() || !path.is_dir() {
        return Err(StorageError::InvalidStorageDir(path.to_path_buf()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::create_test_pages_dir;
    use serde_json::json;

    #[test]
    fn test_create_writes_page_file() {
        // Given an empty pages directory
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();

        // When creating a page
        let page = storage.create("Notes").unwrap();

        // Then it is stored under its id
        let file = pages_dir.path().join(format!("{}.json", page.id));
        assert!(file.exists());
        assert_eq!(storage.get(&page.id).unwrap(), page);
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let result = FilePageStorage::open("/this/path/does/not/exist");
        assert!(matches!(result, Err(StorageError::InvalidStorageDir(_))));
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let pages_dir = create_test_pages_dir();
        let nested = pages_dir.path().join("a").join("b");

        let storage = FilePageStorage::create(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_update_persists_content() {
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
        let page = storage.create("Notes").unwrap();

        let content = json!([{"type": "paragraph", "children": [{"text": "saved"}]}]);
        storage
            .update(&page.id, PageUpdate::content(content.clone()))
            .unwrap();

        // A second handle on the same directory sees the change
        let reopened = FilePageStorage::open(pages_dir.path()).unwrap();
        let stored = reopened.get(&page.id).unwrap();
        assert_eq!(stored.content, content);
        assert_eq!(stored.title, "Notes");
    }

    #[test]
    fn test_ids_that_are_not_uuids_are_rejected() {
        let pages_dir = create_test_pages_dir();
        let storage = FilePageStorage::open(pages_dir.path()).unwrap();

        for id in ["../secrets", "notes", ""] {
            assert!(matches!(storage.get(id), Err(StorageError::InvalidId(_))));
        }
    }

    #[test]
    fn test_unknown_page_is_not_found() {
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
        let id = Uuid::new_v4().to_string();

        assert!(matches!(storage.get(&id), Err(StorageError::NotFound(_))));
        assert!(matches!(storage.delete(&id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
        storage.create("Real").unwrap();
        std::fs::write(pages_dir.path().join("notes.md"), "# not a page").unwrap();
        std::fs::write(pages_dir.path().join("broken.json"), "{").unwrap();

        let pages = storage.list().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Real");
    }

    #[test]
    fn test_share_round_trip() {
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
        let page = storage.create("Public").unwrap();

        let token = storage.set_public(&page.id).unwrap();
        assert_eq!(storage.get_by_share_token(&token).unwrap().id, page.id);

        storage.unset_public(&page.id).unwrap();
        assert!(matches!(
            storage.get_by_share_token(&token),
            Err(StorageError::SharedNotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_file() {
        let pages_dir = create_test_pages_dir();
        let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
        let page = storage.create("Gone").unwrap();

        storage.delete(&page.id).unwrap();
        assert!(storage.list().unwrap().is_empty());
    }
}
