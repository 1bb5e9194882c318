use std::time::{Duration, Instant};

use margin_engine::{
    EditOperation, EditorSession, EditorSettings, FilePageStorage, MemoryPageStorage, Page,
    PageStorage, PageUpdate, SaveOutcome, StorageError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Page storage that counts the updates it receives
#[derive(Default)]
struct CountingStorage {
    inner: MemoryPageStorage,
    updates: Vec<String>,
}

impl PageStorage for CountingStorage {
    fn list(&self) -> Result<Vec<Page>, StorageError> {
        self.inner.list()
    }

    fn get(&self, id: &str) -> Result<Page, StorageError> {
        self.inner.get(id)
    }

    fn get_by_share_token(&self, token: &str) -> Result<Page, StorageError> {
        self.inner.get_by_share_token(token)
    }

    fn create(&mut self, title: &str) -> Result<Page, StorageError> {
        self.inner.create(title)
    }

    fn update(&mut self, id: &str, update: PageUpdate) -> Result<Page, StorageError> {
        self.updates.push(id.to_string());
        self.inner.update(id, update)
    }

    fn delete(&mut self, id: &str) -> Result<(), StorageError> {
        self.inner.delete(id)
    }

    fn set_public(&mut self, id: &str) -> Result<String, StorageError> {
        self.inner.set_public(id)
    }

    fn unset_public(&mut self, id: &str) -> Result<(), StorageError> {
        self.inner.unset_public(id)
    }
}

const INTERVAL: Duration = Duration::from_millis(1000);

fn typing(at: usize, ch: char) -> EditOperation {
    EditOperation::InsertText {
        path: vec![0, 0],
        offset: at,
        text: ch.to_string(),
    }
}

fn open_blank(storage: &mut dyn PageStorage, settings: EditorSettings) -> (EditorSession, String) {
    let page = storage.create("Draft").unwrap();
    let page = storage
        .update(
            &page.id,
            PageUpdate::content(json!([{"type": "paragraph", "children": [{"text": ""}]}])),
        )
        .unwrap();
    let mut session = EditorSession::new(settings);
    session.open(&page);
    (session, page.id)
}

fn settings() -> EditorSettings {
    EditorSettings {
        save_interval: INTERVAL,
        ..EditorSettings::default()
    }
}

#[test]
fn burst_of_edits_saves_once() {
    let mut storage = CountingStorage::default();
    let (mut session, id) = open_blank(&mut storage, settings());
    storage.updates.clear();

    let start = Instant::now();
    for (i, ch) in "typing".chars().enumerate() {
        let now = start + Duration::from_millis(i as u64 * 150);
        session.apply(&typing(i, ch), now).unwrap();
        assert!(matches!(session.poll_save(now, &mut storage), SaveOutcome::Idle));
    }

    let last = start + Duration::from_millis(5 * 150);
    for tick in 1..=30 {
        session.poll_save(last + Duration::from_millis(tick * 100), &mut storage);
    }

    assert_eq!(storage.updates, vec![id.clone()]);
    assert_eq!(
        storage.get(&id).unwrap().content,
        json!([{"type": "paragraph", "children": [{"text": "typing"}]}])
    );
}

#[test]
fn switching_page_cancels_pending_save() {
    let mut storage = CountingStorage::default();
    let (mut session, _first) = open_blank(&mut storage, settings());
    let second = storage.create("Second").unwrap();
    storage.updates.clear();

    let start = Instant::now();
    session.apply(&typing(0, 'x'), start).unwrap();
    session.open(&second);

    assert!(matches!(
        session.poll_save(start + INTERVAL * 3, &mut storage),
        SaveOutcome::Idle
    ));
    assert!(storage.updates.is_empty());
}

#[test]
fn closing_cancels_pending_save() {
    let mut storage = CountingStorage::default();
    let (mut session, _id) = open_blank(&mut storage, settings());
    storage.updates.clear();

    let start = Instant::now();
    session.apply(&typing(0, 'x'), start).unwrap();
    session.close();

    session.poll_save(start + INTERVAL * 3, &mut storage);
    assert!(storage.updates.is_empty());
    assert_eq!(session.page_id(), None);
}

#[test]
fn read_only_session_never_saves() {
    let mut storage = CountingStorage::default();
    let read_only = EditorSettings {
        read_only: true,
        ..settings()
    };
    let (mut session, _id) = open_blank(&mut storage, read_only);
    storage.updates.clear();

    let start = Instant::now();
    assert!(session.apply(&typing(0, 'x'), start).is_err());
    session.poll_save(start + INTERVAL * 3, &mut storage);
    assert!(session.save_now(&mut storage).unwrap().is_none());

    assert!(storage.updates.is_empty());
}

#[test]
fn saves_land_in_page_files() {
    let pages_dir = tempfile::tempdir().unwrap();
    let mut storage = FilePageStorage::open(pages_dir.path()).unwrap();
    let (mut session, id) = open_blank(&mut storage, settings());

    let start = Instant::now();
    session.apply(&typing(0, 'h'), start).unwrap();
    session.apply(&typing(1, 'i'), start).unwrap();

    let outcome = session.poll_save(start + INTERVAL, &mut storage);
    assert!(matches!(outcome, SaveOutcome::Saved(_)));

    let reopened = FilePageStorage::open(pages_dir.path()).unwrap();
    assert_eq!(
        reopened.get(&id).unwrap().content,
        json!([{"type": "paragraph", "children": [{"text": "hi"}]}])
    );
}
