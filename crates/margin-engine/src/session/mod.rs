//! The editing session: the one owner of the open page's state.
//!
//! Everything the editor mutates lives here and is passed in explicitly,
//! including time. Callers drive the session from their event loop:
//! edits and selections go in as they happen, and [`EditorSession::poll_save`]
//! is called periodically to flush debounced saves.

pub mod debounce;

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::{
    annotations::{Annotation, AnnotationError, AnnotationStore, listener},
    editing::{
        Cmd, Document, DocumentError, EditOperation, FlatRange, Patch, TreePosition,
        map_selection, slice_flat,
    },
    models::{Page, PageUpdate},
    services::{FactCheckError, FactCheckResponse, FactChecker, PageStorage, StorageError},
};

pub use debounce::SaveDebouncer;

/// Default idle interval before a change is saved
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub save_interval: Duration,
    pub read_only: bool,
    /// Author recorded on fact-check annotations
    pub ai_author: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            save_interval: DEFAULT_SAVE_INTERVAL,
            read_only: false,
            ai_author: "AI".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub anchor: TreePosition,
    pub focus: TreePosition,
    pub range: FlatRange,
}

/// Identifies the document state a fact-check request was issued against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheckTicket {
    page_id: Option<String>,
    generation: u64,
    request: u64,
}

/// A fact-check in flight: what was asked and where to anchor the answer
#[derive(Debug, Clone, PartialEq)]
pub struct FactCheckRequest {
    pub ticket: FactCheckTicket,
    pub text: String,
    pub range: FlatRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactCheckOutcome {
    Annotated(Annotation),
    /// The request failed; a failure annotation was stored in its place
    Failed(Annotation),
    /// The response arrived for a document that is no longer open, or for
    /// text that was deleted while the request was in flight
    Discarded,
}

#[derive(Debug)]
pub enum SaveOutcome {
    Idle,
    Saved(Page),
    Failed(StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is read-only")]
    ReadOnly,
    #[error("No text selected")]
    NoSelection,
    #[error("No page open")]
    NoPage,
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),
}

#[derive(Debug)]
pub struct EditorSession {
    settings: EditorSettings,
    page_id: Option<String>,
    document: Document,
    annotations: AnnotationStore,
    selection: Option<Selection>,
    debouncer: SaveDebouncer,
    generation: u64,
    /// Ranges of fact-checks in flight, by request number
    pending_checks: Vec<(u64, FlatRange)>,
    next_request: u64,
    last_error: Option<String>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl EditorSession {
    pub fn new(settings: EditorSettings) -> Self {
        let debouncer = SaveDebouncer::new(settings.save_interval, settings.read_only);
        Self {
            settings,
            page_id: None,
            document: Document::default(),
            annotations: AnnotationStore::new(),
            selection: None,
            debouncer,
            generation: 0,
            pending_checks: Vec::new(),
            next_request: 0,
            last_error: None,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Most recent collaborator failure, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.settings.read_only = read_only;
        self.debouncer.set_read_only(read_only);
    }

    /// Make `page` the active document, abandoning everything tied to the
    /// previous one
    pub fn open(&mut self, page: &Page) {
        self.reset();
        self.page_id = Some(page.id.clone());
        self.document = Document::from_persisted(&page.content);
        info!("Opened page {} ({})", page.id, page.title);
    }

    pub fn close(&mut self) {
        if let Some(id) = &self.page_id {
            info!("Closed page {id}");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.debouncer.cancel();
        self.annotations.clear();
        self.selection = None;
        self.page_id = None;
        self.document = Document::default();
        self.last_error = None;
        // Invalidates tickets of requests still in flight
        self.generation += 1;
        self.pending_checks.clear();
    }

    /// Apply an edit from the editing surface.
    ///
    /// Annotations over deleted text are pruned, as are fact-checks still
    /// in flight for it, and a save is scheduled. The selection is dropped;
    /// the surface reports a fresh one.
    pub fn apply(&mut self, op: &EditOperation, now: Instant) -> Result<Patch, SessionError> {
        if self.settings.read_only {
            return Err(SessionError::ReadOnly);
        }

        let deleted = listener::deleted_range(&self.document, op);
        let patch = self.document.apply(op)?;

        if let Some(range) = deleted {
            let pruned = self.annotations.prune_overlapping(range);
            if !pruned.is_empty() {
                debug!("Edit removed {} annotation(s)", pruned.len());
            }
            let in_flight = self.pending_checks.len();
            self.pending_checks
                .retain(|(_, pending)| !pending.overlaps(&range));
            if self.pending_checks.len() < in_flight {
                debug!(
                    "Edit invalidated {} pending fact-check(s)",
                    in_flight - self.pending_checks.len()
                );
            }
        }
        self.edited(now);
        Ok(patch)
    }

    /// Run a toolbar formatting command.
    ///
    /// Formatting restyles and regroups text without deleting any, so
    /// annotations and pending fact-checks are left alone.
    pub fn execute(&mut self, cmd: &Cmd, now: Instant) -> Result<Vec<Patch>, SessionError> {
        if self.settings.read_only {
            return Err(SessionError::ReadOnly);
        }

        let ops = self.document.compile(cmd)?;
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let patches = ops
            .iter()
            .map(|op| self.document.apply(op))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("{cmd:?} applied as {} operation(s)", patches.len());
        self.edited(now);
        Ok(patches)
    }

    fn edited(&mut self, now: Instant) {
        self.selection = None;
        if let Some(id) = &self.page_id {
            self.debouncer.touch(id, now);
        }
    }

    /// Record the current selection and return its flat range
    pub fn select(&mut self, anchor: TreePosition, focus: TreePosition) -> FlatRange {
        let range = map_selection(&self.document, &anchor, &focus);
        self.selection = Some(Selection {
            anchor,
            focus,
            range,
        });
        range
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn selected(&self) -> Result<(FlatRange, String), SessionError> {
        let range = match &self.selection {
            Some(selection) if !selection.range.is_empty() => selection.range,
            _ => return Err(SessionError::NoSelection),
        };
        let text = slice_flat(&self.document, range);
        if text.trim().is_empty() {
            return Err(SessionError::NoSelection);
        }
        Ok((range, text))
    }

    /// Capture the current selection as a fact-check request
    pub fn begin_fact_check(&mut self) -> Result<FactCheckRequest, SessionError> {
        let (range, text) = self.selected()?;
        self.next_request += 1;
        self.pending_checks.push((self.next_request, range));
        Ok(FactCheckRequest {
            ticket: FactCheckTicket {
                page_id: self.page_id.clone(),
                generation: self.generation,
                request: self.next_request,
            },
            text,
            range,
        })
    }

    /// Take `ticket` off the pending list, if it is still current
    fn settle(&mut self, ticket: &FactCheckTicket) -> bool {
        if ticket.page_id != self.page_id || ticket.generation != self.generation {
            return false;
        }
        match self
            .pending_checks
            .iter()
            .position(|(request, _)| *request == ticket.request)
        {
            Some(index) => {
                self.pending_checks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Store the answer to `request` as an annotation, unless the document
    /// it was issued against is no longer open
    pub fn complete_fact_check(
        &mut self,
        request: FactCheckRequest,
        result: Result<FactCheckResponse, FactCheckError>,
        now: DateTime<Utc>,
    ) -> Result<FactCheckOutcome, SessionError> {
        if !self.settle(&request.ticket) {
            debug!(
                "Discarding fact-check response for {:?}: document changed",
                request.ticket.page_id
            );
            return Ok(FactCheckOutcome::Discarded);
        }

        let author = self.settings.ai_author.clone();
        match result {
            Ok(response) => {
                let annotation = Annotation::fact_check(
                    response.result,
                    response.confidence,
                    response.sources,
                    author,
                    request.text,
                    request.range,
                    now,
                );
                self.annotations.add(annotation.clone())?;
                self.last_error = None;
                Ok(FactCheckOutcome::Annotated(annotation))
            }
            Err(e) => {
                warn!("Fact check failed: {e}");
                self.last_error = Some(e.to_string());
                let annotation =
                    Annotation::fact_check_failed(author, request.text, request.range, now);
                self.annotations.add(annotation.clone())?;
                Ok(FactCheckOutcome::Failed(annotation))
            }
        }
    }

    /// Fact-check the selection synchronously
    pub fn run_fact_check(
        &mut self,
        checker: &dyn FactChecker,
        now: DateTime<Utc>,
    ) -> Result<FactCheckOutcome, SessionError> {
        let request = self.begin_fact_check()?;
        let result = checker.fact_check(&request.text);
        self.complete_fact_check(request, result, now)
    }

    /// Attach a manual comment to the current selection
    pub fn add_comment(
        &mut self,
        body: &str,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<Annotation, SessionError> {
        let (range, text) = self.selected()?;
        let annotation = Annotation::comment(body, author, text, range, now);
        self.annotations.add(annotation.clone())?;
        Ok(annotation)
    }

    pub fn remove_annotation(&mut self, id: &str) -> Option<Annotation> {
        self.annotations.remove(id)
    }

    /// Save the document if its debounce interval has elapsed
    pub fn poll_save(&mut self, now: Instant, storage: &mut dyn PageStorage) -> SaveOutcome {
        let Some(id) = self.debouncer.due(now) else {
            return SaveOutcome::Idle;
        };
        if self.page_id.as_deref() != Some(id.as_str()) {
            debug!("Dropping save for inactive page {id}");
            return SaveOutcome::Idle;
        }
        self.save(&id, storage)
    }

    /// Cancel any pending countdown and save immediately
    pub fn save_now(&mut self, storage: &mut dyn PageStorage) -> anyhow::Result<Option<Page>> {
        self.debouncer.cancel();
        if self.settings.read_only {
            return Ok(None);
        }
        let Some(id) = self.page_id.clone() else {
            return Ok(None);
        };
        match self.save(&id, storage) {
            SaveOutcome::Saved(page) => Ok(Some(page)),
            SaveOutcome::Failed(e) => Err(e.into()),
            SaveOutcome::Idle => Ok(None),
        }
    }

    fn save(&mut self, id: &str, storage: &mut dyn PageStorage) -> SaveOutcome {
        match storage.update(id, PageUpdate::content(self.document.to_persisted())) {
            Ok(page) => {
                info!("Saved page {id}");
                self.last_error = None;
                SaveOutcome::Saved(page)
            }
            Err(e) => {
                warn!("Failed to save page {id}: {e}");
                self.last_error = Some(e.to_string());
                SaveOutcome::Failed(e)
            }
        }
    }
}
