//! In-memory resource used by the engine's own tests.

use crate::resource::ManagedResource;
use crate::schema::{Attribute, AttributeType, Mutability, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note {0} not found")]
    NotFound(String),
    #[error("note {0} already exists")]
    Conflict(String),
    #[error("service unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub parent: Option<String>,
    pub tags: Vec<String>,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct NoteRequest {
    pub text: String,
    pub parent: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteModel {
    pub id: Option<String>,
    pub text: Option<String>,
    pub parent: Option<String>,
    pub tags: Option<Vec<String>>,
    pub revision: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    notes: BTreeMap<String, Note>,
    calls: usize,
    fail_in: Option<usize>,
}

/// Shared note store; clones see the same notes.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    inner: Arc<Mutex<Inner>>,
}

impl NoteStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn call(&self) -> Result<MutexGuard<'_, Inner>, NoteError> {
        let mut inner = self.lock();
        inner.calls += 1;
        match inner.fail_in {
            Some(0) => {
                inner.fail_in = None;
                Err(NoteError::Unavailable)
            }
            Some(n) => {
                inner.fail_in = Some(n - 1);
                Ok(inner)
            }
            None => Ok(inner),
        }
    }

    /// Make the next call fail.
    pub fn fail_next(&self) {
        self.fail_after(0);
    }

    /// Let `calls` calls succeed, then fail one.
    pub fn fail_after(&self, calls: usize) {
        self.lock().fail_in = Some(calls);
    }

    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    pub fn insert(&self, id: &str, text: &str) {
        self.lock().notes.insert(
            id.to_string(),
            Note {
                id: id.to_string(),
                text: text.to_string(),
                parent: None,
                tags: Vec::new(),
                revision: 1,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.lock().notes.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().notes.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().notes.is_empty()
    }
}

pub struct NoteResource {
    store: NoteStore,
}

impl NoteResource {
    pub fn new(store: NoteStore) -> Self {
        Self { store }
    }
}

impl ManagedResource for NoteResource {
    type Model = NoteModel;
    type Request = NoteRequest;
    type Record = Note;
    type Error = NoteError;

    const TYPE_NAME: &'static str = "test_note";

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute("id", Attribute::required_string().requires_replace())
            .with_attribute("text", Attribute::required_string().use_state_for_unknown())
            .with_attribute("parent", Attribute::optional_string())
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::Set(Box::new(AttributeType::String)),
                    Mutability::Optional,
                ),
            )
            .with_attribute("revision", Attribute::computed_string())
    }

    fn plan_to_request(&self, planned: &NoteModel) -> NoteRequest {
        NoteRequest {
            text: planned.text.clone().unwrap_or_default(),
            parent: planned.parent.clone(),
            tags: planned.tags.clone().unwrap_or_default(),
        }
    }

    fn response_to_state(&self, record: Note) -> NoteModel {
        NoteModel {
            id: Some(record.id),
            text: Some(record.text),
            parent: record.parent,
            tags: (!record.tags.is_empty()).then_some(record.tags),
            revision: Some(record.revision.to_string()),
        }
    }

    fn id_of(model: &NoteModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> NoteModel {
        NoteModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn references(&self, model: &NoteModel) -> Vec<String> {
        model.parent.iter().cloned().collect()
    }

    fn is_not_found(error: &NoteError) -> bool {
        matches!(error, NoteError::NotFound(_))
    }

    fn remote_create(&self, planned: &NoteModel, request: &NoteRequest) -> Result<Note, NoteError> {
        let mut inner = self.store.call()?;
        let id = planned.id.clone().unwrap_or_default();
        if inner.notes.contains_key(&id) {
            return Err(NoteError::Conflict(id));
        }
        let note = Note {
            id: id.clone(),
            text: request.text.clone(),
            parent: request.parent.clone(),
            tags: request.tags.clone(),
            revision: 1,
        };
        inner.notes.insert(id, note.clone());
        Ok(note)
    }

    fn remote_read(&self, id: &str) -> Result<Note, NoteError> {
        let inner = self.store.call()?;
        inner
            .notes
            .get(id)
            .cloned()
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    fn remote_update(&self, id: &str, request: &NoteRequest) -> Result<Note, NoteError> {
        let mut inner = self.store.call()?;
        let note = inner
            .notes
            .get_mut(id)
            .ok_or_else(|| NoteError::NotFound(id.to_string()))?;
        note.text = request.text.clone();
        note.parent = request.parent.clone();
        note.tags = request.tags.clone();
        note.revision += 1;
        Ok(note.clone())
    }

    fn remote_delete(&self, id: &str) -> Result<(), NoteError> {
        let mut inner = self.store.call()?;
        inner
            .notes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }
}
