//! Editing sessions and the rule for committing them to the store.
//!
//! Both fields are trimmed before they reach the store. A draft whose title
//! and content are both blank after trimming is dropped without touching the
//! store or storage.

use crate::{Note, NotePatch, NoteStore, StorageProvider};

/// Title and content being edited, plus the id of the note being edited, if any.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
}

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Created(Note),
    /// `found` is false when the edited note no longer exists.
    Updated { id: String, found: bool },
    /// Both fields were blank, nothing was saved.
    Abandoned,
}

impl Draft {
    /// An empty draft for a new note.
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft seeded from an existing note.
    pub fn for_note(note: &Note) -> Self {
        Self {
            id: Some(note.id.clone()),
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// Submit the draft to `store`.
    pub fn commit<P: StorageProvider>(self, store: &mut NoteStore<P>) -> CommitOutcome {
        if self.is_blank() {
            return CommitOutcome::Abandoned;
        }
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();

        match self.id {
            Some(id) => {
                let found = store.update(&id, NotePatch::text(title, content));
                CommitOutcome::Updated { id, found }
            }
            None => CommitOutcome::Created(store.create(title, content)),
        }
    }
}
