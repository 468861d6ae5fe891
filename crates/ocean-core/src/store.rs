use crate::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::{Note, NotePatch, StorageProvider};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Owner of the canonical note list.
///
/// Generic over the persistence provider. Every mutation re-sorts the list and
/// writes all of it back through the provider.
pub struct NoteStore<P: StorageProvider> {
    provider: P,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    notes: Vec<Note>,
}

/// Pinned notes first, then most recently updated first.
pub fn compare_notes(a: &Note, b: &Note) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Stable sort into display order.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(compare_notes);
}

impl<P: StorageProvider> NoteStore<P> {
    /// Build a store from whatever the provider currently holds.
    ///
    /// Stored notes with a blank or repeated id are given fresh ids. Nothing
    /// is written back until the next mutation.
    pub fn load(provider: P) -> Self {
        let mut notes = provider.list_notes();
        sort_notes(&mut notes);
        debug!("loaded {} notes", notes.len());
        let mut store = Self {
            provider,
            clock: Box::new(SystemClock),
            ids: Box::new(UuidGenerator),
            notes,
        };
        store.repair_ids();
        store
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Create a note and return it.
    ///
    /// Blank title and content are accepted here; the editor's commit step is
    /// what keeps empty notes out.
    pub fn create(&mut self, title: impl Into<String>, content: impl Into<String>) -> Note {
        let note = Note {
            id: self.fresh_id(),
            title: title.into(),
            content: content.into(),
            updated_at: self.clock.now_millis(),
            pinned: false,
        };
        self.notes.insert(0, note.clone());
        self.persist();
        note
    }

    /// Merge `patch` into the note with `id`. Returns false if there is none.
    pub fn update(&mut self, id: &str, patch: NotePatch) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.find_mut(id) else {
            debug!("update skipped, no note {}", id);
            return false;
        };
        patch.apply_to(note);
        note.updated_at = now;
        self.persist();
        true
    }

    /// Delete the note with `id`. Returns false if there is none.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            debug!("delete skipped, no note {}", id);
            return false;
        }
        self.persist();
        true
    }

    /// Flip the pinned flag on the note with `id`. Returns false if there is none.
    pub fn toggle_pin(&mut self, id: &str) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.find_mut(id) else {
            debug!("pin toggle skipped, no note {}", id);
            return false;
        };
        note.pinned = !note.pinned;
        note.updated_at = now;
        self.persist();
        true
    }

    /// All notes in display order.
    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    /// Notes whose title or content contains `query`, ignoring case.
    ///
    /// A blank query returns everything. Results keep display order.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        if query.trim().is_empty() {
            return self.notes.iter().collect();
        }
        let needle = query.to_lowercase();
        self.notes.iter().filter(|n| n.matches(&needle)).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    fn fresh_id(&self) -> String {
        let base = self.ids.next_id();
        if self.get(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.get(&candidate).is_none() {
                debug!("id {} already taken, using {}", base, candidate);
                return candidate;
            }
            n += 1;
        }
    }

    fn repair_ids(&mut self) {
        let mut seen = HashSet::new();
        for i in 0..self.notes.len() {
            if !self.notes[i].id.is_empty() && seen.insert(self.notes[i].id.clone()) {
                continue;
            }
            let id = self.fresh_id();
            debug!("reassigning stored id {:?} to {}", self.notes[i].id, id);
            seen.insert(id.clone());
            self.notes[i].id = id;
        }
    }

    fn persist(&mut self) {
        sort_notes(&mut self.notes);
        self.provider.set_notes(&self.notes);
    }
}
