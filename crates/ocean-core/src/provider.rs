//! Persistence contract for the note list.
//!
//! A [`StorageProvider`] mirrors the store's list. It never decides what the
//! list contains; it is told what to write and hands back whatever it can read.
//! Both directions are best-effort: unreadable data loads as an empty list and
//! failed writes are logged and dropped.

use crate::{Error, Note, NotePatch};
use log::{debug, warn};
use serde_json::Value;

/// Key under which the key-value backed provider stores the note list.
pub const NOTES_KEY: &str = "notes_app_v1";

/// Durable mirror of the note list.
pub trait StorageProvider {
    /// Load all stored notes. Missing or corrupt data yields an empty list.
    fn list_notes(&self) -> Vec<Note>;

    /// Overwrite the stored set with `notes`. Failures are swallowed.
    fn set_notes(&self, notes: &[Note]);

    /// Prepend a note to the stored set.
    fn create_note(&self, note: Note) {
        let mut notes = self.list_notes();
        notes.insert(0, note);
        self.set_notes(&notes);
    }

    /// Merge `patch` into the stored note with `id`, if any.
    fn update_note(&self, id: &str, patch: &NotePatch) {
        let mut notes = self.list_notes();
        for note in notes.iter_mut().filter(|n| n.id == id) {
            patch.apply_to(note);
        }
        self.set_notes(&notes);
    }

    /// Remove the stored note with `id`, if any.
    fn delete_note(&self, id: &str) {
        let mut notes = self.list_notes();
        notes.retain(|n| n.id != id);
        self.set_notes(&notes);
    }
}

impl<P: StorageProvider + ?Sized> StorageProvider for &P {
    fn list_notes(&self) -> Vec<Note> {
        (**self).list_notes()
    }

    fn set_notes(&self, notes: &[Note]) {
        (**self).set_notes(notes)
    }
}

impl<P: StorageProvider + ?Sized> StorageProvider for Box<P> {
    fn list_notes(&self) -> Vec<Note> {
        (**self).list_notes()
    }

    fn set_notes(&self, notes: &[Note]) {
        (**self).set_notes(notes)
    }
}

/// String key-value storage in the style of browser local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    fn remove_item(&self, key: &str) -> Result<(), Error>;
}

/// Provider that keeps the whole list as one JSON array under [`NOTES_KEY`].
pub struct LocalStorageProvider<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> LocalStorageProvider<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read(&self) -> Vec<Note> {
        let raw = match self.storage.get_item(NOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("failed to read notes from storage: {}", e);
                return Vec::new();
            }
        };
        if raw.is_empty() {
            return Vec::new();
        }
        decode_notes(&raw)
    }

    fn write(&self, notes: &[Note]) -> Result<(), Error> {
        let raw = serde_json::to_string(notes)?;
        self.storage.set_item(NOTES_KEY, &raw)
    }
}

impl<S: KeyValueStore> StorageProvider for LocalStorageProvider<S> {
    fn list_notes(&self) -> Vec<Note> {
        self.read()
    }

    fn set_notes(&self, notes: &[Note]) {
        if let Err(e) = self.write(notes) {
            warn!("dropping write of {} notes: {}", notes.len(), e);
        }
    }
}

/// Decode a stored JSON array, tolerating missing or mistyped fields.
///
/// Anything that is not an array decodes to an empty list. Array entries that
/// are not objects are skipped.
pub fn decode_notes(raw: &str) -> Vec<Note> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("stored notes are not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let Value::Array(items) = value else {
        debug!("stored notes are not an array");
        return Vec::new();
    };

    items.iter().filter_map(decode_note).collect()
}

fn decode_note(value: &Value) -> Option<Note> {
    let Value::Object(fields) = value else {
        debug!("skipping stored note that is not an object");
        return None;
    };

    Some(Note {
        id: string_field(fields.get("id")),
        title: string_field(fields.get("title")),
        content: string_field(fields.get("content")),
        updated_at: timestamp_field(fields.get("updatedAt")),
        pinned: fields.get("pinned").map(truthy).unwrap_or(false),
    })
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn timestamp_field(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Loose boolean coercion: `null`, `false`, `0`, and `""` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn note(id: &str, updated_at: i64) -> Note {
        Note {
            id: id.to_string(),
            title: format!("Title {}", id),
            content: format!("Content {}", id),
            updated_at,
            pinned: false,
        }
    }

    fn provider_with(raw: &str) -> LocalStorageProvider<MemoryStorage> {
        let storage = MemoryStorage::new();
        storage.set_item(NOTES_KEY, raw).unwrap();
        LocalStorageProvider::new(storage)
    }

    #[test]
    fn test_missing_key_loads_empty() {
        let provider = LocalStorageProvider::new(MemoryStorage::new());
        assert!(provider.list_notes().is_empty());
    }

    #[test]
    fn test_corrupt_data_loads_empty() {
        assert!(provider_with("{not json").list_notes().is_empty());
        assert!(provider_with("").list_notes().is_empty());
        assert!(provider_with("{\"id\":\"a\"}").list_notes().is_empty());
        assert!(provider_with("42").list_notes().is_empty());
    }

    #[test]
    fn test_decode_coerces_pinned_and_defaults_fields() {
        let provider = provider_with(
            r#"[
                {"id":"a","title":"A","content":"x","updatedAt":5,"pinned":1},
                {"id":"b","title":null,"updatedAt":"7","pinned":""},
                {"id":"c","content":"c","updatedAt":3.9},
                "garbage",
                {"id":"d","pinned":"yes"}
            ]"#,
        );
        let notes = provider.list_notes();
        assert_eq!(notes.len(), 4);

        assert!(notes[0].pinned);
        assert_eq!(notes[0].updated_at, 5);

        assert_eq!(notes[1].title, "");
        assert_eq!(notes[1].content, "");
        assert_eq!(notes[1].updated_at, 7);
        assert!(!notes[1].pinned);

        assert_eq!(notes[2].updated_at, 3);
        assert!(!notes[2].pinned);

        assert_eq!(notes[3].id, "d");
        assert!(notes[3].pinned);
        assert_eq!(notes[3].updated_at, 0);
    }

    #[test]
    fn test_round_trip_preserves_fields_and_order() {
        let provider = LocalStorageProvider::new(MemoryStorage::new());
        let mut pinned = note("b", 1);
        pinned.pinned = true;
        let notes = vec![pinned, note("a", 2), note("c", 0)];

        provider.set_notes(&notes);
        assert_eq!(provider.list_notes(), notes);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let provider = LocalStorageProvider::new(MemoryStorage::with_quota(8));
        provider.set_notes(&[note("a", 1)]);
        assert!(provider.list_notes().is_empty());
        assert!(provider.storage().get_item(NOTES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_convenience_methods_read_modify_write() {
        let provider = LocalStorageProvider::new(MemoryStorage::new());
        provider.create_note(note("a", 1));
        provider.create_note(note("b", 2));
        let ids: Vec<_> = provider.list_notes().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "a"]);

        provider.update_note(
            "a",
            &NotePatch {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        );
        let notes = provider.list_notes();
        assert_eq!(notes[1].title, "Renamed");
        // Provider-level updates do not touch the timestamp.
        assert_eq!(notes[1].updated_at, 1);

        provider.delete_note("b");
        provider.delete_note("missing");
        let ids: Vec<_> = provider.list_notes().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
