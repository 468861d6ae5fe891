//! Ocean Notes core library - note model, persistence contract, and lifecycle.
//!
//! This crate contains no I/O and can be compiled for any target.

mod clock;
mod editor;
mod error;
mod memory;
mod note;
mod provider;
mod store;

pub use clock::{Clock, IdGenerator, ManualClock, SequentialIds, SystemClock, UuidGenerator};
pub use editor::{CommitOutcome, Draft};
pub use error::Error;
pub use memory::MemoryStorage;
pub use note::{Note, NotePatch, NoteSummary};
pub use provider::{decode_notes, KeyValueStore, LocalStorageProvider, StorageProvider, NOTES_KEY};
pub use store::{compare_notes, sort_notes, NoteStore};
