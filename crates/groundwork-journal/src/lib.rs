//! # Groundwork Journal
//!
//! Append-only run journal: the single source of truth across a process
//! restart. All mutation goes through [`JournalStore::append`]; entries are
//! replayed at startup to reconstruct executor state.

pub mod entry;
pub mod file;
pub mod resume;
pub mod store;

pub use entry::JournalEntry;
pub use file::FileJournal;
pub use resume::{NodeRecord, ResumedState};
pub use store::{InMemoryJournal, JournalStore};
