//! Core module - framework-agnostic logic of the ebook manager.
//! Nothing in here knows about the command line; every operation takes a connection
//! (or the [`session::Session`]) and returns structured data.

/// Redemption-code CRUD and the code uniqueness check
pub mod ebook;
/// Timestamped error-log files
pub mod error_log;
/// CSV export
pub mod export;
/// Tracked form fields and new-record drafts
pub mod form;
/// Record edit sessions (select, edit, save, cancel, delete)
pub mod lifecycle;
/// Snapshots of editable fields
pub mod memento;
/// Student/ebook pairing and owner lookup
pub mod pairing;
/// Redemption report
pub mod report;
/// Storage session owning the database connection
pub mod session;
/// Student CRUD and the Student ID uniqueness check
pub mod student;
