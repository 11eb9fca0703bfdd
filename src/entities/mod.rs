//! Entity module - `SeaORM` entity definitions for the two tables of an ebook database.
//! Students hold the pairing through their `ebook_code` column; ebooks are passive
//! targets that carry the assignment timestamp.

pub mod ebook;
pub mod student;

use std::fmt;

// Re-export specific types to avoid conflicts
pub use ebook::{Column as EbookColumn, Entity as Ebook, Model as EbookModel};
pub use student::{Column as StudentColumn, Entity as Student, Grade, Model as StudentModel};

/// The two kinds of records the manager keeps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A row of the `students` table
    Student,
    /// A row of the `ebooks` table
    Ebook,
}

impl RecordKind {
    /// Name of the human-assigned unique identifier of this kind.
    #[must_use]
    pub const fn identifier_label(self) -> &'static str {
        match self {
            Self::Student => "Student ID",
            Self::Ebook => "code",
        }
    }

    /// Message shown when the identifier collides with another record.
    #[must_use]
    pub const fn already_exists_message(self) -> &'static str {
        match self {
            Self::Student => "A Student with that Student ID already exists!",
            Self::Ebook => "An E-Book with that code already exists!",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => f.write_str("Student"),
            Self::Ebook => f.write_str("E-Book"),
        }
    }
}
