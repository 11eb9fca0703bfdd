//! Snapshots of a record's editable fields.
//!
//! A memento is taken right before an in-place edit or pairing change that may have to
//! be undone. Restoring writes the captured values back onto the same model; the
//! storage id is never part of a snapshot and is left untouched. A memento can also be
//! turned into a detached `ActiveModel` with no storage id ([`StudentMemento::replica`],
//! [`EbookMemento::replica`]).

use crate::entities::{ebook, student};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, Set};

/// A model whose editable fields can be captured and restored.
pub trait Restorable {
    /// Snapshot type holding the editable fields by value
    type Memento;

    /// Captures the current editable fields.
    fn save_to_memento(&self) -> Self::Memento;

    /// Writes the captured fields back onto this model.
    fn load_from_memento(&mut self, memento: &Self::Memento);
}

/// Snapshot of a student's editable fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentMemento {
    source_id: i64,
    first_name: String,
    last_name: String,
    grade: String,
    student_id: String,
    ebook_code: Option<String>,
}

impl StudentMemento {
    /// Storage id of the student the snapshot was taken from.
    #[must_use]
    pub const fn source_id(&self) -> i64 {
        self.source_id
    }

    /// Builds a free-standing student with the snapshot's values and no storage id.
    #[must_use]
    pub fn replica(&self) -> student::ActiveModel {
        student::ActiveModel {
            id: NotSet,
            first_name: Set(self.first_name.clone()),
            last_name: Set(self.last_name.clone()),
            grade: Set(self.grade.clone()),
            student_id: Set(self.student_id.clone()),
            ebook_code: Set(self.ebook_code.clone()),
        }
    }
}

impl Restorable for student::Model {
    type Memento = StudentMemento;

    fn save_to_memento(&self) -> StudentMemento {
        StudentMemento {
            source_id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            grade: self.grade.clone(),
            student_id: self.student_id.clone(),
            ebook_code: self.ebook_code.clone(),
        }
    }

    fn load_from_memento(&mut self, memento: &StudentMemento) {
        debug_assert_eq!(self.id, memento.source_id);
        self.first_name.clone_from(&memento.first_name);
        self.last_name.clone_from(&memento.last_name);
        self.grade.clone_from(&memento.grade);
        self.student_id.clone_from(&memento.student_id);
        self.ebook_code.clone_from(&memento.ebook_code);
    }
}

/// Snapshot of an ebook's editable fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EbookMemento {
    source_id: i64,
    name: String,
    code: String,
    assignment_date: Option<DateTime<Utc>>,
}

impl EbookMemento {
    /// Storage id of the ebook the snapshot was taken from.
    #[must_use]
    pub const fn source_id(&self) -> i64 {
        self.source_id
    }

    /// Builds a free-standing ebook with the snapshot's values and no storage id.
    #[must_use]
    pub fn replica(&self) -> ebook::ActiveModel {
        ebook::ActiveModel {
            id: NotSet,
            code: Set(self.code.clone()),
            name: Set(self.name.clone()),
            assignment_date: Set(self.assignment_date),
        }
    }
}

impl Restorable for ebook::Model {
    type Memento = EbookMemento;

    fn save_to_memento(&self) -> EbookMemento {
        EbookMemento {
            source_id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            assignment_date: self.assignment_date,
        }
    }

    fn load_from_memento(&mut self, memento: &EbookMemento) {
        debug_assert_eq!(self.id, memento.source_id);
        self.name.clone_from(&memento.name);
        self.code.clone_from(&memento.code);
        self.assignment_date = memento.assignment_date;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn ada() -> student::Model {
        student::Model {
            id: 7,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            grade: "11".to_string(),
            student_id: "1001".to_string(),
            ebook_code: Some("ALG-001".to_string()),
        }
    }

    fn algebra() -> ebook::Model {
        ebook::Model {
            id: 3,
            code: "ALG-001".to_string(),
            name: "Algebra I".to_string(),
            assignment_date: Some(Utc::now()),
        }
    }

    #[test]
    fn test_student_restore_reverts_in_place_edits() {
        let mut student = ada();
        let before = student.clone();
        let memento = student.save_to_memento();

        student.first_name = "Augusta".to_string();
        student.student_id = String::new();
        student.ebook_code = None;

        student.load_from_memento(&memento);
        assert_eq!(student, before);
        assert_eq!(memento.source_id(), 7);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_mutation() {
        let mut student = ada();
        let memento = student.save_to_memento();
        student.last_name.push_str("-King");

        let replica = memento.replica();
        assert_eq!(replica.last_name.clone().unwrap(), "Lovelace");
    }

    #[test]
    fn test_student_replica_has_no_storage_id() {
        let student = ada();
        let replica = student.save_to_memento().replica();

        assert!(replica.id.is_not_set());
        assert_eq!(replica.first_name.clone().unwrap(), student.first_name);
        assert_eq!(replica.last_name.clone().unwrap(), student.last_name);
        assert_eq!(replica.grade.clone().unwrap(), student.grade);
        assert_eq!(replica.student_id.clone().unwrap(), student.student_id);
        assert_eq!(replica.ebook_code.clone().unwrap(), student.ebook_code);
    }

    #[test]
    fn test_ebook_round_trip() {
        let mut ebook = algebra();
        let before = ebook.clone();
        let memento = ebook.save_to_memento();

        ebook.name = "Geometry".to_string();
        ebook.assignment_date = None;
        ebook.load_from_memento(&memento);
        assert_eq!(ebook, before);

        let replica = memento.replica();
        assert!(replica.id.is_not_set());
        assert_eq!(replica.code.clone().unwrap(), "ALG-001");
        assert_eq!(replica.assignment_date.clone().unwrap(), before.assignment_date);
    }
}
