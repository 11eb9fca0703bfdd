//! Edit-form state.
//!
//! A [`TrackedField`] remembers the value it was last loaded (or saved) with, so the
//! form can tell whether the user has unsaved changes. [`NewStudent`] and [`NewEbook`]
//! are the drafts submitted by the "new record" forms.

use crate::entities::{Grade, RecordKind, ebook, student};
use crate::errors::{Error, Result};

/// A text input that knows whether it differs from its last loaded value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackedField {
    saved: String,
    value: String,
}

impl TrackedField {
    /// Raw current value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Current value with surrounding whitespace removed.
    #[must_use]
    pub fn as_text(&self) -> String {
        self.value.trim().to_string()
    }

    /// Replaces the current value (a user edit).
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Loads a value from a record; the field is unchanged afterwards.
    pub fn load(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.saved.clone_from(&self.value);
    }

    /// Whether the value differs from the last loaded or saved one.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.value != self.saved
    }

    /// Empties the field.
    pub fn clear(&mut self) {
        self.value.clear();
        self.saved.clear();
    }
}

/// A group of tracked fields shown for one record.
pub trait RecordForm: Default {
    /// Whether any field has unsaved changes.
    fn any_changed(&self) -> bool;

    /// Empties every field.
    fn clear(&mut self);
}

/// Edit form of the student tab.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudentForm {
    /// First name input
    pub first_name: TrackedField,
    /// Last name input
    pub last_name: TrackedField,
    /// Grade dropdown
    pub grade: TrackedField,
    /// Student ID input
    pub student_id: TrackedField,
}

impl StudentForm {
    fn fields_mut(&mut self) -> [&mut TrackedField; 4] {
        [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.grade,
            &mut self.student_id,
        ]
    }
}

impl RecordForm for StudentForm {
    fn any_changed(&self) -> bool {
        self.first_name.changed()
            || self.last_name.changed()
            || self.grade.changed()
            || self.student_id.changed()
    }

    fn clear(&mut self) {
        self.fields_mut().into_iter().for_each(TrackedField::clear);
    }
}

/// Edit form of the ebook tab. The assignment date is display-only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EbookForm {
    /// Name input
    pub name: TrackedField,
    /// Redemption code input
    pub code: TrackedField,
    /// Formatted assignment date (read-only)
    pub assignment_date: TrackedField,
}

impl RecordForm for EbookForm {
    fn any_changed(&self) -> bool {
        self.name.changed() || self.code.changed()
    }

    fn clear(&mut self) {
        self.name.clear();
        self.code.clear();
        self.assignment_date.clear();
    }
}

/// Two-way binding between a model and its edit form.
pub trait FormBinding {
    /// Form type showing this model
    type Form: RecordForm;

    /// Kind of record bound
    const KIND: RecordKind;

    /// Fills the form from the model; the form is unchanged afterwards.
    fn load_into(&self, form: &mut Self::Form);

    /// Copies the form's (trimmed) values onto the model.
    fn apply_from(&mut self, form: &Self::Form);

    /// Whether every required field is non-empty after trimming.
    fn filled_out_properly(&self) -> bool;
}

impl FormBinding for student::Model {
    type Form = StudentForm;
    const KIND: RecordKind = RecordKind::Student;

    fn load_into(&self, form: &mut StudentForm) {
        form.first_name.load(self.first_name.as_str());
        form.last_name.load(self.last_name.as_str());
        form.grade.load(self.grade.as_str());
        form.student_id.load(self.student_id.as_str());
    }

    fn apply_from(&mut self, form: &StudentForm) {
        self.first_name = form.first_name.as_text();
        self.last_name = form.last_name.as_text();
        self.grade = form.grade.as_text();
        self.student_id = form.student_id.as_text();
    }

    fn filled_out_properly(&self) -> bool {
        required_filled(&[
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.student_id.as_str(),
        ])
    }
}

impl FormBinding for ebook::Model {
    type Form = EbookForm;
    const KIND: RecordKind = RecordKind::Ebook;

    fn load_into(&self, form: &mut EbookForm) {
        form.name.load(self.name.as_str());
        form.code.load(self.code.as_str());
        form.assignment_date.load(self.assignment_date_display());
    }

    fn apply_from(&mut self, form: &EbookForm) {
        self.name = form.name.as_text();
        self.code = form.code.as_text();
    }

    fn filled_out_properly(&self) -> bool {
        required_filled(&[self.name.as_str(), self.code.as_str()])
    }
}

fn required_filled(values: &[&str]) -> bool {
    values.iter().all(|value| !value.trim().is_empty())
}

/// Input of the "new student" form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewStudent {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Selected grade text
    pub grade: String,
    /// School-assigned student ID
    pub student_id: String,
}

impl NewStudent {
    /// Draft with every field set.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        grade: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            grade: grade.into(),
            student_id: student_id.into(),
        }
    }

    /// Checks every field is filled and the grade is valid; returns the parsed grade.
    pub fn validate(&self) -> Result<Grade> {
        if !required_filled(&[
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.grade.as_str(),
            self.student_id.as_str(),
        ]) {
            return Err(Error::IncompleteRecord {
                kind: RecordKind::Student,
            });
        }
        self.grade.parse()
    }
}

/// Input of the "new ebook" form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewEbook {
    /// Display name
    pub name: String,
    /// Redemption code
    pub code: String,
}

impl NewEbook {
    /// Draft with both fields set.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Checks both fields are filled.
    pub fn validate(&self) -> Result<()> {
        if required_filled(&[self.name.as_str(), self.code.as_str()]) {
            Ok(())
        } else {
            Err(Error::IncompleteRecord {
                kind: RecordKind::Ebook,
            })
        }
    }
}
