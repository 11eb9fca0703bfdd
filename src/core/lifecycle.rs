//! Record edit sessions.
//!
//! An [`EditSession`] drives one tab of the application: a record is selected into the
//! edit form, the user changes fields, and the changes are either saved or cancelled.
//!
//! ```text
//! Idle --select--> Selected --edit field--> Editing --save ok--> Selected
//!   ^                  |                       |
//!   +------cancel------+--------cancel---------+ (confirmation required when Editing)
//! ```
//!
//! A failed save never leaves a half-applied record behind: the record is snapshotted
//! right before the form is applied and restored from that snapshot on any failure.

use crate::{
    core::{
        ebook::{code_in_use, create_ebook, delete_ebook, update_ebook},
        form::{FormBinding, NewEbook, NewStudent, RecordForm},
        memento::Restorable,
        pairing,
        session::Session,
        student::{
            create_student, delete_student, student_id_in_use, update_student, validate_student,
        },
    },
    entities::{RecordKind, ebook, student},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::{debug, info, warn};

/// Question asked before discarding unsaved form input.
pub const DISCARD_CHANGES_QUESTION: &str =
    "You have unsaved changes, are you sure you want to cancel?";

/// Question asked before deleting a record.
pub const DELETE_QUESTION: &str = "Are you sure you want to delete this record?";

/// Blocking yes/no confirmation shown to the user.
pub trait Prompt {
    /// Asks `question`; `true` means the user agreed.
    fn confirm(&mut self, question: &str) -> bool;
}

/// Where an edit session currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditState {
    /// No record selected
    Idle,
    /// A record is loaded and the form matches it
    Selected,
    /// The form holds unsaved changes
    Editing,
}

/// Edit session over one kind of record.
pub struct EditSession<R: FormBinding> {
    record: Option<R>,
    form: R::Form,
}

/// Edit session of the student tab.
pub type StudentEditor = EditSession<student::Model>;
/// Edit session of the ebook tab.
pub type EbookEditor = EditSession<ebook::Model>;

impl<R: FormBinding> Default for EditSession<R> {
    fn default() -> Self {
        Self {
            record: None,
            form: R::Form::default(),
        }
    }
}

impl<R> EditSession<R>
where
    R: FormBinding + Restorable,
{
    /// An idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `record` into the form, replacing whatever was selected.
    pub fn select(&mut self, record: R) {
        record.load_into(&mut self.form);
        self.record = Some(record);
    }

    /// Current state, derived from the selection and the form's change flags.
    #[must_use]
    pub fn state(&self) -> EditState {
        match &self.record {
            None => EditState::Idle,
            Some(_) if self.form.any_changed() => EditState::Editing,
            Some(_) => EditState::Selected,
        }
    }

    /// The selected record.
    #[must_use]
    pub fn record(&self) -> Option<&R> {
        self.record.as_ref()
    }

    /// The edit form.
    #[must_use]
    pub fn form(&self) -> &R::Form {
        &self.form
    }

    /// The edit form, for user input.
    pub fn form_mut(&mut self) -> &mut R::Form {
        &mut self.form
    }

    /// Cancels editing. With unsaved changes the user is asked first; returns `false`
    /// if they chose to keep editing.
    pub fn cancel(&mut self, prompt: &mut impl Prompt) -> bool {
        if self.state() == EditState::Editing && !prompt.confirm(DISCARD_CHANGES_QUESTION) {
            return false;
        }
        self.finish();
        true
    }

    /// Deselects the record and clears the form.
    pub fn finish(&mut self) {
        self.record = None;
        self.form.clear();
    }

    fn selected(&self) -> Result<&R> {
        self.record
            .as_ref()
            .ok_or(Error::NothingSelected { kind: R::KIND })
    }

    fn selected_mut(&mut self) -> Result<&mut R> {
        self.record
            .as_mut()
            .ok_or(Error::NothingSelected { kind: R::KIND })
    }

    /// Snapshots the record, then applies the form onto it. An incomplete result is
    /// rolled back before returning the error; the form keeps the user's input.
    fn apply_form(&mut self) -> Result<R::Memento> {
        let record = self
            .record
            .as_mut()
            .ok_or(Error::NothingSelected { kind: R::KIND })?;
        let memento = record.save_to_memento();
        record.apply_from(&self.form);

        if !record.filled_out_properly() {
            record.load_from_memento(&memento);
            return Err(Error::IncompleteRecord { kind: R::KIND });
        }
        Ok(memento)
    }

    fn restore(&mut self, memento: &R::Memento) {
        if let Some(record) = self.record.as_mut() {
            record.load_from_memento(memento);
        }
    }

    /// Finishes a save: on success the stored record becomes the selection, on failure
    /// the record is restored and the form reloaded from it.
    fn settle(&mut self, outcome: Result<R>, memento: &R::Memento) -> Result<()> {
        match outcome {
            Ok(saved) => {
                self.select(saved);
                Ok(())
            }
            Err(e) => {
                warn!("Saving {} failed, restoring previous values: {}", R::KIND, e);
                self.restore(memento);
                if let Some(record) = &self.record {
                    record.load_into(&mut self.form);
                }
                Err(e)
            }
        }
    }
}

impl StudentEditor {
    /// Saves the form onto the selected student.
    ///
    /// # Errors
    /// - [`Error::AlreadyExists`] if another student has the Student ID; nothing changes
    /// - [`Error::IncompleteRecord`] / [`Error::InvalidGrade`]; the student is restored
    ///   and the form keeps the input
    /// - any storage failure; the student is restored and the form reloaded from it
    pub async fn save<C>(&mut self, db: &C) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id = self.selected()?.id;
        let candidate = self.form.student_id.as_text();
        if student_id_in_use(db, &candidate, Some(id)).await? {
            return Err(Error::AlreadyExists {
                kind: RecordKind::Student,
                value: candidate,
            });
        }

        let memento = self.apply_form()?;
        if let Err(e) = validate_student(self.selected()?) {
            self.restore(&memento);
            return Err(e);
        }

        let outcome = update_student(db, self.selected()?).await;
        self.settle(outcome, &memento)
    }

    /// Deletes the selected student after confirmation, releasing its ebook.
    /// Returns `false` if the user declined.
    pub async fn delete<C>(&mut self, db: &C, prompt: &mut impl Prompt) -> Result<bool>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id = self.selected()?.id;
        if !prompt.confirm(DELETE_QUESTION) {
            return Ok(false);
        }
        delete_student(db, id).await?;
        self.finish();
        Ok(true)
    }

    /// Hands `ebook` to the selected student.
    pub async fn pair_with<C>(&mut self, db: &C, ebook: &mut ebook::Model) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let student = self.selected_mut()?;
        pairing::pair(db, student, ebook).await
    }

    /// Takes the selected student's ebook away.
    pub async fn unpair<C>(&mut self, db: &C) -> Result<Option<ebook::Model>>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let student = self.selected_mut()?;
        pairing::unpair(db, student).await
    }
}

impl EbookEditor {
    /// Saves the form onto the selected ebook.
    ///
    /// # Errors
    /// Same contract as [`StudentEditor::save`], keyed on the redemption code.
    pub async fn save<C>(&mut self, db: &C) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id = self.selected()?.id;
        let candidate = self.form.code.as_text();
        if code_in_use(db, &candidate, Some(id)).await? {
            return Err(Error::AlreadyExists {
                kind: RecordKind::Ebook,
                value: candidate,
            });
        }

        let memento = self.apply_form()?;
        let outcome = update_ebook(db, self.selected()?).await;
        self.settle(outcome, &memento)
    }

    /// Deletes the selected ebook after confirmation, clearing its owner's reference.
    /// Returns `false` if the user declined.
    pub async fn delete<C>(&mut self, db: &C, prompt: &mut impl Prompt) -> Result<bool>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let id = self.selected()?.id;
        if !prompt.confirm(DELETE_QUESTION) {
            return Ok(false);
        }
        delete_ebook(db, id).await?;
        self.finish();
        Ok(true)
    }

    /// Hands the selected ebook to `student`; the displayed assignment date follows.
    pub async fn pair_with<C>(&mut self, db: &C, student: &mut student::Model) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let ebook = self.selected_mut()?;
        pairing::pair(db, student, ebook).await?;
        let display = ebook.assignment_date_display();
        self.form.assignment_date.load(display);
        Ok(())
    }
}

/// Creates a student from the "new student" form inside one session transaction.
pub async fn create_student_record(session: &Session, draft: NewStudent) -> Result<student::Model> {
    debug!("Submitting new student {}", draft.student_id);
    let created = session
        .run_in_transaction(move |txn| Box::pin(async move { create_student(txn, &draft).await }))
        .await?;
    info!("New student saved: {}", created);
    Ok(created)
}

/// Creates an ebook from the "new ebook" form inside one session transaction.
pub async fn create_ebook_record(session: &Session, draft: NewEbook) -> Result<ebook::Model> {
    debug!("Submitting new ebook {}", draft.code);
    let created = session
        .run_in_transaction(move |txn| Box::pin(async move { create_ebook(txn, &draft).await }))
        .await?;
    info!("New ebook saved: {} ({})", created.name, created.code);
    Ok(created)
}
