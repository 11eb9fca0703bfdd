//! Pairing of students with ebooks.
//!
//! A student holds at most one ebook by storing its redemption code; an ebook carries
//! the date it was handed out. Every operation here keeps both sides in step inside a
//! single transaction: an ebook has an assignment date exactly when some student
//! references its code.

use crate::{
    core::ebook::get_ebook_by_code,
    core::memento::Restorable,
    core::student::get_student_by_id,
    entities::{Ebook, RecordKind, Student, ebook, student},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Unchanged, Set, TransactionTrait,
    prelude::*,
};
use tracing::{debug, info, instrument, warn};

/// Finds the student holding the ebook with `code`.
///
/// An ebook nobody references (including an orphaned one that still carries an
/// assignment date) has no owner; that is not an error.
pub async fn find_owner<C>(db: &C, code: &str) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find()
        .filter(student::Column::EbookCode.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up the ebook a student holds.
///
/// The foreign key clears references to deleted ebooks, but tables created before it
/// existed may still hold a dangling code; that yields `None` with a warning.
pub async fn owned_ebook<C>(db: &C, student: &student::Model) -> Result<Option<ebook::Model>>
where
    C: ConnectionTrait,
{
    let Some(code) = &student.ebook_code else {
        return Ok(None);
    };

    let ebook = get_ebook_by_code(db, code).await?;
    if ebook.is_none() {
        warn!(
            "Student {} references missing ebook '{}'",
            student.student_id, code
        );
    }
    Ok(ebook)
}

/// Whether an ebook carries an assignment date while no student references it.
pub async fn is_orphaned<C>(db: &C, ebook: &ebook::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    if !ebook.is_assigned() {
        return Ok(false);
    }
    Ok(find_owner(db, &ebook.code).await?.is_none())
}

/// Hands `ebook` to `student`.
///
/// Within one transaction:
/// - the ebook the student held before (if a different one) is released
/// - the ebook's previous owner (if someone else) loses the reference
/// - the ebook is stamped with the current time and the student references it
///
/// On success both models are replaced by their stored state. On failure both are
/// restored to what they were before the call and nothing is written.
#[instrument(skip_all, fields(student = student.id, ebook = ebook.id))]
pub async fn pair<C>(db: &C, student: &mut student::Model, ebook: &mut ebook::Model) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let student_memento = student.save_to_memento();
    let ebook_memento = ebook.save_to_memento();

    student.ebook_code = Some(ebook.code.clone());
    ebook.assignment_date = Some(Utc::now());

    match persist_pairing(db, student.id, ebook.id).await {
        Ok((saved_student, saved_ebook)) => {
            info!(
                "Paired student {} with ebook '{}'",
                saved_student.student_id, saved_ebook.code
            );
            *student = saved_student;
            *ebook = saved_ebook;
            Ok(())
        }
        Err(e) => {
            student.load_from_memento(&student_memento);
            ebook.load_from_memento(&ebook_memento);
            Err(e)
        }
    }
}

async fn persist_pairing<C>(
    db: &C,
    student_id: i64,
    ebook_id: i64,
) -> Result<(student::Model, ebook::Model)>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let stored_student = get_student_by_id(&txn, student_id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Student,
            id: student_id,
        })?;
    let stored_ebook = Ebook::find_by_id(ebook_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Ebook,
            id: ebook_id,
        })?;

    if let Some(previous) = &stored_student.ebook_code {
        if *previous != stored_ebook.code {
            release_ebook(&txn, previous).await?;
        }
    }
    if let Some(previous_owner) = find_owner(&txn, &stored_ebook.code).await? {
        if previous_owner.id != stored_student.id {
            debug!(
                "Taking ebook '{}' from student {}",
                stored_ebook.code, previous_owner.student_id
            );
            set_ebook_code(&txn, previous_owner.id, None).await?;
        }
    }

    let saved_ebook = set_assignment_date(&txn, stored_ebook.id, Some(Utc::now())).await?;
    let saved_student =
        set_ebook_code(&txn, stored_student.id, Some(saved_ebook.code.clone())).await?;
    txn.commit().await?;

    Ok((saved_student, saved_ebook))
}

/// Takes the student's ebook away, clearing the ebook's assignment date as well.
///
/// Returns the released ebook, or `None` if the student held nothing (or only a
/// dangling reference). On failure the student is restored and nothing is written.
#[instrument(skip_all, fields(student = student.id))]
pub async fn unpair<C>(db: &C, student: &mut student::Model) -> Result<Option<ebook::Model>>
where
    C: ConnectionTrait + TransactionTrait,
{
    let memento = student.save_to_memento();
    let id = student.id;
    student.ebook_code = None;

    let result = async {
        let txn = db.begin().await?;
        let stored = get_student_by_id(&txn, id)
            .await?
            .ok_or(Error::RecordNotFound {
                kind: RecordKind::Student,
                id,
            })?;

        let released = match &stored.ebook_code {
            Some(code) => release_ebook(&txn, code).await?,
            None => None,
        };
        let saved = set_ebook_code(&txn, stored.id, None).await?;
        txn.commit().await?;
        Ok::<_, Error>((saved, released))
    }
    .await;

    match result {
        Ok((saved, released)) => {
            if let Some(ebook) = &released {
                info!("Unpaired student {} from ebook '{}'", saved.student_id, ebook.code);
            }
            *student = saved;
            Ok(released)
        }
        Err(e) => {
            student.load_from_memento(&memento);
            Err(e)
        }
    }
}

/// Clears the assignment date of the ebook with `code`. A missing ebook is skipped.
pub(crate) async fn release_ebook<C>(db: &C, code: &str) -> Result<Option<ebook::Model>>
where
    C: ConnectionTrait,
{
    let Some(ebook) = get_ebook_by_code(db, code).await? else {
        warn!("Cannot release missing ebook '{}'", code);
        return Ok(None);
    };

    debug!("Releasing ebook '{}'", ebook.code);
    set_assignment_date(db, ebook.id, None).await.map(Some)
}

/// Writes a student's ebook reference, leaving every other column untouched.
pub(crate) async fn set_ebook_code<C>(
    db: &C,
    id: i64,
    code: Option<String>,
) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    student::ActiveModel {
        id: Unchanged(id),
        ebook_code: Set(code),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(Into::into)
}

/// Writes an ebook's assignment date, leaving every other column untouched.
pub(crate) async fn set_assignment_date<C>(
    db: &C,
    id: i64,
    date: Option<DateTimeUtc>,
) -> Result<ebook::Model>
where
    C: ConnectionTrait,
{
    ebook::ActiveModel {
        id: Unchanged(id),
        assignment_date: Set(date),
        ..Default::default()
    }
    .update(db)
    .await
    .map_err(Into::into)
}
