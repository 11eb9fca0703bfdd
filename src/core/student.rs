//! Student business logic - roster queries, the Student ID uniqueness check and the
//! create/update/delete operations.
//!
//! Every write runs inside its own transaction. Callers may pass either the
//! connection or an open transaction (the latter nests as a savepoint).

use crate::{
    core::form::NewStudent,
    core::pairing,
    entities::{Grade, RecordKind, Student, student},
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::{NotSet, Unchanged},
    PaginatorTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use tracing::{debug, error, info, instrument};

/// Retrieves every student, ordered by last name then first name.
pub async fn get_all_students<C>(db: &C) -> Result<Vec<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find()
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a student by storage id.
pub async fn get_student_by_id<C>(db: &C, id: i64) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Finds a student by school-assigned Student ID.
pub async fn get_student_by_student_id<C>(
    db: &C,
    student_id: &str,
) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find()
        .filter(student::Column::StudentId.eq(student_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Reports whether a student other than `exclude` already uses `candidate` as its
/// Student ID.
///
/// The candidate is compared as given; trimming is the caller's job. `exclude` is the
/// storage id of the student being re-saved, or `None` for a brand-new student.
///
/// # Errors
/// A failed lookup is returned as an error rather than treated as "not in use", so a
/// save can never slip past the check because storage hiccuped.
pub async fn student_id_in_use<C>(db: &C, candidate: &str, exclude: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = Student::find().filter(student::Column::StudentId.eq(candidate));
    if let Some(id) = exclude {
        query = query.filter(student::Column::Id.ne(id));
    }

    let matches = query
        .count(db)
        .await
        .inspect_err(|e| error!("Student ID uniqueness check failed: {}", e))?;
    Ok(matches > 0)
}

/// Checks that a student is complete: names and Student ID non-empty, grade valid.
pub fn validate_student(student: &student::Model) -> Result<Grade> {
    if student.first_name.trim().is_empty()
        || student.last_name.trim().is_empty()
        || student.student_id.trim().is_empty()
    {
        return Err(Error::IncompleteRecord {
            kind: RecordKind::Student,
        });
    }
    student.grade.parse()
}

/// Creates a new, unpaired student from the "new student" form.
///
/// # Errors
/// Returns an error if:
/// - A field is empty or the grade is not one of 9-12
/// - Another student already has the Student ID
/// - The insert fails
#[instrument(skip(db))]
pub async fn create_student<C>(db: &C, draft: &NewStudent) -> Result<student::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let grade = draft.validate()?;
    let student_id = draft.student_id.trim().to_string();

    let txn = db.begin().await?;
    if student_id_in_use(&txn, &student_id, None).await? {
        return Err(Error::AlreadyExists {
            kind: RecordKind::Student,
            value: student_id,
        });
    }

    let student = student::ActiveModel {
        id: NotSet,
        first_name: Set(draft.first_name.trim().to_string()),
        last_name: Set(draft.last_name.trim().to_string()),
        grade: Set(grade.to_string()),
        student_id: Set(student_id),
        ebook_code: Set(None),
    };
    let created = student.insert(&txn).await?;
    txn.commit().await?;

    info!("Created student {}", created);
    Ok(created)
}

/// Persists the editable fields (names, grade, Student ID) of an existing student.
///
/// The pairing column is left alone; pairing changes go through
/// [`crate::core::pairing`].
///
/// # Errors
/// Returns an error if:
/// - The student is incomplete or has an invalid grade
/// - Another student already has the Student ID
/// - The student no longer exists
/// - The update fails
#[instrument(skip(db, student), fields(id = student.id))]
pub async fn update_student<C>(db: &C, student: &student::Model) -> Result<student::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let grade = validate_student(student)?;
    let student_id = student.student_id.trim().to_string();

    let txn = db.begin().await?;
    if student_id_in_use(&txn, &student_id, Some(student.id)).await? {
        return Err(Error::AlreadyExists {
            kind: RecordKind::Student,
            value: student_id,
        });
    }
    get_student_by_id(&txn, student.id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Student,
            id: student.id,
        })?;

    let updated = student::ActiveModel {
        id: Unchanged(student.id),
        first_name: Set(student.first_name.trim().to_string()),
        last_name: Set(student.last_name.trim().to_string()),
        grade: Set(grade.to_string()),
        student_id: Set(student_id),
        ebook_code: NotSet,
    }
    .update(&txn)
    .await?;
    txn.commit().await?;

    debug!("Updated student {}", updated);
    Ok(updated)
}

/// Deletes a student. If the student holds an ebook, the ebook's assignment date is
/// cleared in the same transaction.
///
/// # Errors
/// Returns an error if the student does not exist or a write fails.
#[instrument(skip(db))]
pub async fn delete_student<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let student = get_student_by_id(&txn, id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Student,
            id,
        })?;

    if let Some(code) = &student.ebook_code {
        pairing::release_ebook(&txn, code).await?;
    }
    Student::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted student {}", student);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pairing::{find_owner, pair};
    use crate::entities::Ebook;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_student_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let student = create_student(&db, &NewStudent::new(" Ada ", "Lovelace", "11", " 1001"))
            .await?;
        assert_eq!(student.first_name, "Ada");
        assert_eq!(student.last_name, "Lovelace");
        assert_eq!(student.grade, "11");
        assert_eq!(student.student_id, "1001");
        assert!(student.ebook_code.is_none());

        let found = get_student_by_student_id(&db, "1001").await?.unwrap();
        assert_eq!(found, student);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_student_id_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "Ada", "1001").await?;

        let result = create_student(&db, &NewStudent::new("Grace", "Hopper", "12", "1001")).await;
        assert!(matches!(
            result,
            Err(Error::AlreadyExists {
                kind: RecordKind::Student,
                ..
            })
        ));
        assert_eq!(get_all_students(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_unique_violation_maps_to_constraint_violation() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "Ada", "1001").await?;

        let duplicate = student::ActiveModel {
            first_name: Set("Grace".to_string()),
            last_name: Set("Hopper".to_string()),
            grade: Set("12".to_string()),
            student_id: Set("1001".to_string()),
            ebook_code: Set(None),
            ..Default::default()
        };
        let err = Error::from(duplicate.insert(&db).await.unwrap_err());
        assert!(matches!(err, Error::ConstraintViolation { .. }));
        assert!(err.is_already_exists());
        assert!(!err.is_unexpected());
        assert_eq!(
            err.user_message(),
            "A record with that identifier already exists!"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_student(&db, &NewStudent::new("", "Lovelace", "11", "1001")).await;
        assert!(matches!(result, Err(Error::IncompleteRecord { .. })));

        let result = create_student(&db, &NewStudent::new("Ada", "Lovelace", "8", "1001")).await;
        assert!(matches!(result, Err(Error::InvalidGrade { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_student_id_in_use_excludes_self_by_identity() -> Result<()> {
        let db = setup_test_db().await?;
        let ada = create_test_student(&db, "Ada", "1001").await?;
        let grace = create_test_student(&db, "Grace", "1002").await?;

        // Re-saving under the unchanged ID is fine.
        assert!(!student_id_in_use(&db, "1001", Some(ada.id)).await?);
        // Taking someone else's ID is not, in either direction.
        assert!(student_id_in_use(&db, "1001", Some(grace.id)).await?);
        assert!(student_id_in_use(&db, "1002", Some(ada.id)).await?);
        // A new student collides with any existing one.
        assert!(student_id_in_use(&db, "1001", None).await?);
        assert!(!student_id_in_use(&db, "9999", None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_student_id_check_fails_closed() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("disk I/O error".to_string())])
            .into_connection();

        let result = student_id_in_use(&db, "1001", None).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_update_student_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let mut student = create_test_student(&db, "Ada", "1001").await?;

        student.last_name = "King".to_string();
        student.grade = "12".to_string();
        let updated = update_student(&db, &student).await?;
        assert_eq!(updated.last_name, "King");
        assert_eq!(updated.grade, "12");

        let stored = get_student_by_id(&db, student.id).await?.unwrap();
        assert_eq!(stored, updated);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_rejects_taken_id() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "Ada", "1001").await?;
        let mut grace = create_test_student(&db, "Grace", "1002").await?;

        grace.student_id = "1001".to_string();
        let result = update_student(&db, &grace).await;
        assert!(result.unwrap_err().is_already_exists());

        let stored = get_student_by_id(&db, grace.id).await?.unwrap();
        assert_eq!(stored.student_id, "1002");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_student() -> Result<()> {
        let db = setup_test_db().await?;
        let mut student = create_test_student(&db, "Ada", "1001").await?;
        Student::delete_by_id(student.id).exec(&db).await?;

        student.first_name = "Augusta".to_string();
        let result = update_student(&db, &student).await;
        assert!(matches!(result, Err(Error::RecordNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_students_ordered_by_name() -> Result<()> {
        let db = setup_test_db().await?;
        create_student(&db, &NewStudent::new("Grace", "Hopper", "12", "1002")).await?;
        create_student(&db, &NewStudent::new("Ada", "Lovelace", "11", "1001")).await?;
        create_student(&db, &NewStudent::new("Alan", "Hopper", "10", "1003")).await?;

        let names: Vec<String> = get_all_students(&db)
            .await?
            .iter()
            .map(student::Model::full_name)
            .collect();
        assert_eq!(names, ["Alan Hopper", "Grace Hopper", "Ada Lovelace"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_student_releases_ebook() -> Result<()> {
        let (db, mut student, mut ebook) = setup_with_student_and_ebook().await?;
        pair(&db, &mut student, &mut ebook).await?;
        assert!(ebook.assignment_date.is_some());

        delete_student(&db, student.id).await?;

        assert!(get_student_by_id(&db, student.id).await?.is_none());
        let stored = Ebook::find_by_id(ebook.id).one(&db).await?.unwrap();
        assert!(stored.assignment_date.is_none());
        assert!(find_owner(&db, &ebook.code).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_student() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_student(&db, 42).await;
        assert!(matches!(
            result,
            Err(Error::RecordNotFound {
                kind: RecordKind::Student,
                id: 42
            })
        ));
        Ok(())
    }
}
