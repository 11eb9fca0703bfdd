//! Ebook business logic - catalogue queries, the redemption-code uniqueness check and
//! the create/update/delete operations.

use crate::{
    core::form::NewEbook,
    core::pairing,
    entities::{Ebook, RecordKind, ebook},
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::{NotSet, Unchanged},
    PaginatorTrait, QueryOrder, Set, TransactionTrait,
    prelude::*,
};
use tracing::{debug, error, info, instrument};

/// Retrieves every ebook, ordered by code.
pub async fn get_all_ebooks<C>(db: &C) -> Result<Vec<ebook::Model>>
where
    C: ConnectionTrait,
{
    Ebook::find()
        .order_by_asc(ebook::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an ebook by storage id.
pub async fn get_ebook_by_id<C>(db: &C, id: i64) -> Result<Option<ebook::Model>>
where
    C: ConnectionTrait,
{
    Ebook::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Finds an ebook by redemption code.
pub async fn get_ebook_by_code<C>(db: &C, code: &str) -> Result<Option<ebook::Model>>
where
    C: ConnectionTrait,
{
    Ebook::find()
        .filter(ebook::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Reports whether an ebook other than `exclude` already uses `candidate` as its code.
///
/// Same contract as [`crate::core::student::student_id_in_use`]: the candidate is
/// compared as given and a failed lookup is an error.
pub async fn code_in_use<C>(db: &C, candidate: &str, exclude: Option<i64>) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = Ebook::find().filter(ebook::Column::Code.eq(candidate));
    if let Some(id) = exclude {
        query = query.filter(ebook::Column::Id.ne(id));
    }

    let matches = query
        .count(db)
        .await
        .inspect_err(|e| error!("E-Book code uniqueness check failed: {}", e))?;
    Ok(matches > 0)
}

/// Checks that an ebook is complete: name and code non-empty.
pub fn validate_ebook(ebook: &ebook::Model) -> Result<()> {
    if ebook.name.trim().is_empty() || ebook.code.trim().is_empty() {
        return Err(Error::IncompleteRecord {
            kind: RecordKind::Ebook,
        });
    }
    Ok(())
}

/// Creates a new, unassigned ebook from the "new ebook" form.
///
/// # Errors
/// Returns an error if a field is empty, the code is taken, or the insert fails.
#[instrument(skip(db))]
pub async fn create_ebook<C>(db: &C, draft: &NewEbook) -> Result<ebook::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    draft.validate()?;
    let code = draft.code.trim().to_string();

    let txn = db.begin().await?;
    if code_in_use(&txn, &code, None).await? {
        return Err(Error::AlreadyExists {
            kind: RecordKind::Ebook,
            value: code,
        });
    }

    let ebook = ebook::ActiveModel {
        id: NotSet,
        code: Set(code),
        name: Set(draft.name.trim().to_string()),
        assignment_date: Set(None),
    };
    let created = ebook.insert(&txn).await?;
    txn.commit().await?;

    info!("Created ebook '{}' ({})", created.name, created.code);
    Ok(created)
}

/// Persists the editable fields (name, code) of an existing ebook.
///
/// Renaming the code of a paired ebook carries the owner's reference along in the same
/// transaction, so the pairing survives the rename.
///
/// # Errors
/// Returns an error if:
/// - The name or code is empty
/// - Another ebook already has the code
/// - The ebook no longer exists
/// - A write fails
#[instrument(skip(db, ebook), fields(id = ebook.id))]
pub async fn update_ebook<C>(db: &C, ebook: &ebook::Model) -> Result<ebook::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_ebook(ebook)?;
    let code = ebook.code.trim().to_string();

    let txn = db.begin().await?;
    if code_in_use(&txn, &code, Some(ebook.id)).await? {
        return Err(Error::AlreadyExists {
            kind: RecordKind::Ebook,
            value: code,
        });
    }
    let stored = get_ebook_by_id(&txn, ebook.id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Ebook,
            id: ebook.id,
        })?;

    let owner = if stored.code == code {
        None
    } else {
        pairing::find_owner(&txn, &stored.code).await?
    };

    let updated = ebook::ActiveModel {
        id: Unchanged(ebook.id),
        code: Set(code),
        name: Set(ebook.name.trim().to_string()),
        assignment_date: NotSet,
    }
    .update(&txn)
    .await?;

    if let Some(owner) = owner {
        debug!(
            "Moving reference of student {} from '{}' to '{}'",
            owner.student_id, stored.code, updated.code
        );
        pairing::set_ebook_code(&txn, owner.id, Some(updated.code.clone())).await?;
    }
    txn.commit().await?;

    debug!("Updated ebook '{}' ({})", updated.name, updated.code);
    Ok(updated)
}

/// Deletes an ebook. A student still referencing its code loses the reference in the
/// same transaction.
///
/// # Errors
/// Returns an error if the ebook does not exist or a write fails.
#[instrument(skip(db))]
pub async fn delete_ebook<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let ebook = get_ebook_by_id(&txn, id)
        .await?
        .ok_or(Error::RecordNotFound {
            kind: RecordKind::Ebook,
            id,
        })?;

    if let Some(owner) = pairing::find_owner(&txn, &ebook.code).await? {
        debug!("Clearing reference of student {}", owner.student_id);
        pairing::set_ebook_code(&txn, owner.id, None).await?;
    }
    Ebook::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted ebook '{}' ({})", ebook.name, ebook.code);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pairing::{find_owner, pair};
    use crate::core::student::get_student_by_id;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_ebook_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let ebook = create_ebook(&db, &NewEbook::new(" Algebra I ", "ALG-001 ")).await?;
        assert_eq!(ebook.name, "Algebra I");
        assert_eq!(ebook.code, "ALG-001");
        assert!(ebook.assignment_date.is_none());

        assert_eq!(get_ebook_by_code(&db, "ALG-001").await?.unwrap(), ebook);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_ebook_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_ebook(&db, &NewEbook::new("   ", "ALG-001")).await;
        assert!(matches!(
            result,
            Err(Error::IncompleteRecord {
                kind: RecordKind::Ebook
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_ebook(&db, "ALG-001").await?;

        let result = create_ebook(&db, &NewEbook::new("Other", "ALG-001")).await;
        assert_eq!(
            result.unwrap_err().user_message(),
            "An E-Book with that code already exists!"
        );
        assert_eq!(get_all_ebooks(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_code_in_use_excludes_self_by_identity() -> Result<()> {
        let db = setup_test_db().await?;
        let algebra = create_test_ebook(&db, "ALG-001").await?;
        let geometry = create_test_ebook(&db, "GEO-001").await?;

        assert!(!code_in_use(&db, "ALG-001", Some(algebra.id)).await?);
        assert!(code_in_use(&db, "ALG-001", Some(geometry.id)).await?);
        assert!(code_in_use(&db, "GEO-001", Some(algebra.id)).await?);
        assert!(!code_in_use(&db, "BIO-001", None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_ebook_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let mut ebook = create_test_ebook(&db, "ALG-001").await?;

        ebook.name = "Algebra II".to_string();
        let updated = update_ebook(&db, &ebook).await?;
        assert_eq!(updated.name, "Algebra II");
        assert_eq!(updated.code, "ALG-001");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_ebook_rejects_taken_code() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_ebook(&db, "ALG-001").await?;
        let mut geometry = create_test_ebook(&db, "GEO-001").await?;

        geometry.code = "ALG-001".to_string();
        let result = update_ebook(&db, &geometry).await;
        assert!(result.unwrap_err().is_already_exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_renaming_code_keeps_pairing() -> Result<()> {
        let (db, mut student, mut ebook) = setup_with_student_and_ebook().await?;
        pair(&db, &mut student, &mut ebook).await?;

        ebook.code = "ALG-002".to_string();
        let updated = update_ebook(&db, &ebook).await?;
        assert_eq!(updated.code, "ALG-002");
        assert!(updated.assignment_date.is_some());

        let owner = find_owner(&db, "ALG-002").await?.unwrap();
        assert_eq!(owner.id, student.id);
        assert!(find_owner(&db, "ALG-001").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_ebook_clears_owner_reference() -> Result<()> {
        let (db, mut student, mut ebook) = setup_with_student_and_ebook().await?;
        pair(&db, &mut student, &mut ebook).await?;

        delete_ebook(&db, ebook.id).await?;

        assert!(get_ebook_by_id(&db, ebook.id).await?.is_none());
        let stored = get_student_by_id(&db, student.id).await?.unwrap();
        assert!(stored.ebook_code.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_ebook() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_ebook(&db, 7).await;
        assert!(matches!(result, Err(Error::RecordNotFound { .. })));
        Ok(())
    }
}
