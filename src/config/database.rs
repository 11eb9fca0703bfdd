//! Database configuration module.
//!
//! Resolves the `SQLite` URL for a database file and creates the `students` and
//! `ebooks` tables from the entity definitions. Table creation goes through
//! `SeaORM`'s `Schema::create_table_from_entity`, so the UNIQUE constraints on
//! `student_id`, `code` and `ebook_code` and the foreign key from
//! `students.ebook_code` to `ebooks.code` come straight from the entity attributes.

use crate::entities::{Ebook, RecordKind, Student};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Schema};
use std::path::Path;
use tracing::debug;

/// Builds the `SQLite` URL for a database file, creating the file on first open.
#[must_use]
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to
/// the configured database file.
#[must_use]
pub fn get_database_url(default_path: &Path) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| sqlite_url(default_path))
}

/// Creates the table backing `kind` unless it already exists.
pub async fn create_table_if_missing<C>(db: &C, kind: RecordKind) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut table = match kind {
        RecordKind::Student => schema.create_table_from_entity(Student),
        RecordKind::Ebook => schema.create_table_from_entity(Ebook),
    };
    table.if_not_exists();

    debug!("Ensuring table for {} records exists", kind);
    db.execute(builder.build(&table)).await?;
    Ok(())
}

/// Creates all tables. Ebooks go first because students reference them.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    create_table_if_missing(db, RecordKind::Ebook).await?;
    create_table_if_missing(db, RecordKind::Student).await?;
    Ok(())
}
