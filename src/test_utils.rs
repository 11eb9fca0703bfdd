//! Shared test utilities for the ebook manager.
//!
//! This module provides helpers for setting up in-memory test databases and creating
//! students and ebooks with sensible defaults.

use crate::{
    core::{
        ebook,
        form::{NewEbook, NewStudent},
        student,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with both tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test student with sensible defaults.
///
/// # Defaults
/// * `last_name`: "Tester"
/// * `grade`: "10"
pub async fn create_test_student(
    db: &DatabaseConnection,
    first_name: &str,
    student_id: &str,
) -> Result<entities::student::Model> {
    create_custom_student(db, first_name, "Tester", "10", student_id).await
}

/// Creates a test student with every field given.
pub async fn create_custom_student(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
    grade: &str,
    student_id: &str,
) -> Result<entities::student::Model> {
    student::create_student(
        db,
        &NewStudent::new(first_name, last_name, grade, student_id),
    )
    .await
}

/// Creates an unassigned test ebook with the given code.
///
/// # Defaults
/// * `name`: "Algebra I"
pub async fn create_test_ebook(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::ebook::Model> {
    ebook::create_ebook(db, &NewEbook::new("Algebra I", code)).await
}

/// Sets up a database holding Ada Lovelace (grade 11, Student ID "1001") and the
/// unpaired ebook "Algebra I" (code "ALG-001").
/// Returns (db, student, ebook) for pairing scenarios.
pub async fn setup_with_student_and_ebook() -> Result<(
    DatabaseConnection,
    entities::student::Model,
    entities::ebook::Model,
)> {
    let db = setup_test_db().await?;
    let student = create_custom_student(&db, "Ada", "Lovelace", "11", "1001").await?;
    let ebook = create_test_ebook(&db, "ALG-001").await?;
    Ok((db, student, ebook))
}
