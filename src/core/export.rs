//! CSV export of the student roster and the ebook catalogue.

use crate::{
    core::{ebook::get_all_ebooks, student::get_all_students},
    entities::{ebook, student},
    errors::Result,
};
use chrono::{DateTime, Local};
use sea_orm::ConnectionTrait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp format used in export file names.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// A record that can be written as one CSV row.
pub trait CsvRecord {
    /// Column names, in row order.
    fn csv_headers() -> &'static [&'static str];

    /// Field values, in the same order as [`CsvRecord::csv_headers`].
    fn as_csv_line(&self) -> Vec<String>;
}

impl CsvRecord for student::Model {
    fn csv_headers() -> &'static [&'static str] {
        &[
            "firstName",
            "lastName",
            "grade",
            "studentId",
            "hasEbook",
            "ebookCode",
        ]
    }

    fn as_csv_line(&self) -> Vec<String> {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.grade.clone(),
            self.student_id.clone(),
            self.has_ebook().to_string(),
            self.ebook_code.clone().unwrap_or_default(),
        ]
    }
}

impl CsvRecord for ebook::Model {
    fn csv_headers() -> &'static [&'static str] {
        &["name", "code", "assignmentDate"]
    }

    fn as_csv_line(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.code.clone(),
            self.assignment_date_display(),
        ]
    }
}

/// Quotes a field if it contains a delimiter, a quote or a line break.
#[must_use]
pub fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn join_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| escape_csv(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders records as CSV text: a header row, then one row per record.
#[must_use]
pub fn render_csv<R: CsvRecord>(records: &[R]) -> String {
    let mut csv = join_row(R::csv_headers());
    csv.push('\n');
    for record in records {
        csv.push_str(&join_row(record.as_csv_line().as_slice()));
        csv.push('\n');
    }
    csv
}

/// Writes `records` to `path` as CSV, replacing any existing file.
pub fn write_csv<R: CsvRecord>(records: &[R], path: &Path) -> Result<()> {
    fs::write(path, render_csv(records))?;
    Ok(())
}

/// Files produced by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFiles {
    /// Student roster
    pub students: PathBuf,
    /// Ebook catalogue
    pub ebooks: PathBuf,
}

/// Exports every student and every ebook into `dir`, one file per kind, named after
/// `timestamp`.
pub async fn export_all<C>(db: &C, dir: &Path, timestamp: DateTime<Local>) -> Result<ExportFiles>
where
    C: ConnectionTrait,
{
    let stamp = timestamp.format(EXPORT_TIMESTAMP_FORMAT);
    let files = ExportFiles {
        students: dir.join(format!("students-{stamp}.csv")),
        ebooks: dir.join(format!("ebooks-{stamp}.csv")),
    };

    let students = get_all_students(db).await?;
    let ebooks = get_all_ebooks(db).await?;
    write_csv(&students, &files.students)?;
    write_csv(&ebooks, &files.ebooks)?;

    info!(
        "Exported {} students and {} ebooks to {}",
        students.len(),
        ebooks.len(),
        dir.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pairing::pair;
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("Smith, Jr."), "\"Smith, Jr.\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_student_row() {
        let student = student::Model {
            id: 1,
            first_name: "Ada".to_string(),
            last_name: "Lovelace, Countess".to_string(),
            grade: "11".to_string(),
            student_id: "1001".to_string(),
            ebook_code: None,
        };

        let csv = render_csv(&[student]);
        assert_eq!(
            csv,
            "firstName,lastName,grade,studentId,hasEbook,ebookCode\n\
             Ada,\"Lovelace, Countess\",11,1001,false,\n"
        );
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = render_csv::<ebook::Model>(&[]);
        assert_eq!(csv, "name,code,assignmentDate\n");
    }

    #[tokio::test]
    async fn test_export_all_writes_both_files() -> Result<()> {
        let (db, mut student, mut ebook) = setup_with_student_and_ebook().await?;
        pair(&db, &mut student, &mut ebook).await?;
        let dir = tempfile::tempdir()?;
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();

        let files = export_all(&db, dir.path(), timestamp).await?;

        assert_eq!(
            files.students.file_name().unwrap(),
            "students-2024-03-09 14.05.30.csv"
        );
        assert_eq!(
            files.ebooks.file_name().unwrap(),
            "ebooks-2024-03-09 14.05.30.csv"
        );

        let students = fs::read_to_string(&files.students)?;
        assert!(students.ends_with("Ada,Lovelace,11,1001,true,ALG-001\n"));

        let ebooks = fs::read_to_string(&files.ebooks)?;
        let row = ebooks.lines().nth(1).unwrap();
        assert!(row.starts_with("Algebra I,ALG-001,"));
        assert_eq!(row.len(), "Algebra I,ALG-001,".len() + "03/09/24 02:05 PM".len());
        Ok(())
    }
}
