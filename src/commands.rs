//! Command-line front end.
//!
//! Each [`Command`] maps onto one record-lifecycle operation. Parsing is separate from
//! execution, and execution writes to any `Write` and reads confirmations from any
//! `BufRead`, so both halves are testable without a terminal.

use crate::{
    config::AppConfig,
    core::{
        ebook::{get_all_ebooks, get_ebook_by_code},
        export::export_all,
        form::{NewEbook, NewStudent},
        lifecycle::{
            EbookEditor, EditState, Prompt, StudentEditor, create_ebook_record,
            create_student_record,
        },
        pairing::{find_owner, is_orphaned},
        report::generate_redemption_report,
        session::Session,
        student::{get_all_students, get_student_by_student_id},
    },
    entities::{RecordKind, ebook, student},
    errors::{Error, Result},
};
use chrono::Local;
use sea_orm::ConnectionTrait;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Usage text printed for `help` and after a parse error.
pub const USAGE: &str = "\
Usage: ebook-manager <command> [arguments]

Commands:
  students                                   List all students
  ebooks                                     List all ebooks
  add-student <first> <last> <grade> <id>    Add a student (grade 9-12)
  add-ebook <name> <code>                    Add an ebook
  edit-student <id> [--first <name>] [--last <name>] [--grade <grade>] [--id <new id>]
  edit-ebook <code> [--name <name>] [--code <new code>]
  pair <student id> <code>                   Hand an ebook to a student
  unpair <student id>                        Take a student's ebook away
  owner <code>                               Show who holds an ebook
  delete-student <id> [--yes]                Delete a student
  delete-ebook <code> [--yes]                Delete an ebook
  export [dir]                               Write students and ebooks to CSV
  report                                     Write the redemption report
  help                                       Show this text";

/// Field changes requested by `edit-student`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    /// New first name
    pub first_name: Option<String>,
    /// New last name
    pub last_name: Option<String>,
    /// New grade
    pub grade: Option<String>,
    /// New Student ID
    pub student_id: Option<String>,
}

/// Field changes requested by `edit-ebook`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EbookChanges {
    /// New name
    pub name: Option<String>,
    /// New redemption code
    pub code: Option<String>,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all students
    Students,
    /// List all ebooks
    Ebooks,
    /// Create a student
    AddStudent(NewStudent),
    /// Create an ebook
    AddEbook(NewEbook),
    /// Edit the student with `student_id`
    EditStudent {
        /// Student ID of the student to edit
        student_id: String,
        /// Fields to change
        changes: StudentChanges,
    },
    /// Edit the ebook with `code`
    EditEbook {
        /// Code of the ebook to edit
        code: String,
        /// Fields to change
        changes: EbookChanges,
    },
    /// Pair a student with an ebook
    Pair {
        /// Student ID of the new owner
        student_id: String,
        /// Code of the ebook handed out
        code: String,
    },
    /// Unpair a student
    Unpair {
        /// Student ID of the student
        student_id: String,
    },
    /// Show the owner of an ebook
    Owner {
        /// Code of the ebook
        code: String,
    },
    /// Delete a student
    DeleteStudent {
        /// Student ID of the student
        student_id: String,
        /// Skip the confirmation question
        assume_yes: bool,
    },
    /// Delete an ebook
    DeleteEbook {
        /// Code of the ebook
        code: String,
        /// Skip the confirmation question
        assume_yes: bool,
    },
    /// Export both tables to CSV
    Export {
        /// Target directory; the configured exports directory when absent
        dir: Option<PathBuf>,
    },
    /// Write the redemption report
    Report,
    /// Print usage
    Help,
}

impl Command {
    /// Parses the arguments following the program name.
    ///
    /// # Errors
    /// Returns a usage message for an unknown command, a missing argument or an
    /// unexpected flag.
    pub fn parse<I>(args: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Self::Help);
        };

        let command = match name.as_str() {
            "students" => Self::Students,
            "ebooks" => Self::Ebooks,
            "add-student" => Self::AddStudent(NewStudent::new(
                positional(&mut args, "first name")?,
                positional(&mut args, "last name")?,
                positional(&mut args, "grade")?,
                positional(&mut args, "student id")?,
            )),
            "add-ebook" => Self::AddEbook(NewEbook::new(
                positional(&mut args, "name")?,
                positional(&mut args, "code")?,
            )),
            "edit-student" => {
                let student_id = positional(&mut args, "student id")?;
                let mut changes = StudentChanges::default();
                while let Some(flag) = args.next() {
                    let value = flag_value(&mut args, &flag)?;
                    match flag.as_str() {
                        "--first" => changes.first_name = Some(value),
                        "--last" => changes.last_name = Some(value),
                        "--grade" => changes.grade = Some(value),
                        "--id" => changes.student_id = Some(value),
                        _ => return Err(format!("unknown option `{flag}` for edit-student")),
                    }
                }
                Self::EditStudent {
                    student_id,
                    changes,
                }
            }
            "edit-ebook" => {
                let code = positional(&mut args, "code")?;
                let mut changes = EbookChanges::default();
                while let Some(flag) = args.next() {
                    let value = flag_value(&mut args, &flag)?;
                    match flag.as_str() {
                        "--name" => changes.name = Some(value),
                        "--code" => changes.code = Some(value),
                        _ => return Err(format!("unknown option `{flag}` for edit-ebook")),
                    }
                }
                Self::EditEbook { code, changes }
            }
            "pair" => Self::Pair {
                student_id: positional(&mut args, "student id")?,
                code: positional(&mut args, "code")?,
            },
            "unpair" => Self::Unpair {
                student_id: positional(&mut args, "student id")?,
            },
            "owner" => Self::Owner {
                code: positional(&mut args, "code")?,
            },
            "delete-student" => Self::DeleteStudent {
                student_id: positional(&mut args, "student id")?,
                assume_yes: yes_flag(&mut args)?,
            },
            "delete-ebook" => Self::DeleteEbook {
                code: positional(&mut args, "code")?,
                assume_yes: yes_flag(&mut args)?,
            },
            "export" => Self::Export {
                dir: args.next().map(PathBuf::from),
            },
            "report" => Self::Report,
            "help" | "-h" | "--help" => Self::Help,
            other => return Err(format!("unknown command `{other}`")),
        };

        if let Some(extra) = args.next() {
            return Err(format!("unexpected argument `{extra}`"));
        }
        Ok(command)
    }
}

fn positional(
    args: &mut impl Iterator<Item = String>,
    what: &str,
) -> std::result::Result<String, String> {
    args.next().ok_or_else(|| format!("missing {what}"))
}

fn flag_value(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> std::result::Result<String, String> {
    args.next()
        .ok_or_else(|| format!("missing value for `{flag}`"))
}

fn yes_flag(args: &mut impl Iterator<Item = String>) -> std::result::Result<bool, String> {
    match args.next().as_deref() {
        None => Ok(false),
        Some("--yes" | "-y") => Ok(true),
        Some(other) => Err(format!("unexpected argument `{other}`")),
    }
}

/// Asks yes/no questions on a terminal-like pair of streams.
pub struct LinePrompt<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<'a, R: BufRead, W: Write> LinePrompt<'a, R, W> {
    /// Prompt reading answers from `input` and writing questions to `output`.
    pub fn new(input: &'a mut R, output: &'a mut W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<'_, R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if write!(self.output, "{question} [y/N] ").is_err() || self.output.flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if self.input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Agrees to everything; used for `--yes`.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

async fn find_student<C>(db: &C, student_id: &str) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    get_student_by_student_id(db, student_id)
        .await?
        .ok_or_else(|| Error::UnknownIdentifier {
            kind: RecordKind::Student,
            value: student_id.to_string(),
        })
}

async fn find_ebook<C>(db: &C, code: &str) -> Result<ebook::Model>
where
    C: ConnectionTrait,
{
    get_ebook_by_code(db, code)
        .await?
        .ok_or_else(|| Error::UnknownIdentifier {
            kind: RecordKind::Ebook,
            value: code.to_string(),
        })
}

/// Runs `command` against the open session.
///
/// Confirmation questions are asked on `input`/`out` unless the command carries
/// `--yes`. Results are written to `out`.
#[instrument(skip_all, fields(command = ?command))]
#[allow(clippy::too_many_lines)]
pub async fn execute<R, W>(
    command: Command,
    session: &Session,
    config: &AppConfig,
    input: &mut R,
    out: &mut W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let db = session.connection()?;
    debug!("Executing command");

    match command {
        Command::Help => writeln!(out, "{USAGE}")?,
        Command::Students => {
            for student in get_all_students(db).await? {
                writeln!(
                    out,
                    "{:<10} {:<30} {:>5}  {}",
                    student.student_id,
                    student.full_name(),
                    student.grade,
                    student.ebook_code.as_deref().unwrap_or("-")
                )?;
            }
        }
        Command::Ebooks => {
            for ebook in get_all_ebooks(db).await? {
                writeln!(
                    out,
                    "{:<15} {:<30} {}",
                    ebook.code,
                    ebook.name,
                    ebook.assignment_date_display()
                )?;
            }
        }
        Command::AddStudent(draft) => {
            let student = create_student_record(session, draft).await?;
            writeln!(out, "Added student {student}")?;
        }
        Command::AddEbook(draft) => {
            let ebook = create_ebook_record(session, draft).await?;
            writeln!(out, "Added ebook '{}' ({})", ebook.name, ebook.code)?;
        }
        Command::EditStudent {
            student_id,
            changes,
        } => {
            let mut editor = StudentEditor::new();
            editor.select(find_student(db, &student_id).await?);
            let form = editor.form_mut();
            if let Some(value) = changes.first_name {
                form.first_name.set(value);
            }
            if let Some(value) = changes.last_name {
                form.last_name.set(value);
            }
            if let Some(value) = changes.grade {
                form.grade.set(value);
            }
            if let Some(value) = changes.student_id {
                form.student_id.set(value);
            }

            if editor.state() == EditState::Editing {
                editor.save(db).await?;
                if let Some(student) = editor.record() {
                    writeln!(out, "Saved student {student}")?;
                }
            } else {
                writeln!(out, "Nothing to change")?;
            }
        }
        Command::EditEbook { code, changes } => {
            let mut editor = EbookEditor::new();
            editor.select(find_ebook(db, &code).await?);
            let form = editor.form_mut();
            if let Some(value) = changes.name {
                form.name.set(value);
            }
            if let Some(value) = changes.code {
                form.code.set(value);
            }

            if editor.state() == EditState::Editing {
                editor.save(db).await?;
                if let Some(ebook) = editor.record() {
                    writeln!(out, "Saved ebook '{}' ({})", ebook.name, ebook.code)?;
                }
            } else {
                writeln!(out, "Nothing to change")?;
            }
        }
        Command::Pair { student_id, code } => {
            let mut ebook = find_ebook(db, &code).await?;
            let mut editor = StudentEditor::new();
            editor.select(find_student(db, &student_id).await?);
            editor.pair_with(db, &mut ebook).await?;
            writeln!(
                out,
                "Paired {student_id} with '{}' on {}",
                ebook.code,
                ebook.assignment_date_display()
            )?;
        }
        Command::Unpair { student_id } => {
            let mut editor = StudentEditor::new();
            editor.select(find_student(db, &student_id).await?);
            match editor.unpair(db).await? {
                Some(ebook) => writeln!(out, "Took '{}' from {student_id}", ebook.code)?,
                None => writeln!(out, "{student_id} holds no ebook")?,
            }
        }
        Command::Owner { code } => {
            let ebook = find_ebook(db, &code).await?;
            if let Some(owner) = find_owner(db, &ebook.code).await? {
                writeln!(out, "{owner} since {}", ebook.assignment_date_display())?;
            } else if is_orphaned(db, &ebook).await? {
                writeln!(
                    out,
                    "Nobody holds '{code}' (stale assignment date {})",
                    ebook.assignment_date_display()
                )?;
            } else {
                writeln!(out, "Nobody holds '{code}'")?;
            }
        }
        Command::DeleteStudent {
            student_id,
            assume_yes,
        } => {
            let mut editor = StudentEditor::new();
            editor.select(find_student(db, &student_id).await?);
            let deleted = if assume_yes {
                editor.delete(db, &mut AssumeYes).await?
            } else {
                editor.delete(db, &mut LinePrompt::new(input, out)).await?
            };
            if deleted {
                writeln!(out, "Deleted student {student_id}")?;
            }
        }
        Command::DeleteEbook { code, assume_yes } => {
            let mut editor = EbookEditor::new();
            editor.select(find_ebook(db, &code).await?);
            let deleted = if assume_yes {
                editor.delete(db, &mut AssumeYes).await?
            } else {
                editor.delete(db, &mut LinePrompt::new(input, out)).await?
            };
            if deleted {
                writeln!(out, "Deleted ebook '{code}'")?;
            }
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| config.exports_dir());
            let files = export_all(db, &dir, Local::now()).await?;
            writeln!(out, "CSV files created in {}", dir.display())?;
            writeln!(out, "  {}", files.students.display())?;
            writeln!(out, "  {}", files.ebooks.display())?;
        }
        Command::Report => {
            let report = generate_redemption_report(db, Local::now()).await?;
            let path = report.write_to(&config.reports_dir(), config.report_page_lines)?;
            writeln!(
                out,
                "Your report was successfully created at {}",
                path.display()
            )?;
        }
    }
    Ok(())
}
