//! Redemption report generation.
//!
//! The report lists every student who currently holds an ebook, one line each, under a
//! title header. Lines are laid out on fixed-size pages; the first page loses
//! [`HEADER_LINES`] of its capacity to the header. Building the report is separate from
//! rendering it, so the structured data can be checked without touching the filesystem.

use crate::{
    entities::{Ebook, Student, ebook, student},
    errors::Result,
};
use chrono::{DateTime, Local};
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Title printed at the top of every report.
pub const REPORT_TITLE: &str = "E-Book Redemption Report";

/// Lines of a page taken by the title, rule, generation line and blank separator.
pub const HEADER_LINES: usize = 4;

/// Longest line kept intact; longer lines are cut and end in `...`.
pub const MAX_LINE_WIDTH: usize = 71;

const TRUNCATED_WIDTH: usize = MAX_LINE_WIDTH - 3;

/// Timestamp format used in report file names.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// A generated redemption report.
#[derive(Debug, Clone)]
pub struct RedemptionReport {
    /// When the report was generated
    pub generated_at: DateTime<Local>,
    /// One line per paired student, already truncated
    pub lines: Vec<String>,
}

/// Formats the report line for one paired student.
///
/// Returns a line like ` - ID '1001' (Ada Lovelace) assigned bookcode 'ALG-001'`,
/// truncated to [`MAX_LINE_WIDTH`] characters.
#[must_use]
pub fn format_redemption_line(student: &student::Model, ebook: &ebook::Model) -> String {
    let line = format!(
        " - ID '{}' ({} {}) assigned bookcode '{}'",
        student.student_id, student.first_name, student.last_name, ebook.code
    );
    truncate_line(line)
}

/// Cuts a line longer than [`MAX_LINE_WIDTH`] characters down to exactly that width,
/// ending in `...`.
#[must_use]
pub fn truncate_line(line: String) -> String {
    if line.chars().count() <= MAX_LINE_WIDTH {
        return line;
    }
    let mut cut: String = line.chars().take(TRUNCATED_WIDTH).collect();
    cut.push_str("...");
    cut
}

/// Builds the report from every student currently holding an ebook.
///
/// A student whose reference points at a missing ebook is left out.
pub async fn generate_redemption_report<C>(
    db: &C,
    generated_at: DateTime<Local>,
) -> Result<RedemptionReport>
where
    C: ConnectionTrait,
{
    let pairs = Student::find()
        .find_also_related(Ebook)
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await?;

    let lines: Vec<String> = pairs
        .iter()
        .filter_map(|(student, ebook)| {
            ebook
                .as_ref()
                .map(|ebook| format_redemption_line(student, ebook))
        })
        .collect();

    debug!(
        "Report covers {} of {} students",
        lines.len(),
        pairs.len()
    );
    Ok(RedemptionReport {
        generated_at,
        lines,
    })
}

impl RedemptionReport {
    /// Splits the lines into pages of `page_lines`, the first page holding
    /// [`HEADER_LINES`] fewer. There is always at least one page.
    #[must_use]
    pub fn pages(&self, page_lines: usize) -> Vec<&[String]> {
        let page_lines = page_lines.max(1);
        let first_capacity = page_lines.saturating_sub(HEADER_LINES).max(1);

        let split = first_capacity.min(self.lines.len());
        let (first, rest) = self.lines.split_at(split);

        let mut pages = vec![first];
        pages.extend(rest.chunks(page_lines));
        pages
    }

    /// Header block: title, rule, generation timestamp and a blank line.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        vec![
            REPORT_TITLE.to_string(),
            "=".repeat(REPORT_TITLE.len()),
            format!(
                "Report generated on {} at {}",
                self.generated_at.format("%B %d, %Y"),
                self.generated_at.format("%I:%M %p")
            ),
            String::new(),
        ]
    }

    /// Renders the report as plain text. Pages are separated by a form feed and end
    /// with a `Page n of m` footer.
    #[must_use]
    pub fn render(&self, page_lines: usize) -> String {
        let pages = self.pages(page_lines);
        let total = pages.len();
        let mut out = String::new();

        for (index, page) in pages.into_iter().enumerate() {
            if index == 0 {
                for line in self.header() {
                    out.push_str(&line);
                    out.push('\n');
                }
            } else {
                out.push('\u{c}');
            }
            for line in page {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("\nPage {} of {}\n", index + 1, total));
        }
        out
    }

    /// File name of the report inside the reports directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "report-{}.txt",
            self.generated_at.format(REPORT_TIMESTAMP_FORMAT)
        )
    }

    /// Renders the report into `dir` and returns the written path.
    pub fn write_to(&self, dir: &Path, page_lines: usize) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        fs::write(&path, self.render(page_lines))?;
        info!(
            "Wrote redemption report with {} lines to {}",
            self.lines.len(),
            path.display()
        );
        Ok(path)
    }
}
