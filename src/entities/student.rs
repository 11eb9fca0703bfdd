//! Student entity - A student on the school roster.
//!
//! `ebook_code` is the single source of truth for the pairing: it points at the
//! `code` of the ebook the student holds. The column is UNIQUE, so no two students
//! can reference the same code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Storage-assigned identifier, never edited by the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Grade as text, one of `"9"`, `"10"`, `"11"`, `"12"`
    pub grade: String,
    /// School-assigned student ID, unique among all students
    #[sea_orm(unique)]
    pub student_id: String,
    /// Code of the paired ebook, None while the student holds no ebook
    #[sea_orm(unique)]
    pub ebook_code: Option<String>,
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each student optionally holds one ebook, referenced by code
    #[sea_orm(
        belongs_to = "super::ebook::Entity",
        from = "Column::EbookCode",
        to = "super::ebook::Column::Code",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Ebook,
}

impl Related<super::ebook::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ebook.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the student currently references an ebook.
    #[must_use]
    pub const fn has_ebook(&self) -> bool {
        self.ebook_code.is_some()
    }

    /// `First Last` for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.first_name, self.last_name, self.student_id
        )?;
        if let Some(code) = &self.ebook_code {
            write!(f, " [{code}]")?;
        }
        Ok(())
    }
}

/// High-school grade a student can be enrolled in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    /// Freshman
    Ninth,
    /// Sophomore
    Tenth,
    /// Junior
    Eleventh,
    /// Senior
    Twelfth,
}

impl Grade {
    /// Every grade, in order, as offered by the grade dropdown.
    pub const ALL: [Self; 4] = [Self::Ninth, Self::Tenth, Self::Eleventh, Self::Twelfth];

    /// Stored text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ninth => "9",
            Self::Tenth => "10",
            Self::Eleventh => "11",
            Self::Twelfth => "12",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|grade| grade.as_str() == trimmed)
            .ok_or_else(|| crate::errors::Error::InvalidGrade {
                value: s.to_string(),
            })
    }
}
