//! Ebook entity - A redemption code for an e-textbook.
//!
//! `assignment_date` is set while some student holds the code and cleared when the
//! pairing goes away.

use chrono::Local;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ebook database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ebooks")]
pub struct Model {
    /// Storage-assigned identifier, never edited by the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Redemption code, unique among all ebooks
    #[sea_orm(unique)]
    pub code: String,
    /// Display name of the book (e.g., "Algebra I")
    pub name: String,
    /// When the code was handed to its current owner, None while unpaired
    pub assignment_date: Option<DateTimeUtc>,
}

/// Defines relationships between Ebook and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// At most one student holds an ebook
    #[sea_orm(has_one = "super::student::Entity")]
    Owner,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the ebook currently carries an assignment timestamp.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assignment_date.is_some()
    }

    /// Assignment date in local time as shown in tables, e.g. `03/14/24 09:26 AM`;
    /// empty when unpaired.
    #[must_use]
    pub fn assignment_date_display(&self) -> String {
        self.assignment_date
            .map(|date| {
                date.with_timezone(&Local)
                    .format("%m/%d/%y %I:%M %p")
                    .to_string()
            })
            .unwrap_or_default()
    }
}
