//! Operation Catalog
//!
//! The fixed, closed list of grantable server-side routines, plus the
//! maintenance routine used by "Clear Table".
//!
//! Each routine has a fixed name and parameter signature. The signature is used
//! twice: to invoke the routine and to name it in `GRANT EXECUTE` statements.
//! The numbering shown to the user (1..=7) follows [`Operation::ALL`].

use serde::{Deserialize, Serialize};

/// Kind of server-side routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    /// Invoked with `CALL`, returns nothing
    Procedure,
    /// Invoked with `SELECT * FROM`, returns a table
    Function,
}

impl RoutineKind {
    /// SQL keyword used in `GRANT EXECUTE ON <keyword>`
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
        }
    }
}

/// A grantable catalog operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Insert a book
    Add,
    /// Search by exact title
    FindByTitle,
    /// Search by exact author
    FindByAuthor,
    /// Search by publication year
    FindByYear,
    /// Replace title, author and year of a book by id
    Update,
    /// Delete every book with the given title
    DeleteByTitle,
    /// List every book ordered by id
    ViewAll,
}

impl Operation {
    /// Catalog order; the 1-based position is the number shown to the user
    pub const ALL: [Self; 7] = [
        Self::Add,
        Self::FindByTitle,
        Self::FindByAuthor,
        Self::FindByYear,
        Self::Update,
        Self::DeleteByTitle,
        Self::ViewAll,
    ];

    /// Operations granted to the read-only seed role
    pub const READ_ONLY: [Self; 4] =
        [Self::FindByTitle, Self::FindByAuthor, Self::FindByYear, Self::ViewAll];

    /// Look up an operation by its 1-based catalog number
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Server-side routine name
    #[must_use]
    pub const fn routine_name(&self) -> &'static str {
        match self {
            Self::Add => "AddBook",
            Self::FindByTitle => "FindBookByTitle",
            Self::FindByAuthor => "FindBookByAuthor",
            Self::FindByYear => "FindBookByYear",
            Self::Update => "UpdateBook",
            Self::DeleteByTitle => "DeleteBookByTitle",
            Self::ViewAll => "ViewAllRecords",
        }
    }

    /// Parameter type list as used in grant statements
    #[must_use]
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::Add => "VARCHAR, VARCHAR, INT",
            Self::FindByTitle | Self::FindByAuthor | Self::DeleteByTitle => "VARCHAR",
            Self::FindByYear => "INT",
            Self::Update => "INT, VARCHAR, VARCHAR, INT",
            Self::ViewAll => "",
        }
    }

    /// Procedure or function
    #[must_use]
    pub const fn kind(&self) -> RoutineKind {
        match self {
            Self::Add | Self::Update | Self::DeleteByTitle => RoutineKind::Procedure,
            Self::FindByTitle | Self::FindByAuthor | Self::FindByYear | Self::ViewAll => {
                RoutineKind::Function
            }
        }
    }

    /// Whether the routine only reads the book table
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.kind(), RoutineKind::Function)
    }

    /// `GRANT EXECUTE` template with a single `%I` placeholder for the grantee
    #[must_use]
    pub fn grant_template(&self) -> String {
        format!("GRANT EXECUTE ON {} TO %I", self.routine_target())
    }

    /// Withdraws the default `EXECUTE` privilege every role gets through `PUBLIC`
    #[must_use]
    pub fn revoke_public_statement(&self) -> String {
        format!("REVOKE EXECUTE ON {} FROM PUBLIC", self.routine_target())
    }

    fn routine_target(&self) -> String {
        routine_target(self.kind(), self.routine_name(), self.signature())
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.routine_name())
    }
}

/// Maintenance routine behind "Clear Table"; granted to the admin role only
pub const CLEAR_TABLE_ROUTINE: &str = "ClearTable";

/// `GRANT EXECUTE` template for the maintenance routine
#[must_use]
pub fn clear_table_grant_template() -> String {
    format!("GRANT EXECUTE ON {} TO %I", clear_table_target())
}

/// `REVOKE EXECUTE ... FROM PUBLIC` for the maintenance routine
#[must_use]
pub fn clear_table_revoke_public_statement() -> String {
    format!("REVOKE EXECUTE ON {} FROM PUBLIC", clear_table_target())
}

fn clear_table_target() -> String {
    routine_target(RoutineKind::Procedure, CLEAR_TABLE_ROUTINE, "")
}

fn routine_target(kind: RoutineKind, name: &str, signature: &str) -> String {
    format!("{} {name}({signature})", kind.keyword())
}

/// Result of parsing a comma-separated selection of catalog numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected operations in input order (duplicates preserved)
    pub operations: Vec<Operation>,

    /// Numeric tokens outside 1..=7 (dropped without feedback)
    pub out_of_range: Vec<String>,

    /// Tokens that are not numbers (skipped and counted)
    pub invalid: Vec<String>,
}

/// Parse a selection such as `"1,3,9,abc,5"`
///
/// Tokens are trimmed; empty tokens are ignored. Numbers in 1..=7 map to
/// catalog operations, other numbers are dropped, and non-numeric tokens are
/// recorded as invalid without stopping the parse.
#[must_use]
pub fn parse_selection(input: &str) -> Selection {
    let mut selection = Selection::default();

    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<i64>() {
            Ok(n) => match usize::try_from(n).ok().and_then(Operation::from_index) {
                Some(op) => selection.operations.push(op),
                None => selection.out_of_range.push(token.to_string()),
            },
            Err(_) => selection.invalid.push(token.to_string()),
        }
    }

    selection
}
