//! Console Menu Loop
//!
//! Prints the menu, reads a choice, dispatches it and repeats until "Exit".
//! Every action ends with a success line, a result table or an error line;
//! database errors never end the loop. Only a failing console (closed stdin)
//! stops it early, and both connections are closed on the way out.
//!
//! Titles and authors are passed to the database exactly as typed.

use crate::catalog::Operation;
use crate::console::{prompt_number, prompt_required, Console};
use crate::engine::{CatalogClient, DatabaseConnection, QueryResult};
use crate::error::{LibraryError, Result};
use crate::output::{OutputFormat, Printer};
use crate::records::{self, NewBook};
use crate::roles::{self, RoleReport, RoleRequest};
use crate::session::{DatabaseSetup, Session};

const MENU: &str = "\
Menu:
1. Create Database
2. Delete Database
3. Clear Table
4. Add Record
5. Search Record
6. Update Record
7. Delete Record
8. View All Records
9. Create Role with Selective Permissions
0. Exit";

const SEARCH_MENU: &str = "\
Search by:
1. Title
2. Author
3. Year";

const INVALID_CHOICE: &str = "Invalid choice";
const CANCELLED: &str = "Action cancelled.";

/// Top-level menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// 1
    CreateDatabase,
    /// 2
    DeleteDatabase,
    /// 3
    ClearTable,
    /// 4
    AddRecord,
    /// 5
    Search,
    /// 6
    UpdateRecord,
    /// 7
    DeleteRecord,
    /// 8
    ViewAll,
    /// 9
    CreateRole,
    /// 0
    Exit,
}

impl MenuChoice {
    /// Parse a menu entry; anything but 0..=9 is `None`
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<u8>().ok()? {
            1 => Some(Self::CreateDatabase),
            2 => Some(Self::DeleteDatabase),
            3 => Some(Self::ClearTable),
            4 => Some(Self::AddRecord),
            5 => Some(Self::Search),
            6 => Some(Self::UpdateRecord),
            7 => Some(Self::DeleteRecord),
            8 => Some(Self::ViewAll),
            9 => Some(Self::CreateRole),
            0 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Command name used in JSON envelopes and logs
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::CreateDatabase => "create_database",
            Self::DeleteDatabase => "delete_database",
            Self::ClearTable => "clear_table",
            Self::AddRecord => "add",
            Self::Search => "search",
            Self::UpdateRecord => "update",
            Self::DeleteRecord => "delete_by_title",
            Self::ViewAll => "view_all",
            Self::CreateRole => "create_role",
            Self::Exit => "exit",
        }
    }
}

/// Search sub-menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchChoice {
    /// 1
    Title,
    /// 2
    Author,
    /// 3
    Year,
}

impl SearchChoice {
    /// Parse a sub-menu entry; anything but 1..=3 is `None`
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<u8>().ok()? {
            1 => Some(Self::Title),
            2 => Some(Self::Author),
            3 => Some(Self::Year),
            _ => None,
        }
    }

    const fn command(self) -> &'static str {
        match self {
            Self::Title => "find_by_title",
            Self::Author => "find_by_author",
            Self::Year => "find_by_year",
        }
    }
}

/// What an action produced
#[derive(Debug)]
pub enum Outcome {
    /// A status line
    Message(String),
    /// A result set under a command name
    Rows(&'static str, QueryResult),
    /// Catalog database created or found, schema provisioned
    Database(DatabaseSetup),
    /// Role created and grants attempted
    Role(RoleReport),
    /// Nothing was done; the text goes to stderr
    Notice(&'static str),
}

/// Run the menu until "Exit" or until the console fails
///
/// Consumes the session: both connections are closed before returning.
///
/// # Errors
/// Returns `ConsoleError` when input can no longer be read.
pub async fn run<C: DatabaseConnection, K: Console>(
    mut session: Session<C>,
    console: &mut K,
    printer: Printer,
    year_attempts: u32,
) -> Result<()> {
    let result = menu_loop(&mut session, console, printer, year_attempts).await;

    for database in session.close().await {
        printer.success("close", &format!("Connection to '{database}' database closed."));
    }
    if result.is_ok() {
        printer.success("exit", "Exiting the program.");
    }

    result
}

async fn menu_loop<C: DatabaseConnection, K: Console>(
    session: &mut Session<C>,
    console: &mut K,
    printer: Printer,
    year_attempts: u32,
) -> Result<()> {
    loop {
        console.show(MENU);
        let line = console.text("Enter your choice")?;

        let Some(choice) = MenuChoice::parse(&line) else {
            console.notice(INVALID_CHOICE);
            continue;
        };

        tracing::debug!(command = choice.command(), "dispatching");
        match dispatch(session, choice, console, year_attempts).await {
            Ok(None) => return Ok(()),
            Ok(Some(outcome)) => report(console, printer, choice.command(), outcome),
            Err(e @ LibraryError::ConsoleError(_)) => return Err(e),
            Err(e) => {
                tracing::debug!(command = choice.command(), error = %e, "action failed");
                printer.error(choice.command(), &e);
            }
        }
    }
}

/// Run one menu action; `None` means the user chose "Exit"
async fn dispatch<C: DatabaseConnection, K: Console>(
    session: &mut Session<C>,
    choice: MenuChoice,
    console: &mut K,
    year_attempts: u32,
) -> Result<Option<Outcome>> {
    let outcome = match choice {
        MenuChoice::Exit => return Ok(None),
        MenuChoice::CreateDatabase => Outcome::Database(session.create_database().await?),
        MenuChoice::DeleteDatabase => {
            session.drop_database().await?;
            Outcome::Message(format!("Database '{}' deleted.", session.catalog_database()))
        }
        MenuChoice::ClearTable => clear_table(session.catalog()?).await?,
        MenuChoice::AddRecord => add_record(session.catalog()?, console, year_attempts).await?,
        MenuChoice::Search => search(session.catalog()?, console, year_attempts).await?,
        MenuChoice::UpdateRecord => {
            update_record(session.catalog()?, console, year_attempts).await?
        }
        MenuChoice::DeleteRecord => delete_record(session.catalog()?, console).await?,
        MenuChoice::ViewAll => view_all(session.catalog()?).await?,
        MenuChoice::CreateRole => create_role(session.catalog()?, console).await?,
    };
    Ok(Some(outcome))
}

fn report<K: Console>(console: &mut K, printer: Printer, command: &str, outcome: Outcome) {
    match outcome {
        Outcome::Message(message) => printer.success(command, &message),
        Outcome::Rows(command, result) => printer.rows(command, &result),
        Outcome::Database(setup) => printer.data(command, &setup, &database_summary(&setup)),
        Outcome::Role(role_report) => {
            if printer.format() == OutputFormat::Table {
                for grant in role_report.grants.iter().filter(|g| !g.succeeded()) {
                    let message = grant.error.clone().unwrap_or_default();
                    printer.error(
                        command,
                        &LibraryError::statement_failed(format!(
                            "GRANT on {} failed: {message}",
                            grant.operation
                        )),
                    );
                }
            }
            printer.data(command, &role_report, &role_summary(&role_report));
        }
        Outcome::Notice(text) => console.notice(text),
    }
}

/// Status lines for "Create Database"
#[must_use]
pub fn database_summary(setup: &DatabaseSetup) -> String {
    let database_line = if setup.created {
        format!("Database '{}' created.", setup.database)
    } else {
        format!("Database '{}' already exists.", setup.database)
    };

    let mut lines = vec![database_line];
    for role in &setup.provisioning.roles_created {
        lines.push(format!("Role '{role}' created."));
    }
    lines.push("Table 'book' created or already exists.".to_string());
    lines.join("\n")
}

/// Status lines for a role provisioning run (failed grants are reported separately)
#[must_use]
pub fn role_summary(report: &RoleReport) -> String {
    let mut lines: Vec<String> = report
        .granted()
        .iter()
        .map(|op| format!("Granted {op} to '{}'.", report.role))
        .collect();

    if !report.skipped_tokens.is_empty() {
        lines.push(format!(
            "Skipped {} invalid selection token(s): {}",
            report.skipped_tokens.len(),
            report.skipped_tokens.join(", ")
        ));
    }
    lines.push(format!("Role '{}' created with selected permissions.", report.role));
    lines.join("\n")
}

/// Numbered operation listing shown before the grant selection prompt
fn catalog_listing() -> String {
    let mut out = String::from("Available operations:");
    for (i, op) in Operation::ALL.iter().enumerate() {
        out.push_str(&format!("\n{}. {}({})", i + 1, op.routine_name(), op.signature()));
    }
    out
}

async fn clear_table<C: CatalogClient>(client: &C) -> Result<Outcome> {
    records::clear_table(client).await?;
    Ok(Outcome::Message("Table 'book' cleared.".to_string()))
}

async fn add_record<C: CatalogClient, K: Console>(
    client: &C,
    console: &mut K,
    year_attempts: u32,
) -> Result<Outcome> {
    let title = console.text("Enter title")?;
    let author = console.text("Enter author")?;
    let Some(year) = prompt_number(console, "Enter year", year_attempts)? else {
        return Ok(Outcome::Notice(CANCELLED));
    };

    records::add_book(client, &NewBook::new(title, author, year)).await?;
    Ok(Outcome::Message("Book added successfully.".to_string()))
}

async fn search<C: CatalogClient, K: Console>(
    client: &C,
    console: &mut K,
    year_attempts: u32,
) -> Result<Outcome> {
    console.show(SEARCH_MENU);
    let Some(choice) = SearchChoice::parse(&console.text("Enter your choice")?) else {
        return Ok(Outcome::Notice(INVALID_CHOICE));
    };

    let result = match choice {
        SearchChoice::Title => {
            let title = console.text("Enter title")?;
            records::find_by_title(client, &title).await?
        }
        SearchChoice::Author => {
            let author = console.text("Enter author")?;
            records::find_by_author(client, &author).await?
        }
        SearchChoice::Year => {
            let Some(year) = prompt_number(console, "Enter year", year_attempts)? else {
                return Ok(Outcome::Notice(CANCELLED));
            };
            records::find_by_year(client, year).await?
        }
    };

    Ok(Outcome::Rows(choice.command(), result))
}

async fn update_record<C: CatalogClient, K: Console>(
    client: &C,
    console: &mut K,
    year_attempts: u32,
) -> Result<Outcome> {
    let Some(id) = prompt_number(console, "Enter book ID", year_attempts)? else {
        return Ok(Outcome::Notice(CANCELLED));
    };
    let title = console.text("Enter new title")?;
    let author = console.text("Enter new author")?;
    let Some(year) = prompt_number(console, "Enter new year", year_attempts)? else {
        return Ok(Outcome::Notice(CANCELLED));
    };

    records::update_book(client, id, &NewBook::new(title, author, year)).await?;
    Ok(Outcome::Message("Book updated successfully.".to_string()))
}

async fn delete_record<C: CatalogClient, K: Console>(
    client: &C,
    console: &mut K,
) -> Result<Outcome> {
    let title = console.text("Enter title")?;
    records::delete_by_title(client, &title).await?;
    Ok(Outcome::Message("Book deleted successfully.".to_string()))
}

async fn view_all<C: CatalogClient>(client: &C) -> Result<Outcome> {
    Ok(Outcome::Rows(MenuChoice::ViewAll.command(), records::view_all(client).await?))
}

async fn create_role<C: CatalogClient, K: Console>(client: &C, console: &mut K) -> Result<Outcome> {
    let name = prompt_required(console, "Enter role name")?;
    let password = console.password("Enter password")?;
    let request = RoleRequest::new(name, password)?;

    console.show(&catalog_listing());
    let selection = console.text("Enter operation numbers (comma-separated)")?;

    let report = roles::provision_role(client, &request, &selection).await?;
    Ok(Outcome::Role(report))
}
