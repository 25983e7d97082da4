//! Record Operations
//!
//! One function per catalog action. Each call invokes the matching server-side
//! routine with bound parameters; command-style routines return `()` and
//! table-returning routines return the raw `QueryResult` for rendering.

use serde::{Deserialize, Serialize};

use crate::engine::{CatalogClient, QueryResult};
use crate::error::{LibraryError, Result};

const CLEAR_TABLE_SQL: &str = "CALL ClearTable()";
const ADD_BOOK_SQL: &str = "CALL AddBook($1::varchar, $2::varchar, $3::int)";
const UPDATE_BOOK_SQL: &str = "CALL UpdateBook($1::int, $2::varchar, $3::varchar, $4::int)";
const DELETE_BY_TITLE_SQL: &str = "CALL DeleteBookByTitle($1::varchar)";
const FIND_BY_TITLE_SQL: &str = "SELECT * FROM FindBookByTitle($1::varchar)";
const FIND_BY_AUTHOR_SQL: &str = "SELECT * FROM FindBookByAuthor($1::varchar)";
const FIND_BY_YEAR_SQL: &str = "SELECT * FROM FindBookByYear($1::int)";
const VIEW_ALL_SQL: &str = "SELECT * FROM ViewAllRecords()";

/// A stored book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Server-assigned identity
    pub id: i32,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Publication year
    pub year: i32,
}

/// Field values for insert and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Publication year
    pub year: i32,
}

impl NewBook {
    /// Create field values
    pub fn new(title: impl Into<String>, author: impl Into<String>, year: i32) -> Self {
        Self { title: title.into(), author: author.into(), year }
    }
}

/// Remove every book
pub async fn clear_table<C: CatalogClient>(client: &C) -> Result<()> {
    client.execute(CLEAR_TABLE_SQL, &[]).await?;
    Ok(())
}

/// Insert a book; the server assigns the id
pub async fn add_book<C: CatalogClient>(client: &C, book: &NewBook) -> Result<()> {
    client.execute(ADD_BOOK_SQL, &[&book.title, &book.author, &book.year]).await?;
    Ok(())
}

/// Books with exactly this title, in store order
pub async fn find_by_title<C: CatalogClient>(client: &C, title: &str) -> Result<QueryResult> {
    client.query(FIND_BY_TITLE_SQL, &[&title]).await
}

/// Books with exactly this author, in store order
pub async fn find_by_author<C: CatalogClient>(client: &C, author: &str) -> Result<QueryResult> {
    client.query(FIND_BY_AUTHOR_SQL, &[&author]).await
}

/// Books published in `year`, in store order
pub async fn find_by_year<C: CatalogClient>(client: &C, year: i32) -> Result<QueryResult> {
    client.query(FIND_BY_YEAR_SQL, &[&year]).await
}

/// Replace title, author and year of the book with `id`
///
/// An unknown id is not an error; nothing changes.
pub async fn update_book<C: CatalogClient>(client: &C, id: i32, book: &NewBook) -> Result<()> {
    client.execute(UPDATE_BOOK_SQL, &[&id, &book.title, &book.author, &book.year]).await?;
    Ok(())
}

/// Delete every book with exactly this title
pub async fn delete_by_title<C: CatalogClient>(client: &C, title: &str) -> Result<()> {
    client.execute(DELETE_BY_TITLE_SQL, &[&title]).await?;
    Ok(())
}

/// Every book ordered by ascending id
pub async fn view_all<C: CatalogClient>(client: &C) -> Result<QueryResult> {
    client.query(VIEW_ALL_SQL, &[]).await
}

/// Decode a catalog result set into books
///
/// # Errors
/// Returns `QueryFailed` if a column is missing or has an unexpected type.
pub fn books(result: &QueryResult) -> Result<Vec<Book>> {
    let col = |name: &str| {
        result
            .column_index(name)
            .ok_or_else(|| LibraryError::query_failed(format!("Result has no '{name}' column")))
    };
    let (id, title, author, year) = (col("id")?, col("title")?, col("author")?, col("year")?);

    result
        .rows
        .iter()
        .map(|row| -> Result<Book> {
            Ok(Book {
                id: int_at(row, id)?,
                title: text_at(row, title)?,
                author: text_at(row, author)?,
                year: int_at(row, year)?,
            })
        })
        .collect()
}

fn int_at(row: &[serde_json::Value], idx: usize) -> Result<i32> {
    row.get(idx)
        .and_then(serde_json::Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| LibraryError::query_failed(format!("Column {idx} is not an integer")))
}

fn text_at(row: &[serde_json::Value], idx: usize) -> Result<String> {
    row.get(idx)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LibraryError::query_failed(format!("Column {idx} is not text")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::RecordingClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn book_result(rows: Vec<Vec<serde_json::Value>>) -> QueryResult {
        QueryResult {
            columns: vec!["id".into(), "title".into(), "author".into(), "year".into()],
            rows,
        }
    }

    #[tokio::test]
    async fn test_values_are_bound_not_concatenated() {
        let client = RecordingClient::new();
        let book = NewBook::new("O'Reilly's Guide", "Robert'); DROP TABLE book;--", 2001);

        add_book(&client, &book).await.unwrap();
        update_book(&client, 3, &book).await.unwrap();
        delete_by_title(&client, "Dune").await.unwrap();

        let statements = client.statements();
        assert!(statements[0].starts_with("CALL AddBook($1::varchar, $2::varchar, $3::int) ["));
        assert!(statements[0].ends_with(", 2001]"));
        assert!(statements[1]
            .starts_with("CALL UpdateBook($1::int, $2::varchar, $3::varchar, $4::int) [3, "));
        assert_eq!(statements[2], "CALL DeleteBookByTitle($1::varchar) [\"Dune\"]");
    }

    #[tokio::test]
    async fn test_searches_call_matching_routines() {
        let client = RecordingClient::new();

        find_by_title(&client, "Dune").await.unwrap();
        find_by_author(&client, "Herbert").await.unwrap();
        find_by_year(&client, 1965).await.unwrap();
        view_all(&client).await.unwrap();
        clear_table(&client).await.unwrap();

        assert_eq!(
            client.statements(),
            vec![
                "SELECT * FROM FindBookByTitle($1::varchar) [\"Dune\"]",
                "SELECT * FROM FindBookByAuthor($1::varchar) [\"Herbert\"]",
                "SELECT * FROM FindBookByYear($1::int) [1965]",
                "SELECT * FROM ViewAllRecords() []",
                "CALL ClearTable() []",
            ]
        );
    }

    #[tokio::test]
    async fn test_query_failure_is_reported() {
        let client = RecordingClient::new().failing_on("ViewAllRecords");
        let err = view_all(&client).await.unwrap_err();
        assert_eq!(err.error_code(), "QUERY_FAILED");
    }

    #[test]
    fn test_books_decoding() {
        let result = book_result(vec![
            vec![json!(1), json!("Dune"), json!("Herbert"), json!(1965)],
            vec![json!(2), json!("Emma"), json!("Austen"), json!(1815)],
        ]);

        let decoded = books(&result).unwrap();
        assert_eq!(
            decoded,
            vec![
                Book { id: 1, title: "Dune".into(), author: "Herbert".into(), year: 1965 },
                Book { id: 2, title: "Emma".into(), author: "Austen".into(), year: 1815 },
            ]
        );
    }

    #[test]
    fn test_books_decoding_rejects_bad_shapes() {
        let missing = QueryResult { columns: vec!["id".into()], rows: vec![] };
        assert!(books(&missing).unwrap_err().message().contains("'title'"));

        let wrong_type =
            book_result(vec![vec![json!("one"), json!("Dune"), json!("Herbert"), json!(1965)]]);
        assert!(books(&wrong_type).is_err());
    }
}
