//! Book persistence over SQLite with explicit row mapping.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use folio_db::{sqlite::Database, Result};

use super::models::{Book, BookInput};

/// Storage port for catalog books
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Book>>;
    async fn get(&self, id: &str) -> Result<Option<Book>>;
    /// Case-insensitive substring match on the author name
    async fn by_author(&self, author: &str) -> Result<Vec<Book>>;
    async fn insert(&self, input: BookInput) -> Result<Book>;
    /// Returns `None` when no book has this id
    async fn update(&self, id: &str, input: BookInput) -> Result<Option<Book>>;
    /// Returns whether a row was removed
    async fn delete(&self, id: &str) -> Result<bool>;
}

const SELECT_BOOK: &str = "SELECT id, title, author, year FROM books";

/// SQLite-backed [`BookRepository`]
#[derive(Clone)]
pub struct SqliteBookRepository {
    db: Database,
}

impl SqliteBookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn book_from_row(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get::<_, i64>("id")?.to_string(),
        title: row.get("title")?,
        author: row.get("author")?,
        year: row.get("year")?,
    })
}

/// Only the canonical spelling of a row id matches; `"01"`, `"+1"` and
/// `" 1"` are different ids that never exist.
fn row_id(id: &str) -> Option<i64> {
    id.parse::<i64>().ok().filter(|n| n.to_string() == id)
}

fn query_books(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(sql)?;
    let books = stmt
        .query_map(args, book_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

fn find_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    Ok(conn
        .query_row(&format!("{SELECT_BOOK} WHERE id = ?1"), params![id], book_from_row)
        .optional()?)
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn list(&self) -> Result<Vec<Book>> {
        self.db
            .call(|conn| query_books(conn, &format!("{SELECT_BOOK} ORDER BY id"), params![]))
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Book>> {
        let Some(id) = row_id(id) else {
            return Ok(None);
        };
        self.db.call(move |conn| find_book(conn, id)).await
    }

    async fn by_author(&self, author: &str) -> Result<Vec<Book>> {
        let needle = author.to_lowercase();
        self.db
            .call(move |conn| {
                query_books(
                    conn,
                    &format!("{SELECT_BOOK} WHERE instr(lower(author), ?1) > 0 ORDER BY id"),
                    params![needle],
                )
            })
            .await
    }

    async fn insert(&self, input: BookInput) -> Result<Book> {
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO books (title, author, year) VALUES (?1, ?2, ?3)",
                    params![input.title, input.author, input.year],
                )?;
                Ok(Book {
                    id: conn.last_insert_rowid().to_string(),
                    title: input.title,
                    author: input.author,
                    year: input.year,
                })
            })
            .await
    }

    async fn update(&self, id: &str, input: BookInput) -> Result<Option<Book>> {
        let Some(id) = row_id(id) else {
            return Ok(None);
        };
        self.db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE books SET title = ?1, author = ?2, year = ?3 WHERE id = ?4",
                    params![input.title, input.author, input.year, id],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                find_book(conn, id)
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = row_id(id) else {
            return Ok(false);
        };
        self.db
            .call(move |conn| Ok(conn.execute("DELETE FROM books WHERE id = ?1", params![id])? > 0))
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::modules::books::BooksModule;
    use folio_kernel::Module;

    pub(crate) async fn repository() -> SqliteBookRepository {
        let db = Database::open_in_memory().unwrap();
        let migrations = BooksModule::new()
            .migrations()
            .into_iter()
            .map(|migration| ("books".to_string(), migration))
            .collect();
        db.migrate(migrations).await.unwrap();
        SqliteBookRepository::new(db)
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_get_reads_back() {
        let repo = repository().await;

        let dune = repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();
        let emma = repo.insert(BookInput::new("Emma", "Jane Austen", 1815)).await.unwrap();

        assert_eq!(dune.id, "1");
        assert_eq!(emma.id, "2");
        assert_eq!(repo.get("1").await.unwrap(), Some(dune));
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_numeric_ids_are_not_found() {
        let repo = repository().await;
        repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();

        assert_eq!(repo.get("abc").await.unwrap(), None);
        assert_eq!(repo.update("abc", BookInput::default()).await.unwrap(), None);
        assert!(!repo.delete("abc").await.unwrap());
    }

    #[tokio::test]
    async fn non_canonical_spellings_are_not_found() {
        let repo = repository().await;
        repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();

        for id in ["01", "+1", " 1", "1 ", "1.0"] {
            assert_eq!(repo.get(id).await.unwrap(), None, "get({id:?})");
            assert_eq!(repo.update(id, BookInput::default()).await.unwrap(), None, "update({id:?})");
            assert!(!repo.delete(id).await.unwrap(), "delete({id:?})");
        }
        assert!(repo.get("1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn by_author_is_case_insensitive_substring() {
        let repo = repository().await;
        repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();
        repo.insert(BookInput::new("Emma", "Jane Austen", 1815)).await.unwrap();
        repo.insert(BookInput::new("Persuasion", "Jane Austen", 1817)).await.unwrap();

        let austen = repo.by_author("AUSTEN").await.unwrap();
        assert_eq!(austen.len(), 2);
        assert!(austen.iter().all(|book| book.author == "Jane Austen"));

        assert!(repo.by_author("100%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_all_fields() {
        let repo = repository().await;
        let book = repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();

        let updated = repo
            .update(&book.id, BookInput::new("Dune Messiah", "Frank Herbert", 1969))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.year, 1969);
        assert_eq!(repo.update("99", BookInput::default()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_row_once() {
        let repo = repository().await;
        let book = repo.insert(BookInput::new("Dune", "Frank Herbert", 1965)).await.unwrap();

        assert!(repo.delete(&book.id).await.unwrap());
        assert!(!repo.delete(&book.id).await.unwrap());
        assert_eq!(repo.get(&book.id).await.unwrap(), None);
    }
}
