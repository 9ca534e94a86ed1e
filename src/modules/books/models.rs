use serde::{Deserialize, Serialize};

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier, opaque to clients
    pub id: String,
    pub title: String,
    pub author: String,
    /// Publication year
    pub year: i32,
}

/// Fields accepted when creating or replacing a book.
///
/// Missing fields deserialize to empty values so the validator can report
/// which one is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: i32,
}

impl BookInput {
    pub fn new(title: impl Into<String>, author: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year,
        }
    }
}

/// Query string for `GET /api/books`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub author: Option<String>,
}
