use std::collections::BTreeMap;

use diesel::sql_types::{Integer, Text};
use serde_derive::{Deserialize, Serialize};

use crate::DbError;

/// Model representing the catalog row of a translation dataset.
#[derive(Clone, Debug, PartialEq, Queryable, Deserialize, Serialize)]
pub struct Translation {
    pub translation: String,
    pub title: String,
    pub license: Option<String>,
}

/// Model representing a book of a translation.
#[derive(Clone, Debug, PartialEq, QueryableByName, Deserialize, Serialize)]
pub struct Book {
    #[diesel(sql_type = Integer)]
    pub id: i32,
    #[diesel(sql_type = Text)]
    pub name: String,
}

/// Model representing a Bible verse.
#[derive(Clone, Debug, PartialEq, QueryableByName, Deserialize, Serialize)]
pub struct Verse {
    #[diesel(sql_type = Integer)]
    pub book_id: i32,
    #[diesel(sql_type = Integer)]
    pub chapter: i32,
    #[diesel(sql_type = Integer)]
    pub verse: i32,
    #[diesel(sql_type = Text)]
    pub text: String,
}

/// Number of verses in each chapter of a book, keyed by chapter.
pub type ChapterCounts = BTreeMap<i32, i64>;

/// Aggregate counts for a translation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Stats {
    pub books_count: i64,
    /// Distinct chapter numbers across all books.
    pub chapters_count: i64,
    pub verses_count: i64,
}

/// Model representing a cross reference from one verse to a verse range.
#[derive(Clone, Debug, PartialEq, Queryable, Deserialize, Serialize)]
pub struct CrossReference {
    pub from_book: String,
    pub from_chapter: i32,
    pub from_verse: i32,
    pub to_book: String,
    pub to_chapter: i32,
    pub to_verse_start: i32,
    pub to_verse_end: Option<i32>,
    pub votes: i32,
}

/// Outcome of looking up one side of a comparison.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompareResult {
    Found { verses: Vec<Verse> },
    Error { message: String },
}

impl From<Result<Vec<Verse>, DbError>> for CompareResult {
    fn from(result: Result<Vec<Verse>, DbError>) -> Self {
        match result {
            Ok(verses) => CompareResult::Found { verses },
            Err(e) => CompareResult::Error {
                message: e.to_string(),
            },
        }
    }
}

/// Side-by-side lookups keyed by upper-cased translation identifier.
pub type Comparison = BTreeMap<String, CompareResult>;

mod passage;
pub use self::passage::Passage;
