//! Resolution of translation identifiers to datasets on disk.
//!
//! Every translation lives in its own SQLite file named after the
//! upper-cased identifier (`<ID>.db`) inside a single base directory, and
//! stores its books and verses in `<ID>_books` and `<ID>_verses`. Those
//! names end up in SQL text, so identifiers are checked against a strict
//! allow-list before anything touches the file system or a query.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::{establish_connection, DbConnection, DbError};

/// Directory holding the datasets when nothing else is configured.
pub const DEFAULT_BASE_DIR: &str = "bible_databases/formats/sqlite";

/// File name of the shared dataset holding cross references.
pub const SHARED_DATASET: &str = "translations.db";

const DATASET_EXTENSION: &str = "db";

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

/// A validated, upper-cased translation identifier (e.g. `KJV`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TranslationId(String);

impl TranslationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn table(&self, suffix: &str) -> Result<TableName, DbError> {
        TableName::new(format!("{}_{}", self.0, suffix))
    }
}

impl FromStr for TranslationId {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if IDENTIFIER.is_match(s) {
            Ok(TranslationId(s.to_uppercase()))
        } else {
            Err(DbError::validation(format!(
                "'{}' is not a valid translation identifier.",
                s
            )))
        }
    }
}

impl fmt::Display for TranslationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a relation inside a dataset, safe to interpolate into SQL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: String) -> Result<Self, DbError> {
        if IDENTIFIER.is_match(&name) {
            Ok(TableName(name))
        } else {
            Err(DbError::validation(format!(
                "'{}' is not a valid relation name.",
                name
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A translation dataset that exists on disk.
#[derive(Clone, Debug)]
pub struct DatasetRef {
    pub id: TranslationId,
    pub path: PathBuf,
    pub books: TableName,
    pub verses: TableName,
}

#[derive(QueryableByName)]
struct SchemaObject {
    #[diesel(sql_type = Text)]
    name: String,
}

impl DatasetRef {
    /// Opens the dataset and checks that its books and verses relations
    /// are present.
    pub fn connect(&self) -> Result<DbConnection, DbError> {
        let mut conn = establish_connection(&self.path)?;
        self.validate_schema(&mut conn)?;
        Ok(conn)
    }

    fn validate_schema(&self, conn: &mut DbConnection) -> Result<(), DbError> {
        let found: Vec<SchemaObject> = sql_query(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND lower(name) IN (lower(?), lower(?))",
        )
        .bind::<Text, _>(self.books.as_str())
        .bind::<Text, _>(self.verses.as_str())
        .load(conn)
        .map_err(|e| DbError::from_query(e, "Schema"))?;

        let missing: Vec<&str> = [&self.books, &self.verses]
            .iter()
            .map(|t| t.as_str())
            .filter(|t| !found.iter().any(|o| o.name.eq_ignore_ascii_case(t)))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DbError::Schema {
                cause: format!(
                    "dataset '{}' is missing {}",
                    self.path.display(),
                    missing.join(", ")
                ),
            })
        }
    }
}

/// A dataset file renamed to its canonical name.
#[derive(Clone, Debug, PartialEq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Maps translation identifiers to datasets under a base directory.
#[derive(Clone, Debug)]
pub struct Locator {
    base_dir: PathBuf,
}

impl Default for Locator {
    fn default() -> Self {
        Locator::new(DEFAULT_BASE_DIR)
    }
}

impl Locator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the shared cross reference dataset.
    pub fn shared_dataset(&self) -> PathBuf {
        self.base_dir.join(SHARED_DATASET)
    }

    /// Resolves a translation identifier to its dataset.
    ///
    /// The identifier is validated before the file system is consulted,
    /// so a rejected identifier never reaches a path or a query.
    pub fn resolve(&self, translation: &str) -> Result<DatasetRef, DbError> {
        let id: TranslationId = translation.parse()?;
        let file_name = format!("{}.{}", id, DATASET_EXTENSION);

        if file_name.eq_ignore_ascii_case(SHARED_DATASET) {
            return Err(DbError::validation(format!(
                "'{}' is not a translation.",
                translation
            )));
        }

        let path = self.base_dir.join(file_name);
        if !path.is_file() {
            return Err(DbError::DatasetNotFound {
                path: path.display().to_string(),
            });
        }
        debug!("Resolved translation {} to {}", id, path.display());

        Ok(DatasetRef {
            books: id.table("books")?,
            verses: id.table("verses")?,
            id,
            path,
        })
    }

    /// Every translation dataset in the base directory, sorted by file name.
    ///
    /// The shared dataset is not a translation and is left out.
    pub fn dataset_paths(&self) -> Result<Vec<PathBuf>, DbError> {
        let mut paths: Vec<PathBuf> = self
            .dataset_files()?
            .into_iter()
            .filter(|p| !is_shared_dataset(p))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Renames dataset files to their canonical upper-case names, keeping
    /// the extension.
    ///
    /// Files that are already canonical and the shared dataset are left
    /// alone. A file is also skipped when a different file already holds
    /// its canonical name.
    pub fn normalize_file_names(&self) -> Result<Vec<Rename>, DbError> {
        let mut files = self.dataset_files()?;
        files.sort();
        let mut existing: HashSet<String> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();

        let mut renames = vec![];
        for from in files.into_iter().filter(|p| !is_shared_dataset(p)) {
            let stem = match from.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            let canonical = format!("{}.{}", stem.to_uppercase(), DATASET_EXTENSION);
            if stem == stem.to_uppercase() {
                continue;
            }
            if existing.contains(&canonical) {
                warn!(
                    "Cannot rename {} to {}: file already exists",
                    from.display(),
                    canonical
                );
                continue;
            }

            let to = self.base_dir.join(&canonical);
            match fs::rename(&from, &to) {
                Ok(()) => {
                    info!("Renamed {} to {}", from.display(), to.display());
                    existing.insert(canonical);
                    renames.push(Rename { from, to });
                }
                Err(e) => warn!("Error renaming {}: {}", from.display(), e),
            }
        }

        Ok(renames)
    }

    fn dataset_files(&self) -> Result<Vec<PathBuf>, DbError> {
        if !self.base_dir.is_dir() {
            return Err(DbError::DatasetNotFound {
                path: self.base_dir.display().to_string(),
            });
        }

        let entries = fs::read_dir(&self.base_dir).map_err(|e| DbError::Engine {
            cause: format!("could not read {}: {}", self.base_dir.display(), e),
        })?;

        Ok(entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(DATASET_EXTENSION))
            .collect())
    }
}

fn is_shared_dataset(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.eq_ignore_ascii_case(SHARED_DATASET))
}
