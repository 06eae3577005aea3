#![allow(proc_macro_derive_resolution_fallback)]

#[macro_use]
extern crate diesel;

use std::path::Path;

use diesel::prelude::*;
use diesel::result::Error;
use thiserror::Error;

/// Connection type used by every dataset operation.
pub type DbConnection = SqliteConnection;

#[derive(Clone, Error, Debug, PartialEq)]
pub enum DbError {
    #[error("Dataset '{}' was not found.", path)]
    DatasetNotFound { path: String },

    #[error("The dataset schema is invalid. Root cause: {}.", cause)]
    Schema { cause: String },

    #[error("{} not found.", what)]
    NotFound { what: String },

    #[error("No translations found.")]
    NoTranslationsFound,

    #[error("There was a database error. Root cause: {}.", cause)]
    Engine { cause: String },

    #[error("{}", message)]
    Validation { message: String },
}

impl DbError {
    /// Classifies a Diesel error raised while querying for `what`.
    ///
    /// Missing relations or columns and rows that cannot be deserialized
    /// are schema problems; anything else the engine reports is passed on
    /// as an engine error.
    pub(crate) fn from_query(e: Error, what: &str) -> Self {
        match e {
            Error::NotFound => DbError::NotFound {
                what: what.to_string(),
            },
            Error::DeserializationError(cause) => DbError::Schema {
                cause: cause.to_string(),
            },
            Error::DatabaseError(_, info) if is_schema_message(info.message()) => {
                DbError::Schema {
                    cause: info.message().to_string(),
                }
            }
            e => DbError::Engine {
                cause: e.to_string(),
            },
        }
    }

    pub(crate) fn not_found(what: &str) -> Self {
        DbError::NotFound {
            what: what.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DbError::Validation {
            message: message.into(),
        }
    }
}

fn is_schema_message(message: &str) -> bool {
    message.starts_with("no such table") || message.starts_with("no such column")
}

/// Opens a connection to the SQLite dataset at `path`.
///
/// The file must already exist: a missing dataset is reported as
/// [DatasetNotFound](DbError::DatasetNotFound) instead of letting SQLite
/// create an empty database in its place. The connection is closed when
/// the returned value is dropped.
pub fn establish_connection(path: &Path) -> Result<DbConnection, DbError> {
    if !path.is_file() {
        return Err(DbError::DatasetNotFound {
            path: path.display().to_string(),
        });
    }

    let url = path.to_str().ok_or_else(|| DbError::Engine {
        cause: format!("'{}' is not a valid UTF-8 path", path.display()),
    })?;

    SqliteConnection::establish(url).map_err(|e| DbError::Engine {
        cause: e.to_string(),
    })
}

pub mod abbreviations;
pub mod annotations;
pub mod engine;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod locator;
pub mod models;
mod schema;
mod sword_drill;

pub use locator::{DatasetRef, Locator, TranslationId};
pub use sword_drill::{check_search_query, SwordDrill, SwordDrillable, SEARCH_RESULT_LIMIT};
