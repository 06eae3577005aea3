//! Operations that span more than one query or more than one dataset.
//!
//! Each function acquires the connections it needs and drops them before
//! returning, whichever way it returns.

use std::path::Path;

use log::warn;

use crate::locator::{DatasetRef, Locator};
use crate::models::{CompareResult, Comparison, Translation, Verse};
use crate::{check_search_query, establish_connection, DbConnection, DbError, SwordDrillable};

/// Resolves a translation, opens its dataset and runs `f` against it.
pub fn with_dataset<T, F>(locator: &Locator, translation: &str, f: F) -> Result<T, DbError>
where
    F: FnOnce(&DatasetRef, &mut DbConnection) -> Result<T, DbError>,
{
    let dataset = locator.resolve(translation)?;
    let mut conn = dataset.connect()?;
    f(&dataset, &mut conn)
}

/// Opens the shared cross reference dataset and runs `f` against it.
pub fn with_shared_dataset<T, F>(locator: &Locator, f: F) -> Result<T, DbError>
where
    F: FnOnce(&mut DbConnection) -> Result<T, DbError>,
{
    let mut conn = establish_connection(&locator.shared_dataset())?;
    f(&mut conn)
}

/// Reads the catalog row of every translation dataset.
///
/// A dataset that cannot be opened, lacks its relations or has no usable
/// catalog row is logged and skipped. Only an empty result is an error.
pub fn list_translations<SD>(locator: &Locator) -> Result<Vec<Translation>, DbError>
where
    SD: SwordDrillable,
{
    let mut translations = vec![];
    for path in locator.dataset_paths()? {
        match read_catalog::<SD>(locator, &path) {
            Ok(translation) => translations.push(translation),
            Err(e) => warn!("Skipping dataset {}: {}", path.display(), e),
        }
    }

    if translations.is_empty() {
        Err(DbError::NoTranslationsFound)
    } else {
        Ok(translations)
    }
}

fn read_catalog<SD>(locator: &Locator, path: &Path) -> Result<Translation, DbError>
where
    SD: SwordDrillable,
{
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DbError::validation("dataset file name is not valid UTF-8"))?;

    with_dataset(locator, stem, |_, conn| SD::translation(conn))
}

/// Searches the verse text of a translation.
///
/// An empty query is rejected before the dataset is opened.
pub fn search<SD>(
    locator: &Locator,
    translation: &str,
    query: &str,
    book: Option<i32>,
) -> Result<Vec<Verse>, DbError>
where
    SD: SwordDrillable,
{
    check_search_query(query)?;
    with_dataset(locator, translation, |dataset, conn| {
        SD::search(dataset, query, book, conn)
    })
}

/// Key under which a translation appears in a [Comparison].
pub fn comparison_key(translation: &str) -> String {
    translation.to_uppercase()
}

/// Looks up a verse, or a whole chapter when `verse` is `None`, for one
/// side of a comparison. Failures become [CompareResult::Error].
pub fn compare_side<SD>(
    locator: &Locator,
    translation: &str,
    book: i32,
    chapter: i32,
    verse: Option<i32>,
) -> CompareResult
where
    SD: SwordDrillable,
{
    with_dataset(locator, translation, |dataset, conn| match verse {
        Some(verse) => SD::verse(dataset, book, chapter, verse, conn).map(|v| vec![v]),
        None => SD::chapter(dataset, book, chapter, conn),
    })
    .into()
}

/// Looks up the same verse or chapter in two translations.
///
/// Both sides are always attempted and always present in the result.
pub fn compare<SD>(
    locator: &Locator,
    first: &str,
    second: &str,
    book: i32,
    chapter: i32,
    verse: Option<i32>,
) -> Comparison
where
    SD: SwordDrillable,
{
    [first, second]
        .iter()
        .map(|t| {
            (
                comparison_key(t),
                compare_side::<SD>(locator, t, book, chapter, verse),
            )
        })
        .collect()
}
