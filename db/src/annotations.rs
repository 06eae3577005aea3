//! Notes attached to verses, kept in memory for the life of the process.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_derive::{Deserialize, Serialize};

use crate::{DbError, TranslationId};

/// Model representing a note on a verse.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Annotation {
    pub id: u64,
    pub translation: String,
    pub book: i32,
    pub chapter: i32,
    pub verse: i32,
    pub note: String,
}

/// An annotation that has not been stored yet.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewAnnotation {
    pub translation: String,
    pub book: i32,
    pub chapter: i32,
    pub verse: i32,
    pub note: String,
}

/// Criteria for finding annotations. Unset fields match everything.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AnnotationFilter {
    pub translation: Option<String>,
    pub book: Option<i32>,
    pub chapter: Option<i32>,
    pub verse: Option<i32>,
}

impl AnnotationFilter {
    fn matches(&self, annotation: &Annotation) -> bool {
        self.translation
            .as_deref()
            .filter(|t| !t.is_empty())
            .map_or(true, |t| annotation.translation.eq_ignore_ascii_case(t))
            && self.book.map_or(true, |b| annotation.book == b)
            && self.chapter.map_or(true, |c| annotation.chapter == c)
            && self.verse.map_or(true, |v| annotation.verse == v)
    }
}

#[derive(Debug, Default)]
struct Annotations {
    last_id: u64,
    entries: Vec<Annotation>,
}

/// Append-only annotation store. Starts empty; nothing is persisted.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    inner: Mutex<Annotations>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an annotation under the next id. Ids start at 1.
    pub fn add(&self, new: NewAnnotation) -> Result<Annotation, DbError> {
        let translation: TranslationId = new.translation.parse()?;

        let mut inner = self.lock();
        inner.last_id += 1;
        let annotation = Annotation {
            id: inner.last_id,
            translation: translation.to_string(),
            book: new.book,
            chapter: new.chapter,
            verse: new.verse,
            note: new.note,
        };
        inner.entries.push(annotation.clone());

        Ok(annotation)
    }

    /// Annotations matching the filter, oldest first.
    pub fn find(&self, filter: &AnnotationFilter) -> Vec<Annotation> {
        self.lock()
            .entries
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    // A panic while holding the lock cannot leave the entries half
    // written, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Annotations> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
