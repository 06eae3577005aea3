//! Book abbreviations used to key the shared cross reference dataset.
//!
//! Translation datasets number their books 1 through 66 in canonical
//! order while cross references name books by OSIS abbreviation. Ids
//! outside this table have no known abbreviation and are rejected rather
//! than matched against the wrong book.

use crate::DbError;

/// OSIS abbreviations indexed by book id - 1.
const OSIS_BOOKS: [&str; 66] = [
    "Gen", "Exod", "Lev", "Num", "Deut", "Josh", "Judg", "Ruth", "1Sam", "2Sam", "1Kgs", "2Kgs",
    "1Chr", "2Chr", "Ezra", "Neh", "Esth", "Job", "Ps", "Prov", "Eccl", "Song", "Isa", "Jer",
    "Lam", "Ezek", "Dan", "Hos", "Joel", "Amos", "Obad", "Jonah", "Mic", "Nah", "Hab", "Zeph",
    "Hag", "Zech", "Mal", "Matt", "Mark", "Luke", "John", "Acts", "Rom", "1Cor", "2Cor", "Gal",
    "Eph", "Phil", "Col", "1Thess", "2Thess", "1Tim", "2Tim", "Titus", "Phlm", "Heb", "Jas",
    "1Pet", "2Pet", "1John", "2John", "3John", "Jude", "Rev",
];

/// The OSIS abbreviation of a book id, if it has one.
pub fn osis_abbreviation(book: i32) -> Option<&'static str> {
    usize::try_from(book)
        .ok()
        .and_then(|id| id.checked_sub(1))
        .and_then(|i| OSIS_BOOKS.get(i))
        .copied()
}

/// Like [osis_abbreviation], but a missing abbreviation is a validation
/// error.
pub fn require_osis_abbreviation(book: i32) -> Result<&'static str, DbError> {
    osis_abbreviation(book).ok_or_else(|| {
        DbError::validation(format!("Book {} has no known abbreviation.", book))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations() {
        assert_eq!(osis_abbreviation(1), Some("Gen"));
        assert_eq!(osis_abbreviation(19), Some("Ps"));
        assert_eq!(osis_abbreviation(43), Some("John"));
        assert_eq!(osis_abbreviation(66), Some("Rev"));
    }

    #[test]
    fn unknown_books() {
        for book in &[-1, 0, 67, 1000] {
            assert_eq!(osis_abbreviation(*book), None);
            assert!(matches!(
                require_osis_abbreviation(*book),
                Err(DbError::Validation { .. })
            ));
        }
    }
}
