use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Match, Regex};
use serde_derive::{Deserialize, Serialize};

use crate::DbError;

/// A verse range inside one book, possibly spanning several chapters.
///
/// A passage whose end comes before its start matches nothing.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Passage {
    pub book: i32,
    pub start_chapter: i32,
    pub start_verse: i32,
    pub end_chapter: i32,
    pub end_verse: i32,
}

impl Passage {
    pub fn spans_chapters(&self) -> bool {
        self.start_chapter != self.end_chapter
    }

    pub fn runs_backwards(&self) -> bool {
        (self.end_chapter, self.end_verse) < (self.start_chapter, self.start_verse)
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Passage {
                book,
                start_chapter,
                start_verse,
                end_verse,
                ..
            } if !self.spans_chapters() => {
                if start_verse == end_verse {
                    write!(f, "{} {}:{}", book, start_chapter, start_verse)
                } else {
                    write!(f, "{} {}:{}-{}", book, start_chapter, start_verse, end_verse)
                }
            }
            Passage {
                book,
                start_chapter,
                start_verse,
                end_chapter,
                end_verse,
            } => write!(
                f,
                "{} {}:{}-{}:{}",
                book, start_chapter, start_verse, end_chapter, end_verse
            ),
        }
    }
}

impl FromStr for Passage {
    type Err = DbError;

    /// Parses `<book> <c>:<v>`, `<book> <c>:<v>-<v>` or
    /// `<book> <c>:<v>-<c>:<v>`, where the book is its numeric id.
    /// A `.` may stand in for `:`.
    fn from_str(s: &str) -> Result<Passage, Self::Err> {
        lazy_static! {
            static ref PASSAGE_RE: Regex = Regex::new(
                r"^(\d{1,3}) (\d{1,3})[:\.](\d{1,3})(?:-(?:(\d{1,3})[:\.])?(\d{1,3}))?$"
            )
            .unwrap();
        }

        let caps = PASSAGE_RE
            .captures(s.trim())
            .ok_or_else(|| invalid_passage(s))?;

        match (caps.get(1), caps.get(2), caps.get(3), caps.get(4), caps.get(5)) {
            // One verse
            (Some(book), Some(chapter), Some(verse), None, None) => {
                let chapter = parse_num_match(chapter, s)?;
                let verse = parse_num_match(verse, s)?;
                Ok(Passage {
                    book: parse_num_match(book, s)?,
                    start_chapter: chapter,
                    start_verse: verse,
                    end_chapter: chapter,
                    end_verse: verse,
                })
            }
            // Verse range inside one chapter
            (Some(book), Some(chapter), Some(start_verse), None, Some(end_verse)) => {
                let chapter = parse_num_match(chapter, s)?;
                Ok(Passage {
                    book: parse_num_match(book, s)?,
                    start_chapter: chapter,
                    start_verse: parse_num_match(start_verse, s)?,
                    end_chapter: chapter,
                    end_verse: parse_num_match(end_verse, s)?,
                })
            }
            // Range across chapters
            (Some(book), Some(start_chapter), Some(start_verse), Some(end_chapter), Some(end_verse)) => {
                Ok(Passage {
                    book: parse_num_match(book, s)?,
                    start_chapter: parse_num_match(start_chapter, s)?,
                    start_verse: parse_num_match(start_verse, s)?,
                    end_chapter: parse_num_match(end_chapter, s)?,
                    end_verse: parse_num_match(end_verse, s)?,
                })
            }
            _ => Err(invalid_passage(s)),
        }
    }
}

/// Parse a [Match](regex::Match) into an i32.
fn parse_num_match(m: Match, s: &str) -> Result<i32, DbError> {
    m.as_str().parse().map_err(|_| invalid_passage(s))
}

fn invalid_passage(s: &str) -> DbError {
    DbError::validation(format!("'{}' is not a valid passage.", s))
}
