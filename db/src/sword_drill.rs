use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Integer, Text};
use diesel::sqlite::Sqlite;
use log::debug;

use crate::locator::DatasetRef;
use crate::models::*;
use crate::{DbConnection, DbError};

/// Max number of search results returned from the database.
pub const SEARCH_RESULT_LIMIT: i64 = 100;

#[derive(QueryableByName)]
struct ChapterCount {
    #[diesel(sql_type = Integer)]
    chapter: i32,
    #[diesel(sql_type = BigInt)]
    verse_count: i64,
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Trait implemented by types that can query for and return types of Bible structures.
///
/// Every method works on a connection the caller already holds, so the
/// caller decides how long the connection lives.
pub trait SwordDrillable {
    /// Reads the catalog row of an open translation dataset.
    fn translation(conn: &mut DbConnection) -> Result<Translation, DbError>;

    /// Gets all books of the translation, in canonical order.
    fn books(dataset: &DatasetRef, conn: &mut DbConnection) -> Result<Vec<Book>, DbError>;

    /// Looks up the display name of a book, if the translation has it.
    fn book_name(
        dataset: &DatasetRef,
        book: i32,
        conn: &mut DbConnection,
    ) -> Result<Option<String>, DbError>;

    /// Counts the verses of each chapter of a book.
    fn chapter_counts(
        dataset: &DatasetRef,
        book: i32,
        conn: &mut DbConnection,
    ) -> Result<ChapterCounts, DbError>;

    /// Looks up every verse of a chapter.
    fn chapter(
        dataset: &DatasetRef,
        book: i32,
        chapter: i32,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError>;

    /// Looks up a single verse.
    fn verse(
        dataset: &DatasetRef,
        book: i32,
        chapter: i32,
        verse: i32,
        conn: &mut DbConnection,
    ) -> Result<Verse, DbError>;

    /// Looks up the verses of a passage.
    ///
    /// Within one chapter this is the inclusive verse range. Across
    /// chapters it is the tail of the first chapter from the start verse,
    /// every chapter in between, and the head of the last chapter up to
    /// the end verse. The passage must not run backwards.
    fn passage(
        dataset: &DatasetRef,
        passage: &Passage,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError>;

    /// Searches verse text for a substring.
    ///
    /// Matching uses SQLite's `LIKE`, so it ignores case for ASCII letters
    /// only. Wildcards in the query are matched literally. At most
    /// [SEARCH_RESULT_LIMIT] verses are returned, in canonical order.
    fn search(
        dataset: &DatasetRef,
        query: &str,
        book: Option<i32>,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError>;

    /// Counts books, distinct chapter numbers and verses.
    fn stats(dataset: &DatasetRef, conn: &mut DbConnection) -> Result<Stats, DbError>;

    /// Looks up cross references from a verse in the shared dataset,
    /// strongest first.
    fn cross_references(
        book: &str,
        chapter: i32,
        verse: i32,
        conn: &mut DbConnection,
    ) -> Result<Vec<CrossReference>, DbError>;
}

/// Main implementation for the [SwordDrillable](crate::sword_drill::SwordDrillable) trait.
pub struct SwordDrill;

impl SwordDrillable for SwordDrill {
    fn translation(conn: &mut DbConnection) -> Result<Translation, DbError> {
        use crate::schema::translations::dsl::*;

        translations
            .select((translation, title, license))
            .first(conn)
            .map_err(|e| DbError::from_query(e, "Translation catalog row"))
    }

    fn books(dataset: &DatasetRef, conn: &mut DbConnection) -> Result<Vec<Book>, DbError> {
        sql_query(format!(
            "SELECT id, name FROM {} ORDER BY id",
            dataset.books.quoted()
        ))
        .load(conn)
        .map_err(|e| DbError::from_query(e, "Books"))
    }

    fn book_name(
        dataset: &DatasetRef,
        book: i32,
        conn: &mut DbConnection,
    ) -> Result<Option<String>, DbError> {
        sql_query(format!(
            "SELECT id, name FROM {} WHERE id = ?",
            dataset.books.quoted()
        ))
        .bind::<Integer, _>(book)
        .get_result::<Book>(conn)
        .optional()
        .map(|b| b.map(|b| b.name))
        .map_err(|e| DbError::from_query(e, "Book"))
    }

    fn chapter_counts(
        dataset: &DatasetRef,
        book: i32,
        conn: &mut DbConnection,
    ) -> Result<ChapterCounts, DbError> {
        let counts: Vec<ChapterCount> = sql_query(format!(
            "SELECT chapter, COUNT(*) AS verse_count FROM {} \
             WHERE book_id = ? GROUP BY chapter ORDER BY chapter",
            dataset.verses.quoted()
        ))
        .bind::<Integer, _>(book)
        .load(conn)
        .map_err(|e| DbError::from_query(e, "Chapters"))?;

        if counts.is_empty() {
            return Err(DbError::not_found("Chapters"));
        }

        Ok(counts
            .into_iter()
            .map(|c| (c.chapter, c.verse_count))
            .collect())
    }

    fn chapter(
        dataset: &DatasetRef,
        book: i32,
        chapter: i32,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError> {
        let verses: Vec<Verse> = sql_query(format!(
            "SELECT book_id, chapter, verse, text FROM {} \
             WHERE book_id = ? AND chapter = ? ORDER BY verse",
            dataset.verses.quoted()
        ))
        .bind::<Integer, _>(book)
        .bind::<Integer, _>(chapter)
        .load(conn)
        .map_err(|e| DbError::from_query(e, "Chapter"))?;

        if verses.is_empty() {
            return Err(DbError::not_found("Chapter"));
        }
        Ok(verses)
    }

    fn verse(
        dataset: &DatasetRef,
        book: i32,
        chapter: i32,
        verse: i32,
        conn: &mut DbConnection,
    ) -> Result<Verse, DbError> {
        sql_query(format!(
            "SELECT book_id, chapter, verse, text FROM {} \
             WHERE book_id = ? AND chapter = ? AND verse = ?",
            dataset.verses.quoted()
        ))
        .bind::<Integer, _>(book)
        .bind::<Integer, _>(chapter)
        .bind::<Integer, _>(verse)
        .get_result(conn)
        .map_err(|e| DbError::from_query(e, "Verse"))
    }

    fn passage(
        dataset: &DatasetRef,
        passage: &Passage,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError> {
        debug!("Looking up {} in {}", passage, dataset.id);
        if passage.runs_backwards() {
            return Err(DbError::not_found("Passage"));
        }

        let verses: Vec<Verse> = if passage.spans_chapters() {
            sql_query(format!(
                "SELECT book_id, chapter, verse, text FROM {} \
                 WHERE book_id = ? AND ( \
                     (chapter = ? AND verse >= ?) OR \
                     (chapter > ? AND chapter < ?) OR \
                     (chapter = ? AND verse <= ?) \
                 ) \
                 ORDER BY chapter, verse",
                dataset.verses.quoted()
            ))
            .bind::<Integer, _>(passage.book)
            .bind::<Integer, _>(passage.start_chapter)
            .bind::<Integer, _>(passage.start_verse)
            .bind::<Integer, _>(passage.start_chapter)
            .bind::<Integer, _>(passage.end_chapter)
            .bind::<Integer, _>(passage.end_chapter)
            .bind::<Integer, _>(passage.end_verse)
            .load::<Verse>(conn)
        } else {
            sql_query(format!(
                "SELECT book_id, chapter, verse, text FROM {} \
                 WHERE book_id = ? AND chapter = ? AND verse BETWEEN ? AND ? \
                 ORDER BY chapter, verse",
                dataset.verses.quoted()
            ))
            .bind::<Integer, _>(passage.book)
            .bind::<Integer, _>(passage.start_chapter)
            .bind::<Integer, _>(passage.start_verse)
            .bind::<Integer, _>(passage.end_verse)
            .load::<Verse>(conn)
        }
        .map_err(|e| DbError::from_query(e, "Passage"))?;

        if verses.is_empty() {
            return Err(DbError::not_found("Passage"));
        }
        Ok(verses)
    }

    fn search(
        dataset: &DatasetRef,
        query: &str,
        book: Option<i32>,
        conn: &mut DbConnection,
    ) -> Result<Vec<Verse>, DbError> {
        check_search_query(query)?;

        let mut search = sql_query(format!(
            "SELECT book_id, chapter, verse, text FROM {} WHERE text LIKE ? ESCAPE '\\'",
            dataset.verses.quoted()
        ))
        .into_boxed::<Sqlite>()
        .bind::<Text, _>(format!("%{}%", escape_like(query)));

        if let Some(book) = book {
            search = search.sql(" AND book_id = ?").bind::<Integer, _>(book);
        }

        search
            .sql(" ORDER BY book_id, chapter, verse LIMIT ?")
            .bind::<BigInt, _>(SEARCH_RESULT_LIMIT)
            .load(conn)
            .map_err(|e| DbError::from_query(e, "Search results"))
    }

    fn stats(dataset: &DatasetRef, conn: &mut DbConnection) -> Result<Stats, DbError> {
        let mut count = |sql: String| {
            sql_query(sql)
                .get_result::<Count>(conn)
                .map(|c| c.count)
                .map_err(|e| DbError::from_query(e, "Statistics"))
        };

        Ok(Stats {
            books_count: count(format!(
                "SELECT COUNT(*) AS count FROM {}",
                dataset.books.quoted()
            ))?,
            chapters_count: count(format!(
                "SELECT COUNT(DISTINCT chapter) AS count FROM {}",
                dataset.verses.quoted()
            ))?,
            verses_count: count(format!(
                "SELECT COUNT(*) AS count FROM {}",
                dataset.verses.quoted()
            ))?,
        })
    }

    fn cross_references(
        book: &str,
        chapter: i32,
        verse: i32,
        conn: &mut DbConnection,
    ) -> Result<Vec<CrossReference>, DbError> {
        use crate::schema::cross_references::dsl::*;

        let references: Vec<CrossReference> = cross_references
            .select((
                from_book,
                from_chapter,
                from_verse,
                to_book,
                to_chapter,
                to_verse_start,
                to_verse_end,
                votes,
            ))
            .filter(from_book.eq(book))
            .filter(from_chapter.eq(chapter))
            .filter(from_verse.eq(verse))
            .order_by((votes.desc(), rowid.asc()))
            .load(conn)
            .map_err(|e| DbError::from_query(e, "Cross references"))?;

        if references.is_empty() {
            return Err(DbError::not_found("Cross references"));
        }
        Ok(references)
    }
}

/// Rejects a search query with no characters to look for.
pub fn check_search_query(query: &str) -> Result<(), DbError> {
    if query.trim().is_empty() {
        return Err(DbError::validation("The search query is empty."));
    }
    Ok(())
}

/// Escapes `LIKE` wildcards so the pattern matches them literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Fixture};

    fn kjv(fixture: &Fixture) -> (DatasetRef, DbConnection) {
        let dataset = fixture.locator.resolve("KJV").unwrap();
        let conn = dataset.connect().unwrap();
        (dataset, conn)
    }

    fn coordinates(verses: &[Verse]) -> Vec<(i32, i32)> {
        verses.iter().map(|v| (v.chapter, v.verse)).collect()
    }

    #[test]
    fn escape() {
        assert_eq!(escape_like("light"), "light");
        assert_eq!(escape_like("100%_\\"), "100\\%\\_\\\\");
    }

    #[test]
    fn translation() {
        let fixture = fixtures::library();
        let (_, mut conn) = kjv(&fixture);

        let result = SwordDrill::translation(&mut conn).unwrap();
        assert_eq!(result.translation, "KJV");
        assert_eq!(result.title, "King James Version");
        assert_eq!(result.license.as_deref(), Some("Public Domain"));
    }

    #[test]
    fn books() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let result = SwordDrill::books(&dataset, &mut conn).unwrap();
        let ids: Vec<i32> = result.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 43]);
        assert_eq!(result[0].name, "Genesis");

        assert_eq!(
            SwordDrill::book_name(&dataset, 43, &mut conn).unwrap(),
            Some("John".to_string())
        );
        assert_eq!(SwordDrill::book_name(&dataset, 66, &mut conn).unwrap(), None);
    }

    #[test]
    fn chapter_counts() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let counts = SwordDrill::chapter_counts(&dataset, 1, &mut conn).unwrap();
        let expected: Vec<(i32, i64)> = fixtures::GENESIS_CHAPTERS
            .iter()
            .enumerate()
            .map(|(i, count)| (i as i32 + 1, *count as i64))
            .collect();
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), expected);

        // Exodus has a book row but no verses.
        assert!(matches!(
            SwordDrill::chapter_counts(&dataset, 2, &mut conn),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn chapter_counts_match_chapters() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let counts = SwordDrill::chapter_counts(&dataset, 1, &mut conn).unwrap();
        let mut total = 0;
        for (chapter, count) in &counts {
            let verses = SwordDrill::chapter(&dataset, 1, *chapter, &mut conn).unwrap();
            assert_eq!(verses.len() as i64, *count);
            total += verses.len() as i64;
        }
        assert_eq!(counts.values().sum::<i64>(), total);
    }

    #[test]
    fn chapter() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let verses = SwordDrill::chapter(&dataset, 43, 3, &mut conn).unwrap();
        assert_eq!(verses.len(), 36);
        assert!(verses.windows(2).all(|w| w[0].verse < w[1].verse));
        assert_eq!(verses[15].text, fixtures::JOHN_3_16);

        assert!(matches!(
            SwordDrill::chapter(&dataset, 43, 4, &mut conn),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn verse() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let verse = SwordDrill::verse(&dataset, 1, 1, 1, &mut conn).unwrap();
        assert_eq!(
            verse,
            Verse {
                book_id: 1,
                chapter: 1,
                verse: 1,
                text: fixtures::GENESIS_1_1.to_string(),
            }
        );

        assert_eq!(
            SwordDrill::verse(&dataset, 1, 1, 9999, &mut conn),
            Err(DbError::NotFound {
                what: "Verse".to_string()
            })
        );
    }

    #[test]
    fn passage_across_chapters() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let passage: Passage = "1 1:26-2:3".parse().unwrap();
        let verses = SwordDrill::passage(&dataset, &passage, &mut conn).unwrap();

        let mut expected: Vec<(i32, i32)> = (26..=31).map(|v| (1, v)).collect();
        expected.extend((1..=3).map(|v| (2, v)));
        assert_eq!(coordinates(&verses), expected);
        assert_eq!(verses[0].text, fixtures::GENESIS_1_26);
        assert_eq!(verses[verses.len() - 1].text, fixtures::GENESIS_2_3);
    }

    #[test]
    fn passage_backwards_is_not_found() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        for raw in &["1 2:5-1:3", "1 1:5-3"] {
            let passage: Passage = raw.parse().unwrap();
            assert_eq!(
                SwordDrill::passage(&dataset, &passage, &mut conn),
                Err(DbError::NotFound {
                    what: "Passage".to_string()
                }),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn passage_includes_middle_chapters() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let passage: Passage = "1 1:30-3:2".parse().unwrap();
        let verses = SwordDrill::passage(&dataset, &passage, &mut conn).unwrap();
        let coords = coordinates(&verses);

        assert_eq!(coords.len(), 2 + 25 + 2);
        assert_eq!(coords.first(), Some(&(1, 30)));
        assert_eq!(coords.last(), Some(&(3, 2)));
        assert!(coords.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn passage_in_one_chapter_matches_chapter() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let passage: Passage = "1 2:4-10".parse().unwrap();
        let verses = SwordDrill::passage(&dataset, &passage, &mut conn).unwrap();
        let filtered: Vec<Verse> = SwordDrill::chapter(&dataset, 1, 2, &mut conn)
            .unwrap()
            .into_iter()
            .filter(|v| v.verse >= 4 && v.verse <= 10)
            .collect();

        assert_eq!(verses, filtered);
    }

    #[test]
    fn passage_past_the_end() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        // The end chapter is missing, so the passage runs to the last
        // available chapter.
        let passage: Passage = "1 5:31-9:1".parse().unwrap();
        let verses = SwordDrill::passage(&dataset, &passage, &mut conn).unwrap();
        assert_eq!(coordinates(&verses), vec![(5, 31), (5, 32)]);

        let passage: Passage = "1 1:40-45".parse().unwrap();
        assert_eq!(
            SwordDrill::passage(&dataset, &passage, &mut conn),
            Err(DbError::NotFound {
                what: "Passage".to_string()
            })
        );
    }

    #[test]
    fn search() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let result = SwordDrill::search(&dataset, "seventh day", None, &mut conn).unwrap();
        assert_eq!(coordinates(&result), vec![(2, 2), (2, 3)]);
        assert!(result.iter().all(|v| v.text.contains("seventh day")));

        let result = SwordDrill::search(&dataset, "loved the world", None, &mut conn).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].book_id, 43);
    }

    #[test]
    fn search_is_ascii_case_insensitive() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let result = SwordDrill::search(&dataset, "IN THE BEGINNING", None, &mut conn).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, fixtures::GENESIS_1_1);
    }

    #[test]
    fn search_is_capped() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let result = SwordDrill::search(&dataset, "beginning", None, &mut conn).unwrap();
        assert_eq!(result.len() as i64, SEARCH_RESULT_LIMIT);
        assert!(result
            .iter()
            .all(|v| v.text.to_lowercase().contains("beginning")));

        let coords: Vec<(i32, i32, i32)> =
            result.iter().map(|v| (v.book_id, v.chapter, v.verse)).collect();
        assert!(coords.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn search_in_book() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let result = SwordDrill::search(&dataset, "God", Some(43), &mut conn).unwrap();
        assert!(!result.is_empty());
        assert!(result.iter().all(|v| v.book_id == 43));

        let result = SwordDrill::search(&dataset, "beginning", Some(43), &mut conn).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn search_matches_wildcards_literally() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        assert!(SwordDrill::search(&dataset, "%", None, &mut conn)
            .unwrap()
            .is_empty());
        assert!(SwordDrill::search(&dataset, "_", None, &mut conn)
            .unwrap()
            .is_empty());
        assert!(matches!(
            SwordDrill::search(&dataset, "  ", None, &mut conn),
            Err(DbError::Validation { .. })
        ));
    }

    #[test]
    fn stats() {
        let fixture = fixtures::library();
        let (dataset, mut conn) = kjv(&fixture);

        let genesis: i64 = fixtures::GENESIS_CHAPTERS.iter().map(|c| *c as i64).sum();
        assert_eq!(
            SwordDrill::stats(&dataset, &mut conn).unwrap(),
            Stats {
                books_count: 3,
                chapters_count: 5,
                verses_count: genesis + 36,
            }
        );
    }

    #[test]
    fn cross_references() {
        let fixture = fixtures::library();
        let mut conn = crate::establish_connection(&fixture.locator.shared_dataset()).unwrap();

        let result = SwordDrill::cross_references("Gen", 1, 1, &mut conn).unwrap();
        let targets: Vec<(&str, i32, i32)> = result
            .iter()
            .map(|r| (r.to_book.as_str(), r.to_chapter, r.votes))
            .collect();
        assert_eq!(
            targets,
            vec![("John", 1, 120), ("Isa", 45, 95), ("Heb", 11, 80), ("Ps", 33, 80)]
        );
        assert_eq!(result[0].to_verse_start, 1);
        assert_eq!(result[0].to_verse_end, Some(3));

        assert!(matches!(
            SwordDrill::cross_references("Gen", 50, 26, &mut conn),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_relations_are_schema_errors() {
        let fixture = fixtures::library();
        let dataset = fixture.locator.resolve("BROKEN").unwrap();
        // Skip the schema check to reach the query itself.
        let mut conn = crate::establish_connection(&dataset.path).unwrap();

        assert!(matches!(
            SwordDrill::chapter(&dataset, 1, 1, &mut conn),
            Err(DbError::Schema { .. })
        ));
        assert!(matches!(
            SwordDrill::cross_references("Gen", 1, 1, &mut conn),
            Err(DbError::Schema { .. })
        ));
    }
}
