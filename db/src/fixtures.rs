//! Small datasets on disk for tests.
//!
//! [library] lays out a base directory the way the real datasets are laid
//! out: one SQLite file per translation plus the shared cross reference
//! dataset. The directory is removed when the [Fixture] is dropped.

use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tempfile::TempDir;

use crate::locator::{Locator, SHARED_DATASET};

pub const GENESIS_1_1: &str = "In the beginning God created the heaven and the earth.";
pub const GENESIS_1_26: &str = "And God said, Let us make man in our image, after our likeness: and let them have dominion over the fish of the sea, and over the fowl of the air, and over the cattle, and over all the earth, and over every creeping thing that creepeth upon the earth.";
pub const GENESIS_2_3: &str = "And God blessed the seventh day, and sanctified it: because that in it he had rested from all his work which God created and made.";
pub const JOHN_3_16: &str = "For God so loved the world, that he gave his only begotten Son, that whosoever believeth in him should not perish, but have everlasting life.";

/// Verse counts of the Genesis chapters present in the KJV fixture.
pub const GENESIS_CHAPTERS: [i32; 5] = [31, 25, 24, 26, 32];

const KJV_TEXT: [(i32, i32, &str); 7] = [
    (1, 1, GENESIS_1_1),
    (1, 26, GENESIS_1_26),
    (1, 27, "So God created man in his own image, in the image of God created he him; male and female created he them."),
    (1, 31, "And God saw every thing that he had made, and, behold, it was very good. And the evening and the morning were the sixth day."),
    (2, 1, "Thus the heavens and the earth were finished, and all the host of them."),
    (2, 2, "And on the seventh day God ended his work which he had made; and he rested on the seventh day from all his work which he had made."),
    (2, 3, GENESIS_2_3),
];

pub struct Fixture {
    dir: TempDir,
    pub locator: Locator,
}

impl Fixture {
    pub fn base_dir(&self) -> &Path {
        self.dir.path()
    }
}

type VerseRow = (i32, i32, i32, String);

/// Builds the fixture library:
///
/// - `KJV.db`: Genesis 1-5 and John 3, with an Exodus book row but no
///   Exodus verses
/// - `WEB.db`: Genesis 1:1-2, no license
/// - `BROKEN.db`: catalog and books but no verses relation
/// - `EMPTY.db`: relations present, empty catalog
/// - `MALFORMED.db`: relations present, catalog row without a title
/// - `translations.db`: cross references
/// - `notes.txt`: not a dataset
pub fn library() -> Fixture {
    let dir = tempfile::tempdir().expect("Could not create fixture directory");
    let base = dir.path();

    write_dataset(
        base,
        "KJV",
        Some(("King James Version", Some("Public Domain"))),
        &[(1, "Genesis"), (2, "Exodus"), (43, "John")],
        Some(&kjv_verses()),
    );
    write_dataset(
        base,
        "WEB",
        Some(("World English Bible", None)),
        &[(1, "Genesis"), (43, "John")],
        Some(&[
            (1, 1, 1, "In the beginning, God created the heavens and the earth.".to_string()),
            (1, 1, 2, "The earth was formless and empty. Darkness was on the surface of the deep and God's Spirit was hovering over the surface of the waters.".to_string()),
        ]),
    );
    write_dataset(
        base,
        "BROKEN",
        Some(("Broken Translation", None)),
        &[(1, "Genesis")],
        None,
    );
    write_dataset(base, "EMPTY", None, &[(1, "Genesis")], Some(&[]));
    write_dataset(base, "MALFORMED", None, &[(1, "Genesis")], Some(&[]));
    connect(&base.join("MALFORMED.db"))
        .batch_execute("INSERT INTO translations VALUES ('MALFORMED', NULL, NULL);")
        .expect("Could not write fixture dataset");
    write_shared_dataset(base);
    std::fs::write(base.join("notes.txt"), "not a dataset").expect("Could not write notes");

    Fixture {
        locator: Locator::new(base),
        dir,
    }
}

fn kjv_verses() -> Vec<VerseRow> {
    let mut verses = vec![];
    for (i, count) in GENESIS_CHAPTERS.iter().enumerate() {
        let chapter = i as i32 + 1;
        for verse in 1..=*count {
            let text = KJV_TEXT
                .iter()
                .find(|(c, v, _)| *c == chapter && *v == verse)
                .map(|(_, _, t)| t.to_string())
                .unwrap_or_else(|| format!("Filler {}:{} of the beginning.", chapter, verse));
            verses.push((1, chapter, verse, text));
        }
    }
    for verse in 1..=36 {
        let text = if verse == 16 {
            JOHN_3_16.to_string()
        } else {
            format!("Filler 3:{} of the gospel.", verse)
        };
        verses.push((43, 3, verse, text));
    }
    verses
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn connect(path: &Path) -> SqliteConnection {
    SqliteConnection::establish(path.to_str().expect("Fixture path is not UTF-8"))
        .expect("Could not create fixture dataset")
}

fn write_dataset(
    base: &Path,
    id: &str,
    catalog: Option<(&str, Option<&str>)>,
    books: &[(i32, &str)],
    verses: Option<&[VerseRow]>,
) {
    let mut sql = String::from(
        "CREATE TABLE translations (translation TEXT, title TEXT, license TEXT);\n",
    );
    if let Some((title, license)) = catalog {
        sql.push_str(&format!(
            "INSERT INTO translations VALUES ({}, {}, {});\n",
            quote(id),
            quote(title),
            license.map_or_else(|| "NULL".to_string(), quote)
        ));
    }

    sql.push_str(&format!(
        "CREATE TABLE {}_books (id INTEGER PRIMARY KEY, name TEXT);\n",
        id
    ));
    for (book, name) in books {
        sql.push_str(&format!(
            "INSERT INTO {}_books VALUES ({}, {});\n",
            id,
            book,
            quote(name)
        ));
    }

    if let Some(verses) = verses {
        sql.push_str(&format!(
            "CREATE TABLE {}_verses (id INTEGER PRIMARY KEY, book_id INTEGER, chapter INTEGER, verse INTEGER, text TEXT);\n",
            id
        ));
        for (book, chapter, verse, text) in verses {
            sql.push_str(&format!(
                "INSERT INTO {}_verses (book_id, chapter, verse, text) VALUES ({}, {}, {}, {});\n",
                id,
                book,
                chapter,
                verse,
                quote(text)
            ));
        }
    }

    connect(&base.join(format!("{}.db", id)))
        .batch_execute(&sql)
        .expect("Could not write fixture dataset");
}

fn write_shared_dataset(base: &Path) {
    connect(&base.join(SHARED_DATASET))
        .batch_execute(
            "CREATE TABLE cross_references (
                from_book TEXT, from_chapter INTEGER, from_verse INTEGER,
                to_book TEXT, to_chapter INTEGER, to_verse_start INTEGER, to_verse_end INTEGER,
                votes INTEGER
            );
            INSERT INTO cross_references VALUES ('Gen', 1, 1, 'John', 1, 1, 3, 120);
            INSERT INTO cross_references VALUES ('Gen', 1, 1, 'Heb', 11, 3, NULL, 80);
            INSERT INTO cross_references VALUES ('Gen', 1, 1, 'Ps', 33, 6, NULL, 80);
            INSERT INTO cross_references VALUES ('Gen', 1, 1, 'Isa', 45, 18, NULL, 95);
            INSERT INTO cross_references VALUES ('John', 3, 16, 'Rom', 5, 8, NULL, 210);
            INSERT INTO cross_references VALUES ('John', 3, 16, '1John', 4, 9, 10, 305);",
        )
        .expect("Could not write shared fixture dataset");
}
