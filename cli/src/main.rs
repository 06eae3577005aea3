use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

use db::abbreviations::require_osis_abbreviation;
use db::engine::{self, with_dataset, with_shared_dataset};
use db::locator::DEFAULT_BASE_DIR;
use db::models::{CompareResult, Passage, Verse};
use db::{Locator, SwordDrill, SwordDrillable};

/// Look up verses in the Bible datasets
#[derive(Parser, Debug)]
#[command(name = "bible", version)]
struct Cli {
    /// Directory holding the translation datasets
    #[arg(long, env = "BIBLE_DB_PATH", default_value = DEFAULT_BASE_DIR)]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every usable translation
    Translations,

    /// List the books of a translation
    Books { translation: String },

    /// Count the verses of each chapter of a book
    Chapters { translation: String, book: i32 },

    /// Print every verse of a chapter
    Verses {
        translation: String,
        book: i32,
        chapter: i32,
    },

    /// Print a single verse
    Verse {
        translation: String,
        book: i32,
        chapter: i32,
        verse: i32,
    },

    /// Print a passage, e.g. "1 1:26-2:3"
    Passage {
        translation: String,
        passage: Passage,
    },

    /// Search verse text
    Search {
        translation: String,
        query: String,

        /// Only search this book
        #[arg(long)]
        book: Option<i32>,
    },

    /// Count books, chapters and verses
    Stats { translation: String },

    /// Print the same chapter, or verse, of two translations
    Compare {
        first: String,
        second: String,
        book: i32,
        chapter: i32,

        #[arg(long)]
        verse: Option<i32>,
    },

    /// List cross references from a verse
    Xref { book: i32, chapter: i32, verse: i32 },

    /// Rename dataset files to their upper-case canonical names
    Normalize,
}

fn write_verses(out: &mut impl Write, verses: &[Verse]) -> io::Result<()> {
    for v in verses {
        writeln!(out, "{} {}:{} {}", v.book_id, v.chapter, v.verse, v.text)?;
    }
    Ok(())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let locator = Locator::new(cli.db_path);

    match cli.command {
        Command::Translations => {
            for t in engine::list_translations::<SwordDrill>(&locator)? {
                let license = t.license.as_deref().unwrap_or("-");
                writeln!(out, "{}\t{}\t{}", t.translation, t.title, license)?;
            }
        }
        Command::Books { translation } => {
            for b in with_dataset(&locator, &translation, SwordDrill::books)? {
                writeln!(out, "{}\t{}", b.id, b.name)?;
            }
        }
        Command::Chapters { translation, book } => {
            let counts = with_dataset(&locator, &translation, |dataset, conn| {
                SwordDrill::chapter_counts(dataset, book, conn)
            })?;
            for (chapter, count) in counts {
                writeln!(out, "{}\t{}", chapter, count)?;
            }
        }
        Command::Verses {
            translation,
            book,
            chapter,
        } => {
            let verses = with_dataset(&locator, &translation, |dataset, conn| {
                SwordDrill::chapter(dataset, book, chapter, conn)
            })?;
            write_verses(out, &verses)?;
        }
        Command::Verse {
            translation,
            book,
            chapter,
            verse,
        } => {
            let verse = with_dataset(&locator, &translation, |dataset, conn| {
                SwordDrill::verse(dataset, book, chapter, verse, conn)
            })?;
            write_verses(out, &[verse])?;
        }
        Command::Passage {
            translation,
            passage,
        } => {
            let verses = with_dataset(&locator, &translation, |dataset, conn| {
                SwordDrill::passage(dataset, &passage, conn)
            })?;
            write_verses(out, &verses)?;
        }
        Command::Search {
            translation,
            query,
            book,
        } => {
            let verses = engine::search::<SwordDrill>(&locator, &translation, &query, book)?;
            write_verses(out, &verses)?;
        }
        Command::Stats { translation } => {
            let stats = with_dataset(&locator, &translation, SwordDrill::stats)?;
            writeln!(out, "books\t{}", stats.books_count)?;
            writeln!(out, "chapters\t{}", stats.chapters_count)?;
            writeln!(out, "verses\t{}", stats.verses_count)?;
        }
        Command::Compare {
            first,
            second,
            book,
            chapter,
            verse,
        } => {
            let comparison =
                engine::compare::<SwordDrill>(&locator, &first, &second, book, chapter, verse);
            for (translation, result) in comparison {
                writeln!(out, "[{}]", translation)?;
                match result {
                    CompareResult::Found { verses } => write_verses(out, &verses)?,
                    CompareResult::Error { message } => writeln!(out, "error: {}", message)?,
                }
            }
        }
        Command::Xref {
            book,
            chapter,
            verse,
        } => {
            let from_book = require_osis_abbreviation(book)?;
            let references = with_shared_dataset(&locator, |conn| {
                SwordDrill::cross_references(from_book, chapter, verse, conn)
            })?;
            for r in references {
                let end = r
                    .to_verse_end
                    .filter(|end| *end != r.to_verse_start)
                    .map(|end| format!("-{}", end))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{} {}:{}{}\t{}",
                    r.to_book, r.to_chapter, r.to_verse_start, end, r.votes
                )?;
            }
        }
        Command::Normalize => {
            let renames = locator.normalize_file_names()?;
            if renames.is_empty() {
                writeln!(out, "Nothing to rename.")?;
            }
            for r in renames {
                writeln!(out, "{} -> {}", r.from.display(), r.to.display())?;
            }
        }
    }

    Ok(())
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    if let Err(e) = run(cli, &mut stdout.lock()) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
