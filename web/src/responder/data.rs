use std::sync::Arc;

use handlebars::Handlebars;
use log::error;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use serde_derive::{Deserialize, Serialize};
use textwrap::{Options, WordSplitter};

use db::models::Verse;

use crate::error::Error;

/// Card size, matching the common social preview dimensions.
pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 630;

const MAX_LINE_CHARS: usize = 48;
const LINE_HEIGHT: u32 = 50;
const TITLE_TOP: u32 = 220;
const TITLE_FONT_SIZE: u32 = 48;
const VERSE_FONT_SIZE: u32 = 36;
const WATERMARK_FONT_SIZE: u32 = 24;
const WATERMARK_MARGIN: u32 = 20;

/// Error data for a JSON response.
#[derive(Clone, Deserialize, Serialize, Debug)]
pub struct ErrorData {
    pub message: String,
}

impl ErrorData {
    /// Creates new error data from an [Error](crate::error::Error).
    pub fn from_error(e: &Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

/// One line of verse text on a quote card, with its baseline.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct CardLine {
    pub text: String,
    pub y: u32,
}

/// Data for the `quote-card` SVG template.
#[derive(Clone, Serialize, Debug)]
pub struct QuoteCardData {
    pub width: u32,
    pub height: u32,
    pub center: u32,
    pub title: String,
    pub title_y: u32,
    pub lines: Vec<CardLine>,
    pub watermark: Option<String>,
    pub watermark_x: u32,
    pub watermark_y: u32,
}

impl QuoteCardData {
    /// Lays out a card for a verse.
    ///
    /// `book_name` is `None` when the translation has no row for the book.
    pub fn new(book_name: Option<&str>, verse: &Verse, watermark: Option<&str>) -> Self {
        let title = match book_name {
            Some(name) => format!("{} {}:{}", name, verse.chapter, verse.verse),
            None => format!("Book {} {}:{}", verse.book_id, verse.chapter, verse.verse),
        };

        let wrapped = wrap(&verse.text, MAX_LINE_CHARS);
        let block_height = wrapped.len() as u32 * LINE_HEIGHT;
        let first_top = (CARD_HEIGHT / 2 + 30).saturating_sub(block_height / 2);
        let lines = wrapped
            .into_iter()
            .enumerate()
            .map(|(i, text)| CardLine {
                text,
                y: first_top + i as u32 * LINE_HEIGHT + VERSE_FONT_SIZE,
            })
            .collect();

        Self {
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
            center: CARD_WIDTH / 2,
            title,
            title_y: TITLE_TOP + TITLE_FONT_SIZE,
            lines,
            watermark: watermark.map(str::to_string),
            watermark_x: CARD_WIDTH - WATERMARK_MARGIN,
            watermark_y: CARD_HEIGHT - WATERMARK_MARGIN,
        }
    }

    /// Renders the card as an SVG document.
    pub fn to_svg(&self, renderer: &Handlebars) -> Result<String, Error> {
        renderer.render("quote-card", &self).map_err(|e| {
            error!("{}", e);
            Error::Template
        })
    }

    /// Renders the card and rasterizes it to a PNG of the card's size.
    pub fn to_png(
        &self,
        renderer: &Handlebars,
        fonts: &Arc<fontdb::Database>,
    ) -> Result<Vec<u8>, Error> {
        let svg = self.to_svg(renderer)?;

        let mut options = usvg::Options::default();
        options.fontdb = fonts.clone();
        let tree = usvg::Tree::from_str(&svg, &options).map_err(|e| {
            error!("{}", e);
            Error::Template
        })?;

        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(Error::Template)?;
        resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
        pixmap.encode_png().map_err(|e| {
            error!("{}", e);
            Error::Template
        })
    }
}

/// Wraps verse text into card lines. Runs of whitespace collapse to one
/// space, and a word longer than `width` gets a line of its own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return vec![];
    }

    let options = Options::new(width)
        .break_words(false)
        .word_splitter(WordSplitter::NoHyphenation);
    textwrap::wrap(&text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use db::fixtures;

    use crate::{load_fonts, register_templates};

    fn genesis_1_1() -> Verse {
        Verse {
            book_id: 1,
            chapter: 1,
            verse: 1,
            text: fixtures::GENESIS_1_1.to_string(),
        }
    }

    #[test]
    fn wrap_lines() {
        let lines = wrap(fixtures::JOHN_3_16, MAX_LINE_CHARS);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= MAX_LINE_CHARS));
        assert_eq!(lines.join(" "), fixtures::JOHN_3_16);

        assert_eq!(wrap("  short   text ", 48), vec!["short text"]);
        assert!(wrap("", 48).is_empty());
    }

    #[test]
    fn wrap_long_word() {
        let long = "x".repeat(60);
        let lines = wrap(&format!("a {} b", long), MAX_LINE_CHARS);
        assert_eq!(lines, vec!["a".to_string(), long, "b".to_string()]);
    }

    #[test]
    fn card_layout() {
        let card = QuoteCardData::new(Some("Genesis"), &genesis_1_1(), None);
        assert_eq!(card.title, "Genesis 1:1");
        assert_eq!(card.lines.len(), 2);
        assert_eq!(card.lines[1].y - card.lines[0].y, LINE_HEIGHT);
        assert!(card.lines.iter().all(|l| l.y < CARD_HEIGHT));

        let card = QuoteCardData::new(None, &genesis_1_1(), None);
        assert_eq!(card.title, "Book 1 1:1");
    }

    #[test]
    fn render_svg() {
        let tpl = register_templates().unwrap();
        let verse = Verse {
            text: "Fear & trembling <here>".to_string(),
            ..genesis_1_1()
        };

        let svg = QuoteCardData::new(Some("Genesis"), &verse, Some("example.org"))
            .to_svg(&tpl)
            .unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="1200""#));
        assert!(svg.contains(r#"height="630""#));
        assert!(svg.contains("Genesis 1:1"));
        assert!(svg.contains("Fear &amp; trembling &lt;here&gt;"));
        assert!(svg.contains("example.org"));

        let svg = QuoteCardData::new(Some("Genesis"), &genesis_1_1(), None)
            .to_svg(&tpl)
            .unwrap();
        assert!(!svg.contains("example.org"));
    }

    #[test]
    fn render_png() {
        let tpl = register_templates().unwrap();
        let png = QuoteCardData::new(Some("Genesis"), &genesis_1_1(), Some("example.org"))
            .to_png(&tpl, &load_fonts())
            .unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), CARD_WIDTH);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), CARD_HEIGHT);
    }
}
