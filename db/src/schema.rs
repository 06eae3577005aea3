//! Relations with fixed names.
//!
//! Per-translation relations are named after the translation and are
//! queried through [`sql_query`](diesel::sql_query) instead.

table! {
    translations (translation) {
        translation -> Text,
        title -> Text,
        license -> Nullable<Text>,
    }
}

table! {
    cross_references (rowid) {
        rowid -> Integer,
        from_book -> Text,
        from_chapter -> Integer,
        from_verse -> Integer,
        to_book -> Text,
        to_chapter -> Integer,
        to_verse_start -> Integer,
        to_verse_end -> Nullable<Integer>,
        votes -> Integer,
    }
}
