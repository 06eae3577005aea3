use actix_web::web;
use serde_derive::Deserialize;

use db::models::Passage;
use db::SwordDrillable;

/// Query parameters for a verse text search.
#[derive(Deserialize)]
pub struct SearchParams {
    pub translation: String,
    pub query: String,
    pub book: Option<i32>,
}

/// Query parameters for a passage.
#[derive(Deserialize)]
pub struct PassageParams {
    pub translation: String,
    pub book: i32,
    pub start_chapter: i32,
    pub start_verse: i32,
    pub end_chapter: i32,
    pub end_verse: i32,
}

impl PassageParams {
    pub fn passage(&self) -> Passage {
        Passage {
            book: self.book,
            start_chapter: self.start_chapter,
            start_verse: self.start_verse,
            end_chapter: self.end_chapter,
            end_verse: self.end_verse,
        }
    }
}

/// Query parameters for comparing two translations.
#[derive(Deserialize)]
pub struct CompareParams {
    pub translation1: String,
    pub translation2: String,
    pub book: i32,
    pub chapter: i32,
    pub verse: Option<i32>,
}

/// Registers every API route, querying datasets through `SD`.
///
/// Malformed parameters and unknown routes answer with a JSON error body.
pub fn configure<SD>(cfg: &mut web::ServiceConfig)
where
    SD: SwordDrillable + 'static,
{
    cfg.app_data(web::PathConfig::default().error_handler(api::invalid_request))
        .app_data(web::QueryConfig::default().error_handler(api::invalid_request))
        .app_data(web::JsonConfig::default().error_handler(api::invalid_request))
        .service(web::resource("/translations").route(web::get().to(api::translations::<SD>)))
        .service(
            web::resource("/translations/{translation}/books")
                .route(web::get().to(api::books::<SD>)),
        )
        .service(
            web::resource("/translations/{translation}/books/{book}/chapters")
                .route(web::get().to(api::chapter_counts::<SD>)),
        )
        .service(
            web::resource("/translations/{translation}/books/{book}/chapters/{chapter}/verses")
                .route(web::get().to(api::chapter::<SD>)),
        )
        .service(
            web::resource(
                "/translations/{translation}/books/{book}/chapters/{chapter}/verses/{verse}",
            )
            .route(web::get().to(api::verse::<SD>)),
        )
        .service(
            web::resource(
                "/translations/{translation}/books/{book}/chapters/{chapter}/verses/{verse}/crossreferences",
            )
            .route(web::get().to(api::cross_references::<SD>)),
        )
        .service(
            web::resource(
                "/translations/{translation}/books/{book}/chapters/{chapter}/verses/{verse}/quote-image",
            )
            .route(web::get().to(api::quote_image::<SD>)),
        )
        .service(
            web::resource("/translations/{translation}/stats")
                .route(web::get().to(api::stats::<SD>)),
        )
        .service(web::resource("/search").route(web::get().to(api::search::<SD>)))
        .service(web::resource("/passage").route(web::get().to(api::passage::<SD>)))
        .service(web::resource("/compare").route(web::get().to(api::compare::<SD>)))
        .service(
            web::resource("/annotations")
                .route(web::get().to(api::annotations))
                .route(web::post().to(api::add_annotation)),
        )
        .default_service(web::route().to(api::not_found));
}

pub mod api;
