use actix_web::{web, Either, HttpRequest, HttpResponse};
use futures::future;

use db::abbreviations::require_osis_abbreviation;
use db::annotations::{AnnotationFilter, NewAnnotation};
use db::engine::{self, with_dataset, with_shared_dataset};
use db::models::{CompareResult, Comparison};
use db::{SwordDrillable, TranslationId};

use crate::controllers::{CompareParams, PassageParams, SearchParams};
use crate::error::{Error, JsonError};
use crate::responder::QuoteCardData;
use crate::ServerData;

/// Result for JSON response handlers
type JsonResult = Result<HttpResponse, JsonError>;

/// Handles HTTP requests for the catalog of every usable translation.
pub async fn translations<SD>(data: web::Data<ServerData>) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let locator = data.locator.clone();
    let translations = web::block(move || engine::list_translations::<SD>(&locator)).await??;

    Ok(HttpResponse::Ok().json(translations))
}

/// Handles HTTP requests for the books of a translation.
pub async fn books<SD>(data: web::Data<ServerData>, params: web::Path<(String,)>) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation,) = params.into_inner();
    let locator = data.locator.clone();
    let books = web::block(move || with_dataset(&locator, &translation, SD::books)).await??;

    Ok(HttpResponse::Ok().json(books))
}

/// Handles HTTP requests for the verse count of each chapter of a book.
pub async fn chapter_counts<SD>(
    data: web::Data<ServerData>,
    params: web::Path<(String, i32)>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation, book) = params.into_inner();
    let locator = data.locator.clone();
    let counts = web::block(move || {
        with_dataset(&locator, &translation, |dataset, conn| {
            SD::chapter_counts(dataset, book, conn)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(counts))
}

/// Handles HTTP requests for the verses of a chapter.
pub async fn chapter<SD>(
    data: web::Data<ServerData>,
    params: web::Path<(String, i32, i32)>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation, book, chapter) = params.into_inner();
    let locator = data.locator.clone();
    let verses = web::block(move || {
        with_dataset(&locator, &translation, |dataset, conn| {
            SD::chapter(dataset, book, chapter, conn)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(verses))
}

/// Handles HTTP requests for a single verse.
pub async fn verse<SD>(
    data: web::Data<ServerData>,
    params: web::Path<(String, i32, i32, i32)>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation, book, chapter, verse) = params.into_inner();
    let locator = data.locator.clone();
    let verse = web::block(move || {
        with_dataset(&locator, &translation, |dataset, conn| {
            SD::verse(dataset, book, chapter, verse, conn)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(verse))
}

/// Handles HTTP requests for the cross references of a verse.
///
/// Cross references live in the shared dataset, keyed by book
/// abbreviation, so the translation only has to be a valid identifier.
pub async fn cross_references<SD>(
    data: web::Data<ServerData>,
    params: web::Path<(String, i32, i32, i32)>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation, book, chapter, verse) = params.into_inner();
    translation.parse::<TranslationId>()?;
    let from_book = require_osis_abbreviation(book)?;

    let locator = data.locator.clone();
    let references = web::block(move || {
        with_shared_dataset(&locator, |conn| {
            SD::cross_references(from_book, chapter, verse, conn)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(references))
}

/// Handles HTTP requests for a verse rendered as a PNG quote card.
pub async fn quote_image<SD>(
    data: web::Data<ServerData>,
    params: web::Path<(String, i32, i32, i32)>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation, book, chapter, verse) = params.into_inner();
    let locator = data.locator.clone();
    let (verse, book_name) = web::block(move || {
        with_dataset(&locator, &translation, |dataset, conn| {
            let verse = SD::verse(dataset, book, chapter, verse, conn)?;
            let book_name = SD::book_name(dataset, book, conn)?;
            Ok((verse, book_name))
        })
    })
    .await??;

    let card = QuoteCardData::new(book_name.as_deref(), &verse, data.watermark.as_deref());
    let body = web::block(move || card.to_png(&data.template, &data.fonts)).await??;

    Ok(HttpResponse::Ok().content_type("image/png").body(body))
}

/// Handles HTTP requests for book, chapter and verse counts.
pub async fn stats<SD>(data: web::Data<ServerData>, params: web::Path<(String,)>) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let (translation,) = params.into_inner();
    let locator = data.locator.clone();
    let stats = web::block(move || with_dataset(&locator, &translation, SD::stats)).await??;

    Ok(HttpResponse::Ok().json(stats))
}

/// Handles HTTP requests for searching verse text.
pub async fn search<SD>(data: web::Data<ServerData>, params: web::Query<SearchParams>) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let SearchParams {
        translation,
        query,
        book,
    } = params.into_inner();
    let locator = data.locator.clone();
    let verses =
        web::block(move || engine::search::<SD>(&locator, &translation, &query, book)).await??;

    Ok(HttpResponse::Ok().json(verses))
}

/// Handles HTTP requests for a passage, which may span chapters.
pub async fn passage<SD>(
    data: web::Data<ServerData>,
    params: web::Query<PassageParams>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let passage = params.passage();
    let translation = params.into_inner().translation;
    let locator = data.locator.clone();
    let verses = web::block(move || {
        with_dataset(&locator, &translation, |dataset, conn| {
            SD::passage(dataset, &passage, conn)
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(verses))
}

/// Handles HTTP requests for the same verse or chapter in two translations.
///
/// Both lookups run concurrently on the blocking pool. A failure on one
/// side is reported in that side's entry and never fails the request.
pub async fn compare<SD>(
    data: web::Data<ServerData>,
    params: web::Query<CompareParams>,
) -> JsonResult
where
    SD: SwordDrillable + 'static,
{
    let CompareParams {
        translation1,
        translation2,
        book,
        chapter,
        verse,
    } = params.into_inner();

    let side = |translation: String| {
        let locator = data.locator.clone();
        async move {
            web::block(move || {
                engine::compare_side::<SD>(&locator, &translation, book, chapter, verse)
            })
            .await
            .unwrap_or_else(|e| CompareResult::Error {
                message: e.to_string(),
            })
        }
    };

    let (first, second) =
        future::join(side(translation1.clone()), side(translation2.clone())).await;

    let mut comparison = Comparison::new();
    comparison.insert(engine::comparison_key(&translation1), first);
    comparison.insert(engine::comparison_key(&translation2), second);

    Ok(HttpResponse::Ok().json(comparison))
}

/// Handles HTTP requests for storing a note on a verse.
///
/// The note may come as a JSON body or as query parameters.
pub async fn add_annotation(
    data: web::Data<ServerData>,
    annotation: Either<web::Json<NewAnnotation>, web::Query<NewAnnotation>>,
) -> JsonResult {
    let annotation = match annotation {
        Either::Left(json) => json.into_inner(),
        Either::Right(query) => query.into_inner(),
    };
    let annotation = data.annotations.add(annotation)?;

    Ok(HttpResponse::Ok().json(annotation))
}

/// Handles HTTP requests for the notes matching a filter.
pub async fn annotations(
    data: web::Data<ServerData>,
    filter: web::Query<AnnotationFilter>,
) -> JsonResult {
    Ok(HttpResponse::Ok().json(data.annotations.find(&filter)))
}

/// Handles requests that match no route.
pub async fn not_found() -> JsonResult {
    Err(Error::NotFound {
        message: "Not found.".to_string(),
    }
    .into())
}

/// Turns an extractor failure into a JSON `400` response.
pub fn invalid_request<E>(err: E, _: &HttpRequest) -> actix_web::Error
where
    E: std::fmt::Display,
{
    JsonError::from(Error::InvalidRequest {
        message: err.to_string(),
    })
    .into()
}
