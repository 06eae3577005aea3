#![warn(clippy::all)]

use std::env;
use std::error::Error;
use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use handlebars::Handlebars;
use log::{debug, info, warn};
use resvg::usvg::fontdb;

use db::annotations::AnnotationStore;
use db::{Locator, SwordDrill};

use crate::config::Config;

/// Represents the [server data](actix_web::web::Data) for the application.
pub struct ServerData {
    pub locator: Locator,
    pub annotations: AnnotationStore,
    pub template: Handlebars<'static>,
    pub fonts: Arc<fontdb::Database>,
    pub watermark: Option<String>,
}

/// Registers the [Handlebars](handlebars::Handlebars) templates for the application.
pub fn register_templates() -> Result<Handlebars<'static>, Box<dyn Error>> {
    let mut tpl = Handlebars::new();
    tpl.set_strict_mode(true);
    tpl.register_template_string("quote-card", include_str!("../templates/quote-card.hbs"))?;

    Ok(tpl)
}

/// Loads the system fonts used to rasterize quote cards.
pub fn load_fonts() -> Arc<fontdb::Database> {
    let mut fonts = fontdb::Database::new();
    fonts.load_system_fonts();
    debug!("Loaded {} font faces", fonts.len());

    Arc::new(fonts)
}

/// Renames dataset files to their canonical upper-case names.
fn normalize_datasets(locator: &Locator) {
    match locator.normalize_file_names() {
        Ok(renames) => info!("Normalized {} dataset file names", renames.len()),
        Err(e) => warn!("Could not normalize dataset file names: {}", e),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    // Set up logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = Config::from_env();

    // Set up sentry
    let capture_errors = config.sentry_dsn.is_some();
    let _guard = sentry::init((
        config.sentry_dsn.clone(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let template =
        register_templates().map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let locator = Locator::new(config.db_path.clone());
    if config.normalize_datasets {
        normalize_datasets(&locator);
    }

    // Shared by every worker, so annotations are visible process-wide
    let data = web::Data::new(ServerData {
        locator,
        annotations: AnnotationStore::new(),
        template,
        fonts: load_fonts(),
        watermark: config.watermark.clone(),
    });

    info!(
        "Serving datasets from {} on {}",
        config.db_path.display(),
        config.bind_address
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(
                sentry_actix::Sentry::builder()
                    .emit_header(true)
                    .capture_server_errors(capture_errors)
                    .finish(),
            )
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(controllers::configure::<SwordDrill>)
    })
    .workers(config.workers)
    .bind(&config.bind_address)?
    .run()
    .await
}

mod config;
mod controllers;
mod error;
mod responder;

#[cfg(test)]
mod tests {
    use std::fs;

    use db::fixtures;

    use super::*;

    #[test]
    fn normalize_datasets_at_startup() {
        let fixture = fixtures::library();
        let base = fixture.base_dir();
        fs::rename(base.join("WEB.db"), base.join("web.db")).unwrap();

        normalize_datasets(&fixture.locator);
        assert!(base.join("WEB.db").is_file());
        assert!(fixture.locator.resolve("web").is_ok());

        normalize_datasets(&Locator::new(base.join("missing")));
    }
}
