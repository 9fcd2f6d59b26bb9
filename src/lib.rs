#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod converter;
pub mod cors;
pub mod events;
pub mod images;
pub mod models;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use log::info;
use rocket::figment::Figment;
use rocket::{Build, Rocket};

use cache::ConversionCache;
use config::AppConfig;
use converter::ConversionService;
use cors::CORS;
use events::{CompositeSink, LogSink, ResultSink, WebhookSink};
use images::{ConversionError, HttpFetcher, ImageCrateCodec};
use worker::WorkerPool;

/// Result sink for the configured deployment: outcomes are always logged and
/// additionally posted to `result_webhook` when one is set.
pub fn build_sink(config: &AppConfig) -> Result<Arc<dyn ResultSink>, ConversionError> {
    let Some(url) = &config.result_webhook else {
        info!("Publishing conversion results to the log");
        return Ok(Arc::new(LogSink));
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(&config.user_agent)
        .build()?;

    info!("Publishing conversion results to the log and {}", url);
    Ok(Arc::new(CompositeSink::new(vec![
        Arc::new(LogSink),
        Arc::new(WebhookSink::new(client, url.clone())),
    ])))
}

/// Wire the production fetcher, codec and worker pool around a fresh cache.
/// Must be called from within a Tokio runtime.
pub fn build_service(
    config: &AppConfig,
    sink: Arc<dyn ResultSink>,
) -> Result<Arc<ConversionService>, ConversionError> {
    let fetcher = HttpFetcher::new(config.timeout, &config.user_agent)?;
    let pool = WorkerPool::new(config.workers, config.queue_capacity);

    Ok(Arc::new(ConversionService::new(
        Arc::new(ConversionCache::new()),
        Arc::new(fetcher),
        Arc::new(ImageCrateCodec),
        sink,
        pool,
    )))
}

pub fn build_rocket(figment: Figment, service: Arc<ConversionService>) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(CORS)
        .manage(service)
        .mount(
            api::conversions::BASE_PATH,
            routes![
                api::conversions::formats,
                api::conversions::convert,
                api::conversions::convert_async,
                api::conversions::get_image,
            ],
        )
}
