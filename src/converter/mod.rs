use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info, warn};
use reqwest::Url;

use crate::cache::ConversionCache;
use crate::events::{ConversionOutcome, ResultSink};
use crate::images::{ConversionError, ImageCodec, ImageFetcher, ImageFormat};
use crate::worker::WorkerPool;

/// Cache file name for a conversion of `url` to `format`.
///
/// The hash is an MD5 of the URL text, so distinct URLs may in principle
/// collide and share an entry. The format is taken verbatim, which keeps the
/// name predictable even for formats that will later be rejected.
pub fn derive_key(url: &Url, format: &str) -> String {
    format!("{:x}.{}", md5::compute(url.as_str()), format)
}

/// Publishes exactly one outcome per asynchronous conversion. Dropping it
/// without calling `publish` (job cancelled, runtime shutting down) reports a
/// cancellation failure.
struct OutcomeReport {
    sink: Arc<dyn ResultSink>,
    file_name: Option<String>,
}

impl OutcomeReport {
    fn new(sink: Arc<dyn ResultSink>, file_name: String) -> Self {
        Self {
            sink,
            file_name: Some(file_name),
        }
    }

    fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or_default()
    }

    fn publish(mut self, outcome: ConversionOutcome) {
        self.file_name = None;
        self.sink.publish(outcome);
    }
}

impl Drop for OutcomeReport {
    fn drop(&mut self) {
        if let Some(file_name) = self.file_name.take() {
            warn!("Asynchronous conversion of {} was cancelled", file_name);
            self.sink.publish(ConversionOutcome::Failure {
                file_name,
                error: "conversion cancelled".to_string(),
            });
        }
    }
}

/// Converts remote images into one of the supported formats and memoizes the
/// result per (source URL, target format).
///
/// Concurrent conversions of the same key are not coalesced: both run the
/// full fetch/decode/encode path and the first one to store its bytes wins.
pub struct ConversionService {
    cache: Arc<ConversionCache>,
    fetcher: Arc<dyn ImageFetcher>,
    codec: Arc<dyn ImageCodec>,
    sink: Arc<dyn ResultSink>,
    pool: WorkerPool,
}

impl ConversionService {
    pub fn new(
        cache: Arc<ConversionCache>,
        fetcher: Arc<dyn ImageFetcher>,
        codec: Arc<dyn ImageCodec>,
        sink: Arc<dyn ResultSink>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            cache,
            fetcher,
            codec,
            sink,
            pool,
        }
    }

    pub fn supported_formats(&self) -> Vec<&'static str> {
        ImageFormat::ALL.iter().map(|format| format.as_str()).collect()
    }

    pub fn derive_key(&self, url: &Url, format: &str) -> String {
        derive_key(url, format)
    }

    /// Convert the image at `url` to `format`, returning the cache file name.
    pub async fn convert(&self, url: &Url, format: &str) -> Result<String, ConversionError> {
        let target: ImageFormat = format.parse()?;

        let file_name = derive_key(url, format);
        if self.cache.contains(&file_name) {
            debug!("Converted image found in cache: {}", file_name);
            return Ok(file_name);
        }

        info!("Converting {} to {} as {}", url, target, file_name);

        let source = self.fetcher.fetch(url).await?;
        let encoded = self.transcode(source, target).await?;

        if !self.cache.put(&file_name, encoded) {
            debug!("{} was stored by a concurrent conversion", file_name);
        }

        Ok(file_name)
    }

    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.cache.get(file_name)
    }

    /// Queue a conversion and report its outcome to the result sink.
    ///
    /// Returns once the job is queued. When the backlog is full the job runs
    /// on the calling task instead, so the outcome is still published exactly
    /// once. Errors never reach the caller.
    pub async fn convert_async(self: &Arc<Self>, url: Url, format: String) {
        // Armed before the job exists so a job dropped unpolled still reports
        let report = OutcomeReport::new(Arc::clone(&self.sink), derive_key(&url, &format));
        let job = Arc::clone(self)
            .convert_and_report(url, format, report)
            .boxed();

        if let Err(job) = self.pool.submit(job) {
            warn!(
                "Conversion backlog full ({} pending), running conversion inline",
                self.pool.pending()
            );
            job.await;
        }
    }

    async fn convert_and_report(self: Arc<Self>, url: Url, format: String, report: OutcomeReport) {
        let file_name = report.file_name().to_string();

        let attempt = AssertUnwindSafe(self.convert(&url, &format))
            .catch_unwind()
            .await;

        let outcome = match attempt {
            Ok(Ok(_)) => match self.get(&file_name) {
                Some(content) => ConversionOutcome::Success { file_name, content },
                None => ConversionOutcome::Failure {
                    error: format!("{} missing from cache after conversion", file_name),
                    file_name,
                },
            },
            Ok(Err(e)) => {
                error!("Asynchronous conversion of {} failed: {}", url, e);
                ConversionOutcome::Failure {
                    file_name,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                error!("Asynchronous conversion of {} panicked", url);
                ConversionOutcome::Failure {
                    file_name,
                    error: "conversion task panicked".to_string(),
                }
            }
        };

        report.publish(outcome);
    }

    // Decoding and encoding are CPU bound and stay off the async workers.
    async fn transcode(
        &self,
        source: Vec<u8>,
        target: ImageFormat,
    ) -> Result<Vec<u8>, ConversionError> {
        let codec = Arc::clone(&self.codec);

        tokio::task::spawn_blocking(move || {
            let img = codec.decode(&source)?;
            codec.encode(&img, target)
        })
        .await
        .map_err(|e| ConversionError::Worker(e.to_string()))?
    }
}
