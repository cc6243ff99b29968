//! Bounded tile fetch pool.
//!
//! The grid is always computed first; [`TileFetcher::dispatch`] then takes
//! the finished plan and starts one job per tile in spiral order, so the
//! center of the view is requested before its edges. At most
//! [`FetchConfig::workers`] jobs run at once. Each job checks the disk cache,
//! falls back to the provider over blocking HTTP on tokio's blocking pool,
//! decodes the image and stores the raw bytes in the cache.
//!
//! Results arrive on an mpsc channel in completion order. Cancelling the
//! token (for example when a newer render pass supersedes this one) stops
//! undispatched tiles from starting and makes in-flight jobs report
//! [`FetchError::Cancelled`].

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TileDiskCache;
use crate::grid::TilePlacement;
use crate::provider::{HttpClient, MapProvider, ProviderError};

/// Default number of concurrent fetch jobs.
pub const DEFAULT_FETCH_WORKERS: usize = 8;

/// Errors for a single tile fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider or transport failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The response could not be decoded as an image.
    #[error("failed to decode tile image: {0}")]
    Decode(String),

    /// The render pass was cancelled before this tile finished.
    #[error("fetch cancelled")]
    Cancelled,

    /// A blocking job panicked or was torn down.
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

/// Where a tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    Cache,
    Network,
}

impl fmt::Display for TileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSource::Cache => write!(f, "cache"),
            TileSource::Network => write!(f, "network"),
        }
    }
}

/// A decoded tile ready for compositing.
#[derive(Debug, Clone)]
pub struct FetchedTile {
    pub source: TileSource,
    pub image: DynamicImage,
}

/// Result for one entry of the plan.
#[derive(Debug)]
pub struct TileFetchOutcome {
    /// Position of the tile in the spiral plan.
    pub index: usize,
    pub placement: TilePlacement,
    pub result: Result<FetchedTile, FetchError>,
}

/// Fetch pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Maximum concurrent jobs. Zero is treated as one.
    pub workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_FETCH_WORKERS,
        }
    }
}

impl FetchConfig {
    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Totals over a finished render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub from_cache: usize,
    pub from_network: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl FetchSummary {
    /// Tallies a batch of outcomes.
    pub fn from_outcomes(outcomes: &[TileFetchOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    /// Adds one outcome.
    pub fn record(&mut self, outcome: &TileFetchOutcome) {
        match &outcome.result {
            Ok(tile) if tile.source == TileSource::Cache => self.from_cache += 1,
            Ok(_) => self.from_network += 1,
            Err(FetchError::Cancelled) => self.cancelled += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Tiles that produced an image.
    pub fn succeeded(&self) -> usize {
        self.from_cache + self.from_network
    }
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} downloaded, {} failed, {} cancelled",
            self.from_cache, self.from_network, self.failed, self.cancelled
        )
    }
}

struct FetchContext {
    provider: Arc<dyn MapProvider>,
    http: Arc<dyn HttpClient>,
    cache: Option<TileDiskCache>,
}

/// Downloads the tiles of a plan with bounded concurrency.
#[derive(Clone)]
pub struct TileFetcher {
    context: Arc<FetchContext>,
    config: FetchConfig,
}

impl TileFetcher {
    /// Creates a fetcher.
    ///
    /// # Arguments
    ///
    /// * `provider` - Builds tile URLs
    /// * `http` - Blocking transport
    /// * `cache` - Disk cache, or `None` to always download
    /// * `config` - Pool settings
    ///
    /// # Errors
    ///
    /// Fails if the provider is not usable (e.g. missing API key).
    pub fn new(
        provider: Arc<dyn MapProvider>,
        http: Arc<dyn HttpClient>,
        cache: Option<TileDiskCache>,
        config: FetchConfig,
    ) -> Result<Self, ProviderError> {
        provider.validate()?;
        Ok(Self {
            context: Arc::new(FetchContext {
                provider,
                http,
                cache,
            }),
            config,
        })
    }

    /// Provider name, for building cache keys.
    pub fn provider_name(&self) -> &str {
        self.context.provider.name()
    }

    /// Starts fetching every tile of `plan` and returns the result channel.
    ///
    /// Must be called from within a tokio runtime. The channel closes after
    /// the last outcome has been sent.
    pub fn dispatch(
        &self,
        plan: Vec<TilePlacement>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<TileFetchOutcome> {
        let workers = self.config.workers.max(1);
        let (tx, rx) = mpsc::channel(plan.len().max(1));
        let semaphore = Arc::new(Semaphore::new(workers));
        let context = Arc::clone(&self.context);
        let total = plan.len();

        debug!(tiles = total, workers, "Dispatching tile fetches");

        tokio::spawn(async move {
            let mut dispatched = 0;
            for (index, placement) in plan.into_iter().enumerate() {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let context = Arc::clone(&context);
                let tx = tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let result = context.fetch(&placement, &cancel).await;
                    let _ = tx
                        .send(TileFetchOutcome {
                            index,
                            placement,
                            result,
                        })
                        .await;
                });
                dispatched += 1;
            }

            if dispatched < total {
                info!(
                    dispatched,
                    skipped = total - dispatched,
                    "Render pass cancelled before all tiles were dispatched"
                );
            }
        });

        rx
    }

    /// Dispatches a plan and waits for every outcome, sorted by plan index.
    pub async fn fetch_all(
        &self,
        plan: Vec<TilePlacement>,
        cancel: CancellationToken,
    ) -> Vec<TileFetchOutcome> {
        let mut rx = self.dispatch(plan, cancel);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.index);
        outcomes
    }
}

impl FetchContext {
    async fn fetch(
        &self,
        placement: &TilePlacement,
        cancel: &CancellationToken,
    ) -> Result<FetchedTile, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let key = placement.cache_key.clone();
        let extension = self.provider.extension().to_string();

        if let Some(image) = self.read_cached(&key, &extension).await {
            return Ok(FetchedTile {
                source: TileSource::Cache,
                image,
            });
        }

        let tile = &placement.tile;
        let url = self
            .provider
            .tile_url(tile.lat_lng, tile.zoom(), tile.tile_pixel_size);
        let http = Arc::clone(&self.http);

        let download = tokio::task::spawn_blocking(move || {
            let bytes = http.get(&url)?;
            let image = decode_image(&bytes)?;
            Ok::<_, FetchError>((bytes, image))
        });

        let (bytes, image) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            joined = download => joined.map_err(|e| FetchError::TaskFailed(e.to_string()))??,
        };

        if let Some(cache) = self.cache.clone() {
            let stored = tokio::task::spawn_blocking(move || {
                cache.put(&key, &extension, &bytes).map(|_| ())
            })
            .await;
            match stored {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to cache tile"),
                Err(e) => warn!(error = %e, "Cache write task failed"),
            }
        }

        debug!(key = %placement.cache_key, "Downloaded tile");
        Ok(FetchedTile {
            source: TileSource::Network,
            image,
        })
    }

    async fn read_cached(&self, key: &str, extension: &str) -> Option<DynamicImage> {
        let cache = self.cache.clone()?;
        let key_owned = key.to_string();
        let extension = extension.to_string();

        let bytes = tokio::task::spawn_blocking(move || cache.get(&key_owned, &extension))
            .await
            .ok()
            .flatten()?;

        match tokio::task::spawn_blocking(move || decode_image(&bytes)).await {
            Ok(Ok(image)) => Some(image),
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Corrupt cache entry, refetching");
                None
            }
            Err(_) => None,
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FetchError> {
    image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLng;
    use crate::grid::{plan_tiles, GridRequest, PixelSize};
    use crate::provider::{GoogleStaticMapProvider, MockHttpClient};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn plan() -> Vec<TilePlacement> {
        let request = GridRequest::new(
            LatLng::new(44.5, -3.25),
            PixelSize::square(256),
            PixelSize::square(256),
            15.0,
        );
        plan_tiles(&request, "google")
    }

    fn fetcher(
        http: Arc<dyn HttpClient>,
        cache: Option<TileDiskCache>,
        workers: usize,
    ) -> TileFetcher {
        TileFetcher::new(
            Arc::new(GoogleStaticMapProvider::new("test_key")),
            http,
            cache,
            FetchConfig::default().with_workers(workers),
        )
        .unwrap()
    }

    /// Counts how many requests are in flight at once.
    struct SlowClient {
        body: Vec<u8>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl HttpClient for SlowClient {
        fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[test]
    fn test_rejects_provider_without_key() {
        let result = TileFetcher::new(
            Arc::new(GoogleStaticMapProvider::new("")),
            Arc::new(MockHttpClient::new(Ok(vec![]))),
            None,
            FetchConfig::default(),
        );
        assert!(matches!(result, Err(ProviderError::MissingApiKey(_))));
    }

    #[tokio::test]
    async fn test_fetch_all_from_network_then_cache() {
        let temp = TempDir::new().unwrap();
        let cache = TileDiskCache::new(temp.path());
        let http = Arc::new(MockHttpClient::new(Ok(png_bytes())));
        let fetcher = fetcher(http.clone(), Some(cache.clone()), 4);

        let first = fetcher.fetch_all(plan(), CancellationToken::new()).await;
        assert_eq!(first.len(), 25);
        assert_eq!(FetchSummary::from_outcomes(&first).from_network, 25);
        assert_eq!(http.request_count(), 25);
        assert_eq!(cache.stats().unwrap().files, 25);

        let second = fetcher.fetch_all(plan(), CancellationToken::new()).await;
        let summary = FetchSummary::from_outcomes(&second);
        assert_eq!(summary.from_cache, 25);
        assert_eq!(summary.succeeded(), 25);
        assert_eq!(http.request_count(), 25);
    }

    #[tokio::test]
    async fn test_outcomes_sorted_by_plan_index() {
        let http = Arc::new(MockHttpClient::new(Ok(png_bytes())));
        let expected = plan();
        let outcomes = fetcher(http, None, 3)
            .fetch_all(expected.clone(), CancellationToken::new())
            .await;

        for (outcome, placement) in outcomes.iter().zip(&expected) {
            assert_eq!(&outcome.placement, placement);
        }
        let image = outcomes[0].result.as_ref().unwrap();
        assert_eq!(image.image.width(), 4);
    }

    #[tokio::test]
    async fn test_http_failure_reported_per_tile() {
        let http = Arc::new(MockHttpClient::new(Err(ProviderError::HttpStatus {
            status: 403,
            url: "u".to_string(),
        })));
        let outcomes = fetcher(http, None, 4)
            .fetch_all(plan(), CancellationToken::new())
            .await;

        assert_eq!(outcomes.len(), 25);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(FetchError::Provider(_)))));
        assert_eq!(FetchSummary::from_outcomes(&outcomes).failed, 25);
    }

    #[tokio::test]
    async fn test_undecodable_response_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let cache = TileDiskCache::new(temp.path());
        let http = Arc::new(MockHttpClient::new(Ok(b"<html>quota</html>".to_vec())));

        let outcomes = fetcher(http, Some(cache.clone()), 2)
            .fetch_all(plan(), CancellationToken::new())
            .await;

        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(FetchError::Decode(_)))));
        assert_eq!(cache.stats().unwrap().files, 0);
    }

    #[tokio::test]
    async fn test_cancelled_pass_fetches_nothing() {
        let http = Arc::new(MockHttpClient::new(Ok(png_bytes())));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = fetcher(http.clone(), None, 4).fetch_all(plan(), cancel).await;

        assert!(outcomes.is_empty());
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_workers() {
        let http = Arc::new(SlowClient {
            body: png_bytes(),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let outcomes = fetcher(http.clone(), None, 2)
            .fetch_all(plan(), CancellationToken::new())
            .await;

        assert_eq!(outcomes.len(), 25);
        assert!(http.peak.load(Ordering::SeqCst) <= 2);
        assert!(http.peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = FetchSummary {
            from_cache: 3,
            from_network: 20,
            failed: 1,
            cancelled: 1,
        };
        assert_eq!(summary.to_string(), "3 cached, 20 downloaded, 1 failed, 1 cancelled");
    }
}
