//! Provider trait and errors.

use thiserror::Error;

use crate::coord::LatLng;
use crate::grid::PixelSize;

/// Errors from map tile providers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The provider needs an API key and none is configured.
    #[error("Provider '{0}' requires an API key")]
    MissingApiKey(String),

    /// The provider name is not known.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// A remote source of rendered map tiles.
///
/// Providers only build request URLs; the transport is an
/// [`HttpClient`](super::HttpClient) so tests can run offline.
pub trait MapProvider: Send + Sync {
    /// Short name used in cache keys (e.g. `google`).
    fn name(&self) -> &str;

    /// File extension of the returned images, used for cache paths.
    fn extension(&self) -> &str;

    /// URL that renders one tile centered on `center`.
    ///
    /// # Arguments
    ///
    /// * `center` - Geographic center of the tile
    /// * `zoom` - Integer zoom level
    /// * `size` - Tile size in pixels
    fn tile_url(&self, center: LatLng, zoom: u8, size: PixelSize) -> String;

    /// Checks that the provider is usable before any request is made.
    fn validate(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
