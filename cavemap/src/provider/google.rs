//! Google Static Maps provider.
//!
//! Each tile is one Static Maps render centered on the tile's coordinate:
//!
//! ```text
//! <base_url>?center=<lat>,<lng>&zoom=<z>&scaling=<s>&maptype=<t>&size=<w>x<h>&format=<f>&key=<k>
//! ```
//!
//! Google Maps Platform is a paid service and requires the user's own key.

use crate::coord::LatLng;
use crate::grid::PixelSize;

use super::types::{MapProvider, ProviderError};

/// Default Static Maps endpoint.
pub const GOOGLE_STATIC_MAP_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Provider name used in cache keys.
pub const GOOGLE_PROVIDER_NAME: &str = "google";

/// Google Static Maps tile provider.
///
/// # Example
///
/// ```
/// use cavemap::coord::LatLng;
/// use cavemap::grid::PixelSize;
/// use cavemap::provider::{GoogleStaticMapProvider, MapProvider};
///
/// let provider = GoogleStaticMapProvider::new("KEY").with_maptype("terrain");
/// let url = provider.tile_url(LatLng::new(44.5, -3.25), 15, PixelSize::square(256));
/// assert!(url.contains("center=44.5,-3.25&zoom=15"));
/// assert!(url.contains("maptype=terrain"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleStaticMapProvider {
    pub base_url: String,
    pub api_key: String,
    pub scaling: u8,
    pub maptype: String,
    pub format: String,
}

impl GoogleStaticMapProvider {
    /// Creates a provider with satellite PNG tiles at scaling 1.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GOOGLE_STATIC_MAP_URL.to_string(),
            api_key: api_key.into(),
            scaling: 1,
            maptype: "satellite".to_string(),
            format: "png".to_string(),
        }
    }

    /// Overrides the endpoint (useful for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the pixel scaling factor.
    pub fn with_scaling(mut self, scaling: u8) -> Self {
        self.scaling = scaling;
        self
    }

    /// Sets the map type (`satellite`, `roadmap`, `terrain`, `hybrid`).
    pub fn with_maptype(mut self, maptype: impl Into<String>) -> Self {
        self.maptype = maptype.into();
        self
    }

    /// Sets the image format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

impl MapProvider for GoogleStaticMapProvider {
    fn name(&self) -> &str {
        GOOGLE_PROVIDER_NAME
    }

    fn extension(&self) -> &str {
        match self.format.as_str() {
            "png8" | "png32" => "png",
            "jpg-baseline" => "jpg",
            other => other,
        }
    }

    fn tile_url(&self, center: LatLng, zoom: u8, size: PixelSize) -> String {
        format!(
            "{}?center={},{}&zoom={}&scaling={}&maptype={}&size={}x{}&format={}&key={}",
            self.base_url,
            center.lat,
            center.lng,
            zoom,
            self.scaling,
            self.maptype,
            size.width,
            size.height,
            self.format,
            self.api_key
        )
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey(GOOGLE_PROVIDER_NAME.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = GoogleStaticMapProvider::new("test_key");
        assert_eq!(provider.name(), "google");
    }

    #[test]
    fn test_url_construction() {
        let provider = GoogleStaticMapProvider::new("test_key");
        let url = provider.tile_url(LatLng::new(40.7128, -74.006), 16, PixelSize::new(640, 480));

        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/staticmap?center=40.7128,-74.006&zoom=16\
             &scaling=1&maptype=satellite&size=640x480&format=png&key=test_key"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let provider = GoogleStaticMapProvider::new("k")
            .with_base_url("http://localhost:8080/static")
            .with_scaling(2)
            .with_maptype("hybrid")
            .with_format("jpg");
        let url = provider.tile_url(LatLng::new(0.0, 0.0), 3, PixelSize::square(256));

        assert!(url.starts_with("http://localhost:8080/static?center=0,0&zoom=3"));
        assert!(url.contains("&scaling=2&maptype=hybrid&size=256x256&format=jpg&key=k"));
    }

    #[test]
    fn test_extension_for_format_variants() {
        assert_eq!(GoogleStaticMapProvider::new("k").extension(), "png");
        assert_eq!(
            GoogleStaticMapProvider::new("k").with_format("png32").extension(),
            "png"
        );
        assert_eq!(
            GoogleStaticMapProvider::new("k")
                .with_format("jpg-baseline")
                .extension(),
            "jpg"
        );
    }

    #[test]
    fn test_validate_requires_key() {
        assert!(GoogleStaticMapProvider::new("k").validate().is_ok());
        assert_eq!(
            GoogleStaticMapProvider::new("  ").validate(),
            Err(ProviderError::MissingApiKey("google".to_string()))
        );
    }
}
