//! Remote map tile providers
//!
//! A provider turns a tile request (center, zoom, pixel size) into a URL.
//! Downloading goes through [`HttpClient`] so the fetch pool can be tested
//! with [`MockHttpClient`](http::tests::MockHttpClient).

mod google;
mod http;
mod types;

pub use google::{GoogleStaticMapProvider, GOOGLE_PROVIDER_NAME, GOOGLE_STATIC_MAP_URL};
pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use types::{MapProvider, ProviderError};

#[cfg(test)]
pub use http::tests::MockHttpClient;
