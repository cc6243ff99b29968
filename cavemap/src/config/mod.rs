//! Configuration file
//!
//! Settings live in `~/.cavemap/config.ini`:
//!
//! ```ini
//! [provider]
//! name = google
//! api_key = ...
//! maptype = satellite
//! scaling = 1
//! format = png
//! ; base_url = https://maps.googleapis.com/maps/api/staticmap
//!
//! [grid]
//! tile_width = 256
//! tile_height = 256
//!
//! [cache]
//! directory = ~/.cavemap/tiles
//!
//! [device]
//! port_patterns = /dev/ttyACM*, /dev/ttyUSB*, /dev/cu.usbmodem*
//! poll_cycles = 50
//! poll_interval_ms = 100
//!
//! [fetch]
//! workers = 8
//!
//! [logging]
//! directory = ~/.cavemap/logs
//! level = info
//! ```
//!
//! Missing files and missing keys fall back to defaults. Values that are
//! present but unparseable are errors.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::fetch::{FetchConfig, DEFAULT_FETCH_WORKERS};
use crate::grid::PixelSize;
use crate::logging::{LoggingConfig, DEFAULT_LOG_FILE_PREFIX, DEFAULT_LOG_LEVEL};
use crate::mnemo::{
    DeviceConfig, DEFAULT_POLL_CYCLES, DEFAULT_POLL_INTERVAL, DEFAULT_PORT_PATTERNS,
};
use crate::provider::{
    GoogleStaticMapProvider, MapProvider, ProviderError, GOOGLE_PROVIDER_NAME,
    GOOGLE_STATIC_MAP_URL,
};

/// Name of the per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".cavemap";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default tile edge in pixels.
pub const DEFAULT_TILE_EDGE: u32 = 256;

/// Errors from reading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Per-user configuration directory (`~/.cavemap`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Expands a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub name: String,
    pub api_key: String,
    pub maptype: String,
    pub scaling: u8,
    pub format: String,
    pub base_url: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: GOOGLE_PROVIDER_NAME.to_string(),
            api_key: String::new(),
            maptype: "satellite".to_string(),
            scaling: 1,
            format: "png".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_EDGE,
            tile_height: DEFAULT_TILE_EDGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub directory: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: config_dir().join("tiles"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub port_patterns: Vec<String>,
    pub poll_cycles: u32,
    pub poll_interval_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            port_patterns: DEFAULT_PORT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            poll_cycles: DEFAULT_POLL_CYCLES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub workers: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_FETCH_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_dir().join("logs"),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// All settings from `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub grid: GridSettings,
    pub cache: CacheSettings,
    pub device: DeviceSettings,
    pub fetch: FetchSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Loads the user's configuration file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads a configuration file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Writes the configuration to the user's configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        self.to_ini().write_to_file(path).map_err(io_error)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = ProviderSettings {
            name: get("provider", "name").unwrap_or(defaults.provider.name),
            api_key: get("provider", "api_key").unwrap_or(defaults.provider.api_key),
            maptype: get("provider", "maptype").unwrap_or(defaults.provider.maptype),
            scaling: parse_value("provider", "scaling", get("provider", "scaling"))?
                .unwrap_or(defaults.provider.scaling),
            format: get("provider", "format").unwrap_or(defaults.provider.format),
            base_url: get("provider", "base_url"),
        };

        let grid = GridSettings {
            tile_width: parse_positive("grid", "tile_width", get("grid", "tile_width"))?
                .unwrap_or(defaults.grid.tile_width),
            tile_height: parse_positive("grid", "tile_height", get("grid", "tile_height"))?
                .unwrap_or(defaults.grid.tile_height),
        };

        let cache = CacheSettings {
            directory: get("cache", "directory")
                .map(|d| expand_tilde(&d))
                .unwrap_or(defaults.cache.directory),
        };

        let device = DeviceSettings {
            port_patterns: get("device", "port_patterns")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.device.port_patterns),
            poll_cycles: parse_positive("device", "poll_cycles", get("device", "poll_cycles"))?
                .unwrap_or(defaults.device.poll_cycles),
            poll_interval_ms: parse_value(
                "device",
                "poll_interval_ms",
                get("device", "poll_interval_ms"),
            )?
            .unwrap_or(defaults.device.poll_interval_ms),
        };

        let fetch = FetchSettings {
            workers: parse_positive("fetch", "workers", get("fetch", "workers"))?
                .unwrap_or(defaults.fetch.workers),
        };

        let logging = LoggingSettings {
            directory: get("logging", "directory")
                .map(|d| expand_tilde(&d))
                .unwrap_or(defaults.logging.directory),
            level: get("logging", "level").unwrap_or(defaults.logging.level),
        };

        Ok(Self {
            provider,
            grid,
            cache,
            device,
            fetch,
            logging,
        })
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("provider"))
            .set("name", self.provider.name.as_str())
            .set("api_key", self.provider.api_key.as_str())
            .set("maptype", self.provider.maptype.as_str())
            .set("scaling", self.provider.scaling.to_string())
            .set("format", self.provider.format.as_str());
        if let Some(base_url) = &self.provider.base_url {
            ini.with_section(Some("provider"))
                .set("base_url", base_url.as_str());
        }

        ini.with_section(Some("grid"))
            .set("tile_width", self.grid.tile_width.to_string())
            .set("tile_height", self.grid.tile_height.to_string());

        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.to_string_lossy());

        ini.with_section(Some("device"))
            .set("port_patterns", self.device.port_patterns.join(", "))
            .set("poll_cycles", self.device.poll_cycles.to_string())
            .set("poll_interval_ms", self.device.poll_interval_ms.to_string());

        ini.with_section(Some("fetch"))
            .set("workers", self.fetch.workers.to_string());

        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.to_string_lossy())
            .set("level", self.logging.level.as_str());

        ini
    }

    /// Tile size for grid requests.
    pub fn tile_size(&self) -> PixelSize {
        PixelSize::new(self.grid.tile_width, self.grid.tile_height)
    }

    /// Device discovery and polling settings.
    pub fn to_device_config(&self) -> DeviceConfig {
        DeviceConfig::default()
            .with_port_patterns(self.device.port_patterns.clone())
            .with_poll_cycles(self.device.poll_cycles)
            .with_poll_interval(Duration::from_millis(self.device.poll_interval_ms))
    }

    /// Fetch pool settings.
    pub fn to_fetch_config(&self) -> FetchConfig {
        FetchConfig::default().with_workers(self.fetch.workers)
    }

    /// Logging settings with file output enabled.
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            directory: Some(self.logging.directory.clone()),
            file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            level: self.logging.level.clone(),
            stderr: true,
        }
    }

    /// Builds the configured tile provider.
    pub fn to_provider(&self) -> Result<Arc<dyn MapProvider>, ProviderError> {
        match self.provider.name.as_str() {
            GOOGLE_PROVIDER_NAME => {
                let provider = GoogleStaticMapProvider::new(self.provider.api_key.clone())
                    .with_base_url(
                        self.provider
                            .base_url
                            .clone()
                            .unwrap_or_else(|| GOOGLE_STATIC_MAP_URL.to_string()),
                    )
                    .with_maptype(self.provider.maptype.clone())
                    .with_scaling(self.provider.scaling)
                    .with_format(self.provider.format.clone());
                Ok(Arc::new(provider))
            }
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

fn parse_value<T>(section: &str, key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn parse_positive<T>(
    section: &str,
    key: &str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let parsed = parse_value::<T>(section, key, raw)?;
    if parsed.as_ref() == Some(&T::default()) {
        return Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.fetch.workers, 8);
        assert_eq!(config.device.poll_cycles, 50);
        assert_eq!(config.tile_size(), PixelSize::square(256));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.provider.api_key = "secret".to_string();
        config.provider.base_url = Some("http://localhost:9000/static".to_string());
        config.grid.tile_width = 640;
        config.device.port_patterns = vec!["/dev/ttyS*".to_string()];
        config.fetch.workers = 3;
        config.cache.directory = temp.path().join("tiles");
        config.logging.level = "cavemap=debug".to_string();

        config.save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[provider]\napi_key = abc\n\n[device]\nport_patterns = /dev/a*, /dev/b*\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.provider.api_key, "abc");
        assert_eq!(config.provider.maptype, "satellite");
        assert_eq!(config.device.port_patterns, vec!["/dev/a*", "/dev/b*"]);
        assert_eq!(config.grid, GridSettings::default());
    }

    #[test]
    fn test_invalid_number_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[fetch]\nworkers = many\n").unwrap();

        match ConfigFile::load_from(&path) {
            Err(ConfigError::InvalidValue { section, key, .. }) => {
                assert_eq!(section, "fetch");
                assert_eq!(key, "workers");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[grid]\ntile_width = 0\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_device_config_conversion() {
        let mut config = ConfigFile::default();
        config.device.poll_interval_ms = 25;
        config.device.poll_cycles = 7;

        let device = config.to_device_config();
        assert_eq!(device.poll_interval, Duration::from_millis(25));
        assert_eq!(device.poll_cycles, 7);
    }

    #[test]
    fn test_provider_from_config() {
        let mut config = ConfigFile::default();
        config.provider.api_key = "k".to_string();
        config.provider.maptype = "terrain".to_string();

        let provider = config.to_provider().unwrap();
        assert_eq!(provider.name(), "google");
        let center = crate::coord::LatLng::new(1.0, 2.0);
        let url = provider.tile_url(center, 4, PixelSize::square(256));
        assert!(url.contains("maptype=terrain"));

        config.provider.name = "bing".to_string();
        assert!(matches!(
            config.to_provider(),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/tiles"), home.join("tiles"));
        }
    }
}
