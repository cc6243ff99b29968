//! Reading dumps from a connected Mnemo.
//!
//! The device shows up as a USB CDC serial node. Discovery globs the
//! configured port patterns; reading polls the port without blocking for a
//! bounded number of cycles and stops early once a transfer has started and
//! then gone quiet. An abort flag is checked between cycles; on abort the
//! bytes collected so far are returned.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::{ImportError, ImportResult};

/// Default number of poll cycles before giving up.
pub const DEFAULT_POLL_CYCLES: u32 = 50;

/// Default sleep between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default serial node patterns (Linux CDC/FTDI, macOS).
pub const DEFAULT_PORT_PATTERNS: &[&str] =
    &["/dev/ttyACM*", "/dev/ttyUSB*", "/dev/cu.usbmodem*"];

/// Read buffer size per poll.
const READ_CHUNK: usize = 4096;

/// Device discovery and polling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Glob patterns tried in order; the first match wins.
    pub port_patterns: Vec<String>,
    pub poll_cycles: u32,
    pub poll_interval: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_patterns: DEFAULT_PORT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            poll_cycles: DEFAULT_POLL_CYCLES,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl DeviceConfig {
    /// Replaces the port patterns.
    pub fn with_port_patterns(mut self, patterns: Vec<String>) -> Self {
        self.port_patterns = patterns;
        self
    }

    /// Sets the number of poll cycles.
    pub fn with_poll_cycles(mut self, cycles: u32) -> Self {
        self.poll_cycles = cycles;
        self
    }

    /// Sets the sleep between poll cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// A byte source attached to the device.
pub trait DeviceLink {
    /// Reads whatever is available without blocking; `Ok(0)` means nothing yet.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Path of the underlying port, for diagnostics.
    fn path(&self) -> &Path;
}

/// Serial port opened in non-blocking mode.
#[derive(Debug)]
pub struct SerialDevice {
    file: File,
    path: PathBuf,
}

impl SerialDevice {
    /// Opens a serial node for non-blocking reads.
    pub fn open(path: &Path) -> ImportResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY);
        }

        let file = options.open(path).map_err(|e| ImportError::io(path, e))?;
        debug!(path = %path.display(), "Opened serial device");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl DeviceLink for SerialDevice {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Finds the first serial node matching the configured patterns.
pub fn discover_device(config: &DeviceConfig) -> ImportResult<PathBuf> {
    for pattern in &config.port_patterns {
        let entries = glob::glob(pattern).map_err(|e| ImportError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut matches: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        matches.sort();

        if let Some(path) = matches.into_iter().next() {
            info!(path = %path.display(), pattern = %pattern, "Found Mnemo device");
            return Ok(path);
        }
    }

    Err(ImportError::DeviceNotFound {
        patterns: config.port_patterns.clone(),
    })
}

/// Polls a link until the transfer completes, the budget runs out, or
/// `abort` is set.
///
/// # Errors
///
/// - `NoDataFromDevice` if every cycle came back empty
/// - `Aborted` if `abort` was set before anything arrived
/// - `SerialPortPermission` / `Io` if the port fails mid-read
pub fn read_from_device<L>(
    link: &mut L,
    config: &DeviceConfig,
    abort: &AtomicBool,
) -> ImportResult<Vec<u8>>
where
    L: DeviceLink + ?Sized,
{
    let mut collected = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    for cycle in 1..=config.poll_cycles {
        if abort.load(Ordering::Relaxed) {
            warn!(bytes = collected.len(), cycle, "Device read aborted");
            if collected.is_empty() {
                return Err(ImportError::Aborted);
            }
            return Ok(collected);
        }

        let mut received = 0;
        loop {
            let n = link
                .read_available(&mut buf)
                .map_err(|e| ImportError::io(link.path(), e))?;
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
            received += n;
        }

        if received == 0 && !collected.is_empty() {
            debug!(bytes = collected.len(), cycle, "Device transfer complete");
            return Ok(collected);
        }

        thread::sleep(config.poll_interval);
    }

    if collected.is_empty() {
        return Err(ImportError::NoDataFromDevice {
            path: link.path().to_path_buf(),
            cycles: config.poll_cycles,
        });
    }

    warn!(
        bytes = collected.len(),
        cycles = config.poll_cycles,
        "Poll budget exhausted while device was still sending"
    );
    Ok(collected)
}

/// Opens and reads the device in one go.
///
/// # Arguments
///
/// * `config` - Discovery and polling settings
/// * `port` - Explicit serial node; `None` runs discovery
/// * `abort` - Set from another thread to stop polling
///
/// # Returns
///
/// The port that was read and the raw dump bytes.
pub fn import_from_device(
    config: &DeviceConfig,
    port: Option<&Path>,
    abort: &AtomicBool,
) -> ImportResult<(PathBuf, Vec<u8>)> {
    let path = match port {
        Some(port) => port.to_path_buf(),
        None => discover_device(config)?,
    };
    let mut device = SerialDevice::open(&path)?;
    let bytes = read_from_device(&mut device, config, abort)?;
    info!(path = %path.display(), bytes = bytes.len(), "Read dump from device");
    Ok((path, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Scripted link: each entry is what one read call returns.
    struct MockLink {
        reads: VecDeque<io::Result<Vec<u8>>>,
        path: PathBuf,
        abort_after_first_data: Option<Arc<AtomicBool>>,
    }

    impl MockLink {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                path: PathBuf::from("/dev/mock"),
                abort_after_first_data: None,
            }
        }
    }

    impl DeviceLink for MockLink {
        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    if !data.is_empty() {
                        if let Some(flag) = &self.abort_after_first_data {
                            flag.store(true, Ordering::Relaxed);
                        }
                    }
                    Ok(data.len())
                }
            }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    fn fast_config(cycles: u32) -> DeviceConfig {
        DeviceConfig::default()
            .with_poll_cycles(cycles)
            .with_poll_interval(Duration::ZERO)
    }

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.poll_cycles, 50);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.port_patterns.len(), 3);
    }

    #[test]
    fn test_reads_until_quiet() {
        let mut link = MockLink::new(vec![
            Ok(vec![]),
            Ok(vec![1, 2, 3]),
            Ok(vec![4, 5]),
            Ok(vec![]),
        ]);
        let abort = AtomicBool::new(false);

        let bytes = read_from_device(&mut link, &fast_config(10), &abort).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_data_after_budget() {
        let mut link = MockLink::new(vec![]);
        let abort = AtomicBool::new(false);

        let result = read_from_device(&mut link, &fast_config(3), &abort);
        match result {
            Err(ImportError::NoDataFromDevice { cycles, path }) => {
                assert_eq!(cycles, 3);
                assert_eq!(path, PathBuf::from("/dev/mock"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_abort_returns_partial_data() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut link = MockLink::new(vec![Ok(vec![9, 8]), Ok(vec![]), Ok(vec![7])]);
        link.abort_after_first_data = Some(Arc::clone(&flag));

        let bytes = read_from_device(&mut link, &fast_config(10), &flag).unwrap();
        assert_eq!(bytes, vec![9, 8]);
    }

    #[test]
    fn test_abort_before_any_data() {
        let mut link = MockLink::new(vec![Ok(vec![1])]);
        let abort = AtomicBool::new(true);

        let result = read_from_device(&mut link, &fast_config(10), &abort);
        assert!(matches!(result, Err(ImportError::Aborted)));
    }

    #[test]
    fn test_permission_error_mid_read() {
        let mut link = MockLink::new(vec![Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ))]);
        let abort = AtomicBool::new(false);

        let result = read_from_device(&mut link, &fast_config(5), &abort);
        assert!(matches!(
            result,
            Err(ImportError::SerialPortPermission { .. })
        ));
    }

    #[test]
    fn test_discover_first_match_sorted() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ttyACM1"), b"").unwrap();
        std::fs::write(temp.path().join("ttyACM0"), b"").unwrap();

        let pattern = temp.path().join("ttyACM*").to_string_lossy().to_string();
        let config = DeviceConfig::default().with_port_patterns(vec![pattern]);

        assert_eq!(discover_device(&config).unwrap(), temp.path().join("ttyACM0"));
    }

    #[test]
    fn test_discover_falls_through_patterns() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ttyUSB0"), b"").unwrap();

        let config = DeviceConfig::default().with_port_patterns(vec![
            temp.path().join("ttyACM*").to_string_lossy().to_string(),
            temp.path().join("ttyUSB*").to_string_lossy().to_string(),
        ]);

        assert_eq!(discover_device(&config).unwrap(), temp.path().join("ttyUSB0"));
    }

    #[test]
    fn test_discover_nothing_found() {
        let temp = TempDir::new().unwrap();
        let pattern = temp.path().join("ttyACM*").to_string_lossy().to_string();
        let config = DeviceConfig::default().with_port_patterns(vec![pattern.clone()]);

        match discover_device(&config) {
            Err(ImportError::DeviceNotFound { patterns }) => assert_eq!(patterns, vec![pattern]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let config = DeviceConfig::default().with_port_patterns(vec!["/dev/[".to_string()]);
        assert!(matches!(
            discover_device(&config),
            Err(ImportError::InvalidPattern { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_serial_device_reads_node() {
        let temp = TempDir::new().unwrap();
        let node = temp.path().join("ttyACM0");
        std::fs::write(&node, [2u8, 24, 3]).unwrap();

        let mut device = SerialDevice::open(&node).unwrap();
        let abort = AtomicBool::new(false);
        let bytes = read_from_device(&mut device, &fast_config(5), &abort).unwrap();
        assert_eq!(bytes, vec![2, 24, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_import_from_explicit_port() {
        let temp = TempDir::new().unwrap();
        let node = temp.path().join("ttyS3");
        std::fs::write(&node, [7u8, 7, 7]).unwrap();

        let abort = AtomicBool::new(false);
        let (path, bytes) = import_from_device(&fast_config(5), Some(&node), &abort).unwrap();
        assert_eq!(path, node);
        assert_eq!(bytes, vec![7, 7, 7]);
    }

    #[cfg(unix)]
    #[test]
    fn test_import_discovers_port() {
        let temp = TempDir::new().unwrap();
        let node = temp.path().join("ttyACM0");
        std::fs::write(&node, [1u8, 2]).unwrap();

        let pattern = temp.path().join("ttyACM*").to_string_lossy().to_string();
        let config = fast_config(5).with_port_patterns(vec![pattern]);
        let abort = AtomicBool::new(false);

        let (path, bytes) = import_from_device(&config, None, &abort).unwrap();
        assert_eq!(path, node);
        assert_eq!(bytes, vec![1, 2]);
    }

    #[test]
    fn test_import_without_device() {
        let temp = TempDir::new().unwrap();
        let pattern = temp.path().join("ttyACM*").to_string_lossy().to_string();
        let config = fast_config(5).with_port_patterns(vec![pattern]);
        let abort = AtomicBool::new(false);

        assert!(matches!(
            import_from_device(&config, None, &abort),
            Err(ImportError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn test_open_missing_node() {
        let temp = TempDir::new().unwrap();
        let result = SerialDevice::open(&temp.path().join("ttyACM9"));
        assert!(matches!(result, Err(ImportError::Io { .. })));
    }
}
