//! Configuration management with serde serialization/deserialization
//!
//! This module provides the configuration structures for snag: capture pacing,
//! stitching policy, artifact encoding, and the browser used to render pages.

use crate::SnagError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Slice size used when feeding the artifact to the base64 encoder.
pub const DEFAULT_ENCODING_SLICE: usize = 0x8000;

/// Main configuration structure for snag
///
/// # Examples
///
/// ```rust
/// use snag::Config;
/// use std::time::Duration;
///
/// let config = Config {
///     settle_delay: Duration::from_millis(750),
///     ..Default::default()
/// };
/// assert!(config.enforce_equal_widths);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Pause between scrolling and capturing each segment (default: 400ms)
    ///
    /// Gives the page time to repaint and load lazy content. This is a
    /// heuristic, not a "redraw complete" signal.
    pub settle_delay: Duration,

    /// Upper bound for a single viewport capture (default: 30 seconds)
    pub capture_timeout: Duration,

    /// Fail the run when segments come back with differing widths (default: true)
    ///
    /// When false, segments are drawn left-aligned onto a canvas as wide as
    /// the first segment and any mismatch goes unreported.
    pub enforce_equal_widths: bool,

    /// Byte slice size fed to the base64 encoder (default: 32768)
    pub encoding_slice_size: usize,

    /// Ask before saving a file artifact (default: true)
    pub prompt_user: bool,

    /// Directory that file artifacts are written to (default: current dir)
    pub output_dir: PathBuf,

    /// Browser viewport used for rendering
    pub viewport: Viewport,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Custom User-Agent string (default: Chrome default)
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(400),
            capture_timeout: Duration::from_secs(30),
            enforce_equal_widths: true,
            encoding_slice_size: DEFAULT_ENCODING_SLICE,
            prompt_user: true,
            output_dir: PathBuf::from("."),
            viewport: Viewport::default(),
            chrome_path: None,
            user_agent: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), SnagError> {
        if self.encoding_slice_size == 0 {
            return Err(SnagError::ConfigurationError(
                "Encoding slice size must be greater than 0".to_string(),
            ));
        }

        if self.capture_timeout.is_zero() {
            return Err(SnagError::ConfigurationError(
                "Capture timeout must be greater than 0".to_string(),
            ));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(SnagError::ConfigurationError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        if self.viewport.device_scale_factor <= 0.0 {
            return Err(SnagError::ConfigurationError(
                "Device scale factor must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Browser viewport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,

    /// Device pixel ratio (default: 1.0)
    ///
    /// Captured segments are `width * factor` pixels wide.
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
        }
    }
}

/// Where the finished artifact goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum CaptureMode {
    /// Save as a file through the save sink (default)
    #[default]
    File,
    /// Write the PNG blob to the clipboard
    Clipboard,
}

impl CaptureMode {
    pub fn from_clipboard_flag(clipboard: bool) -> Self {
        if clipboard {
            CaptureMode::Clipboard
        } else {
            CaptureMode::File
        }
    }
}

/// Identifies the page a capture runs against
///
/// The ids end up in the embedded manifest and mirror the host's tab and
/// window handles. Unknown ids are omitted from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureTarget {
    pub tab_id: Option<u64>,
    pub window_id: Option<u64>,
}

/// Generate Chrome command-line arguments based on configuration
///
/// # Examples
///
/// ```rust
/// use snag::{Config, get_chrome_args};
///
/// let args = get_chrome_args(&Config::default());
/// assert!(args.contains(&"--headless".to_string()));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--hide-scrollbars".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
        format!(
            "--user-data-dir={}",
            std::env::temp_dir()
                .join(format!("snag-chromium-{}", std::process::id()))
                .display()
        ),
    ];

    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, SnagError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(SnagError::BrowserLaunchFailed)
}
