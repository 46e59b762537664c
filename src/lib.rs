//! # snag
//!
//! Full-page screenshots with provenance baked into the image.
//!
//! A capture scrolls the page one viewport at a time, screenshots each
//! position after a short settle delay, stitches the segments into a single
//! PNG, and injects `tEXt` chunks recording where and when the page was
//! captured. The scroll position is put back once capturing ends, whether or
//! not it succeeded.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Layout probe, scroll, settle, capture | [`capture`] | ordered [`Segment`]s + [`PageLayout`] |
//! | Vertical concatenation | [`stitch`] | composite RGBA raster, PNG-encoded |
//! | Metadata injection | [`png_text`] | PNG with tEXt chunks after IHDR, base64 |
//! | Delivery | [`sink`] | file on disk or clipboard |
//!
//! Each capture embeds, in order: `CapturedURL`, `PageTitle`, `Timestamp`
//! and `SnagManifest` (a JSON object with url, title, timestamp, tab and
//! window ids).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snag::{CaptureMode, CaptureTarget, ChromeSurface, Config, LocalSink, SnagService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let surface = ChromeSurface::launch(&config, "https://example.com").await?;
//!     let sink = LocalSink::new(config.output_dir.clone());
//!     let service = SnagService::new(config);
//!
//!     let result = service
//!         .run(&surface, &CaptureTarget::default(), &sink, CaptureMode::File)
//!         .await;
//!     surface.shutdown().await;
//!
//!     if let Some(artifact) = result.artifact {
//!         println!("Saved {} ({} bytes)", artifact.filename, artifact.bytes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! snag capture https://example.com --output captures/
//! snag capture https://example.com --clipboard
//! snag inspect captures/full_page_2025-01-01T0000.png
//! snag embed plain.png -o tagged.png -e Author=me -e Source=scan
//! ```

/// Configuration and settings
pub mod config;

/// Error types
pub mod error;

/// Collaborator traits: page surface and artifact sink
pub mod surface;

/// Scroll/settle/capture orchestration
pub mod capture;

/// Vertical stitching of segments
pub mod stitch;

/// PNG chunk walking, tEXt injection, CRC and base64
pub mod png_text;

/// Provenance metadata entries
pub mod metadata;

/// End-to-end capture service
pub mod pipeline;

/// Headless Chrome surface
pub mod browser;

/// File and clipboard sinks
pub mod sink;

/// Command-line interface implementation
pub mod cli;

/// Metrics handles
pub mod metrics;

/// Utility functions and helpers
pub mod utils;


pub use browser::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use error::{ErrorSeverity, SnagError};
pub use metadata::*;
pub use self::metrics::*;
pub use pipeline::*;
pub use png_text::*;
pub use sink::*;
pub use stitch::*;
pub use surface::*;
pub use utils::*;
