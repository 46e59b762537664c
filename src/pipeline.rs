//! Full-page capture pipeline
//!
//! Ties the orchestrator, stitcher and metadata embedder together and hands
//! the finished artifact to a sink. One run covers one page:
//! measure → scroll/settle/capture each segment → restore scroll → stitch →
//! embed provenance → deliver.

use crate::{
    artifact_filename, encode_base64_sliced, encode_png, format_timestamp, inject_text_chunks,
    provenance_entries, stitch, to_data_url, ArtifactSink, CaptureMode, CaptureTarget, Config,
    Metrics, PageLayout, PageSurface, SaveRequest, SegmentCapturer, SnagError, PNG_MIME,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The finished PNG with provenance embedded, in raw and transport form.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub base64: String,
    pub filename: String,
    pub timestamp: String,
    pub layout: PageLayout,
    pub segment_count: usize,
    pub width: u32,
    pub height: u32,
}

impl EncodedArtifact {
    pub fn data_url(&self) -> String {
        to_data_url(&self.base64)
    }
}

#[derive(Debug)]
pub struct CaptureResult {
    pub run_id: String,
    pub mode: CaptureMode,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<SnagError>,
    pub artifact: Option<EncodedArtifact>,
}

/// Runs full-page captures.
///
/// Runs are serialized: a second capture waits until the previous one has
/// restored its page's scroll position and built its artifact.
///
/// # Examples
///
/// ```rust,no_run
/// use snag::{CaptureMode, CaptureTarget, ChromeSurface, Config, LocalSink, SnagService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let surface = ChromeSurface::launch(&config, "https://example.com").await?;
///     let sink = LocalSink::new(config.output_dir.clone());
///     let service = SnagService::new(config);
///
///     let result = service
///         .run(&surface, &CaptureTarget::default(), &sink, CaptureMode::File)
///         .await;
///     println!("success: {}", result.success);
///
///     surface.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct SnagService {
    config: Config,
    capturer: SegmentCapturer,
    metrics: Arc<Metrics>,
    in_flight: Mutex<()>,
}

impl SnagService {
    pub fn new(config: Config) -> Self {
        Self::with_metrics(config, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(config: Config, metrics: Arc<Metrics>) -> Self {
        let capturer = SegmentCapturer::new(&config);
        Self {
            config,
            capturer,
            metrics,
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Capture, deliver, and log the outcome. Never returns an error: every
    /// failure is reported through the returned [`CaptureResult`] and the log,
    /// and no artifact reaches the sink unless the whole run succeeded.
    pub async fn run(
        &self,
        surface: &dyn PageSurface,
        target: &CaptureTarget,
        sink: &dyn ArtifactSink,
        mode: CaptureMode,
    ) -> CaptureResult {
        let run_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        info!("Capture {} started ({:?} mode)", run_id, mode);

        let outcome = async {
            let artifact = self.capture_full_page(surface, target).await?;
            self.deliver(&artifact, mode, sink).await?;
            Ok::<_, SnagError>(artifact)
        }
        .await;

        let duration = start_time.elapsed();
        self.metrics.record_capture(duration, outcome.is_ok());

        match outcome {
            Ok(artifact) => {
                info!(
                    "Capture {} finished in {:?}: {} ({}x{}, {} bytes)",
                    run_id,
                    duration,
                    artifact.filename,
                    artifact.width,
                    artifact.height,
                    artifact.bytes.len()
                );
                CaptureResult {
                    run_id,
                    mode,
                    duration,
                    success: true,
                    error: None,
                    artifact: Some(artifact),
                }
            }
            Err(e) => {
                if e.is_collaborator_failure() {
                    error!("Capture {} failed in host call: {}", run_id, e);
                } else {
                    error!("Capture {} failed ({:?} severity): {}", run_id, e.severity(), e);
                }
                CaptureResult {
                    run_id,
                    mode,
                    duration,
                    success: false,
                    error: Some(e),
                    artifact: None,
                }
            }
        }
    }

    /// Capture the page and build the artifact without delivering it.
    pub async fn capture_full_page(
        &self,
        surface: &dyn PageSurface,
        target: &CaptureTarget,
    ) -> Result<EncodedArtifact, SnagError> {
        let _guard = self.in_flight.lock().await;

        let timestamp = format_timestamp(Utc::now());
        let filename = artifact_filename(&timestamp);

        let page = self.capturer.capture(surface).await?;
        let segment_count = page.segments.len();
        self.metrics.record_segments(segment_count);

        let enforce_widths = self.config.enforce_equal_widths;
        let segments = page.segments;
        let (composite_png, width, height) = tokio::task::spawn_blocking(move || {
            let composite = stitch(&segments, enforce_widths)?;
            let png = encode_png(&composite)?;
            Ok::<_, SnagError>((png, composite.width(), composite.height()))
        })
        .await
        .map_err(|e| SnagError::ImageError(format!("stitching task failed: {e}")))??;
        debug!("Composite {}x{}, {} bytes before metadata", width, height, composite_png.len());

        let entries = provenance_entries(&page.layout, target, &timestamp)?;
        let bytes = inject_text_chunks(&composite_png, &entries)?;
        let base64 = encode_base64_sliced(&bytes, self.config.encoding_slice_size)?;
        self.metrics.record_artifact(bytes.len());

        Ok(EncodedArtifact {
            bytes,
            base64,
            filename,
            timestamp,
            layout: page.layout,
            segment_count,
            width,
            height,
        })
    }

    /// Hand the artifact to the clipboard or save sink according to `mode`.
    pub async fn deliver(
        &self,
        artifact: &EncodedArtifact,
        mode: CaptureMode,
        sink: &dyn ArtifactSink,
    ) -> Result<(), SnagError> {
        match mode {
            CaptureMode::Clipboard => {
                sink.write_clipboard(artifact.bytes.clone(), PNG_MIME).await?;
                info!("Image copied to clipboard");
            }
            CaptureMode::File => {
                sink.save(SaveRequest {
                    bytes: artifact.bytes.clone(),
                    data_url: artifact.data_url(),
                    filename: artifact.filename.clone(),
                    prompt_user: self.config.prompt_user,
                })
                .await?;
                info!("Image saved as {}", artifact.filename);
            }
        }
        Ok(())
    }
}
