//! Segment capture orchestration
//!
//! Scrolls the page one viewport at a time, waits for it to settle, and
//! screenshots each position. The original scroll offset is put back on every
//! exit path once the layout has been measured.

use crate::{Config, PageLayout, PageSurface, Segment, SnagError};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// `ceil(total_height / viewport_height)`
pub fn segment_count(total_height: u32, viewport_height: u32) -> Result<u32, SnagError> {
    if viewport_height == 0 {
        return Err(SnagError::InvalidLayout(
            "viewport height is zero".to_string(),
        ));
    }
    Ok(total_height.div_ceil(viewport_height))
}

/// Scroll offsets for each segment, top to bottom.
pub fn segment_offsets(layout: &PageLayout) -> Result<Vec<u32>, SnagError> {
    let count = segment_count(layout.total_height, layout.viewport_height)?;
    Ok((0..count).map(|i| i * layout.viewport_height).collect())
}

/// Layout plus the segments captured for it, in capture order.
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub layout: PageLayout,
    pub segments: Vec<Segment>,
}

pub struct SegmentCapturer {
    settle_delay: Duration,
    capture_timeout: Duration,
}

impl SegmentCapturer {
    pub fn new(config: &Config) -> Self {
        Self {
            settle_delay: config.settle_delay,
            capture_timeout: config.capture_timeout,
        }
    }

    /// Measure the page once, capture every segment, then restore the
    /// original scroll position whether or not the capture succeeded.
    pub async fn capture(&self, surface: &dyn PageSurface) -> Result<CapturedPage, SnagError> {
        let layout = surface.probe_layout().await?;
        debug!(
            "Layout: {}px total, {}px viewport, scrolled to ({}, {})",
            layout.total_height, layout.viewport_height, layout.scroll_x, layout.scroll_y
        );

        let result = self.capture_segments(surface, &layout).await;

        if let Err(e) = surface.scroll_to(layout.scroll_x, layout.scroll_y).await {
            warn!(
                "Failed to restore scroll position ({}, {}): {}",
                layout.scroll_x, layout.scroll_y, e
            );
        }

        let segments = result?;
        Ok(CapturedPage { layout, segments })
    }

    async fn capture_segments(
        &self,
        surface: &dyn PageSurface,
        layout: &PageLayout,
    ) -> Result<Vec<Segment>, SnagError> {
        let offsets = segment_offsets(layout)?;
        let total = offsets.len();
        info!("Will capture {} segments", total);

        let mut segments = Vec::with_capacity(total);
        for (i, y) in offsets.into_iter().enumerate() {
            surface.scroll_to(0, y as i64).await?;

            sleep(self.settle_delay).await;

            let segment = match self.capture_one(surface, y).await {
                Ok(segment) => segment,
                Err(e) if segments.is_empty() => {
                    warn!("Capture of first segment failed: {}", e);
                    return Err(SnagError::CaptureEmpty);
                }
                Err(e) => return Err(e),
            };

            debug!(
                "Captured segment {}/{}, {}x{}",
                i + 1,
                total,
                segment.width(),
                segment.height()
            );
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(SnagError::CaptureEmpty);
        }

        Ok(segments)
    }

    async fn capture_one(&self, surface: &dyn PageSurface, y: u32) -> Result<Segment, SnagError> {
        let png = match timeout(self.capture_timeout, surface.capture_viewport()).await {
            Ok(png) => png?,
            Err(_) => {
                return Err(SnagError::CaptureFailed(format!(
                    "viewport capture timed out after {:?}",
                    self.capture_timeout
                )))
            }
        };

        Segment::decode(y, &png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count(2500, 1000).unwrap(), 3);
        assert_eq!(segment_count(3000, 1000).unwrap(), 3);
        assert_eq!(segment_count(1, 1000).unwrap(), 1);
        assert_eq!(segment_count(0, 1000).unwrap(), 0);
        assert_eq!(segment_count(u32::MAX, 1).unwrap(), u32::MAX);
        assert!(matches!(
            segment_count(100, 0),
            Err(SnagError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_segment_count_is_ceiling() {
        for total in [1u32, 7, 999, 1000, 1001, 123_456] {
            for viewport in [1u32, 3, 640, 1000] {
                let expected = (total as f64 / viewport as f64).ceil() as u32;
                assert_eq!(segment_count(total, viewport).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_segment_offsets() {
        let layout = PageLayout {
            scroll_x: 0,
            scroll_y: 0,
            total_height: 2500,
            viewport_height: 1000,
            title: String::new(),
            url: String::new(),
        };
        assert_eq!(segment_offsets(&layout).unwrap(), vec![0, 1000, 2000]);
    }
}
