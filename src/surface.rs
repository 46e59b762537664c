//! Collaborator seams for the capture pipeline
//!
//! The pipeline never talks to a browser directly. It drives a [`PageSurface`]
//! (layout probe, scroll commander, viewport capture) and hands the finished
//! artifact to an [`ArtifactSink`].

use crate::SnagError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Page geometry and identity measured once at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub scroll_x: i64,
    pub scroll_y: i64,
    pub total_height: u32,
    pub viewport_height: u32,
    pub title: String,
    pub url: String,
}

/// A scrollable page that can report its layout and screenshot its viewport.
///
/// Calls are issued strictly one at a time by the orchestrator.
#[async_trait]
pub trait PageSurface: Send + Sync {
    async fn probe_layout(&self) -> Result<PageLayout, SnagError>;

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), SnagError>;

    /// PNG-encoded screenshot of the currently visible viewport.
    async fn capture_viewport(&self) -> Result<Vec<u8>, SnagError>;
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub bytes: Vec<u8>,
    pub data_url: String,
    pub filename: String,
    pub prompt_user: bool,
}

/// Destination for finished artifacts: a save-file request or a clipboard write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save(&self, request: SaveRequest) -> Result<(), SnagError>;

    async fn write_clipboard(&self, bytes: Vec<u8>, mime: &'static str) -> Result<(), SnagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_probe_json() {
        let json = r#"{
            "scrollX": 0,
            "scrollY": 340,
            "totalHeight": 2500,
            "viewportHeight": 1000,
            "title": "Example",
            "url": "https://example.com/"
        }"#;

        let layout: PageLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.scroll_y, 340);
        assert_eq!(layout.total_height, 2500);
        assert_eq!(layout.viewport_height, 1000);
        assert_eq!(layout.url, "https://example.com/");
    }
}
