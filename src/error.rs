use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SnagError {
    #[error("No captures completed")]
    CaptureEmpty,

    #[error("Malformed PNG container: {0}")]
    Format(String),

    #[error("Segment {index} is {actual}px wide, expected {expected}px")]
    DimensionMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },

    #[error("Invalid page layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid metadata entry: {0}")]
    InvalidMetadata(String),

    #[error("Layout probe failed: {0}")]
    LayoutProbeFailed(String),

    #[error("Scroll command failed: {0}")]
    ScrollFailed(String),

    #[error("Viewport capture failed: {0}")]
    CaptureFailed(String),

    #[error("Sink write failed: {0}")]
    SinkFailed(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SnagError {
    /// Failures raised by one of the external collaborators (probe, scroll,
    /// capture, sink) rather than by the pipeline itself.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            SnagError::LayoutProbeFailed(_)
                | SnagError::ScrollFailed(_)
                | SnagError::CaptureFailed(_)
                | SnagError::SinkFailed(_)
                | SnagError::PageError(_)
                | SnagError::IoError(_)
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SnagError::InvalidMetadata(_) => ErrorSeverity::Low,
            SnagError::CaptureEmpty => ErrorSeverity::Low,
            SnagError::ConfigurationError(_) => ErrorSeverity::High,
            SnagError::BrowserLaunchFailed(_) => ErrorSeverity::High,
            SnagError::Format(_) => ErrorSeverity::High,
            _ => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl From<std::io::Error> for SnagError {
    fn from(err: std::io::Error) -> Self {
        SnagError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SnagError {
    fn from(err: serde_json::Error) -> Self {
        SnagError::SerializationError(err.to_string())
    }
}

impl From<image::ImageError> for SnagError {
    fn from(err: image::ImageError) -> Self {
        SnagError::ImageError(err.to_string())
    }
}
