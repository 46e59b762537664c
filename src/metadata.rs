//! Provenance metadata attached to every capture

use crate::{CaptureTarget, PageLayout, SnagError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// One key/value pair destined for a tEXt chunk.
///
/// Neither part may contain a NUL byte since NUL separates key from value
/// inside the chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<(), SnagError> {
        if self.key.is_empty() {
            return Err(SnagError::InvalidMetadata("empty key".to_string()));
        }
        if self.key.contains('\0') {
            return Err(SnagError::InvalidMetadata(format!(
                "key {:?} contains a NUL byte",
                self.key
            )));
        }
        if self.value.contains('\0') {
            return Err(SnagError::InvalidMetadata(format!(
                "value for key {:?} contains a NUL byte",
                self.key
            )));
        }
        Ok(())
    }

    /// Parse the `key=value` form used on the command line.
    pub fn parse_pair(pair: &str) -> Result<Self, SnagError> {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            SnagError::InvalidMetadata(format!("expected key=value, got {pair:?}"))
        })?;
        let entry = Self::new(key.trim(), value);
        entry.validate()?;
        Ok(entry)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<u64>,
}

/// ISO-8601 in UTC with millisecond precision and a trailing `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `full_page_<tag>.png`, where the tag is the timestamp stripped of `:` and
/// `.` and cut to 15 characters.
pub fn artifact_filename(timestamp: &str) -> String {
    let tag: String = timestamp
        .chars()
        .filter(|c| !matches!(c, ':' | '.'))
        .take(15)
        .collect();
    format!("full_page_{tag}.png")
}

/// Drop NUL bytes from page-supplied text so it fits in a tEXt value.
pub fn strip_nul(text: &str) -> String {
    text.chars().filter(|&c| c != '\0').collect()
}

/// The four entries written into every capture, in this order:
/// `CapturedURL`, `PageTitle`, `Timestamp`, `SnagManifest`.
///
/// URL and title come from the page and are stripped of NUL bytes. Tab and
/// window ids are left out of the manifest when unknown.
pub fn provenance_entries(
    layout: &PageLayout,
    target: &CaptureTarget,
    timestamp: &str,
) -> Result<Vec<MetadataEntry>, SnagError> {
    let url = strip_nul(&layout.url);
    let title = strip_nul(&layout.title);
    let manifest = Manifest {
        url: &url,
        title: &title,
        timestamp,
        tab_id: target.tab_id,
        window_id: target.window_id,
    };
    let manifest = serde_json::to_string(&manifest)?;

    Ok(vec![
        MetadataEntry::new("CapturedURL", url),
        MetadataEntry::new("PageTitle", title),
        MetadataEntry::new("Timestamp", timestamp),
        MetadataEntry::new("SnagManifest", manifest),
    ])
}
