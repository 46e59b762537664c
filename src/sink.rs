//! Local artifact sinks: files on disk and the desktop clipboard

use crate::{sanitize_filename, ArtifactSink, SaveRequest, SnagError};
use async_trait::async_trait;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Writes saved artifacts under `output_dir` and pipes clipboard writes to a
/// clipboard helper program (`wl-copy` on Wayland, `xclip` otherwise).
pub struct LocalSink {
    output_dir: PathBuf,
    clipboard_command: Vec<String>,
}

impl LocalSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            clipboard_command: default_clipboard_command(),
        }
    }

    pub fn with_clipboard_command(mut self, command: Vec<String>) -> Self {
        self.clipboard_command = command;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where a file named `filename` lands when the user accepts the default.
    pub fn default_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(sanitize_filename(filename))
    }

    async fn prompt_for_path(&self, default: PathBuf) -> Result<PathBuf, SnagError> {
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, saving to {}", default.display());
            return Ok(default);
        }

        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(format!("Save as [{}]: ", default.display()).as_bytes())
            .await?;
        stderr.flush().await?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

        Ok(resolve_answer(&self.output_dir, line.trim(), default))
    }
}

fn resolve_answer(output_dir: &Path, answer: &str, default: PathBuf) -> PathBuf {
    if answer.is_empty() {
        return default;
    }
    let chosen = PathBuf::from(answer);
    if chosen.is_absolute() {
        chosen
    } else {
        output_dir.join(chosen)
    }
}

/// Write `bytes` to a `.part` sibling of `path`, then rename it into place.
///
/// On failure the partial file is removed and `path` is left untouched.
pub async fn write_file_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut part_name = path
        .file_name()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?
        .to_os_string();
    part_name.push(".part");
    let part = path.with_file_name(part_name);

    let written = async {
        let mut file = fs::File::create(&part).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, path).await
    }
    .await;

    if written.is_err() {
        if let Err(e) = fs::remove_file(&part).await {
            debug!("Could not remove {}: {}", part.display(), e);
        }
    }
    written
}

fn default_clipboard_command() -> Vec<String> {
    let command: &[&str] = if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        &["wl-copy", "--type"]
    } else {
        &["xclip", "-selection", "clipboard", "-i", "-t"]
    };
    command.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl ArtifactSink for LocalSink {
    async fn save(&self, request: SaveRequest) -> Result<(), SnagError> {
        let default = self.default_path(&request.filename);
        let path = if request.prompt_user {
            self.prompt_for_path(default).await?
        } else {
            default
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        write_file_atomically(&path, &request.bytes)
            .await
            .map_err(|e| SnagError::SinkFailed(format!("{}: {}", path.display(), e)))?;

        info!("Saved capture to {}", path.display());
        Ok(())
    }

    async fn write_clipboard(&self, bytes: Vec<u8>, mime: &'static str) -> Result<(), SnagError> {
        let (program, args) = self
            .clipboard_command
            .split_first()
            .ok_or_else(|| SnagError::SinkFailed("no clipboard command configured".to_string()))?;

        // The MIME type is the final argument of the helper invocation.
        let mut child = Command::new(program)
            .args(args)
            .arg(mime)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| SnagError::SinkFailed(format!("failed to start {program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&bytes)
                .await
                .map_err(|e| SnagError::SinkFailed(format!("{program}: {e}")))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SnagError::SinkFailed(format!("{program}: {e}")))?;

        if !status.success() {
            return Err(SnagError::SinkFailed(format!("{program} exited with {status}")));
        }

        debug!("Wrote {} bytes of {} to clipboard via {}", bytes.len(), mime, program);
        Ok(())
    }
}
