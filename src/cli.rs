use crate::{
    format_bytes, format_duration, inject_text_chunks, read_text_chunks, to_data_url,
    encode_base64_sliced, validate_url, CaptureMode, CaptureTarget, ChromeSurface, ChunkCursor,
    write_file_atomically, Config, LocalSink, MetadataEntry, SnagService,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "snag")]
#[command(about = "Full-page screenshots with embedded provenance")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Chrome executable path")]
    pub chrome_path: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a full page and embed provenance metadata
    Capture {
        #[arg(help = "URL of the page to capture")]
        url: String,

        #[arg(long, help = "Copy the image to the clipboard instead of saving it")]
        clipboard: bool,

        #[arg(short, long, help = "Output directory")]
        output: Option<PathBuf>,

        #[arg(long, help = "Settle delay between scroll and capture, in milliseconds")]
        settle_ms: Option<u64>,

        #[arg(long, help = "Save without asking for a file name")]
        no_prompt: bool,

        #[arg(long, help = "Stitch segments even if their widths differ")]
        allow_mixed_widths: bool,

        #[arg(long, help = "Tab id recorded in the embedded manifest")]
        tab_id: Option<u64>,

        #[arg(long, help = "Window id recorded in the embedded manifest")]
        window_id: Option<u64>,
    },

    /// List the text metadata embedded in a PNG
    Inspect {
        #[arg(help = "PNG file to read")]
        file: PathBuf,

        #[arg(long, help = "Also list every chunk with its CRC status")]
        chunks: bool,
    },

    /// Embed key=value text metadata into an existing PNG
    Embed {
        #[arg(help = "Source PNG")]
        input: PathBuf,

        #[arg(short, long, help = "Destination PNG")]
        output: PathBuf,

        #[arg(short, long = "entry", help = "Metadata entry as key=value (repeatable)")]
        entries: Vec<String>,

        #[arg(long, help = "Print the result as a data URL")]
        data_url: bool,
    },

    /// Validate configuration
    Validate {
        #[arg(value_name = "FILE", help = "Configuration file to validate")]
        file: PathBuf,
    },
}

pub struct CliRunner {
    pub config: Config,
}

impl CliRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Capture {
                url,
                clipboard,
                output,
                settle_ms,
                no_prompt,
                allow_mixed_widths,
                tab_id,
                window_id,
            } => {
                let mut config = self.config.clone();
                if let Some(output) = output {
                    config.output_dir = output;
                }
                if let Some(settle_ms) = settle_ms {
                    config.settle_delay = Duration::from_millis(settle_ms);
                }
                if no_prompt {
                    config.prompt_user = false;
                }
                if allow_mixed_widths {
                    config.enforce_equal_widths = false;
                }
                config.validate()?;

                let target = CaptureTarget { tab_id, window_id };
                self.run_capture(
                    config,
                    &url,
                    &target,
                    CaptureMode::from_clipboard_flag(clipboard),
                )
                .await
            }
            Commands::Inspect { file, chunks } => self.run_inspect(file, chunks).await,
            Commands::Embed {
                input,
                output,
                entries,
                data_url,
            } => self.run_embed(input, output, entries, data_url).await,
            Commands::Validate { file } => self.validate_config(file).await,
        }
    }

    pub async fn run_capture(
        &self,
        config: Config,
        url: &str,
        target: &CaptureTarget,
        mode: CaptureMode,
    ) -> anyhow::Result<()> {
        let url = validate_url(url).map_err(anyhow::Error::msg)?;
        info!("Capturing full page: {}", url);

        let surface = ChromeSurface::launch(&config, url.as_str()).await?;
        let sink = LocalSink::new(config.output_dir.clone());
        let service = SnagService::new(config);

        let result = service
            .run(&surface, target, &sink, mode)
            .await;
        surface.shutdown().await;

        match (result.success, result.artifact) {
            (true, Some(artifact)) => {
                println!("Page captured successfully:");
                println!("  URL: {}", artifact.layout.url);
                println!("  Title: {}", artifact.layout.title);
                println!("  Segments: {}", artifact.segment_count);
                println!("  Size: {}x{}, {}", artifact.width, artifact.height, format_bytes(artifact.bytes.len()));
                println!("  Duration: {}", format_duration(result.duration));
                match result.mode {
                    CaptureMode::Clipboard => println!("  Output: clipboard"),
                    CaptureMode::File => println!("  Output: {}", artifact.filename),
                }
                Ok(())
            }
            _ => {
                error!("Capture {} produced no artifact", result.run_id);
                bail!(
                    "capture failed: {}",
                    result
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".to_string())
                )
            }
        }
    }

    pub async fn run_inspect(&self, file: PathBuf, show_chunks: bool) -> anyhow::Result<()> {
        let png = fs::read(&file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;

        if show_chunks {
            println!("Chunks:");
            for chunk in ChunkCursor::new(&png)? {
                let chunk = chunk?;
                println!(
                    "  {} {:>10} bytes  crc {}",
                    String::from_utf8_lossy(&chunk.chunk_type),
                    chunk.data.len(),
                    if chunk.crc_valid() { "ok" } else { "BAD" }
                );
            }
        }

        let entries = read_text_chunks(&png)?;
        if entries.is_empty() {
            println!("No text metadata in {}", file.display());
        }
        for entry in entries {
            println!("{}: {}", entry.key, entry.value);
        }

        Ok(())
    }

    pub async fn run_embed(
        &self,
        input: PathBuf,
        output: PathBuf,
        entries: Vec<String>,
        print_data_url: bool,
    ) -> anyhow::Result<()> {
        let entries = entries
            .iter()
            .map(|pair| MetadataEntry::parse_pair(pair))
            .collect::<Result<Vec<_>, _>>()?;

        let png = fs::read(&input)
            .await
            .with_context(|| format!("reading {}", input.display()))?;
        let bytes = inject_text_chunks(&png, &entries)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_file_atomically(&output, &bytes)
            .await
            .with_context(|| format!("writing {}", output.display()))?;
        info!(
            "Embedded {} entries into {} ({})",
            entries.len(),
            output.display(),
            format_bytes(bytes.len())
        );

        if print_data_url {
            let encoded = encode_base64_sliced(&bytes, self.config.encoding_slice_size)?;
            println!("{}", to_data_url(&encoded));
        }

        Ok(())
    }

    pub async fn validate_config(&self, config_path: PathBuf) -> anyhow::Result<()> {
        println!("Validating configuration: {}", config_path.display());

        let config_content = fs::read_to_string(&config_path).await?;
        let config: Config = serde_json::from_str(&config_content)?;
        config.validate()?;

        println!("Configuration is valid:");
        println!("  Settle delay: {}", format_duration(config.settle_delay));
        println!("  Capture timeout: {}", format_duration(config.capture_timeout));
        println!("  Enforce equal widths: {}", config.enforce_equal_widths);
        println!("  Encoding slice: {}", format_bytes(config.encoding_slice_size));
        println!("  Prompt before saving: {}", config.prompt_user);
        println!("  Output directory: {}", config.output_dir.display());
        println!(
            "  Viewport: {}x{} @{}x",
            config.viewport.width, config.viewport.height, config.viewport.device_scale_factor
        );

        Ok(())
    }
}

pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
