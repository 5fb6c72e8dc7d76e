// src/main.rs
use anyhow::{Context, bail};
use car_color_studio::color::{self, Color, PRESETS};
use car_color_studio::config::StudioConfig;
use car_color_studio::models::{HistoryEntry, ImageAsset, RecolorSettings, UploadFile};
use car_color_studio::services::{HistoryStore, HttpGateway, ImageGateway, ImageProcessor};
use car_color_studio::{PipelineState, StudioError, StudioPipeline};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recolor car photographs through the studio API.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a car photo, prepare it and recolor it once per color.
    Transform {
        /// JPG, JPEG or PNG image.
        image: PathBuf,

        /// Target paint: a preset name or "#RRGGBB". Repeat to try several
        /// colors on the same upload.
        #[arg(short, long = "color", value_name = "COLOR", default_value = color::DEFAULT_PRESET)]
        colors: Vec<Color>,

        /// Flat-fill the paint instead of keeping reflections and shading.
        #[arg(long)]
        no_preserve_luminance: bool,

        /// Download the last recolored image to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Re-run a failed preparation stage up to this many times.
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Inspect or prune saved transformations.
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },

    /// Download the recolored image for an uploaded image id.
    Fetch {
        uuid: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show server-side mask and analysis progress for an image id.
    Status { uuid: String },

    /// List the preset paint colors.
    Presets,
}

#[derive(Subcommand)]
enum HistoryCommand {
    List,
    Delete {
        uuid: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

struct AppState {
    gateway: Arc<dyn ImageGateway>,
    history: Arc<HistoryStore>,
    image_processor: ImageProcessor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = StudioConfig::from_env().context("Invalid studio configuration")?;
    info!("Using studio API at {}", config.api_url);

    let gateway: Arc<dyn ImageGateway> = Arc::new(HttpGateway::new(&config)?);
    let app_state = AppState {
        history: Arc::new(HistoryStore::new(gateway.clone())),
        gateway,
        image_processor: ImageProcessor::new(config.max_image_dimension),
    };

    match cli.command {
        Command::Transform {
            image,
            colors,
            no_preserve_luminance,
            output,
            retries,
        } => {
            let settings = RecolorSettings {
                preserve_luminance: !no_preserve_luminance,
            };
            transform(&app_state, image, colors, settings, output, retries).await
        }
        Command::History { action } => match action {
            HistoryCommand::List => list_history(&app_state).await,
            HistoryCommand::Delete { uuid, yes } => delete_history(&app_state, &uuid, yes).await,
        },
        Command::Fetch { uuid, output } => fetch(&app_state, &uuid, &output).await,
        Command::Status { uuid } => {
            let status = app_state.gateway.image_status(&uuid).await?;
            println!(
                "{}: mask {}, analysis {}",
                uuid,
                if status.mask_complete { "done" } else { "pending" },
                if status.analysis_complete { "done" } else { "pending" },
            );
            Ok(())
        }
        Command::Presets => {
            for (name, color) in PRESETS {
                let [r, g, b] = color.channels();
                println!("{:<14} {}  RGB({}, {}, {})", name, color, r, g, b);
            }
            Ok(())
        }
    }
}

async fn transform(
    app_state: &AppState,
    image: PathBuf,
    colors: Vec<Color>,
    settings: RecolorSettings,
    output: Option<PathBuf>,
    retries: u32,
) -> anyhow::Result<()> {
    let upload = app_state
        .image_processor
        .load_upload(&image)
        .await
        .with_context(|| format!("Cannot upload {}", image.display()))?;

    let pipeline = StudioPipeline::new(app_state.gateway.clone(), app_state.history.clone());
    let mut updates = pipeline.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match &snapshot.state {
                PipelineState::Failed { .. } => eprintln!("  {}", snapshot.state),
                state => println!("  {}", state),
            }
        }
    });

    let asset = prepare_with_retries(&pipeline, upload, retries).await?;
    println!("Image {} ready (preview: {})", asset.uuid, asset.local_preview);

    for color in colors {
        let outcome = pipeline.request_recolor(color, settings).await?;
        println!("{} -> {}", color, outcome.recolored_url);
        if let Err(e) = outcome.history {
            eprintln!("  not saved to history: {}", e);
        }
    }

    drop(pipeline);
    progress.await.ok();

    if let Some(path) = output {
        fetch(app_state, &asset.uuid, &path).await?;
    }
    Ok(())
}

async fn prepare_with_retries(
    pipeline: &StudioPipeline,
    upload: UploadFile,
    retries: u32,
) -> Result<ImageAsset, StudioError> {
    let mut result = pipeline.submit_image(upload).await;
    for attempt in 1..=retries {
        match &result {
            Ok(_) => break,
            Err(e) => warn!("Attempt {} failed: {}; retrying", attempt, e),
        }
        result = pipeline.retry().await.and_then(|snapshot| {
            snapshot
                .asset
                .ok_or_else(|| StudioError::NotReady("no image bound after retry".to_string()))
        });
    }
    result
}

async fn list_history(app_state: &AppState) -> anyhow::Result<()> {
    let entries = app_state.history.list().await?;
    if entries.is_empty() {
        println!("No processing history available yet.");
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &HistoryEntry) {
    let [r, g, b] = entry.color.channels();
    println!(
        "{}  {}  RGB({}, {}, {})  luminance {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.uuid,
        r,
        g,
        b,
        if entry.settings.preserve_luminance { "kept" } else { "flat" },
    );
    println!("    original:  {}", entry.original_image.as_deref().unwrap_or("-"));
    println!("    recolored: {}", entry.recolored_image);
}

async fn delete_history(app_state: &AppState, uuid: &str, yes: bool) -> anyhow::Result<()> {
    if !yes {
        let known = app_state.history.list().await?;
        for entry in known.iter().filter(|entry| entry.uuid == uuid) {
            print_entry(entry);
        }

        print!("Are you sure you want to delete history entry {}? [y/N] ", uuid);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Kept {}", uuid);
            return Ok(());
        }
    }

    app_state.history.delete(uuid).await?;
    println!(
        "Deleted {} ({} cached entries left)",
        uuid,
        app_state.history.cached().len()
    );
    Ok(())
}

async fn fetch(app_state: &AppState, uuid: &str, output: &Path) -> anyhow::Result<()> {
    let bytes = app_state.gateway.fetch_recolored(uuid).await?;
    if bytes.is_empty() {
        bail!("Server returned an empty image for {}", uuid);
    }
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;
    println!("Saved {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
