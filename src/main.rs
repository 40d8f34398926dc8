use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use dnrplay::{
    EventSink, HomeViewModel, HttpShowsApi, LocalStream, MediaCache, MediaEngine, NoopSink,
    PlaybackError, ReqwestClient, SharedEventSink, Show, ViewModelConfig, ViewModelEvent,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PLAY: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Browse the .NET Rocks! show catalogue and cache episodes for playback
#[derive(Parser, Debug)]
#[command(name = "dnrplay")]
#[command(about = "Browse the .NET Rocks! show catalogue and cache episodes for playback")]
#[command(version)]
struct Args {
    /// Base URL of the shows API
    #[arg(short, long)]
    api: Option<String>,

    /// JSON config file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory downloaded episodes are cached in
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Width of the show number window fetched per page
    #[arg(short, long)]
    page_size: Option<u32>,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List shows page by page, newest first
    Shows {
        /// Number of pages to load
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,
    },

    /// Load the whole catalogue and summarize the newest show
    All,

    /// Show guests and media URL of one show
    Details { show_number: u32 },

    /// Play an episode, filling the local cache when it is not cached yet
    Play { url: String },
}

/// Media engine for a terminal: announces playback instead of producing audio
struct ConsoleEngine;

#[async_trait]
impl MediaEngine for ConsoleEngine {
    async fn play_url(&self, url: &str) -> Result<(), PlaybackError> {
        println!("{PLAY}Streaming {}", url.cyan());
        Ok(())
    }

    async fn play_stream(&self, _stream: LocalStream, name: &str) -> Result<(), PlaybackError> {
        println!("{PLAY}Playing {} from cache", name.cyan());
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        Ok(())
    }
}

/// Event sink drawing cache downloads with indicatif
struct IndicatifSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifSink {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bar) = self.bar.lock()
            && let Some(bar) = bar.as_ref()
        {
            f(bar);
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl EventSink for IndicatifSink {
    fn emit(&self, event: ViewModelEvent) {
        match event {
            ViewModelEvent::StatusChanged { status } if !status.is_empty() => {
                println!("{HEADPHONES}{}", status.dimmed());
            }

            ViewModelEvent::DownloadStarting {
                url,
                content_length,
            } => {
                let style = ProgressStyle::default_bar()
                    .template(&format!(
                        "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░");

                let bar = ProgressBar::new(content_length.unwrap_or(0));
                bar.set_style(style);
                bar.set_message(truncate_title(&url, 40));
                if let Ok(mut current) = self.bar.lock() {
                    *current = Some(bar);
                }
            }

            ViewModelEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => self.with_bar(|bar| {
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
                bar.set_position(bytes_downloaded);
            }),

            ViewModelEvent::DownloadCompleted { content_hash, .. } => {
                if let Some(bar) = self.take_bar() {
                    bar.finish_and_clear();
                }
                println!("{SUCCESS}Cached ({})", content_hash.dimmed());
            }

            ViewModelEvent::DownloadFailed { url, error } => {
                if let Some(bar) = self.take_bar() {
                    bar.abandon();
                }
                println!("{FAILURE}{} - {}", url.red(), error.red());
            }

            _ => {}
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let head: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_show(show: &Show) {
    println!(
        "  {} {}",
        format!("#{:>4}", show.show_number).cyan(),
        show.show_title
    );
}

fn load_config(args: &Args) -> Result<ViewModelConfig> {
    let mut config = match &args.config {
        Some(path) => ViewModelConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ViewModelConfig::default(),
    };

    if let Some(api) = &args.api {
        config.api_base_url = api.clone();
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }

    config.validate()?;
    if config.api_base_url.is_empty() {
        bail!("No API base URL given; pass --api or set api_base_url in the config file");
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "dnrplay".bold().magenta(),
            "- .NET Rocks! browser".dimmed()
        );
    }

    let http = ReqwestClient::new();
    let api = HttpShowsApi::new(http.clone(), &config.api_base_url, &config.show_name)
        .context("Invalid API base URL")?;

    let cache_dir = config.resolved_cache_dir()?;
    let cache = MediaCache::open(&cache_dir).context("Failed to open media cache")?;

    let sink: SharedEventSink = if args.quiet {
        NoopSink::shared()
    } else {
        Arc::new(IndicatifSink::new())
    };

    let view_model = HomeViewModel::new(api, Arc::new(ConsoleEngine), http, cache, &config, sink);

    match args.command {
        Command::Shows { pages } => {
            for _ in 0..pages {
                let added = view_model
                    .load_next_batch()
                    .await
                    .context("Failed to load shows")?;
                if added == 0 {
                    break;
                }
            }

            for show in view_model.all_shows() {
                print_show(&show);
            }
            println!(
                "\n{} shows loaded, next page below #{}",
                view_model.show_count().to_string().green().bold(),
                view_model.last_show_number()
            );
        }

        Command::All => {
            view_model
                .load_all_shows()
                .await
                .context("Failed to load the show catalogue")?;
            println!("{}", view_model.current_status());
        }

        Command::Details { show_number } => {
            let details = view_model
                .load_show_details(show_number)
                .await
                .with_context(|| format!("Failed to load details for show {}", show_number))?;

            println!("{}", format!("Show #{}", show_number).bold());
            for guest in &details.guests {
                println!("  {}", guest.name.yellow());
            }
            println!("  {}", details.file.url.cyan());
        }

        Command::Play { url } => {
            view_model
                .play(&url)
                .await
                .with_context(|| format!("Failed to play {}", url))?;

            // Let the cache fill before the process exits
            view_model.wait_for_downloads().await;
            view_model.stop().await.context("Failed to stop playback")?;

            if !args.quiet {
                println!(
                    "\n{FOLDER}Cache: {}\n",
                    cache_dir.display().to_string().cyan()
                );
            }
        }
    }

    Ok(())
}
