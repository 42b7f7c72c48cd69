//! Shukan CLI - serves the translation API or runs one pipeline step.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shukan::config::Config;
use shukan::console::Console;
use shukan::providers::build_provider;
use shukan::{
    AppState, KeyedLock, PipelineDeps, PipelineError, SourceRegistry, SqliteStore, TranslationPipeline,
    WebFetcher, build_router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Web novel aggregation and translation backend.
#[derive(Parser, Debug)]
#[command(name = "shukan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve,

    /// Extract and translate a novel's landing page.
    Extract {
        /// Novel landing page URL.
        url: String,

        /// Source site tag (see `shukan sources`).
        #[arg(long)]
        source: String,
    },

    /// Translate the first chapter of a novel.
    FirstChapter {
        novel_id: String,
        chapter_url: String,
    },

    /// Translate the chapters following the last translated one.
    NextChapter {
        novel_id: String,

        /// Number of chapters to translate.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },

    /// Re-read a novel's landing page and update its details.
    Refresh { novel_id: String },

    /// List supported source sites.
    Sources,
}

fn env_bool(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("SHUKAN_LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn load_config(path: Option<&PathBuf>, console: &Console) -> Result<Config> {
    let path = match path {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.apply_env();

    if !config.active_api().is_configured() {
        console.warning(&format!(
            "API key not configured. Please edit: {}",
            path.display()
        ));
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_pipeline(config: &Config) -> Result<TranslationPipeline> {
    let db_path = config.database_path()?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let fetcher = WebFetcher::new(config.scraping.clone()).context("Failed to build HTTP client")?;
    let provider = build_provider(config).context("Failed to build translation provider")?;
    info!(provider = provider.name(), db = %db_path.display(), "pipeline ready");

    Ok(TranslationPipeline::new(
        PipelineDeps {
            store: Arc::new(store),
            sources: Arc::new(SourceRegistry::new()),
            fetcher: Arc::new(fetcher),
            provider,
            locks: Arc::new(KeyedLock::new(config.lock.poll_interval())),
        },
        config.lock.acquire_timeout(),
    ))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn serve(config: Config) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(&config)?);
    let state = AppState::new(pipeline, config.server.allowed_origins.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown_signal().await;
            info!("shutting down");
        })
        .await
        .context("Server failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();
    let console = Console::new();

    if let Command::Sources = args.command {
        console.section("Supported sources");
        for site in SourceRegistry::new().sites() {
            println!("{}", console.site_line(&site));
        }
        return Ok(());
    }

    let config = load_config(args.config.as_ref(), &console)?;

    match args.command {
        Command::Serve => serve(config).await,
        Command::Extract { url, source } => {
            let pipeline = build_pipeline(&config)?;
            console.step(&format!("Extracting {}...", url));
            let novel = pipeline.extract_novel_details(&url, &source, None).await?;
            console.success(&console.novel_line(&novel));
            if !novel.genres.is_empty() {
                console.info(&format!("Genres: {}", novel.genres.join(", ")));
            }
            Ok(())
        }
        Command::FirstChapter {
            novel_id,
            chapter_url,
        } => {
            let pipeline = build_pipeline(&config)?;
            console.step(&format!("Translating first chapter of {}...", novel_id));
            let chapter = pipeline
                .translate_first_chapter(&novel_id, &chapter_url, None)
                .await?;
            console.success(&console.chapter_line(&chapter));
            Ok(())
        }
        Command::NextChapter { novel_id, count } => {
            let pipeline = build_pipeline(&config)?;
            for _ in 0..count {
                console.step(&format!("Translating next chapter of {}...", novel_id));
                match pipeline.translate_chapter(&novel_id, None).await {
                    Ok(chapter) => console.success(&console.chapter_line(&chapter)),
                    Err(PipelineError::NotFound(message)) => {
                        console.warning(&message);
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        }
        Command::Refresh { novel_id } => {
            let pipeline = build_pipeline(&config)?;
            console.step(&format!("Refreshing {}...", novel_id));
            let novel = pipeline.refresh_novel(&novel_id, None).await?;
            console.success(&console.novel_line(&novel));
            Ok(())
        }
        Command::Sources => Ok(()),
    }
}
