mod app;
mod error;

use crate::app::App;
use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use editions_config::Config;
use editions_gallery::{CoverState, Edition, GalleryEvent, GalleryView, editions};
use exn::ResultExt;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "editions", version)]
#[command(about = "Discover PDF editions on a static host and generate their cover thumbnails")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Document store: an http(s) origin or a local directory
    #[arg(long, global = true)]
    store: Option<String>,

    /// More logging (-v debug, -vv trace); `RUST_LOG` takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the editions found on the document store, newest first
    Discover,
    /// Discover the editions and generate a cover for each
    Covers {
        /// Also write every cover into this directory as a JPEG
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(store) = &cli.store {
        config.store.base = store.clone();
        config.validate().or_raise(|| ErrorKind::Config)?;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;
    match cli.command {
        Command::Discover => discover(App::new(config)?).await,
        Command::Covers { export } => covers(App::new(config)?, export.as_deref()).await,
        Command::Config => {
            let toml = toml::to_string_pretty(&config).or_raise(|| ErrorKind::Output)?;
            print!("{toml}");
            Ok(())
        },
    }
}

async fn discover(app: App) -> Result<()> {
    let discovery = app.resolver()?.resolve().await;
    let editions = editions(discovery.files, &app.config.discovery.publication);
    if editions.is_empty() {
        println!("No editions found.");
        return Ok(());
    }
    println!("{} edition(s) found by {}:", editions.len(), discovery.source);
    for (index, edition) in editions.iter().enumerate() {
        let marker = if index == 0 { "latest" } else { "" };
        let document = app.store.document(&edition.file);
        println!("{marker:>6}  {:<40} {}", edition.title, document.viewer_link());
    }
    Ok(())
}

async fn covers(app: App, export: Option<&Path>) -> Result<()> {
    if let Some(dir) = export {
        tokio::fs::create_dir_all(dir).await.or_raise(|| ErrorKind::Export(dir.to_path_buf()))?;
    }
    let (durable, database) = app.durable().await;
    let gallery = app.gallery(durable)?;
    let mut view = GalleryView::new();
    let mut by_path: HashMap<String, Edition> = HashMap::new();
    let mut export_failures = 0usize;

    let mut events = std::pin::pin!(gallery.run());
    while let Some(event) = events.next().await {
        view.apply(&event);
        match &event {
            GalleryEvent::Started => tracing::debug!("Discovering editions"),
            GalleryEvent::Discovered(editions) => {
                by_path = editions.iter().map(|e| (gallery.document(e).path().to_string(), e.clone())).collect();
                match view.is_empty() {
                    true => println!("No editions found."),
                    false => println!("{} edition(s) found; generating covers", editions.len()),
                }
            },
            GalleryEvent::CoverRequested(path) => tracing::debug!(%path, "Cover requested"),
            GalleryEvent::CoverReady { path, cover } => {
                let name = by_path.get(path).map_or(path.as_str(), |e| e.title.as_str());
                println!("  ready   {name} ({} KiB)", cover.len() / 1024);
                if let (Some(dir), Some(edition)) = (export, by_path.get(path))
                    && !export_cover(dir, edition, cover).await
                {
                    export_failures += 1;
                }
            },
            GalleryEvent::CoverFailed { path, reason } => {
                let name = by_path.get(path).map_or(path.as_str(), |e| e.title.as_str());
                println!("  failed  {name}: {reason}");
            },
            GalleryEvent::Complete => {},
        }
    }

    let ready = view
        .editions()
        .iter()
        .filter(|e| matches!(view.cover(gallery.document(e).path()), CoverState::Ready(_)))
        .count();
    println!("{ready}/{} cover(s) ready", view.editions().len());
    if export_failures > 0 {
        println!("{export_failures} cover(s) could not be exported");
    }
    if let Some(database) = database {
        database.close().await;
    }
    Ok(())
}

/// Export one cover, logging instead of failing so the remaining covers are
/// still reported.
async fn export_cover(dir: &Path, edition: &Edition, cover: &editions_render::Cover) -> bool {
    match write_cover(dir, edition, cover).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(title = %edition.title, error = ?e, "Could not export cover");
            false
        },
    }
}

async fn write_cover(dir: &Path, edition: &Edition, cover: &editions_render::Cover) -> Result<()> {
    let stem = match Path::new(&edition.file).file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => edition.id.to_string(),
    };
    let path = dir.join(format!("{stem}.jpg"));
    let Some(bytes) = cover.to_bytes() else {
        exn::bail!(ErrorKind::Export(path));
    };
    tokio::fs::write(&path, bytes).await.or_raise(|| ErrorKind::Export(path.clone()))?;
    tracing::debug!(path = %path.display(), "Exported cover");
    Ok(())
}
