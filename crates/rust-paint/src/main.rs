//! rust-paint command line: replays an edit script and prints the history timeline.
mod script;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use image::Rgba;
use rust_paint_config::AppConfig;
use rust_paint_core::document::Document;
use rust_paint_core::history::HistoryConfig;

/// Replays an edit script against a new image and prints its undo history.
#[derive(Parser, Debug)]
#[command(name = "rust-paint", version, about)]
struct Cli {
    /// JSON edit script to replay.
    script: PathBuf,

    /// Config file to use instead of the one next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// History memory ceiling in MiB, overriding config and environment.
    #[arg(long = "max-mb")]
    max_mb: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting rust-paint");

    let config_path = cli.config.unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_or_create(&config_path);
    let history = match cli.max_mb {
        Some(mb) => {
            config.history_max_mb = mb;
            config.sanitize();
            HistoryConfig::new(config.history_max_bytes())
        }
        None => HistoryConfig::from_env_or(HistoryConfig::new(config.history_max_bytes())),
    };

    let steps = script::load(&cli.script)?;
    let mut doc = Document::new(
        config.default_canvas_width,
        config.default_canvas_height,
        Rgba(config.default_background.to_array()),
        history,
    );
    doc.title = cli
        .script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());

    script::run(&mut doc, &steps)?;
    print_timeline(&doc);
    Ok(())
}

fn print_timeline(doc: &Document) {
    println!(
        "{} ({}x{}, {} layers)",
        doc.title,
        doc.layers.width(),
        doc.layers.height(),
        doc.layers.len()
    );
    let entries = doc.history.entries();
    if entries.is_empty() {
        println!("  (no history)");
    }
    for entry in &entries {
        let marker = if entry.is_current {
            ">"
        } else if entry.is_future {
            "~"
        } else {
            " "
        };
        println!(
            "{marker} {:>3} {:<24} {:<10} {:>12} B  {}",
            entry.index,
            entry.label,
            entry.kind.icon_name(),
            entry.byte_cost,
            entry.created_at.format("%H:%M:%S"),
        );
    }
    let usage = doc.history.memory_usage();
    println!(
        "History: {} of {} bytes ({:.1}%)",
        usage.used_bytes, usage.max_bytes, usage.percentage
    );
}
