mod clean;
mod db;
mod error;
mod extract;
mod normalize;
mod paginator;
mod pipeline;
mod progress;
mod record;
mod settings;
mod sink;
mod transport;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use normalize::Normalizer;
use paginator::PageSettings;
use progress::{BarObserver, LogObserver, NoopObserver, Observer};
use transport::HttpTransport;

#[derive(Parser)]
#[command(name = "listing_scraper", about = "Collect current product listings from the retailer's search index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every page of the category, clean, and save a timestamped CSV
    Run {
        /// Hits requested per page
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
        hits_per_page: u32,
        /// Seconds to wait before each page after the first
        #[arg(long, default_value_t = 0.2)]
        sleep_sec: f64,
        /// Max pages to fetch (0 = all; set 1 or 2 for a quick test)
        #[arg(long, default_value_t = 0)]
        max_pages: u64,
        /// categoryId filter value
        #[arg(long, default_value = "WATCH")]
        category_filter: String,
        /// Output directory for the CSV
        #[arg(long, default_value = "data/raw")]
        out_dir: PathBuf,
        /// CSV base name; a timestamp is appended
        #[arg(long, default_value = "current_2026_raw")]
        out_name: String,
        /// Also store the run as a snapshot in this SQLite file
        #[arg(long)]
        sqlite: Option<PathBuf>,
        /// Plain log lines instead of a progress bar
        #[arg(long)]
        no_progress: bool,
        /// No per-page or cleaning output at all
        #[arg(short, long, conflicts_with = "no_progress")]
        quiet: bool,
    },
    /// List snapshot runs stored in a SQLite file
    Runs {
        #[arg(long)]
        sqlite: PathBuf,
        /// Max runs to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            hits_per_page,
            sleep_sec,
            max_pages,
            category_filter,
            out_dir,
            out_name,
            sqlite,
            no_progress,
            quiet,
        } => {
            let cfg = settings::load()?;
            info!(app_id = %cfg.app_id, index = %cfg.index, "Starting listing scraper");

            let delay = Duration::try_from_secs_f64(sleep_sec)
                .with_context(|| format!("--sleep-sec must be a non-negative number, got {}", sleep_sec))?;
            let paging = PageSettings {
                hits_per_page,
                delay,
                max_pages: (max_pages > 0).then_some(max_pages),
                category: category_filter,
            };
            let endpoint = cfg.endpoint();
            let transport = HttpTransport::new()?;
            let normalizer = Normalizer::new(cfg.origin.clone());
            let started_at = sink::now_ts();

            let mut observer: Box<dyn Observer> = if quiet {
                Box::new(NoopObserver)
            } else if no_progress {
                Box::new(LogObserver)
            } else {
                Box::new(BarObserver::new())
            };

            let (dataset, path) = pipeline::run_to_csv(
                &transport,
                &endpoint,
                &paging,
                &normalizer,
                observer.as_mut(),
                &out_dir,
                &out_name,
            )?;
            if dataset.is_empty() {
                warn!("No listings matched categoryId:{}", paging.category);
            }
            println!(
                "Saved {} rows x {} columns to {} ({:.1}s)",
                dataset.len(),
                dataset.column_count(),
                path.display(),
                t0.elapsed().as_secs_f64()
            );

            if let Some(db_path) = sqlite {
                let conn = db::connect(&db_path)?;
                db::init_schema(&conn)?;
                let csv_path = path.to_string_lossy();
                let run_id = db::save_snapshot(
                    &conn,
                    &db::RunInfo {
                        started_at: &started_at,
                        category: &paging.category,
                        csv_path: Some(&*csv_path),
                    },
                    &dataset,
                )?;
                println!("Snapshot run {} stored in {}", run_id, db_path.display());
            }
        }
        Commands::Runs { sqlite, limit } => {
            let conn = db::connect(&sqlite)?;
            db::init_schema(&conn)?;
            let runs = db::list_runs(&conn, limit)?;
            if runs.is_empty() {
                println!("No runs stored yet. Use 'run --sqlite {}' first.", sqlite.display());
                return Ok(());
            }
            println!(
                "{:>4} | {:<15} | {:<10} | {:>6} | {:>6} | {}",
                "id", "started", "category", "rows", "priced", "csv"
            );
            println!("{}", "-".repeat(72));
            for r in &runs {
                println!(
                    "{:>4} | {:<15} | {:<10} | {:>6} | {:>6} | {}",
                    r.id,
                    r.started_at,
                    r.category,
                    r.row_count,
                    r.priced,
                    r.csv_path.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}
