use anyhow::Result;
use clap::{Parser, Subcommand};
use panelcorpus::config::{GroupBy, StopwordMode};
use panelcorpus::harness::{HarnessOptions, run_harness};
use panelcorpus::pipeline::{
    ScrapeOptions, StatsOptions, ValidateOptions, compute_stats, scrape_to_dir, validate_config,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "panelcorpus",
    about = "Scrapes panel listings into wide/long datasets and n-gram statistics"
)]
struct Cli {
    #[arg(long, default_value = "configs/panels.toml")]
    config: PathBuf,

    #[arg(long, default_value = "data/out")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Scrape,
    Stats {
        /// Long dataset to analyze; defaults to the last scrape's binary output.
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long)]
        n: Option<usize>,
        #[arg(long, value_enum)]
        group_by: Option<GroupBy>,
        #[arg(long, value_enum)]
        stopword_mode: Option<StopwordMode>,
        #[arg(long)]
        min_count: Option<usize>,
        #[arg(long)]
        top: Option<usize>,
    },
    Validate,
    Harness,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape => {
            let report = scrape_to_dir(&ScrapeOptions {
                config_path: cli.config,
                out_dir: cli.out_dir,
            })?;

            info!(
                site = %report.site_key,
                listing_pages = report.listing_pages,
                records = report.records,
                theme_members = report.theme_members,
                skipped = report.skipped.len(),
                "scrape summary"
            );
            for skipped in &report.skipped {
                warn!(url = %skipped.url, kind = %skipped.kind, "{}", skipped.message);
            }
        }
        Commands::Stats {
            dataset,
            n,
            group_by,
            stopword_mode,
            min_count,
            top,
        } => {
            let report = compute_stats(&StatsOptions {
                config_path: cli.config,
                out_dir: cli.out_dir,
                dataset,
                n,
                group_by,
                stopword_mode,
                min_count,
            })?;

            let top = top.unwrap_or(report.top_n);
            for group in &report.groups {
                println!("== {} ({} documents)", group.group, group.documents);
                for c in group.frequencies.iter().take(top) {
                    println!("{:>6}  {}", c.count, c.ngram);
                }
                println!("-- top tf-idf");
                for row in group.tfidf.iter().take(top) {
                    println!("{:>10.6}  {:<8} {}", row.tf_idf, row.document, row.ngram);
                }
            }
        }
        Commands::Validate => {
            let messages = validate_config(&ValidateOptions {
                config_path: cli.config,
            })?;
            for line in messages {
                println!("{line}");
            }
        }
        Commands::Harness => {
            let report = run_harness(&HarnessOptions {
                config_path: cli.config,
                out_dir: cli.out_dir.join("harness"),
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
