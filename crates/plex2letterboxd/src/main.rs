use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use plex_export_core::{
    run_export_blocking, ClientOptions, ExportOptions, ExportProgress, ExportResult,
    ProgressCallback, DEFAULT_CONFIG_PATH, DEFAULT_MAX_WORKERS, DEFAULT_OUTPUT_PATH,
    DEFAULT_SECTION, FIELDNAMES,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Export watched Plex movies to the Letterboxd import format.",
    long_about = None
)]
struct Cli {
    /// Config file
    #[arg(short = 'i', long = "ini", default_value = DEFAULT_CONFIG_PATH)]
    ini: PathBuf,

    /// File to output to
    #[arg(short = 'o', long = "output", default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Sections to grab from
    #[arg(
        short = 's',
        long = "sections",
        num_args = 1..,
        default_value = DEFAULT_SECTION
    )]
    sections: Vec<String>,

    /// Name of managed user to export
    #[arg(short = 'm', long = "managed-user")]
    managed_user: Option<String>,

    /// Movie details fetched at the same time
    #[arg(short = 'w', long = "workers", default_value_t = DEFAULT_MAX_WORKERS)]
    workers: usize,

    /// Per-request timeout in seconds (waits indefinitely when unset)
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    /// Log every exported row
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.workers == 0 {
        bail!("workers must be greater than 0");
    }

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let options = ExportOptions {
        config_path: cli.ini.clone(),
        csv_path: cli.output.clone(),
        sections: cli.sections.clone(),
        managed_user: cli.managed_user.clone(),
        max_workers: cli.workers,
        client_options: ClientOptions {
            timeout: cli.timeout.map(Duration::from_secs),
            ..ClientOptions::default()
        },
        progress_callback: Some(progress_reporter(progress_bar.clone())),
        ..ExportOptions::default()
    };

    let result = run_export_blocking(options);
    progress_bar.finish_and_clear();
    let result = result.with_context(|| "export to Letterboxd failed")?;
    print_summary(&result);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_reporter(progress_bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |progress: ExportProgress| match progress.record {
        None => {
            progress_bar.reset();
            progress_bar.set_length(progress.total);
            progress_bar.set_message(progress.section);
        }
        Some(record) => {
            progress_bar.set_position(progress.current);
            progress_bar.set_message(record.title);
        }
    })
}

fn print_summary(result: &ExportResult) {
    println!(
        "{} {}",
        style("Server:").green().bold(),
        result.server_name
    );
    if let Some(user) = &result.managed_user {
        println!("{} {}", style("Managed user:").green().bold(), user);
    }
    println!(
        "{} {}",
        style("Sections:").green().bold(),
        result.sections.join(", ")
    );
    if result.records_written == 0 {
        println!("{}", style("No movies found, wrote header only.").yellow());
    } else {
        println!(
            "{} {} movies to {}",
            style("Exported").green(),
            result.records_written,
            result.csv_path.display()
        );
    }
    println!("{} {}", style("CSV columns:").dim(), FIELDNAMES.join(", "));
}
