use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use taxodl::batch::{BatchDownloader, BatchOptions, BatchSummary};
use taxodl::domain::{Accession, QueryMode};
use taxodl::error::TaxoError;
use taxodl::interpro::{DEFAULT_BASE_URL, Fetcher, ReqwestTransport, RetryPolicy, ThreadSleeper};
use taxodl::output::JsonOutput;
use taxodl::reconcile::{EXTRA_DISPLAY_LIMIT, MISSING_DISPLAY_LIMIT, Report, reconcile};
use taxodl::stats::{DirectorySummary, NodeStats, stats_for_file, summarize_store};
use taxodl::store::ArtifactStore;
use taxodl::table;

#[derive(Parser)]
#[command(name = "taxodl")]
#[command(about = "Resumable batch downloader for InterPro taxonomy records")]
#[command(version, author)]
struct Cli {
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download taxonomy records for a table of accessions or a single accession")]
    Fetch(FetchArgs),
    #[command(about = "Compare a required accession table against downloaded artifacts")]
    Check(CheckArgs),
    #[command(about = "Count taxonomy nodes in one artifact or across a directory")]
    Count(CountArgs),
    #[command(about = "Split a table into round-robin parts")]
    Split(SplitArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Table path (.tsv/.txt) or a single accession literal.
    input: String,

    #[arg(long, default_value = "database/interpro_type_domain")]
    out_dir: Utf8PathBuf,

    #[arg(long, value_enum, default_value_t = QueryMode::Taxonomy)]
    mode: QueryMode,

    #[arg(long, default_value = table::DEFAULT_COLUMN)]
    column: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Total attempts per accession, including the first.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Seconds to wait after a transport error or a non-200, non-408 status.
    #[arg(long, default_value_t = 10)]
    retry_delay: u64,

    /// Seconds to wait after an HTTP 408 before retrying.
    #[arg(long, default_value_t = 61)]
    timeout_backoff: u64,

    /// Seconds to wait between successive accessions.
    #[arg(long, default_value_t = 1)]
    pause: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 100)]
    timeout: u64,

    /// Re-fetch and overwrite artifacts that already exist.
    #[arg(long)]
    force: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Directory holding downloaded artifacts.
    artifact_dir: Utf8PathBuf,

    /// Table of required accessions.
    table: PathBuf,

    #[arg(long, default_value = table::DEFAULT_COLUMN)]
    column: String,

    #[arg(long, value_enum, default_value_t = QueryMode::Taxonomy)]
    mode: QueryMode,

    /// Write the full missing list here, one accession per line.
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CountArgs {
    /// One artifact file, or a directory to aggregate.
    path: Utf8PathBuf,

    #[arg(long, value_enum, default_value_t = QueryMode::Taxonomy)]
    mode: QueryMode,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SplitArgs {
    table: PathBuf,

    #[arg(long, default_value_t = 2)]
    parts: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(taxo) = report.downcast_ref::<TaxoError>() {
            return ExitCode::from(map_exit_code(taxo));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TaxoError) -> u8 {
    match error {
        TaxoError::InvalidAccession(_)
        | TaxoError::TableRead { .. }
        | TaxoError::MissingColumn { .. } => 2,
        TaxoError::Http(_) | TaxoError::Status { .. } | TaxoError::RetriesExhausted { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "taxodl=debug" } else { "taxodl=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Check(args) => run_check(args),
        Commands::Count(args) => run_count(args),
        Commands::Split(args) => run_split(args),
    }
}

/// A table path (by extension or an existing file) yields the named column;
/// anything else is taken as one accession literal.
fn resolve_accessions(input: &str, column: &str) -> Result<Vec<Accession>, TaxoError> {
    let path = Path::new(input);
    if input.ends_with(".tsv") || input.ends_with(".txt") || path.is_file() {
        let values = table::load_column(path, column)?;
        values.iter().map(|value| value.parse()).collect()
    } else {
        Ok(vec![input.parse()?])
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    let accessions = resolve_accessions(&args.input, &args.column).into_diagnostic()?;

    let store = ArtifactStore::new(args.out_dir);
    let transport = ReqwestTransport::new(Duration::from_secs(args.timeout)).into_diagnostic()?;
    let policy = RetryPolicy {
        max_attempts: args.max_retries,
        retry_delay: Duration::from_secs(args.retry_delay),
        timeout_backoff: Duration::from_secs(args.timeout_backoff),
    };
    let fetcher = Fetcher::new(transport, ThreadSleeper, policy);
    let options = BatchOptions {
        force: args.force,
        request_pause: Duration::from_secs(args.pause),
    };
    let downloader = BatchDownloader::new(store, fetcher, ThreadSleeper, args.base_url, options);

    let summary = downloader.run(&accessions, args.mode).into_diagnostic()?;
    if args.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    } else {
        print_fetch_summary(&summary);
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> miette::Result<()> {
    let required: BTreeSet<Accession> = table::load_column(&args.table, &args.column)
        .into_diagnostic()?
        .iter()
        .map(|value| value.parse())
        .collect::<Result<_, TaxoError>>()
        .into_diagnostic()?;

    let store = ArtifactStore::new(args.artifact_dir);
    let completed = store.list_completed(args.mode);
    let report = reconcile(&required, &completed);

    if let Some(output) = &args.output {
        report.write_missing(output).into_diagnostic()?;
        eprintln!("missing accessions saved to {}", output.display());
    }

    if args.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_count(args: CountArgs) -> miette::Result<()> {
    if args.path.as_std_path().is_file() {
        let stats = stats_for_file(&args.path).into_diagnostic()?;
        if args.json {
            JsonOutput::print_stats(&stats).into_diagnostic()?;
        } else {
            print_stats(args.path.as_str(), &stats);
        }
        return Ok(());
    }

    if args.path.as_std_path().is_dir() {
        let store = ArtifactStore::new(args.path);
        let summary = summarize_store(&store, args.mode);
        if args.json {
            JsonOutput::print_directory_summary(&summary).into_diagnostic()?;
        } else {
            print_directory_summary(&summary);
        }
        return Ok(());
    }

    Err(TaxoError::Filesystem(format!("path not found: {}", args.path))).into_diagnostic()
}

fn run_split(args: SplitArgs) -> miette::Result<()> {
    let written = table::split(&args.table, args.parts).into_diagnostic()?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_fetch_summary(summary: &BatchSummary) {
    println!("fetch summary ({})", summary.started_at);
    println!(
        "  total {} | attempted {} | saved {} | skipped {} | failed {}",
        summary.total, summary.attempted, summary.saved, summary.skipped, summary.failed
    );
    for failure in &summary.failures {
        println!("  [FAILED] {}: {}", failure.accession, failure.cause);
    }
}

fn print_report(report: &Report) {
    println!(
        "completed: {} / {} ({:.1}%)",
        report.completed_count, report.required_count, report.completed_pct
    );
    println!(
        "missing:   {} / {} ({:.1}%)",
        report.missing_count, report.required_count, report.missing_pct
    );

    if report.missing.is_empty() {
        println!("all required accessions have been downloaded");
    } else {
        println!("missing accessions ({}):", report.missing_count);
        for (i, accession) in report.missing.iter().take(MISSING_DISPLAY_LIMIT).enumerate() {
            println!("  {:3}. {accession}", i + 1);
        }
        if report.missing.len() > MISSING_DISPLAY_LIMIT {
            println!("  ... and {} more", report.missing.len() - MISSING_DISPLAY_LIMIT);
        }
    }

    if !report.extra.is_empty() {
        println!("extra artifacts not in the required set ({}):", report.extra.len());
        for (i, accession) in report.extra.iter().take(EXTRA_DISPLAY_LIMIT).enumerate() {
            println!("  {:3}. {accession}", i + 1);
        }
        if report.extra.len() > EXTRA_DISPLAY_LIMIT {
            println!("  ... and {} more", report.extra.len() - EXTRA_DISPLAY_LIMIT);
        }
    }
}

fn print_stats(path: &str, stats: &NodeStats) {
    println!("{path}");
    println!("  api count:           {}", stats.api_count);
    println!("  nodes in file:       {}", stats.nodes_in_file);
    println!("  nodes with children: {}", stats.nodes_with_children);
    println!("  leaf nodes:          {}", stats.leaf_nodes);
    println!("  next page:           {}", stats.has_next_page);
    println!("  previous page:       {}", stats.has_previous_page);
    println!("  complete dataset:    {}", stats.complete);
    if !stats.complete {
        println!(
            "  note: file holds {} of {} nodes the API reports",
            stats.nodes_in_file, stats.api_count
        );
    }
}

fn print_directory_summary(summary: &DirectorySummary) {
    for file in &summary.files {
        println!(
            "{}: {} nodes (api reports {})",
            file.accession, file.stats.nodes_in_file, file.stats.api_count
        );
    }
    println!(
        "{} files | {} complete | {} incomplete | {} unreadable",
        summary.files.len(),
        summary.complete_files,
        summary.incomplete_files,
        summary.failed_files
    );
    println!(
        "api node total {} | stored node total {}",
        summary.api_node_total, summary.stored_node_total
    );
}
