use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use turfcheck::api::normalize;
use turfcheck::config::{DEFAULT_DB_PATH, DEFAULT_TIMEOUT_SECS, DEPLOYED_API_BASE, LOCAL_API_BASE};
use turfcheck::report::{self, Summary};
use turfcheck::workflow::refresh_results;
use turfcheck::{
    ApiClient, CancellationSource, ClientConfig, Contract, Database, IdTracking, IdentityProvider,
    PollReport, PollSchedule, Poller, ResultRow, Session, Surface, TerminalSurface,
};

#[derive(Parser, Debug)]
#[command(name = "turfcheck")]
#[command(author, version, about = "Upload turf photos, request analysis, and poll the results")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL
    #[arg(long, global = true, env = "TURFCHECK_API_BASE", default_value = DEPLOYED_API_BASE)]
    base_url: String,

    /// Use the local development backend instead of --base-url
    #[arg(long, global = true)]
    local: bool,

    /// Analyze request contract: s3-urls or image-id-strings
    #[arg(long, global = true, env = "TURFCHECK_CONTRACT", default_value = "s3-urls")]
    contract: Contract,

    /// Keep every uploaded id for the session instead of only the latest upload
    #[arg(long, global = true)]
    cumulative: bool,

    /// Local storage database
    #[arg(long, global = true, env = "TURFCHECK_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Request timeout in seconds (0 = none)
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Quick poll window in milliseconds
    #[arg(long, global = true, default_value = "5000")]
    poll_window_ms: u64,

    /// Quick poll interval in milliseconds
    #[arg(long, global = true, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// Write the final results to a report (.csv, .json, .html)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Open the report after writing it
    #[arg(long, global = true)]
    open: bool,

    /// Only print the result table
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload images, request analysis, then fetch and quick poll results
    Run {
        /// Image files or folders (omit to pick with a dialog in GUI builds)
        paths: Vec<PathBuf>,
    },

    /// Upload images and print the ids the backend assigned
    Upload {
        /// Image files or folders
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Request analysis for already uploaded ids, then quick poll
    Analyze {
        /// Asset ids returned by upload
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Fetch and show results once
    Results,

    /// Quick poll results (press Enter to stop early)
    Poll,

    /// Print the anonymous identity
    Identity,

    /// Show stored result snapshots
    History {
        /// Number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Include rows from every identity
        #[arg(long)]
        all: bool,

        /// Delete all stored snapshots instead of listing them
        #[arg(long)]
        clear: bool,
    },

    /// Show how a saved response body would be interpreted
    Inspect {
        /// JSON file with a response body
        file: PathBuf,

        /// Which endpoint the body came from
        #[arg(short, long, value_enum, default_value = "results")]
        kind: InspectKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum InspectKind {
    Ids,
    Results,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = build_config(&args);

    // Commands that need no backend
    match &args.command {
        Command::Inspect { file, kind } => {
            std::process::exit(inspect(file, *kind));
        }
        Command::History { limit, all, clear } => {
            let db = open_db(&config);
            if *clear {
                std::process::exit(clear_history(&db));
            }
            let identity = IdentityProvider::new(&db).get();
            std::process::exit(show_history(&db, &identity, *limit, *all));
        }
        _ => {}
    }

    let db = open_db(&config);
    let identity = IdentityProvider::new(&db).get();

    if let Command::Identity = args.command {
        println!("{}", identity);
        return;
    }

    let client = match ApiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            std::process::exit(2);
        }
    };

    if !args.quiet {
        eprintln!("\x1b[1mturfcheck - Turf Condition Analysis\x1b[0m");
        eprintln!("{}", "─".repeat(60));
        eprintln!("Backend:  {}", config.base_url);
        eprintln!("Identity: {}\n", identity);
    }

    let mut surface = TerminalSurface::stdout(args.quiet);
    let mut session = Session::new(client, identity, &config).with_history(db.clone());

    let outcome: Result<(), ()> = match args.command {
        Command::Run { paths } => {
            let paths = resolve_paths(paths);
            select(&mut session, &paths, args.quiet);
            let stop = CancellationSource::new();
            cancel_on_enter(&stop, args.quiet);
            session
                .run(&mut surface, &stop.token())
                .map_err(|_| ())
                .and_then(|report| poll_outcome(&report, args.quiet))
        }
        Command::Upload { paths } => {
            select(&mut session, &paths, args.quiet);
            match session.upload(&mut surface) {
                Ok(ids) => {
                    for id in ids {
                        println!("{}", id);
                    }
                    Ok(())
                }
                Err(_) => Err(()),
            }
        }
        Command::Analyze { ids } => {
            session.adopt_uploaded(ids);
            match session.analyze(&mut surface) {
                Ok(()) => {
                    let stop = CancellationSource::new();
                    cancel_on_enter(&stop, args.quiet);
                    let report = session.fetch_and_poll(&mut surface, &stop.token());
                    poll_outcome(&report, args.quiet)
                }
                Err(_) => Err(()),
            }
        }
        Command::Results => session.refresh(&mut surface).map(|_| ()).map_err(|_| ()),
        Command::Poll => {
            // Background poll so Enter can stop it from this thread
            let shared = Arc::new(Mutex::new(surface));
            let report = poll_in_background(&session, &config, &db, Arc::clone(&shared), args.quiet);
            surface = match Arc::try_unwrap(shared) {
                Ok(inner) => inner.into_inner().unwrap_or_else(|e| e.into_inner()),
                Err(_) => TerminalSurface::stdout(args.quiet),
            };
            poll_outcome(&report, args.quiet)
        }
        Command::Identity | Command::History { .. } | Command::Inspect { .. } => Ok(()),
    };

    let rows = surface.rows().to_vec();
    if !rows.is_empty() && !args.quiet {
        print_summary(&rows);
    }

    if let Some(ref output_path) = args.output {
        write_report(output_path, &rows, args.open, args.quiet);
    }

    if outcome.is_err() {
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "turfcheck=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> ClientConfig {
    let base_url = if args.local { LOCAL_API_BASE } else { args.base_url.as_str() };
    ClientConfig::new()
        .with_base_url(base_url)
        .with_contract(args.contract)
        .with_id_tracking(if args.cumulative { IdTracking::Cumulative } else { IdTracking::Replace })
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_poll(PollSchedule {
            window: Duration::from_millis(args.poll_window_ms),
            interval: Duration::from_millis(args.poll_interval_ms),
        })
        .with_db_path(&args.db)
}

fn open_db(config: &ClientConfig) -> Database {
    match Database::open_at(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", config.db_path.display(), e);
            std::process::exit(2);
        }
    }
}

fn select(session: &mut Session, paths: &[PathBuf], quiet: bool) {
    let count = session.select(paths);
    if !quiet {
        if count == 0 {
            eprintln!("No images found in the given paths.");
        } else {
            eprintln!("Selected {} image(s)", count);
        }
    }
}

/// Paths given on the command line, or a file dialog in GUI builds
fn resolve_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    #[cfg(feature = "gui")]
    if paths.is_empty() {
        return rfd::FileDialog::new()
            .set_title("Select turf photos to analyze")
            .add_filter("Images", turfcheck::workflow::IMAGE_EXTENSIONS)
            .pick_files()
            .unwrap_or_default();
    }

    paths
}

/// Cancel `source` when Enter is pressed on an interactive terminal
fn cancel_on_enter(source: &CancellationSource, quiet: bool) {
    if !io::stdin().is_terminal() {
        return;
    }
    if !quiet {
        eprintln!("\x1b[90m(press Enter to stop polling)\x1b[0m");
    }
    let stop = source.clone();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            stop.cancel();
        }
    });
}

fn poll_in_background(
    session: &Session,
    config: &ClientConfig,
    db: &Database,
    surface: Arc<Mutex<TerminalSurface<io::Stdout>>>,
    quiet: bool,
) -> PollReport {
    let client = match ApiClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            std::process::exit(2);
        }
    };
    let identity = session.identity().to_string();
    let history = db.clone();

    let mut poller = Poller::new(session.schedule());
    let handle = poller.start(move || {
        let mut surface = surface.lock().unwrap_or_else(|e| e.into_inner());
        refresh_results(&client, &identity, &mut *surface, Some(&history)).is_ok()
    });
    cancel_on_enter(&handle.canceller(), quiet);

    match poller.take() {
        Some(handle) => handle.join(),
        None => PollReport::default(),
    }
}

fn print_poll_report(report: &PollReport, quiet: bool) {
    if quiet {
        return;
    }
    let ended = if report.cancelled { "stopped" } else { "finished" };
    eprintln!(
        "\x1b[90mQuick poll {} after {:.1}s: {} fetch(es), {} failed\x1b[0m",
        ended,
        report.elapsed.as_secs_f64(),
        report.cycles,
        report.failures
    );
}

/// A poll in which no fetch succeeded is a failed fetch
fn poll_outcome(report: &PollReport, quiet: bool) -> Result<(), ()> {
    print_poll_report(report, quiet);
    if report.all_failed() || report.panicked {
        Err(())
    } else {
        Ok(())
    }
}

fn print_summary(rows: &[ResultRow]) {
    let summary = Summary::from_rows(rows);
    eprintln!("\n{}", "─".repeat(60));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  \x1b[32m✓ 양호:\x1b[0m    {}", summary.good);
    eprintln!("  \x1b[33m! 주의:\x1b[0m    {}", summary.warn);
    eprintln!("  \x1b[31m✗ 불량:\x1b[0m    {}", summary.bad);
    if summary.unknown > 0 {
        eprintln!("  \x1b[90m? Other:\x1b[0m   {}", summary.unknown);
    }
}

fn write_report(output: &Path, rows: &[ResultRow], open_after: bool, quiet: bool) {
    let path = if output.is_dir() {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        output.join(format!("turfcheck_report_{}.html", timestamp))
    } else {
        output.to_path_buf()
    };

    if let Err(e) = report::generate(&path, rows) {
        eprintln!("Failed to write report: {}", e);
        std::process::exit(1);
    }
    if !quiet {
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", path.display());
    }
    if open_after {
        if let Err(e) = open::that(&path) {
            eprintln!("Failed to open report: {}", e);
        }
    }
}

fn show_history(db: &Database, identity: &str, limit: i64, all: bool) -> i32 {
    let records = if all {
        db.recent_history(limit)
    } else {
        db.history_for(identity, limit)
    };

    match records {
        Ok(records) if records.is_empty() => {
            println!("No stored results.");
            0
        }
        Ok(records) => {
            println!("{:<26} {:<30} {:<8} {}", "FETCHED", "IMAGE", "STATUS", "RAW");
            println!("{}", "-".repeat(80));
            for r in records {
                println!(
                    "{:<26} {:<30} {:<8} {}",
                    truncate(&r.fetched_at, 25),
                    truncate(&r.image_id, 30),
                    r.condition,
                    r.raw_status
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn clear_history(db: &Database) -> i32 {
    match db.clear_history() {
        Ok(count) => {
            println!("Deleted {} stored result(s).", count);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn inspect(file: &Path, kind: InspectKind) -> i32 {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", file.display(), e);
            return 2;
        }
    };
    let body = normalize::safe_json(&bytes);

    match kind {
        InspectKind::Ids => {
            let extracted = normalize::extract_ids(&body);
            describe_shape(extracted.shape(), extracted.len());
            for id in extracted.items() {
                println!("{}", id);
            }
        }
        InspectKind::Results => {
            let extracted = normalize::extract_results(&body);
            describe_shape(extracted.shape(), extracted.len());
            let rows = turfcheck::status::classify_records(extracted.items());
            TerminalSurface::stdout(false).render(&rows);
        }
    }
    0
}

fn describe_shape(shape: Option<normalize::Shape>, count: usize) {
    match shape {
        Some(shape) => eprintln!("Shape: {} ({} item(s))", shape, count),
        None => eprintln!("Shape: \x1b[33munrecognized\x1b[0m"),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
