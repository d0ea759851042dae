//! Geofence CLI - inspect and copy geofence partitions
//!
//! Usage:
//!   geofence [--store <sheets.json>] sheets
//!   geofence [--store <sheets.json>] info <sheet>
//!   geofence [--store <sheets.json>] scan <sheet> [--recursive]
//!   geofence [--store <sheets.json>] copy <source> <dest>
//!
//! The store path may also come from the config file (`[store] path`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use geofence::config::Settings;
use geofence::scan::render_outline;
use geofence::service::{MemoryBackend, SheetService};
use geofence::{PartitionScanner, SheetId, SkipObserver, SkippedChild, TreeReplicator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geofence")]
#[command(about = "Geofence - inspect and copy geofence partition trees")]
#[command(version)]
struct Cli {
    /// Config file (defaults to GEOFENCE_CONFIG, ./geofence.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sheet store snapshot, overriding the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List top-level sheets in the store
    Sheets,

    /// Show sheet details
    Info {
        /// Sheet id
        sheet: String,
    },

    /// List the geofence partitions of a sheet
    Scan {
        /// Sheet id
        sheet: String,

        /// Include nested partitions
        #[arg(short, long)]
        recursive: bool,
    },

    /// Copy the geofence partition tree of one sheet into another
    Copy {
        /// Sheet to copy partitions from
        source: String,

        /// Sheet to copy partitions into
        dest: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store_path = match settings.store_path(cli.store.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {} (pass --store or set [store] path)", e);
            return ExitCode::FAILURE;
        }
    };

    let backend = match MemoryBackend::load(&store_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading store '{}': {}", store_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Sheets => cmd_sheets(&backend),
        Commands::Info { sheet } => cmd_info(&backend, SheetId::new(sheet)).await,
        Commands::Scan { sheet, recursive } => {
            cmd_scan(&backend, SheetId::new(sheet), recursive).await
        }
        Commands::Copy { source, dest } => {
            cmd_copy(&backend, &store_path, SheetId::new(source), SheetId::new(dest)).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_sheets(backend: &MemoryBackend) -> CmdResult {
    let roots = backend.roots();
    if roots.is_empty() {
        println!("No sheets.");
    }
    for (id, name) in roots {
        println!("{}  {}", id, name);
    }
    Ok(())
}

async fn cmd_info(backend: &MemoryBackend, sheet: SheetId) -> CmdResult {
    let info = backend.get_info(&sheet).await?;

    println!("SheetName:       {}", info.name);
    println!(
        "ParentSheetName: {}",
        info.parent_name.as_deref().unwrap_or("-")
    );
    println!("SheetVer:        {}", info.latest_version);
    println!("RowCount:        {}", info.record_count);
    Ok(())
}

async fn cmd_scan(backend: &MemoryBackend, sheet: SheetId, recursive: bool) -> CmdResult {
    // Looking up the sheet first doubles as validation of the id.
    let info = backend.get_info(&sheet).await?;
    let skipped = Arc::new(SkipCounter::default());
    let scanner = PartitionScanner::new(backend).with_observer(skipped.clone());

    println!("SheetName: {}", info.name);
    println!("Geofenced into:");
    if recursive {
        let tree = scanner.scan_tree(&sheet).await?;
        for line in render_outline(&tree).lines() {
            println!("   {}", line);
        }
    } else {
        for partition in scanner.list_existing(&sheet).await? {
            println!("   {}", partition.name);
        }
    }
    skipped.report();
    Ok(())
}

async fn cmd_copy(
    backend: &MemoryBackend,
    store_path: &std::path::Path,
    source: SheetId,
    dest: SheetId,
) -> CmdResult {
    backend.get_info(&source).await?;
    backend.get_info(&dest).await?;

    let skipped = Arc::new(SkipCounter::default());
    let replicator = TreeReplicator::new(backend).with_observer(skipped.clone());
    let outcome = replicator.copy(Some(&source), Some(&dest)).await;

    // Keep whatever was created even if the copy stopped part way.
    backend.save(store_path)?;
    let summary = outcome?;

    println!("Geofence copy complete");
    println!(
        "  created: {}, reused: {}, depth: {}",
        summary.created, summary.reused, summary.depth
    );
    skipped.report();
    Ok(())
}

/// Counts child sheets that were not geofence partitions.
#[derive(Default)]
struct SkipCounter(AtomicUsize);

impl SkipObserver for SkipCounter {
    fn on_skip(&self, _skipped: &SkippedChild) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

impl SkipCounter {
    fn report(&self) {
        let count = self.0.load(Ordering::Relaxed);
        if count > 0 {
            println!("Skipped {} child sheet(s) without geofence data", count);
        }
    }
}
