//! Frame Text Sync CLI
//!
//! Usage:
//!   frame-text-sync [OPTIONS] <DOCUMENT>
//!
//! Options:
//!   --source <ID>            Source container id
//!   --containers <ID,...>    Containers to sync (default: all top-level containers)
//!   --request <FILE>         JSON sync request instead of the flags above
//!   --config <FILE>          Sync options (TOML format)
//!   --tolerance <N>          Match tolerance in normalized units
//!   --dry-run                Report projected counts without writing
//!   --include-source         Also treat the source as a target
//!   --ordered                Replay texts in reading order instead of matching
//!   --timeout-secs <N>       Give up after N seconds (matching sync only)
//!   -o, --output <FILE>      Write the updated document here (default: stdout)

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use frame_text_sync::sync::DEFAULT_TOLERANCE;
use frame_text_sync::{
    run_ordered, run_sync, run_with_deadline, CancelFlag, ConfigError, DocumentHost,
    MemoryDocument, NodeId, ProgressEvent, RunContext, SyncError, SyncOptions, SyncRequest,
};

#[derive(Parser)]
#[command(name = "frame-text-sync")]
#[command(about = "Propagate text from a source container to matching elements in others")]
struct Cli {
    /// Document snapshot (JSON)
    document: PathBuf,

    /// Source container id
    #[arg(long)]
    source: Option<String>,

    /// Container ids to sync, comma separated
    #[arg(long, value_delimiter = ',')]
    containers: Vec<String>,

    /// JSON sync request (overrides --source, --containers and --tolerance)
    #[arg(long)]
    request: Option<PathBuf>,

    /// Sync options file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Match tolerance in normalized container units
    #[arg(long)]
    tolerance: Option<f64>,

    /// Report projected counts without writing
    #[arg(long)]
    dry_run: bool,

    /// Also treat the source container as a target
    #[arg(long)]
    include_source: bool,

    /// Replay texts in reading order instead of matching
    #[arg(long)]
    ordered: bool,

    /// Give up after this many seconds (matching sync only)
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Output file for the updated document (stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn build_request(cli: &Cli, doc: &MemoryDocument) -> Result<SyncRequest, SyncError> {
    let mut request = match &cli.request {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::from)?;
            SyncRequest::from_json(&content)?
        }
        None => {
            let containers: Vec<NodeId> = if cli.containers.is_empty() {
                doc.root_ids()
                    .iter()
                    .filter(|id| {
                        doc.container(id)
                            .map(|c| c.kind.is_groupable())
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect()
            } else {
                cli.containers.iter().map(|id| NodeId::from(id.as_str())).collect()
            };
            SyncRequest {
                container_ids: containers,
                source_container_id: cli.source.as_deref().map(NodeId::from),
                tolerance: cli.tolerance.unwrap_or(DEFAULT_TOLERANCE),
                include_source_in_targets: false,
                options: SyncOptions::default(),
            }
        }
    };

    if let Some(path) = &cli.config {
        request.options = SyncOptions::from_file(path)?;
    }
    if cli.dry_run {
        request.options.dry_run = true;
    }
    if cli.include_source {
        request.include_source_in_targets = true;
    }
    Ok(request)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut doc = match MemoryDocument::from_file(&cli.document) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error loading document '{}': {}", cli.document.display(), e);
            std::process::exit(1);
        }
    };

    let deadline = match cli.timeout_secs.map(Duration::try_from_secs_f64).transpose() {
        Ok(deadline) => deadline,
        Err(e) => {
            eprintln!("Error: invalid --timeout-secs: {}", e);
            std::process::exit(1);
        }
    };

    let request = match build_request(&cli, &doc) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Progress goes to stderr as it arrives
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("[{:>3}%] {}", event.percentage, event.message);
        }
    });

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_flag.cancel();
        }
    });

    let ctx = RunContext::new(cancel, tx);
    let fonts = doc.font_loader();
    let result = match (cli.ordered, deadline) {
        (true, _) => run_ordered(&mut doc, &fonts, &request, &ctx).await,
        (false, Some(deadline)) => {
            run_with_deadline(&mut doc, &fonts, &request, &ctx, deadline).await
        }
        (false, None) => run_sync(&mut doc, &fonts, &request, &ctx).await,
    };
    drop(ctx);
    if let Err(e) = printer.await {
        warn!(error = %e, "progress printer stopped abnormally");
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    eprintln!("{}", outcome.notification());

    if outcome.summary().dry_run {
        return;
    }
    let json = match doc.to_json_pretty() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing document: {}", e);
            std::process::exit(1);
        }
    };
    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, json) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => println!("{}", json),
    }
}
