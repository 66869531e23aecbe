//! copythat command-line driver
//!
//! Works on JSON document snapshots: load, run an operation, write back.

#![warn(unreachable_pub)]

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use copythat_core::{
    create_report, find_report, AnomalyKind, BindingSyntax, DataMapping, Document, DocumentSnapshot,
    EmptyValuePolicy, MemoryDocument, SyncConfig, SyncOutcome, Synchronizer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line definition
#[must_use]
pub fn cli() -> Command {
    Command::new("copythat")
        .version(copythat_core::VERSION)
        .about("Fill named text layers from a key-value data source")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .subcommand(
            Command::new("sync")
                .about("Sync a document snapshot against a data mapping")
                .arg(
                    Arg::new("document")
                        .long("document")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document snapshot (JSON)"),
                )
                .arg(
                    Arg::new("data")
                        .long("data")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Data mapping (flat JSON object)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the synced snapshot (default: in place)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("replace-empty")
                        .long("replace-empty")
                        .action(ArgAction::SetTrue)
                        .help("Write empty values instead of reporting them"),
                )
                .arg(
                    Arg::new("max-concurrency")
                        .long("max-concurrency")
                        .value_parser(value_parser!(usize))
                        .help("Cap on layers processed at once"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Print the report layer of a document snapshot")
                .arg(
                    Arg::new("document")
                        .long("document")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document snapshot (JSON)"),
                ),
        )
        .subcommand(
            Command::new("ping")
                .about("Append a test line for a layer to the report")
                .arg(
                    Arg::new("document")
                        .long("document")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document snapshot (JSON)"),
                )
                .arg(
                    Arg::new("layer")
                        .required(true)
                        .help("Name of the text layer to reference"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Show whether layer names are bindings")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("names")
                        .required(true)
                        .num_args(1..)
                        .help("Layer names to check"),
                ),
        )
}

/// Options of the `sync` command
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    /// Document snapshot to sync
    pub document: PathBuf,
    /// Data mapping file
    pub data: PathBuf,
    /// Output snapshot (`None` = overwrite `document`)
    pub output: Option<PathBuf>,
    /// TOML configuration file
    pub config: Option<PathBuf>,
    /// Write empty values instead of treating them as missing
    pub replace_empty: bool,
    /// Concurrency cap override
    pub max_concurrency: Option<usize>,
}

/// Read a document snapshot file
///
/// # Errors
/// Fails if the file is unreadable or not a valid snapshot
pub fn load_document(path: &Path) -> Result<MemoryDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    let snapshot = DocumentSnapshot::from_json_str(&json)
        .with_context(|| format!("Failed to parse document {}", path.display()))?;
    MemoryDocument::from_snapshot(&snapshot)
        .with_context(|| format!("Failed to build document {}", path.display()))
}

/// Write a document snapshot file
///
/// # Errors
/// Fails if the tree cannot be captured or the file cannot be written
pub fn save_document(doc: &MemoryDocument, path: &Path) -> Result<()> {
    let json = doc
        .snapshot()
        .context("Failed to capture document")?
        .to_json_string()?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write document {}", path.display()))
}

/// Read a data mapping file
///
/// # Errors
/// Fails if the file is unreadable or not a JSON object
pub fn load_mapping(path: &Path) -> Result<DataMapping> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data {}", path.display()))?;
    DataMapping::from_json_str(&json)
        .with_context(|| format!("Failed to parse data {}", path.display()))
}

/// Configuration from an optional file
///
/// # Errors
/// Fails if the file is unreadable or invalid
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SyncConfig::new()),
    }
}

/// Run a sync and write the updated snapshot
///
/// # Errors
/// Fails on unreadable inputs, invalid options, sync failures or an
/// unwritable output
pub async fn run_sync(args: &SyncArgs) -> Result<SyncOutcome> {
    let mut config = load_config(args.config.as_deref())?;
    if args.replace_empty {
        config = config.with_empty_values(EmptyValuePolicy::Replace);
    }
    if let Some(max) = args.max_concurrency {
        config = config.with_max_concurrent_elements(max);
    }
    config.validate()?;

    let doc = Arc::new(load_document(&args.document)?);
    let data = load_mapping(&args.data)?;
    tracing::debug!("Loaded {} keys from {}", data.len(), args.data.display());

    let outcome = Synchronizer::new(Arc::clone(&doc), config)
        .synchronize(&data)
        .await
        .context("Sync failed")?;

    let output = args.output.as_deref().unwrap_or(args.document.as_path());
    save_document(&doc, output)?;
    tracing::info!("Wrote {}", output.display());
    Ok(outcome)
}

/// Human-readable outcome summary
#[must_use]
pub fn summarize(outcome: &SyncOutcome) -> String {
    let mut lines = vec![
        format!("Scanned:      {}", outcome.scanned),
        format!("Skipped:      {}", outcome.skipped),
        format!("Replaced:     {}", outcome.replaced),
        format!("Missing font: {}", outcome.missing_font),
        format!("Not found:    {}", outcome.not_found),
        format!("Failed:       {}", outcome.failed),
        format!("Duration:     {:?}", outcome.duration),
    ];
    if !outcome.anomalies.is_empty() {
        lines.push(String::new());
        lines.push("Anomalies:".to_string());
        for anomaly in &outcome.anomalies {
            lines.push(format!("  [{}] {}", anomaly.kind, anomaly.element));
        }
    }
    lines.join("\n")
}

/// Text of the report layer in a snapshot
///
/// # Errors
/// Fails if the snapshot is unreadable or has no report layer
pub async fn read_report(path: &Path) -> Result<String> {
    let doc = load_document(path)?;
    let config = SyncConfig::new();
    let report = find_report(&doc, &config.report)
        .await?
        .ok_or_else(|| anyhow!("{} has no report layer; run `copythat sync` first", path.display()))?;
    Ok(doc.characters(report.node()).await?)
}

/// Append a test line naming `layer` to the report, creating the report if
/// needed
///
/// # Errors
/// Fails if the layer does not exist or the snapshot cannot be updated
pub async fn ping(path: &Path, layer: &str) -> Result<String> {
    let doc = load_document(path)?;
    let config = SyncConfig::new();

    let Some(&element) = doc.find_text_nodes_named(layer).await?.first() else {
        bail!("No text layer named {layer:?} in {}", path.display());
    };

    let report = match find_report(&doc, &config.report).await? {
        Some(report) => {
            let font = doc.font_name(report.node()).await?;
            doc.load_font(&font).await?;
            report
        }
        None => create_report(&doc, &config.report).await?,
    };
    let anomaly = report
        .append_anomaly(&doc, element, AnomalyKind::JustTesting)
        .await?;

    save_document(&doc, path)?;
    Ok(anomaly.line(&config.report.unknown_page_label))
}

/// Binding check result per name, one line each
///
/// # Errors
/// Fails if the configuration cannot be loaded
pub fn check_names(config: Option<&Path>, names: &[String]) -> Result<Vec<String>> {
    let binding: BindingSyntax = load_config(config)?.binding;
    Ok(names
        .iter()
        .map(|name| match binding.extract_key(name) {
            Some(key) => format!("{name}: binding, key {key:?}"),
            None => format!("{name}: not a binding"),
        })
        .collect())
}
