//! `lineage` command-line front end.
//!
//! Every command opens the provenance store named by `--db` (or
//! `LINEAGE_DB`), does one thing, and exits. Logs go to stderr; command
//! output goes to stdout or to the `--output` file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lineage_graph::GraphBuilder;
use lineage_report::{derive_report, render_markdown};
use lineage_store::{Metadata, ProvenanceStore, RunStatus};
use lineage_tracker::{parse_event_log, verify_store, Declaration, Tracker, TrackerConfig};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod render;

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Data lineage tracking for file-based pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Lineage database path
    #[arg(long, global = true, env = "LINEAGE_DB", default_value = "lineage.db")]
    db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines read/write event log into the store
    Ingest(IngestArgs),

    /// Record an explicit transformation from inputs to outputs
    Declare(DeclareArgs),

    /// Show counts, recent datasets and the data flow
    Summary,

    /// List every dataset, newest first
    Datasets,

    /// List every operation, newest first
    Operations,

    /// Print or export the lineage graph
    Show(ShowArgs),

    /// Graph statistics (nodes, edges, sources, sinks, acyclicity)
    Stats(StatsArgs),

    /// Generate the EU AI Act Article 10 compliance report
    Report(ReportArgs),

    /// Re-hash every dataset and compare with the recorded fingerprint
    Verify(VerifyArgs),

    /// Delete all lineage records
    Clear(ClearArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Event log (one JSON object per line, `-` for stdin)
    events: PathBuf,

    /// Script path recorded on the run (defaults to the log path)
    #[arg(long)]
    script: Option<String>,

    /// Tracker configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct DeclareArgs {
    /// Input file (repeatable)
    #[arg(long = "input", short = 'i', required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (repeatable)
    #[arg(long = "output", short = 'o', required = true)]
    outputs: Vec<PathBuf>,

    /// Function the transformation is attributed to
    #[arg(long)]
    function: String,

    /// Code snippet describing the transformation
    #[arg(long)]
    code: Option<String>,

    /// Parameter as key=value; values are parsed as JSON when possible
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,

    /// Tracker configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, value_enum, default_value_t = GraphFormat::Text)]
    format: GraphFormat,

    /// Write to file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Only the ancestors or descendants of this file name
    #[arg(long, conflicts_with = "downstream")]
    upstream: Option<String>,

    #[arg(long)]
    downstream: Option<String>,
}

#[derive(Args)]
struct StatsArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    format: ReportFormat,

    /// Output path; with `both`, the extension is replaced per format
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Tracker configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GraphFormat {
    Text,
    Json,
    Dot,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum ReportFormat {
    Markdown,
    Json,
    Both,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Ingest(args) => run_ingest(&cli.db, args),
        Commands::Declare(args) => run_declare(&cli.db, args),
        Commands::Summary => run_summary(&cli.db),
        Commands::Datasets => run_datasets(&cli.db),
        Commands::Operations => run_operations(&cli.db),
        Commands::Show(args) => run_show(&cli.db, args),
        Commands::Stats(args) => run_stats(&cli.db, args),
        Commands::Report(args) => run_report(&cli.db, args),
        Commands::Verify(args) => run_verify(&cli.db, args),
        Commands::Clear(args) => run_clear(&cli.db, args),
    }
}

/// TOML file when given, then `LINEAGE_*` overrides on top.
fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    match path {
        Some(path) => Ok(TrackerConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_overrides()),
        None => Ok(TrackerConfig::from_env()),
    }
}

/// Open an existing store; read-only commands never create one.
fn open_existing(db: &Path) -> Result<ProvenanceStore> {
    if !db.exists() {
        bail!("Database not found: {}", db.display());
    }
    ProvenanceStore::open(db).with_context(|| format!("Failed to open {}", db.display()))
}

fn open_tracker(db: &Path, config: TrackerConfig) -> Result<Tracker> {
    let store = ProvenanceStore::open(db)
        .with_context(|| format!("Failed to open {}", db.display()))?;
    Ok(Tracker::new(Arc::new(store), config))
}

/// Close the run with a status matching `outcome`, then hand the outcome back.
fn finish<T>(tracker: &mut Tracker, outcome: lineage_tracker::Result<T>) -> Result<T> {
    let status = if outcome.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    if let Err(err) = tracker.stop(status) {
        log::warn!("Failed to close run: {err}");
    }
    Ok(outcome?)
}

fn run_ingest(db: &Path, args: IngestArgs) -> Result<()> {
    let events = if args.events.as_os_str() == "-" {
        parse_event_log(io::stdin().lock())
    } else {
        let file = File::open(&args.events)
            .with_context(|| format!("Failed to open {}", args.events.display()))?;
        parse_event_log(BufReader::new(file))
    }
    .context("Failed to read event log")?;

    let script = args
        .script
        .unwrap_or_else(|| args.events.to_string_lossy().into_owned());

    let mut tracker = open_tracker(db, load_config(args.config.as_deref())?)?;
    tracker.start(Some(&script))?;
    let outcome = tracker.ingest(events);
    let stats = finish(&mut tracker, outcome)?;

    println!(
        "Ingested {} read(s) and {} write(s): {} lineage edge(s), {} dropped",
        stats.reads, stats.writes, stats.edges, stats.dropped
    );
    println!("Database: {}", db.display());
    Ok(())
}

fn run_declare(db: &Path, args: DeclareArgs) -> Result<()> {
    let mut declaration = Declaration::new(args.function);
    declaration.inputs = args.inputs;
    declaration.outputs = args.outputs;
    declaration.code_snippet = args.code;
    if !args.params.is_empty() {
        declaration.parameters = Some(args.params.into_iter().collect::<Metadata>());
    }

    let mut tracker = open_tracker(db, load_config(args.config.as_deref())?)?;
    tracker.start(Some("declare"))?;
    let outcome = tracker.declare(declaration);
    let declared = finish(&mut tracker, outcome)?;

    for path in &declared.skipped {
        eprintln!("Skipped missing file: {}", path.display());
    }
    println!(
        "Recorded {} ({}): {} input(s), {} output(s), {} edge(s)",
        declared.operation.function_name,
        declared.operation.id,
        declared.input_ids.len(),
        declared.output_ids.len(),
        declared.edges.len()
    );
    Ok(())
}

fn run_summary(db: &Path) -> Result<()> {
    let store = open_existing(db)?;
    print!(
        "{}",
        render::summary(
            &store.counts()?,
            &store.all_datasets()?,
            &store.lineage_edges()?
        )
    );
    Ok(())
}

fn run_datasets(db: &Path) -> Result<()> {
    let store = open_existing(db)?;
    print!("{}", render::datasets(&store.all_datasets()?));
    Ok(())
}

fn run_operations(db: &Path) -> Result<()> {
    let store = open_existing(db)?;
    print!("{}", render::operations(&store.all_operations()?));
    Ok(())
}

fn run_show(db: &Path, args: ShowArgs) -> Result<()> {
    let store = open_existing(db)?;
    let graph = GraphBuilder::new().build(&store.lineage_edges()?);

    let rendered = if let Some(label) = &args.upstream {
        render::lineage_list("Upstream of", label, &graph.upstream(label)?)
    } else if let Some(label) = &args.downstream {
        render::lineage_list("Downstream of", label, &graph.downstream(label)?)
    } else {
        match args.format {
            GraphFormat::Text => graph.to_text(),
            GraphFormat::Json => graph.to_json()?,
            GraphFormat::Dot => graph.to_dot(),
        }
    };

    emit(&rendered, args.output.as_deref())
}

fn run_stats(db: &Path, args: StatsArgs) -> Result<()> {
    let store = open_existing(db)?;
    let stats = GraphBuilder::new().build(&store.lineage_edges()?).stats();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render::stats(&stats));
    }
    Ok(())
}

fn run_report(db: &Path, args: ReportArgs) -> Result<()> {
    let store = open_existing(db)?;
    let report = derive_report(
        &store.all_datasets()?,
        &store.all_operations()?,
        &store.lineage_edges()?,
        chrono::Utc::now(),
    );

    let targets = report_targets(args.format, args.output);
    if let Some(path) = &targets.markdown {
        write_file(path, &render_markdown(&report))?;
        println!("Markdown report: {}", path.display());
    }
    if let Some(path) = &targets.json {
        write_file(path, &report.to_json()?)?;
        println!("JSON report: {}", path.display());
    }
    Ok(())
}

struct ReportTargets {
    markdown: Option<PathBuf>,
    json: Option<PathBuf>,
}

fn report_targets(format: ReportFormat, output: Option<PathBuf>) -> ReportTargets {
    let default_md = || PathBuf::from("compliance_report.md");
    let default_json = || PathBuf::from("compliance_report.json");

    match format {
        ReportFormat::Markdown => ReportTargets {
            markdown: Some(output.unwrap_or_else(default_md)),
            json: None,
        },
        ReportFormat::Json => ReportTargets {
            markdown: None,
            json: Some(output.unwrap_or_else(default_json)),
        },
        ReportFormat::Both => match output {
            Some(base) => ReportTargets {
                markdown: Some(base.with_extension("md")),
                json: Some(base.with_extension("json")),
            },
            None => ReportTargets {
                markdown: Some(default_md()),
                json: Some(default_json()),
            },
        },
    }
}

fn run_verify(db: &Path, args: VerifyArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = open_existing(db)?;
    let results = verify_store(&store, config.hash_chunk_size)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render::verification(&results));
    }

    let failed = results.iter().filter(|r| !r.status.is_verified()).count();
    if failed > 0 {
        bail!("{failed} dataset(s) failed verification");
    }
    Ok(())
}

fn run_clear(db: &Path, args: ClearArgs) -> Result<()> {
    if !db.exists() {
        log::warn!("Database not found: {}", db.display());
        return Ok(());
    }

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete all lineage data in {}?", db.display()))
            .default(false)
            .interact()
            .context("Confirmation required (use --yes to skip)")?;
        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    let store = open_existing(db)?;
    store.reset()?;
    println!("Cleared {}", db.display());
    Ok(())
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_file(path, content)?;
            println!("Saved to {}", path.display());
        }
        None => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn parse_param(raw: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_json_or_fall_back_to_text() {
        assert_eq!(
            parse_param("ratio=0.8").unwrap(),
            ("ratio".to_string(), serde_json::json!(0.8))
        );
        assert_eq!(
            parse_param("mode=fast").unwrap(),
            ("mode".to_string(), serde_json::json!("fast"))
        );
        assert_eq!(
            parse_param("expr=a=b").unwrap(),
            ("expr".to_string(), serde_json::json!("a=b"))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn both_formats_share_the_output_stem() {
        let targets = report_targets(ReportFormat::Both, Some(PathBuf::from("out/audit.txt")));
        assert_eq!(targets.markdown, Some(PathBuf::from("out/audit.md")));
        assert_eq!(targets.json, Some(PathBuf::from("out/audit.json")));

        let defaults = report_targets(ReportFormat::Json, None);
        assert_eq!(defaults.markdown, None);
        assert_eq!(defaults.json, Some(PathBuf::from("compliance_report.json")));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
