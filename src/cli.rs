//! Command-line interface for gentests.

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::{
    ComponentAnalyzer, Conventions, ControllerAnalyzer, ModelAnalyzer, ResourceAnalyzer,
};
use crate::batch::{Batch, BatchReport};
use crate::config::{Config, CONFIG_FILE, DEFAULT_CONFIG};
use crate::generate::OutputWriter;
use crate::introspect::{AppSnapshot, Capabilities, CAPABILITY_FILAMENT, CAPABILITY_LIVEWIRE};
use crate::report;
use crate::stub;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default snapshot file names to search for.
const DEFAULT_SNAPSHOT_NAMES: &[&str] = &[
    "gentests.snapshot.yaml",
    ".gentests/snapshot.yaml",
    "storage/gentests/snapshot.yaml",
];

const DEFAULT_STUBS_DIR: &str = "stubs/gentests";

/// Test scaffold generator for Laravel applications.
///
/// gentests reads an exported snapshot of an application (classes, routes,
/// admin schemas) or a database schema and writes Pest test files for
/// models, controllers, Livewire components and Filament resources.
#[derive(Parser)]
#[command(name = "gentests")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate tests for Eloquent models
    #[command(visible_alias = "models")]
    Model(SubjectArgs),
    /// Generate tests for controllers and their routes
    #[command(visible_alias = "controllers")]
    Controller(SubjectArgs),
    /// Generate model tests from database tables
    #[command(visible_alias = "db")]
    Database(DatabaseArgs),
    /// Generate tests for Livewire components
    Livewire(SubjectArgs),
    /// Generate tests for Filament resources and their pages
    Filament(SubjectArgs),
    /// Generate tests for every subject kind
    All(AllArgs),
    /// Create a gentests.yaml configuration file
    Init(InitArgs),
}

/// Flags shared by every generating command.
#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Application snapshot YAML (default: auto-discover)
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Configuration file (default: gentests.yaml in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overwrite existing test files without asking
    #[arg(short, long)]
    pub force: bool,

    /// Output format: pretty or json
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Never prompt; existing files are skipped unless --force is given
    #[arg(short = 'n', long)]
    pub no_interaction: bool,

    /// Directory tests are written to (overrides the configuration)
    #[arg(long)]
    pub test_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct SubjectArgs {
    /// Class names, short or fully qualified (default: discover all)
    pub names: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct DatabaseArgs {
    /// Tables to analyze (default: every table the configuration selects)
    pub tables: Vec<String>,

    /// SQLite database file (overrides the configuration)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct AllArgs {
    /// SQLite database file; tables are skipped when none is configured
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing configuration or published stubs
    #[arg(short, long)]
    pub force: bool,

    /// Also copy the built-in stubs into DIR for customisation
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = DEFAULT_STUBS_DIR)]
    pub publish_stubs: Option<PathBuf>,
}

/// Discover a snapshot file in the current directory.
fn discover_snapshot() -> anyhow::Result<PathBuf> {
    for name in DEFAULT_SNAPSHOT_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "no snapshot file found (looked for {})",
        DEFAULT_SNAPSHOT_NAMES.join(", ")
    )
}

fn load_snapshot(common: &CommonArgs) -> anyhow::Result<AppSnapshot> {
    let path = match &common.snapshot {
        Some(p) => p.clone(),
        None => discover_snapshot()?,
    };
    AppSnapshot::parse_file(&path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))
}

fn load_config(common: &CommonArgs) -> anyhow::Result<Config> {
    let mut config = match &common.config {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            Config::parse_file(path)?.relative_to(dir)
        }
        None => Config::discover(&std::env::current_dir()?)?,
    };
    if let Some(test_path) = &common.test_path {
        config.test_path = test_path.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Qualify a bare class name with `namespace`.
fn qualify(name: &str, namespace: &str) -> String {
    let name = name.trim_start_matches('\\');
    if name.contains('\\') || namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace.trim_end_matches('\\'), name)
    }
}

fn qualify_all(names: &[String], namespace: &str) -> Vec<String> {
    names.iter().map(|n| qualify(n, namespace)).collect()
}

/// Ask a yes/no question on stderr; anything but yes declines.
fn prompt(question: &str) -> bool {
    eprint!("{} [y/N] ", question);
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration, wire the writer and batch, run `body`, print the report.
fn run_generation<F>(command: &str, common: &CommonArgs, body: F) -> anyhow::Result<i32>
where
    F: FnOnce(&Config, &mut Batch<'_>, &mut BatchReport) -> anyhow::Result<()>,
{
    // Validate format
    if common.format != "pretty" && common.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            common.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = match load_config(common) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let stubs = config.stubs();
    let settings = config.settings();

    let interactive = !common.no_interaction && std::io::stdin().is_terminal();
    let progress = (common.format == "pretty" && std::io::stderr().is_terminal()).then(spinner);

    let mut out = OutputWriter::new(&config.test_path)
        .force(common.force)
        .extension(config.extension.as_str());
    if interactive {
        let pb = progress.clone();
        out = out.confirm_with(move |question| match &pb {
            Some(pb) => pb.suspend(|| prompt(question)),
            None => prompt(question),
        });
    }

    let mut batch = Batch::new(&stubs, &settings, out);
    if let Some(pb) = progress.clone() {
        batch = batch.on_subject(move |kind, name| {
            pb.set_message(format!("[{}] {}", kind, name));
            pb.inc(1);
        });
    }

    let mut report = BatchReport::new();
    let outcome = body(&config, &mut batch, &mut report);
    drop(batch);
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    if let Err(e) = outcome {
        eprintln!("Error: {:#}", e);
        return Ok(EXIT_ERROR);
    }

    match common.format.as_str() {
        "json" => report::write_json(command, &config.test_path, &report)?,
        _ => report::write_pretty(command, &config.test_path, &report),
    }

    if report.has_failures() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn models(
    app: &AppSnapshot,
    conventions: &Conventions,
    names: &[String],
    batch: &mut Batch<'_>,
    report: &mut BatchReport,
) {
    let analyzer = ModelAnalyzer::new(app, conventions);
    let names = if names.is_empty() {
        analyzer.discover()
    } else {
        qualify_all(names, &conventions.model_namespace)
    };
    batch.run(&analyzer, &names, report);
}

fn controllers(
    app: &AppSnapshot,
    conventions: &Conventions,
    names: &[String],
    batch: &mut Batch<'_>,
    report: &mut BatchReport,
) {
    let analyzer = ControllerAnalyzer::new(app, app, conventions);
    let names = if names.is_empty() {
        analyzer.discover()
    } else {
        qualify_all(names, &conventions.controller_namespace)
    };
    batch.run(&analyzer, &names, report);
}

fn components(
    app: &AppSnapshot,
    conventions: &Conventions,
    capabilities: &Capabilities,
    names: &[String],
    batch: &mut Batch<'_>,
    report: &mut BatchReport,
) {
    if !capabilities.has(CAPABILITY_LIVEWIRE) {
        report.note("Livewire is not installed; components skipped");
        return;
    }
    let analyzer = ComponentAnalyzer::new(app, conventions);
    let names = if names.is_empty() {
        analyzer.discover(capabilities).subjects
    } else {
        qualify_all(names, &conventions.livewire_namespace)
    };
    batch.run(&analyzer, &names, report);
}

fn resources(
    app: &AppSnapshot,
    conventions: &Conventions,
    capabilities: &Capabilities,
    names: &[String],
    batch: &mut Batch<'_>,
    report: &mut BatchReport,
) {
    if !capabilities.has(CAPABILITY_FILAMENT) {
        report.note("Filament is not installed; resources skipped");
        return;
    }
    let analyzer = ResourceAnalyzer::new(app, app, conventions);
    let names = if names.is_empty() {
        analyzer.discover(capabilities).subjects
    } else {
        qualify_all(names, &conventions.filament_namespace)
    };
    batch.run(&analyzer, &names, report);
}

#[cfg(feature = "sqlite")]
fn tables(
    config: &Config,
    database: &Path,
    names: &[String],
    batch: &mut Batch<'_>,
    report: &mut BatchReport,
) -> anyhow::Result<()> {
    use crate::analyze::{database::SqliteConnection, TableAnalyzer};

    if let Some(driver) = config.database.driver.as_deref() {
        if driver != "sqlite" {
            anyhow::bail!(
                "only sqlite databases can be opened directly (configured driver: {})",
                driver
            );
        }
    }
    let conn = SqliteConnection::open(database)
        .with_context(|| format!("cannot open database {}", database.display()))?;
    let analyzer = TableAnalyzer::new(&conn)?;
    let names = if names.is_empty() {
        analyzer.tables(&config.table_selection()?)?
    } else {
        names.to_vec()
    };
    if names.is_empty() {
        report.note("no tables selected");
    }
    batch.run(&analyzer, &names, report);
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn tables(
    _config: &Config,
    _database: &Path,
    _names: &[String],
    _batch: &mut Batch<'_>,
    _report: &mut BatchReport,
) -> anyhow::Result<()> {
    anyhow::bail!("gentests was built without sqlite support")
}

/// Run the model command.
pub fn run_model(args: &SubjectArgs) -> anyhow::Result<i32> {
    run_generation("model", &args.common, |config, batch, report| {
        let app = load_snapshot(&args.common)?;
        models(&app, &config.conventions(), &args.names, batch, report);
        Ok(())
    })
}

/// Run the controller command.
pub fn run_controller(args: &SubjectArgs) -> anyhow::Result<i32> {
    run_generation("controller", &args.common, |config, batch, report| {
        let app = load_snapshot(&args.common)?;
        controllers(&app, &config.conventions(), &args.names, batch, report);
        Ok(())
    })
}

/// Run the livewire command.
pub fn run_livewire(args: &SubjectArgs) -> anyhow::Result<i32> {
    run_generation("livewire", &args.common, |config, batch, report| {
        let app = load_snapshot(&args.common)?;
        let capabilities = Capabilities::resolve(&app);
        components(&app, &config.conventions(), &capabilities, &args.names, batch, report);
        Ok(())
    })
}

/// Run the filament command.
pub fn run_filament(args: &SubjectArgs) -> anyhow::Result<i32> {
    run_generation("filament", &args.common, |config, batch, report| {
        let app = load_snapshot(&args.common)?;
        let capabilities = Capabilities::resolve(&app);
        resources(&app, &config.conventions(), &capabilities, &args.names, batch, report);
        Ok(())
    })
}

/// Run the database command.
pub fn run_database(args: &DatabaseArgs) -> anyhow::Result<i32> {
    run_generation("database", &args.common, |config, batch, report| {
        let database = args
            .database
            .as_ref()
            .or(config.database.path.as_ref())
            .context("no database given (use --database or set database.path)")?;
        tables(config, database, &args.tables, batch, report)
    })
}

/// Run the all command.
pub fn run_all(args: &AllArgs) -> anyhow::Result<i32> {
    run_generation("all", &args.common, |config, batch, report| {
        let app = load_snapshot(&args.common)?;
        let conventions = config.conventions();
        let capabilities = Capabilities::resolve(&app);

        models(&app, &conventions, &[], batch, report);
        controllers(&app, &conventions, &[], batch, report);
        components(&app, &conventions, &capabilities, &[], batch, report);
        resources(&app, &conventions, &capabilities, &[], batch, report);

        match args.database.as_ref().or(config.database.path.as_ref()) {
            Some(database) => tables(config, database, &[], batch, report)?,
            None => report.note("no database configured; tables skipped"),
        }
        Ok(())
    })
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    let keep_existing = args.output.exists() && !args.force;
    if keep_existing && args.publish_stubs.is_none() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it");
        return Ok(EXIT_ERROR);
    }

    if keep_existing {
        println!("Keeping existing {}", args.output.display());
    } else {
        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && parent != Path::new(".") {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error: failed to create directory: {}", e);
                    return Ok(EXIT_ERROR);
                }
            }
        }
        if let Err(e) = std::fs::write(&args.output, DEFAULT_CONFIG) {
            eprintln!("Error: failed to write configuration: {}", e);
            return Ok(EXIT_ERROR);
        }
        println!("Created {}", args.output.display());
    }

    if let Some(dir) = &args.publish_stubs {
        let written = match stub::publish(dir, args.force) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        };
        println!("Published {} stub(s) to {}", written.len(), dir.display());
        println!("Set stubs_path: {} to use them", dir.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Export an application snapshot to {}", DEFAULT_SNAPSHOT_NAMES[0]);
    println!("  2. Run: gentests all");

    Ok(EXIT_SUCCESS)
}
