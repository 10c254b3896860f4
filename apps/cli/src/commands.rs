//! CLI definition, tracing setup, and the update command.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use readme_index_core::{ProgressReporter, UpdateConfig, UpdateReport, update_readme};
use readme_index_shared::{LinkBuilder, REPOSITORY_ENV, load_config, load_config_from};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// readme-index — regenerate the chapter tables in a study README.
#[derive(Parser, Debug)]
#[command(
    name = "readme-index",
    version,
    about = "Regenerate per-chapter contribution tables in README.md from <chapter>장/아이템_<item>/<title>_<author>.md files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Repository root to scan (defaults to the current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// README path relative to the root (overrides the config file).
    #[arg(long)]
    pub readme: Option<PathBuf>,

    /// Repository identifier (owner/repo) used in links.
    #[arg(long, env = REPOSITORY_ENV)]
    pub repository: Option<String>,

    /// Branch name used in links (overrides the config file).
    #[arg(long)]
    pub branch: Option<String>,

    /// Config file (defaults to <root>/readme-index.toml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Remove rows whose files no longer exist.
    #[arg(long)]
    pub prune: bool,

    /// Compute the update without writing the README.
    #[arg(long)]
    pub dry_run: bool,

    /// Fail if the README is out of date. Implies --dry-run.
    #[arg(long)]
    pub check: bool,

    /// Print the update report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so `--json` output stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "readme_index=info",
        1 => "readme_index=debug",
        _ => "readme_index=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Run the update with flags merged over the config file.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?,
    };

    let config = resolve_config(&cli, &root)?;

    info!(
        root = %root.display(),
        readme = %config.readme.display(),
        prune = config.prune,
        dry_run = config.dry_run,
        "updating README index"
    );

    let report = update_readme(&config, &CliProgress)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, cli.check);
    }

    if cli.check && report.changed {
        return Err(eyre!(
            "{} is out of date; run readme-index to regenerate it",
            report.readme.display()
        ));
    }

    Ok(())
}

/// Merge CLI flags over the config file: flags > environment > file > defaults.
fn resolve_config(cli: &Cli, root: &Path) -> Result<UpdateConfig> {
    let app = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(root)?,
    };

    let mut config = UpdateConfig::from_app_config(root, &app);

    if let Some(readme) = &cli.readme {
        config.readme = readme.clone();
    }

    let repository = cli.repository.clone().or(app.repository);
    let branch = cli.branch.clone().unwrap_or(app.branch);
    config.links = LinkBuilder::new(repository, branch);

    config.prune = cli.prune;
    config.dry_run = cli.dry_run || cli.check;

    Ok(config)
}

fn print_summary(report: &UpdateReport, check: bool) {
    let status = match (report.changed, report.written) {
        (false, _) => "up to date",
        (true, true) => "updated",
        (true, false) if check => "out of date",
        (true, false) => "would change (dry run)",
    };

    println!();
    println!("  README {status}: {}", report.readme.display());
    println!("  Files:    {}", report.files_scanned);
    println!("  Entries:  {} in {} chapter(s)", report.entries, report.chapters);
    println!("  Inserted: {}", report.stats.rows_inserted);
    println!("  Replaced: {}", report.stats.rows_replaced);
    if report.stats.tables_created > 0 {
        println!("  Tables:   {} created", report.stats.tables_created);
    }
    if report.stats.rows_pruned > 0 {
        println!("  Pruned:   {}", report.stats.rows_pruned);
    }
    if !report.skipped.is_empty() {
        println!("  Skipped:  {}", report.skipped.len());
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Prints one diagnostic line per malformed file on stderr.
struct CliProgress;

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        debug!(phase = name, "entering phase");
    }

    fn file_skipped(&self, path: &Path) {
        eprintln!(
            "  ! {} does not match <chapter>장/아이템_<item>/<title>_<author>.md, skipped",
            path.display()
        );
    }

    fn done(&self, _report: &UpdateReport) {}
}
