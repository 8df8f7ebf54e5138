//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use epicreport_artifacts::ArtifactMeta;
use epicreport_core::pipeline::{GenerateConfig, GenerateResult, ProgressReporter, Summary};
use epicreport_fetcher::{AzureDevOpsSource, SnapshotSource, WorkItemSource};
use epicreport_render::OutputFormat;
use epicreport_shared::{AppConfig, Epic, EpicQuery, init_config, load_config, read_pat};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// epicreport: epic status reports from Azure DevOps Boards.
#[derive(Parser)]
#[command(
    name = "epicreport",
    version,
    about = "Generate epic status reports (Markdown, JSON, Word) from Azure DevOps Boards.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which epics to report on and where to read them from.
///
/// Unset flags fall back to `~/.epicreport/epicreport.toml`, then defaults.
#[derive(Args, Debug, Clone)]
pub(crate) struct SelectionArgs {
    /// Azure DevOps organization.
    #[arg(long, env = "EPICREPORT_ORGANIZATION")]
    pub organization: Option<String>,

    /// Azure DevOps project.
    #[arg(long)]
    pub project: Option<String>,

    /// Area path, e.g. `One\CloudInit`.
    #[arg(long)]
    pub area_path: Option<String>,

    /// Iteration path, e.g. `One\Bromine`.
    #[arg(long)]
    pub iteration_path: Option<String>,

    /// Read epics from a JSON snapshot instead of the live API.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch epics and write the status report.
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output format: md, json, word, or all.
        #[arg(short, long)]
        format: Option<String>,

        /// Output directory for report files.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Project name used in the title and file names.
        #[arg(long)]
        project_name: Option<String>,
    },

    /// Fetch and classify epics, print counts, write nothing.
    Summary {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "epicreport=info",
        1 => "epicreport=debug",
        _ => "epicreport=trace",
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
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            selection,
            format,
            out,
            project_name,
        } => cmd_generate(&selection, format.as_deref(), out, project_name).await,
        Command::Summary { selection, json } => cmd_summary(&selection, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Source selection
// ---------------------------------------------------------------------------

/// The source chosen for this run.
enum Source {
    Azure(AzureDevOpsSource),
    Snapshot(SnapshotSource),
}

impl WorkItemSource for Source {
    fn describe(&self) -> String {
        match self {
            Self::Azure(s) => s.describe(),
            Self::Snapshot(s) => s.describe(),
        }
    }

    async fn fetch_epics(&self, query: &EpicQuery) -> epicreport_shared::Result<Vec<Epic>> {
        match self {
            Self::Azure(s) => s.fetch_epics(query).await,
            Self::Snapshot(s) => s.fetch_epics(query).await,
        }
    }
}

/// Apply selection flags on top of the loaded config.
fn apply_selection(config: &mut AppConfig, selection: &SelectionArgs) {
    let ado = &mut config.azure_devops;
    if let Some(org) = &selection.organization {
        ado.organization = org.clone();
    }
    if let Some(project) = &selection.project {
        ado.project = project.clone();
    }
    if let Some(area) = &selection.area_path {
        ado.area_path = area.clone();
    }
    if let Some(iteration) = &selection.iteration_path {
        ado.iteration_path = iteration.clone();
    }
}

fn open_source(config: &AppConfig, selection: &SelectionArgs) -> Result<Source> {
    if let Some(path) = &selection.input {
        if !path.is_file() {
            return Err(eyre!("snapshot file '{}' does not exist", path.display()));
        }
        return Ok(Source::Snapshot(SnapshotSource::new(path.clone())));
    }

    let pat = read_pat(&config.azure_devops)?;
    Ok(Source::Azure(AzureDevOpsSource::new(&config.azure_devops, pat)?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    selection: &SelectionArgs,
    format: Option<&str>,
    out: Option<PathBuf>,
    project_name: Option<String>,
) -> Result<()> {
    let mut config = load_config()?;
    apply_selection(&mut config, selection);

    let formats = OutputFormat::parse_selection(format.unwrap_or(&config.defaults.format))?;
    let output_dir = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    let project_name = project_name.unwrap_or_else(|| config.report.project_name.clone());

    let source = open_source(&config, selection)?;

    let generate_config = GenerateConfig {
        project_name,
        query: config.azure_devops.query(),
        formats,
        output_dir,
    };

    info!(
        source = %source.describe(),
        area = %generate_config.query.area_path,
        iteration = %generate_config.query.iteration_path,
        "generating report"
    );

    let reporter = CliProgress::new();
    let result = epicreport_core::generate_report(&source, &generate_config, &reporter).await;
    if result.is_err() {
        reporter.spinner.finish_and_clear();
    }
    let result = result?;

    println!();
    println!("  Report generated!");
    println!("  Epics:     {} analyzed", result.counts.total);
    println!(
        "  Buckets:   {} active/committed, {} new, {} other",
        result.counts.active_committed, result.counts.new, result.counts.other
    );
    println!("  Children:  {}", result.counts.child_items);
    if result.counts.removed > 0 {
        println!("  Removed:   {} excluded", result.counts.removed);
    }
    for file in &result.files {
        println!(
            "  File:      {} ({} bytes, sha256 {})",
            file.path.display(),
            file.size_bytes,
            &file.sha256[..12]
        );
    }
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_summary(selection: &SelectionArgs, json: bool) -> Result<()> {
    let mut config = load_config()?;
    apply_selection(&mut config, selection);

    let source = open_source(&config, selection)?;
    let query = config.azure_devops.query();

    info!(source = %source.describe(), area = %query.area_path, "summarizing epics");
    let summary = epicreport_core::summarize(&source, &query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &query);
    }
    Ok(())
}

fn print_summary(summary: &Summary, query: &EpicQuery) {
    let counts = &summary.counts;
    println!();
    println!("  Source:     {}", summary.source);
    println!("  Area:       {}", query.area_path);
    println!("  Iteration:  {}", query.iteration_path);
    println!();
    println!("  Epics:      {}", counts.total);
    for (state, count) in &summary.states {
        println!("    {state:<12} {count}");
    }
    println!();
    println!("  Active/Committed: {}", counts.active_committed);
    println!("  New:              {}", counts.new);
    println!("  Other:            {}", counts.other);
    println!("  Removed:          {}", counts.removed);
    println!("  Child items:      {}", counts.child_items);
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }
    println!();
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn epics_fetched(&self, count: usize) {
        self.spinner.set_message(format!("Fetched {count} epics"));
    }

    fn file_written(&self, meta: &ArtifactMeta) {
        self.spinner.set_message(format!("Wrote {}", meta.filename));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "epicreport",
            "-v",
            "generate",
            "--area-path",
            "One\\CloudInit",
            "--format",
            "all",
            "--input",
            "snapshot.json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Generate {
                selection, format, ..
            } => {
                assert_eq!(selection.area_path.as_deref(), Some("One\\CloudInit"));
                assert_eq!(format.as_deref(), Some("all"));
                assert_eq!(selection.input, Some(PathBuf::from("snapshot.json")));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn selection_overrides_config() {
        let mut config = AppConfig::default();
        let selection = SelectionArgs {
            organization: Some("contoso".into()),
            project: None,
            area_path: Some("Fabrikam\\Platform".into()),
            iteration_path: None,
            input: None,
        };
        apply_selection(&mut config, &selection);

        assert_eq!(config.azure_devops.organization, "contoso");
        assert_eq!(config.azure_devops.project, "One");
        assert_eq!(config.azure_devops.area_path, "Fabrikam\\Platform");
        assert_eq!(config.azure_devops.iteration_path, "One\\Bromine");
    }

    #[test]
    fn missing_snapshot_is_rejected_before_fetch() {
        let selection = SelectionArgs {
            organization: None,
            project: None,
            area_path: None,
            iteration_path: None,
            input: Some(PathBuf::from("/nonexistent/epicreport.json")),
        };
        assert!(open_source(&AppConfig::default(), &selection).is_err());
    }
}
