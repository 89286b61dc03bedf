//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use leadgen_core::pipeline;
use leadgen_core::report::{self, ReportConfig};
use leadgen_dataflow::{DependencyGraph, ModuleSpec};
use leadgen_shared::{AppConfig, DataFlowConfig, MergeOptions, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// leadgen: reconcile claims gathered by upstream research steps.
#[derive(Parser)]
#[command(
    name = "leadgen",
    version,
    about = "Merge step-produced claims with reconciliation patches and inspect module data flow.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Apply patches to claim batches and write a merge report.
    Merge {
        /// JSON array of `{ step, claims }` batches.
        #[arg(long)]
        claims: PathBuf,

        /// JSON array of reconciliation patches.
        #[arg(long)]
        patches: PathBuf,

        /// Report directory (defaults to <report.output_dir>/<run id>).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail if any patch is skipped or only partially applied.
        #[arg(long)]
        strict: bool,

        /// Print the merge result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Analyse `{{module.field}}` references between workflow modules.
    Deps {
        /// JSON array of `{ id, texts }` modules.
        #[arg(long)]
        modules: PathBuf,

        /// Bottleneck threshold (strictly more consumers than this).
        #[arg(long)]
        threshold: Option<usize>,

        /// Root module id, never reported as unreferenced.
        #[arg(long)]
        root: Option<String>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadgen=info",
        1 => "leadgen=debug",
        _ => "leadgen=trace",
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Merge {
            claims,
            patches,
            out,
            strict,
            json,
        } => cmd_merge(&claims, &patches, out.as_deref(), strict, json),
        Command::Deps {
            modules,
            threshold,
            root,
        } => cmd_deps(&modules, threshold, root),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_merge(
    claims: &Path,
    patches: &Path,
    out: Option<&Path>,
    strict: bool,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let mut options = MergeOptions::from(&config);
    options.strict |= strict;

    let (batches, patch_list) = pipeline::load_inputs(claims, patches)?;
    let run = pipeline::run(&batches, &patch_list, &options)
        .wrap_err("merge refused in strict mode")?;

    let report_config = ReportConfig::default();
    let report_dir = match out {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(&config.report.output_dir).join(report_config.run_id.to_string()),
    };
    let written = report::write_report(&report_dir, &run, &report_config)?;

    info!(run_id = %written.manifest.id, path = %written.dir.display(), "merge complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&run.result)?);
        return Ok(());
    }

    let summary = &run.result.application_summary;
    println!();
    println!("  Merge complete");
    println!("  Run:         {}", written.manifest.id);
    println!("  Input:       {} claims", summary.total_input_claims);
    println!("  Patches:     {}", summary.patches_applied);
    println!(
        "  Operations:  {} merges, {} invalidations, {} conflicts, {} enhancements",
        summary.merges, summary.invalidations, summary.conflicts_flagged, summary.enhancements
    );
    println!("  Surviving:   {} claims", summary.final_claim_count);
    println!("  Report:      {}", written.dir.display());

    if !run.diagnostics().is_empty() {
        println!();
        println!("  {} patch(es) not fully applied:", run.diagnostics().len());
        for diagnostic in run.diagnostics() {
            println!("    {diagnostic}");
        }
    }
    let lost: Vec<_> = run.lost_claims().collect();
    if !lost.is_empty() {
        println!();
        println!("  {} input claim(s) overwritten at ingestion:", lost.len());
        for note in lost {
            println!("    {note:?}");
        }
    }
    println!();

    Ok(())
}

fn cmd_deps(modules: &Path, threshold: Option<usize>, root: Option<String>) -> Result<()> {
    let config = load_config()?;
    let mut flow = DataFlowConfig::from(&config);
    if let Some(threshold) = threshold {
        flow.bottleneck_threshold = threshold;
    }
    if let Some(root) = root {
        flow.root_module_id = root;
    }

    let content = std::fs::read_to_string(modules)
        .wrap_err_with(|| format!("cannot read {}", modules.display()))?;
    let specs: Vec<ModuleSpec> = serde_json::from_str(&content)
        .wrap_err("modules must be a JSON array of { id, texts }")?;

    let report = DependencyGraph::from_modules(&specs).report(&flow);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
