//! Marshal CLI - run the primitive marshaling fixture checks
//!
//! Commands:
//!   marshal check <module>  - Validate exports and run the conformance suite
//!   marshal exports         - List the entry points a fixture must export

use anyhow::Context;
use clap::{Parser, Subcommand};
use marshal::abi::{ScalarKind, EXPORTS};
use marshal::{HarnessConfig, Runtime, Suite};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "marshal")]
#[command(about = "Check that primitive values cross a WebAssembly call boundary intact")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a fixture module's exports and run the conformance suite
    Check {
        /// Path to the WASM module (.wasm or .wat)
        module: PathBuf,

        /// JSON harness configuration
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Only check these kinds (repeatable)
        #[arg(long = "only", value_name = "KIND")]
        only: Vec<String>,

        /// Stop at the first failing case
        #[arg(long)]
        fail_fast: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the entry points a fixture module must export
    Exports {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    marshal::logging::init_cli_logger(cli.verbose);

    match cli.command {
        Commands::Check {
            module,
            config,
            only,
            fail_fast,
            json,
        } => check_command(&module, config.as_deref(), &only, fail_fast, json),
        Commands::Exports { json } => exports_command(json),
    }
}

fn check_command(
    module_path: &Path,
    config_path: Option<&Path>,
    only: &[String],
    fail_fast: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => HarnessConfig::from_path(path)?,
        None => HarnessConfig::default(),
    };
    if !only.is_empty() {
        config.kinds = only
            .iter()
            .map(|name| {
                ScalarKind::from_name(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown kind '{}'", name))
            })
            .collect::<anyhow::Result<_>>()?;
    }
    config.fail_fast |= fail_fast;
    config.validate()?;

    let wasm_bytes = std::fs::read(module_path)
        .with_context(|| format!("Failed to read {}", module_path.display()))?;

    let runtime = Runtime::new();
    let module = runtime
        .load_module(&wasm_bytes)
        .with_context(|| format!("Failed to load {}", module_path.display()))?;
    let mut instance = module.instantiate()?;

    if config.validate_exports {
        instance
            .validate_exports(&config.kinds)
            .context("module does not implement the fixture exports")?;
        info!(kinds = config.kinds.len(), "exports validated");
    }

    let report = Suite::new(config).run(&mut instance);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if !report.is_success() {
        anyhow::bail!("{} of {} cases failed", report.failed(), report.cases.len());
    }
    Ok(())
}

fn exports_command(json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&EXPORTS)?);
        return Ok(());
    }

    for kind in ScalarKind::ALL {
        println!("{}:", kind);
        for export in EXPORTS.iter().filter(|e| e.kind == kind) {
            println!(
                "  {:<24} {:<14} {}",
                export.name, export.convention, export.signature
            );
        }
    }
    Ok(())
}
