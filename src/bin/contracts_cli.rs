use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use module_contracts::config::{EngineKind, HarnessConfig};
use module_contracts::engine::PlanDriver;
use module_contracts::fixtures::{self, FixtureCatalog, FixtureStore};
use module_contracts::scenario::{run_scenarios, RunSummary, ScenarioCatalog, ScenarioStatus};
use module_contracts::value::Value;

#[derive(Parser, Debug)]
#[command(
    name = "contracts_cli",
    about = "Input-variable contract scenarios for provisioning modules"
)]
struct Cli {
    /// Configuration file (defaults to ./contracts.json when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory with additional `<name>.fixture.json` files
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run catalog scenarios and report pass/fail per scenario
    Run {
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Only scenarios whose id or module contains this text
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        engine: Option<EngineKind>,
        #[arg(long)]
        modules_root: Option<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List scenarios in the catalog
    ListScenarios {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List built-in and on-disk fixtures
    ListFixtures,
    /// Print one fixture as JSON
    ShowFixture { name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = HarnessConfig::load_from_file(path);
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => HarnessConfig::load(),
    };
    let fixture_catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_default();
    let store = fixtures::builtin()
        .merged_with(&fixture_catalog)
        .with_context(|| format!("loading fixtures from {}", fixture_catalog.root().display()))?;

    match cli.command {
        Commands::Run {
            catalog,
            filter,
            engine,
            modules_root,
            jobs,
            format,
        } => {
            if let Some(kind) = engine {
                config.engine.kind = kind;
            }
            if let Some(root) = modules_root {
                config.modules_root = root;
            }
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            let catalog = load_catalog(catalog.or_else(|| config.catalog.clone()), &store)?;
            run_catalog(&config, &catalog, &store, filter.as_deref(), format)
        }
        Commands::ListScenarios { catalog } => {
            let catalog = load_catalog(catalog.or_else(|| config.catalog.clone()), &store)?;
            for scenario in &catalog.scenarios {
                println!(
                    "{}\t{}\t{}",
                    scenario.id,
                    scenario.module,
                    scenario.fixture.as_deref().unwrap_or("-")
                );
            }
            Ok(ExitCode::from(0))
        }
        Commands::ListFixtures => {
            for name in store.names() {
                println!("{name}");
            }
            Ok(ExitCode::from(0))
        }
        Commands::ShowFixture { name } => {
            let fixture = store.require(&name)?;
            let json = serde_json::to_string_pretty(&Value::Map(fixture.clone()))?;
            println!("{json}");
            Ok(ExitCode::from(0))
        }
    }
}

fn load_catalog(path: Option<PathBuf>, store: &FixtureStore) -> Result<ScenarioCatalog> {
    match path {
        Some(path) => ScenarioCatalog::load_from_file(&path, store),
        None => ScenarioCatalog::embedded(),
    }
}

fn run_catalog(
    config: &HarnessConfig,
    catalog: &ScenarioCatalog,
    store: &FixtureStore,
    filter: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let selected = catalog.select(filter);
    if selected.is_empty() {
        anyhow::bail!("no scenarios match filter {:?}", filter.unwrap_or_default());
    }

    let driver = PlanDriver::from_config(config);
    let summary = run_scenarios(&selected, &driver, store, config.worker_count());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary.to_json())?),
        OutputFormat::Table => print_table(&summary),
    }

    if summary.all_passed() {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(2))
    }
}

fn print_table(summary: &RunSummary) {
    for report in &summary.reports {
        let label = match report.status {
            ScenarioStatus::Passed => "PASS ",
            ScenarioStatus::Failed => "FAIL ",
            ScenarioStatus::Fatal => "FATAL",
        };
        println!(
            "{label} {} ({}) {}ms",
            report.id, report.module, report.duration_ms
        );
        for failure in &report.failures {
            println!("      - [{}] {}", failure.code, failure.message);
        }
    }
    println!(
        "{} passed, {} failed, {} fatal ({} engine)",
        summary.passed, summary.failed, summary.fatal, summary.backend
    );
}
