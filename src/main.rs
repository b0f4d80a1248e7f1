//! Lead scorer CLI
//!
//! Trains, evaluates and applies the clinic propensity model in the
//! warehouse, then prints the prospects worth calling.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lead_scorer::clinic::ClinicRecord;
use lead_scorer::config::PipelineConfig;
use lead_scorer::export::write_export;
use lead_scorer::pipeline::Pipeline;
use lead_scorer::sql;
use lead_scorer::warehouse::{BigQueryClient, MemoryWarehouse, Warehouse};

#[derive(Parser)]
#[command(name = "lead-scorer")]
#[command(about = "Score sales leads with a warehouse-trained propensity model", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run against a built-in in-memory warehouse with sample clinics
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, evaluate, score and report (default if no command specified)
    Run {
        /// Number of prospects to report
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write the reported prospects and run record to this JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Create or replace the model only
    Train,

    /// Print evaluation metrics of the current model
    Evaluate,

    /// Score unconverted clinics with the current model
    Score,

    /// Print the top prospects from the last scoring pass
    Report {
        /// Number of prospects to report
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the generated SQL without submitting anything
    Plan {
        /// Report limit to render
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "lead_scorer=info".into()))
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref(), cli.offline)?;
    let command = cli.command.unwrap_or(Commands::Run {
        limit: None,
        export: None,
    });

    // Planning needs no warehouse connection
    if let Commands::Plan { limit } = command {
        return plan_command(&config, limit.unwrap_or(config.scoring.limit));
    }

    if cli.offline {
        info!("using in-memory warehouse with sample clinics");
        execute(sample_warehouse(), config, command).await
    } else {
        let warehouse = BigQueryClient::new(&config.warehouse);
        execute(warehouse, config, command).await
    }
}

fn load_config(path: Option<&PathBuf>, offline: bool) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;
    if offline && config.warehouse.project.is_empty() {
        config.warehouse.project = "offline".to_string();
    }
    config.validate().context("invalid configuration")?;
    info!(
        project = %config.warehouse.project,
        dataset = %config.warehouse.dataset,
        model = %config.tables.model_name,
        "loaded configuration"
    );
    Ok(config)
}

async fn execute<W: Warehouse>(
    warehouse: W,
    config: PipelineConfig,
    command: Commands,
) -> Result<()> {
    let default_limit = config.scoring.limit;
    let mut pipeline = Pipeline::new(warehouse, config, io::stdout());

    match command {
        Commands::Run { limit, export } => {
            let prospects = pipeline.run(limit.unwrap_or(default_limit)).await?;
            if let Some(path) = export {
                write_export(&path, pipeline.run_record(), &prospects)
                    .with_context(|| format!("failed to export to {}", path.display()))?;
                println!("📁 Exported {} prospects to {}", prospects.len(), path.display());
            }
        }
        Commands::Train => pipeline.train().await?,
        Commands::Evaluate => {
            pipeline.evaluate().await?;
        }
        Commands::Score => {
            pipeline.score().await?;
        }
        Commands::Report { limit } => {
            pipeline.report(limit.unwrap_or(default_limit)).await?;
        }
        Commands::Plan { .. } => unreachable!("plan runs before a warehouse is built"),
    }
    Ok(())
}

fn plan_command(config: &PipelineConfig, limit: usize) -> Result<()> {
    let mut out = io::stdout().lock();
    for statement in [
        sql::train_model(config),
        sql::evaluate_model(config),
        sql::score_clinics(config),
        sql::top_prospects(config, limit),
    ] {
        writeln!(out, "-- {}", statement.kind.label())?;
        writeln!(out, "{};\n", statement.sql)?;
    }
    Ok(())
}

/// A handful of clinics so `--offline` has something to rank.
fn sample_warehouse() -> MemoryWarehouse {
    let warehouse = MemoryWarehouse::new();
    let samples = [
        ("c-001", "Glow Med Spa", "Austin", "TX", 82.0, 4.8, 12, 5, 20, 14),
        ("c-002", "Radiance Aesthetics", "Denver", "CO", 74.0, 4.6, 6, 2, 10, 6),
        ("c-003", "Summit Wellness", "Boise", "ID", 51.0, 4.1, 3, 0, 4, 1),
        ("c-004", "Harbor Skin Clinic", "Tampa", "FL", 66.0, 4.4, 0, 0, 0, 0),
        ("c-005", "Elevate Vitality", "Scottsdale", "AZ", 90.0, 4.9, 8, 4, 12, 9),
    ];
    for (id, name, city, state, affluence, rating, outreach, responses, sent, opened) in samples {
        warehouse.insert_clinic(ClinicRecord {
            city: city.to_string(),
            state: state.to_string(),
            phone: Some(format!("+1 555 01{}", &id[2..])),
            email: Some(format!("info@{}.example", id)),
            affluence_score: affluence,
            rating,
            outreach_count: outreach,
            response_count: responses,
            emails_sent: sent,
            emails_opened: opened,
            ..ClinicRecord::new(id, name)
        });
    }
    warehouse
}
