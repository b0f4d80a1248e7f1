//! # Lead Scorer: warehouse-native propensity scoring
//!
//! Orchestrates a four-step lead scoring pipeline on top of a managed data
//! warehouse (BigQuery ML). The warehouse does the heavy lifting: model
//! fitting, inference and ranking all run there. This crate renders the SQL,
//! runs the steps in order, and formats what comes back.
//!
//! ## Pipeline
//!
//! 1. **Train**: `CREATE OR REPLACE MODEL` over labelled conversions
//! 2. **Evaluate**: read precision, recall, accuracy, F1 and AUC
//! 3. **Score**: one `UPDATE` writing score, tier and timestamp onto every
//!    unconverted clinic
//! 4. **Report**: the top hot/warm prospects not contacted recently
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lead_scorer::config::PipelineConfig;
//! use lead_scorer::pipeline::Pipeline;
//! use lead_scorer::warehouse::BigQueryClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = PipelineConfig::from_file("scorer.yaml".as_ref())?;
//! config.apply_env()?;
//! config.validate()?;
//!
//! let warehouse = BigQueryClient::new(&config.warehouse);
//! let limit = config.scoring.limit;
//! let mut pipeline = Pipeline::new(warehouse, config, std::io::stdout());
//! let prospects = pipeline.run(limit).await?;
//! println!("{} prospects", prospects.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod clinic;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod run;
pub mod sql;
pub mod tier;
pub mod warehouse;

pub use error::{Error, Result};
