/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use mdi_core::{Environment, TradingCalendar};
use mdi_database_postgres::{PriceRepository, build_pool};
use mdi_pipeline::{Orchestrator, PipelineConfig, PipelineError, TriggerEvent};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
  /// Target environment (dev, test, prod); falls back to DEFAULT_SCHEMA
  #[arg(short, long)]
  pub environment: Option<Environment>,

  /// Logical date for the run (YYYY-MM-DD); defaults to today
  #[arg(short = 'd', long)]
  pub date: Option<NaiveDate>,

  /// Opaque scheduler run identifier, unique per run
  #[arg(long)]
  pub run_id: Option<String>,

  /// Parameter blob as JSON, as the scheduler would supply it
  #[arg(short, long)]
  pub params: Option<String>,

  /// Mark this run as a scheduler-driven invocation
  #[arg(long)]
  pub scheduled: bool,

  /// Mark this run as catch-up/backfill
  #[arg(long)]
  pub catchup: bool,

  /// Number of concurrent instrument workers
  #[arg(short, long)]
  pub workers: Option<usize>,

  /// Show a progress bar
  #[arg(long)]
  pub progress: bool,
}

/// Translate the invocation into one orchestrator run and report the
/// terminal status as a process exit code.
pub async fn execute(args: RunArgs, config: Config) -> Result<i32> {
  let environment = args.environment.unwrap_or(config.app.default_environment);
  let workers = args.workers.unwrap_or(config.app.workers);

  let params_blob: Option<serde_json::Value> = args
    .params
    .as_deref()
    .map(serde_json::from_str)
    .transpose()
    .context("params must be valid JSON")?;

  let pool = build_pool(&config.database_url, environment, config.pool_size(workers))
    .context("building database connection pool")?;
  let repository = Arc::new(PriceRepository::new(pool, environment));

  let pipeline_config = PipelineConfig {
    extractor: config.app.extractor.clone(),
    workers,
    show_progress: args.progress,
    ..PipelineConfig::default()
  };

  let event = TriggerEvent {
    environment,
    logical_date: args.date.unwrap_or_else(|| Local::now().date_naive()),
    scheduler_run_id: args.run_id,
    params_blob,
    manual: !args.scheduled,
    is_catchup: args.catchup,
  };

  info!(%environment, logical_date = %event.logical_date, "starting ingest run");

  let orchestrator = Orchestrator::new(repository, TradingCalendar::default(), pipeline_config);

  match orchestrator.run(&event).await {
    Ok(summary) => {
      info!(
        job_id = summary.job_id,
        status = %summary.status,
        processed = summary.counters.processed(),
        inserted = summary.counters.inserted,
        updated = summary.counters.updated,
        skipped = summary.counters.skipped,
        failed = summary.counters.failed,
        "run finished"
      );
      Ok(summary.exit_code())
    }
    Err(PipelineError::DuplicateRun(id)) => {
      error!(run_id = %id, "a job for this scheduler run id already exists");
      Ok(1)
    }
    Err(e) => Err(e.into()),
  }
}
