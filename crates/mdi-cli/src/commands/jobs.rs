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
use clap::Args;
use mdi_core::Environment;
use mdi_database_postgres::{PriceRepository, build_pool};
use tokio::task;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct JobsArgs {
  /// Target environment (dev, test, prod); falls back to DEFAULT_SCHEMA
  #[arg(short, long)]
  pub environment: Option<Environment>,

  /// How many recent jobs to show
  #[arg(short, long, default_value = "20")]
  pub limit: i64,
}

/// List recent pipeline jobs for one environment.
pub async fn execute(args: JobsArgs, config: Config) -> Result<()> {
  let environment = args.environment.unwrap_or(config.app.default_environment);

  let pool = build_pool(&config.database_url, environment, 2)
    .context("building database connection pool")?;
  let repository = PriceRepository::new(pool, environment);

  let limit = args.limit;
  let jobs = task::spawn_blocking(move || repository.recent_jobs(limit)).await??;

  if jobs.is_empty() {
    println!("No jobs recorded in {environment}");
    return Ok(());
  }

  println!(
    "{:>8}  {:<10}  {:<20}  {:>9}  {:>8}  {:>8}  {:>8}  {:>7}  finished",
    "id", "status", "started", "processed", "inserted", "updated", "skipped", "failed"
  );

  for job in jobs {
    let finished =
      job.finished_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()).unwrap_or_default();

    println!(
      "{:>8}  {:<10}  {:<20}  {:>9}  {:>8}  {:>8}  {:>8}  {:>7}  {}",
      job.id,
      job.status,
      job.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
      job.records_processed,
      job.records_inserted,
      job.records_updated,
      job.records_skipped,
      job.records_failed,
      finished,
    );
  }

  Ok(())
}
