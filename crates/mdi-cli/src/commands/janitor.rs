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
use tracing::info;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct JanitorArgs {
  /// Target environment (dev, test, prod); falls back to DEFAULT_SCHEMA
  #[arg(short, long)]
  pub environment: Option<Environment>,

  /// Running jobs older than this many hours are marked failed
  #[arg(long, default_value = "2")]
  pub max_age_hours: i64,
}

/// Fail `running` jobs whose heartbeat window has lapsed.
///
/// A job left in `running` by a crashed process would otherwise block
/// nothing but confuse observers forever.
pub async fn execute(args: JanitorArgs, config: Config) -> Result<()> {
  let environment = args.environment.unwrap_or(config.app.default_environment);

  let pool = build_pool(&config.database_url, environment, 2)
    .context("building database connection pool")?;
  let repository = PriceRepository::new(pool, environment);

  let max_age = chrono::Duration::hours(args.max_age_hours);
  let swept = task::spawn_blocking(move || repository.mark_stale_jobs(max_age)).await??;

  info!(%environment, swept, "janitor sweep complete");
  println!("Marked {swept} stale job(s) as failed in {environment}");

  Ok(())
}
