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

//! Pipeline orchestrator
//!
//! The single coordinator for one run: calendar gate, job open,
//! per-instrument mode resolution, bounded fan-out, counter aggregation,
//! and the job's one terminal transition. Workers are fully isolated:
//! each owns its own provider client and its own transaction, and no
//! transaction is ever held across extractor network I/O.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use mdi_client::QuoteClient;
use mdi_core::{ExtractorConfig, InstrumentKind, JobStatus, TradingCalendar};
use mdi_database_postgres::models::{Instrument, NewPriceRow};
use mdi_database_postgres::{IngestRepository, RepositoryError, UpsertOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::job_tracker::{InstrumentReport, JobCounters, JobTracker};
use crate::mode::{ModePolicy, ResolvedMode, SchedulerContext, resolve_mode};
use crate::quality::{QualityChecker, QualityPolicy};
use crate::trigger::{RunParams, TriggerEvent};

/// One instrument in the configured universe.
#[derive(Debug, Clone)]
pub struct WatchItem {
  pub symbol: String,
  pub kind: InstrumentKind,
  pub currency: String,
}

impl WatchItem {
  pub fn new(symbol: &str, kind: InstrumentKind, currency: &str) -> Self {
    Self { symbol: symbol.to_string(), kind, currency: currency.to_string() }
  }
}

/// Orchestrator settings for one deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub job_name: String,
  pub exchange_code: String,
  pub instruments: Vec<WatchItem>,

  /// Worker pool ceiling; effective pool is min(instruments, workers)
  pub workers: usize,

  /// Per-instrument soft timeout
  pub soft_timeout: Duration,

  /// Whole-run hard deadline
  pub hard_deadline: Duration,

  /// Stored rows re-read per instrument for the quality rules
  pub quality_lookback: i64,

  pub show_progress: bool,
  pub mode_policy: ModePolicy,
  pub quality_policy: QualityPolicy,
  pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      job_name: "daily_ohlcv_ingest".to_string(),
      exchange_code: "WSE".to_string(),
      instruments: default_universe(),
      workers: mdi_core::DEFAULT_WORKERS,
      soft_timeout: Duration::from_secs(300),
      hard_deadline: Duration::from_secs(3600),
      quality_lookback: 60,
      show_progress: false,
      mode_policy: ModePolicy::default(),
      quality_policy: QualityPolicy::default(),
      extractor: ExtractorConfig::default(),
    }
  }
}

/// The fixed WSE universe tracked by default.
pub fn default_universe() -> Vec<WatchItem> {
  let stocks = ["XTB", "CDR", "PKO", "PKN", "ALE", "LPP", "KGH", "PZU", "PEO", "DNP"];
  let indices = ["WIG20", "WIG"];

  let mut items: Vec<WatchItem> =
    stocks.iter().map(|s| WatchItem::new(s, InstrumentKind::Stock, "PLN")).collect();
  items.extend(indices.iter().map(|s| WatchItem::new(s, InstrumentKind::Index, "PLN")));
  items
}

/// Everything the caller learns about one finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
  pub job_id: i64,
  pub status: JobStatus,
  pub counters: JobCounters,
}

impl RunSummary {
  pub fn exit_code(&self) -> i32 {
    self.status.exit_code()
  }
}

struct WorkUnit {
  instrument: Instrument,
  kind: InstrumentKind,
  mode: ResolvedMode,
}

/// Coordinates one pipeline invocation end to end.
pub struct Orchestrator {
  repository: Arc<dyn IngestRepository>,
  calendar: TradingCalendar,
  config: PipelineConfig,
}

impl Orchestrator {
  pub fn new(
    repository: Arc<dyn IngestRepository>,
    calendar: TradingCalendar,
    config: PipelineConfig,
  ) -> Self {
    Self { repository, calendar, config }
  }

  /// Execute one run for a scheduler event.
  pub async fn run(&self, event: &TriggerEvent) -> PipelineResult<RunSummary> {
    // Parameter validation happens before any database write
    let params = RunParams::parse(event.params_blob.as_ref())?;
    let target_date = params.effective_date(event.logical_date);

    let metadata = json!({
      "logical_date": event.logical_date.to_string(),
      "target_date": target_date.to_string(),
      "manual": event.manual,
      "catchup": event.is_catchup,
      "params": event.params_blob,
    });

    // Calendar gate: explicit history requests run regardless
    if !self.calendar.is_trading_day(target_date) && !params.bypasses_gate() {
      info!(%target_date, "calendar gate: not a trading day, skipping run");

      let tracker = JobTracker::open(
        self.repository.clone(),
        self.config.job_name.clone(),
        event.scheduler_run_id.clone(),
        Some(metadata),
      )
      .await?;
      tracker.finalize_skipped("calendar gate: not a trading day").await?;

      return Ok(RunSummary {
        job_id: tracker.job_id(),
        status: JobStatus::Skipped,
        counters: JobCounters::default(),
      });
    }

    let tracker = JobTracker::open(
      self.repository.clone(),
      self.config.job_name.clone(),
      event.scheduler_run_id.clone(),
      Some(metadata),
    )
    .await?;
    let job_id = tracker.job_id();

    let context = SchedulerContext {
      manual: event.manual,
      logical_date: event.logical_date,
      is_catchup: event.is_catchup,
    };

    // Precondition failures abort before any instrument work
    let work = match self.build_work_list(&params, &context, target_date).await {
      Ok(work) => work,
      Err(e) => {
        let reason = e.to_string();
        error!(job_id, %reason, "work list construction failed");
        tracker.finalize(JobStatus::Failed, &JobCounters::default(), Some(reason)).await?;
        return Err(e);
      }
    };

    info!(job_id, instruments = work.len(), "fanning out");
    let fan_out_result = self.fan_out(job_id, work).await;

    let (status, summary_text) = match &fan_out_result {
      FanOutResult::Finished(counters) => {
        let status = counters.final_status(self.config.quality_policy.max_error_verdicts);
        let text = (counters.instruments_failed > 0)
          .then(|| format!("{} instrument(s) failed", counters.instruments_failed));
        (status, text)
      }
      FanOutResult::DeadlineExceeded(counters) => {
        let status =
          if counters.instruments_ok > 0 { JobStatus::Partial } else { JobStatus::Failed };
        let text =
          format!("run deadline of {}s exceeded", self.config.hard_deadline.as_secs());
        warn!(job_id, %text, "abandoning stragglers");
        (status, Some(text))
      }
    };

    let counters = fan_out_result.into_counters();
    tracker.finalize(status, &counters, summary_text).await?;

    Ok(RunSummary { job_id, status, counters })
  }

  /// Resolve instruments and their extraction modes into a work list.
  async fn build_work_list(
    &self,
    params: &RunParams,
    context: &SchedulerContext,
    today: NaiveDate,
  ) -> PipelineResult<Vec<WorkUnit>> {
    let mut work = Vec::with_capacity(self.config.instruments.len());

    for item in &self.config.instruments {
      let repo = self.repository.clone();
      let symbol = item.symbol.clone();
      let kind = item.kind;
      let exchange = self.config.exchange_code.clone();
      let currency = item.currency.clone();

      let instrument = task::spawn_blocking(move || {
        repo.resolve_instrument(&symbol, kind, &exchange, &currency)
      })
      .await
      .map_err(|e| PipelineError::Worker(e.to_string()))??;

      let repo = self.repository.clone();
      let instrument_id = instrument.id;
      let state = task::spawn_blocking(move || repo.instrument_state(instrument_id))
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;

      let mode =
        resolve_mode(&item.symbol, params, context, &state, today, &self.config.mode_policy);

      debug!(
        symbol = %item.symbol,
        %mode,
        rows = state.row_count,
        max_date = ?state.max_date,
        "resolved extraction mode"
      );

      work.push(WorkUnit { instrument, kind: item.kind, mode });
    }

    Ok(work)
  }

  /// Run the worker pool and aggregate reports as workers return.
  async fn fan_out(&self, job_id: i64, work: Vec<WorkUnit>) -> FanOutResult {
    if work.is_empty() {
      return FanOutResult::Finished(JobCounters::default());
    }

    let worker_count = work.len().min(self.config.workers.max(1));
    let checker =
      QualityChecker::new(self.config.quality_policy.clone(), self.calendar.clone());

    let progress = if self.config.show_progress {
      let pb = ProgressBar::new(work.len() as u64);
      pb.set_style(
        ProgressStyle::default_bar()
          .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
          .unwrap()
          .progress_chars("##-"),
      );
      pb.set_message("Loading daily prices");
      Some(pb)
    } else {
      None
    };

    let mut counters = JobCounters::default();
    let deadline_hit = {
      let repository = &self.repository;
      let config = &self.config;
      let checker = &checker;
      let progress = &progress;
      let counters = &mut counters;

      let drain = async move {
        let mut reports = stream::iter(work.into_iter().map(|unit| {
          let repository = repository.clone();
          let extractor = config.extractor.clone();
          let checker = checker.clone();
          let soft_timeout = config.soft_timeout;
          let lookback = config.quality_lookback;

          process_instrument(repository, extractor, checker, job_id, unit, soft_timeout, lookback)
        }))
        .buffer_unordered(worker_count);

        while let Some(report) = reports.next().await {
          if let Some(pb) = progress {
            pb.set_message(report.symbol.clone());
            pb.inc(1);
          }
          counters.absorb(&report);
        }
      };

      // Expiry drops `drain`, aborting workers still in async I/O
      // (in-flight HTTP requests cancel with their futures). A worker
      // already inside its blocking load cannot be interrupted; the
      // repository refuses its writes once the job row leaves
      // `running`, so stragglers roll back instead of committing into
      // a finalized job.
      tokio::time::timeout(self.config.hard_deadline, drain).await.is_err()
    };

    if let Some(pb) = progress {
      pb.finish_with_message("Daily price ingest complete");
    }

    if deadline_hit {
      FanOutResult::DeadlineExceeded(counters)
    } else {
      FanOutResult::Finished(counters)
    }
  }
}

enum FanOutResult {
  Finished(JobCounters),
  DeadlineExceeded(JobCounters),
}

impl FanOutResult {
  fn into_counters(self) -> JobCounters {
    match self {
      FanOutResult::Finished(c) | FanOutResult::DeadlineExceeded(c) => c,
    }
  }
}

/// One worker: extract, load in an isolated transaction, quality-check.
async fn process_instrument(
  repository: Arc<dyn IngestRepository>,
  extractor: ExtractorConfig,
  checker: QualityChecker,
  job_id: i64,
  unit: WorkUnit,
  soft_timeout: Duration,
  quality_lookback: i64,
) -> InstrumentReport {
  let started = Instant::now();
  let symbol = unit.instrument.symbol.clone();
  let instrument_id = unit.instrument.id;

  // Each worker owns its client, so pacing is per extractor instance
  let client = match QuoteClient::new(&extractor) {
    Ok(client) => client,
    Err(e) => {
      return record_error(repository, job_id, instrument_id, symbol, e.to_string(), 0, started)
        .await;
    }
  };

  let batch =
    match tokio::time::timeout(soft_timeout, client.daily(&symbol, unit.kind, unit.mode.bound()))
      .await
    {
      Err(_) => {
        let reason = format!("soft timeout after {}s during extraction", soft_timeout.as_secs());
        return record_error(repository, job_id, instrument_id, symbol, reason, 0, started).await;
      }
      Ok(Err(e)) => {
        return record_error(repository, job_id, instrument_id, symbol, e.to_string(), 0, started)
          .await;
      }
      Ok(Ok(batch)) => batch,
    };

  let rejected = batch.rejected;

  // Last cancellation point before the transaction
  if started.elapsed() >= soft_timeout {
    let reason = format!("soft timeout after {}s before load", soft_timeout.as_secs());
    return record_error(repository, job_id, instrument_id, symbol, reason, rejected, started)
      .await;
  }

  let rows: Vec<NewPriceRow> = batch
    .records
    .iter()
    .map(|record| NewPriceRow {
      instrument_id,
      trading_date: record.date,
      open: record.open,
      high: record.high,
      low: record.low,
      close: record.close,
      volume: record.volume,
      raw_hash: record.raw_hash.clone(),
    })
    .collect();

  let elapsed_ms = started.elapsed().as_millis() as i64;
  let outcome = match load_with_retry(&repository, job_id, instrument_id, rows, elapsed_ms).await {
    Ok(outcome) => outcome,
    Err(LoadFailure::JobClosed) => {
      // The run was finalized while this load waited on the blocking
      // pool; nothing was committed and nobody is aggregating reports.
      warn!(%symbol, "job closed before load committed, dropping result");
      return InstrumentReport {
        symbol,
        result: Err("job closed before load committed".to_string()),
        rejected,
        quality_failed: 0,
        quality_errors: 0,
        elapsed_ms: started.elapsed().as_millis() as i64,
      };
    }
    Err(LoadFailure::Other(reason)) => {
      return record_error(repository, job_id, instrument_id, symbol, reason, rejected, started)
        .await;
    }
  };

  let (quality_failed, quality_errors) =
    run_quality_checks(&repository, &checker, job_id, instrument_id, quality_lookback).await;

  info!(
    %symbol,
    inserted = outcome.inserted,
    updated = outcome.updated,
    skipped = outcome.skipped,
    rejected,
    quality_failed,
    "instrument complete"
  );

  InstrumentReport {
    symbol,
    result: Ok(outcome),
    rejected,
    quality_failed,
    quality_errors,
    elapsed_ms: started.elapsed().as_millis() as i64,
  }
}

/// Why one instrument's load did not commit.
enum LoadFailure {
  /// The job reached its terminal state first; the write was refused
  JobClosed,

  /// Anything else worth an error detail row
  Other(String),
}

/// One transaction per instrument, retried once on transient database
/// failures. A load refused because the job already closed is final.
async fn load_with_retry(
  repository: &Arc<dyn IngestRepository>,
  job_id: i64,
  instrument_id: i32,
  rows: Vec<NewPriceRow>,
  elapsed_ms: i64,
) -> Result<UpsertOutcome, LoadFailure> {
  for attempt in 0..2 {
    let repo = repository.clone();
    let rows = rows.clone();

    let result = task::spawn_blocking(move || {
      repo.load_instrument_prices(job_id, instrument_id, rows, elapsed_ms)
    })
    .await;

    match result {
      Ok(Ok(outcome)) => return Ok(outcome),
      Ok(Err(RepositoryError::JobClosed(_))) => return Err(LoadFailure::JobClosed),
      Ok(Err(e)) if e.is_transient() && attempt == 0 => {
        warn!(instrument_id, error = %e, "transient database failure, retrying instrument");
      }
      Ok(Err(e)) => return Err(LoadFailure::Other(e.to_string())),
      Err(e) => return Err(LoadFailure::Other(format!("worker join error: {e}"))),
    }
  }

  Err(LoadFailure::Other("database retry exhausted".to_string()))
}

/// Re-read stored rows and append verdicts, best-effort.
async fn run_quality_checks(
  repository: &Arc<dyn IngestRepository>,
  checker: &QualityChecker,
  job_id: i64,
  instrument_id: i32,
  lookback: i64,
) -> (usize, usize) {
  let repo = repository.clone();
  let recent = task::spawn_blocking(move || repo.recent_prices(instrument_id, lookback)).await;

  match recent {
    Ok(Ok(stored_rows)) => {
      let report = checker.evaluate(job_id, instrument_id, &stored_rows);
      let failed = report.failed;
      let errors = report.errors;

      let repo = repository.clone();
      let verdicts = report.verdicts;
      if let Err(e) = task::spawn_blocking(move || repo.write_quality_verdicts(&verdicts)).await {
        warn!(instrument_id, error = %e, "quality verdict task failed");
      }

      (failed, errors)
    }
    Ok(Err(e)) => {
      warn!(instrument_id, error = %e, "could not re-read rows for quality checks");
      (0, 0)
    }
    Err(e) => {
      warn!(instrument_id, error = %e, "quality read task failed");
      (0, 0)
    }
  }
}

/// Record a failed instrument; its siblings keep running.
async fn record_error(
  repository: Arc<dyn IngestRepository>,
  job_id: i64,
  instrument_id: i32,
  symbol: String,
  reason: String,
  rejected: usize,
  started: Instant,
) -> InstrumentReport {
  error!(%symbol, %reason, "instrument failed");

  let elapsed_ms = started.elapsed().as_millis() as i64;
  let repo = repository.clone();
  let detail_reason = reason.clone();

  let write = task::spawn_blocking(move || {
    repo.record_instrument_error(job_id, instrument_id, &detail_reason, elapsed_ms)
  })
  .await;

  match write {
    Ok(Err(e)) => warn!(%symbol, error = %e, "could not record instrument error"),
    Err(e) => warn!(%symbol, error = %e, "error detail task failed"),
    Ok(Ok(())) => {}
  }

  InstrumentReport {
    symbol,
    result: Err(reason),
    rejected,
    quality_failed: 0,
    quality_errors: 0,
    elapsed_ms,
  }
}
