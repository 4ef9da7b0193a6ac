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

//! Job lifecycle tracking: open, aggregate, finalize
//!
//! One tracker owns one job row. Workers report per-instrument results
//! as values; the orchestrator aggregates them here after each worker
//! returns, so no counter state is contended during the run.

use mdi_core::JobStatus;
use mdi_database_postgres::models::JobCounterColumns;
use mdi_database_postgres::{IngestRepository, UpsertOutcome};
use std::sync::Arc;
use tokio::task;
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

/// What one worker hands back to the orchestrator.
#[derive(Debug)]
pub struct InstrumentReport {
  pub symbol: String,

  /// Commit outcome, or the reason the instrument failed
  pub result: Result<UpsertOutcome, String>,

  /// Provider rows dropped by validation
  pub rejected: usize,

  /// Failing quality verdicts for this instrument
  pub quality_failed: usize,

  /// Failing quality verdicts at error severity
  pub quality_errors: usize,

  pub elapsed_ms: i64,
}

/// Aggregate run counters, owned by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounters {
  pub inserted: usize,
  pub updated: usize,
  pub skipped: usize,

  /// Record-level rejects across all instruments
  pub failed: usize,

  pub instruments_ok: usize,
  pub instruments_failed: usize,

  pub quality_failed: usize,
  pub quality_errors: usize,
}

impl JobCounters {
  /// `processed = inserted + updated + skipped + failed`, by definition.
  pub fn processed(&self) -> usize {
    self.inserted + self.updated + self.skipped + self.failed
  }

  /// Fold one worker's report into the run totals.
  pub fn absorb(&mut self, report: &InstrumentReport) {
    match &report.result {
      Ok(outcome) => {
        self.inserted += outcome.inserted;
        self.updated += outcome.updated;
        self.skipped += outcome.skipped;
        self.instruments_ok += 1;
      }
      Err(_) => {
        self.instruments_failed += 1;
      }
    }

    self.failed += report.rejected;
    self.quality_failed += report.quality_failed;
    self.quality_errors += report.quality_errors;
  }

  /// Terminal status implied by the aggregated results.
  pub fn final_status(&self, max_error_verdicts: usize) -> JobStatus {
    if self.instruments_failed > 0 && self.instruments_ok == 0 {
      JobStatus::Failed
    } else if self.instruments_failed > 0 {
      JobStatus::Partial
    } else if self.quality_errors > max_error_verdicts {
      JobStatus::Partial
    } else {
      JobStatus::Completed
    }
  }

  pub fn to_columns(&self) -> JobCounterColumns {
    JobCounterColumns {
      processed: self.processed() as i32,
      inserted: self.inserted as i32,
      updated: self.updated as i32,
      skipped: self.skipped as i32,
      failed: self.failed as i32,
      quality_failed: self.quality_failed as i32,
    }
  }
}

/// Tracks exactly one job row from open to its single terminal write.
pub struct JobTracker {
  repository: Arc<dyn IngestRepository>,
  job_id: i64,
}

impl JobTracker {
  /// Insert the job row in `running` state.
  ///
  /// A duplicate scheduler run id surfaces as
  /// [`PipelineError::DuplicateRun`] before any instrument work starts.
  pub async fn open(
    repository: Arc<dyn IngestRepository>,
    job_name: String,
    scheduler_run_id: Option<String>,
    metadata: Option<serde_json::Value>,
  ) -> PipelineResult<Self> {
    let repo = repository.clone();
    let job = task::spawn_blocking(move || {
      repo.open_job(&job_name, scheduler_run_id.as_deref(), metadata)
    })
    .await
    .map_err(|e| PipelineError::Worker(e.to_string()))??;

    info!(job_id = job.id, environment = %job.environment, "job opened");
    Ok(Self { repository, job_id: job.id })
  }

  pub fn job_id(&self) -> i64 {
    self.job_id
  }

  /// Apply the job's one terminal transition.
  pub async fn finalize(
    &self,
    status: JobStatus,
    counters: &JobCounters,
    error_summary: Option<String>,
  ) -> PipelineResult<()> {
    let repo = self.repository.clone();
    let job_id = self.job_id;
    let columns = counters.to_columns();

    task::spawn_blocking(move || {
      repo.finalize_job(job_id, status, columns, error_summary.as_deref())
    })
    .await
    .map_err(|e| PipelineError::Worker(e.to_string()))??;

    info!(job_id, %status, processed = counters.processed(), "job finalized");
    Ok(())
  }

  /// Gate outcome: the run never touched prices.
  pub async fn finalize_skipped(&self, reason: &str) -> PipelineResult<()> {
    self.finalize(JobStatus::Skipped, &JobCounters::default(), Some(reason.to_string())).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ok_report(inserted: usize, updated: usize, skipped: usize, rejected: usize) -> InstrumentReport {
    InstrumentReport {
      symbol: "XTB".to_string(),
      result: Ok(UpsertOutcome { inserted, updated, skipped }),
      rejected,
      quality_failed: 0,
      quality_errors: 0,
      elapsed_ms: 12,
    }
  }

  fn failed_report() -> InstrumentReport {
    InstrumentReport {
      symbol: "CDR".to_string(),
      result: Err("provider returned malformed CSV".to_string()),
      rejected: 0,
      quality_failed: 0,
      quality_errors: 0,
      elapsed_ms: 3,
    }
  }

  #[test]
  fn test_processed_identity() {
    let mut counters = JobCounters::default();
    counters.absorb(&ok_report(10, 2, 3, 1));

    assert_eq!(counters.processed(), 16);
    assert_eq!(counters.processed(), counters.inserted + counters.updated + counters.skipped + counters.failed);
  }

  #[test]
  fn test_all_ok_is_completed() {
    let mut counters = JobCounters::default();
    counters.absorb(&ok_report(10, 0, 0, 0));
    counters.absorb(&ok_report(0, 0, 1, 0));

    assert_eq!(counters.final_status(25), JobStatus::Completed);
    assert_eq!(counters.instruments_ok, 2);
  }

  #[test]
  fn test_mixed_results_are_partial() {
    let mut counters = JobCounters::default();
    counters.absorb(&ok_report(10, 0, 0, 0));
    counters.absorb(&failed_report());

    assert_eq!(counters.final_status(25), JobStatus::Partial);
    assert_eq!(counters.instruments_failed, 1);
  }

  #[test]
  fn test_all_failed_is_failed() {
    let mut counters = JobCounters::default();
    counters.absorb(&failed_report());
    counters.absorb(&failed_report());

    assert_eq!(counters.final_status(25), JobStatus::Failed);
  }

  #[test]
  fn test_zero_instruments_is_completed() {
    let counters = JobCounters::default();
    assert_eq!(counters.final_status(25), JobStatus::Completed);
  }

  #[test]
  fn test_quality_errors_demote_to_partial() {
    let mut counters = JobCounters::default();
    counters.absorb(&ok_report(10, 0, 0, 0));
    counters.quality_errors = 26;
    counters.quality_failed = 26;

    assert_eq!(counters.final_status(25), JobStatus::Partial);
    // At or below the threshold the job stays completed
    counters.quality_errors = 25;
    assert_eq!(counters.final_status(25), JobStatus::Completed);
  }

  #[test]
  fn test_to_columns_carries_the_identity() {
    let mut counters = JobCounters::default();
    counters.absorb(&ok_report(5, 1, 2, 3));

    let columns = counters.to_columns();
    assert_eq!(columns.processed, 11);
    assert_eq!(columns.inserted, 5);
    assert_eq!(columns.updated, 1);
    assert_eq!(columns.skipped, 2);
    assert_eq!(columns.failed, 3);
  }

  #[test]
  fn test_rejects_count_even_on_failed_instrument() {
    let mut counters = JobCounters::default();
    counters.absorb(&InstrumentReport {
      symbol: "PKN".to_string(),
      result: Err("timeout".to_string()),
      rejected: 2,
      quality_failed: 0,
      quality_errors: 0,
      elapsed_ms: 1,
    });

    assert_eq!(counters.failed, 2);
    assert_eq!(counters.instruments_failed, 1);
  }
}
