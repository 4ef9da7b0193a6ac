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

//! Idempotent persistence for prices, jobs, and quality verdicts
//!
//! One repository serves one (database, environment) pair; the pool it
//! wraps stamps every connection with that environment's schema. The
//! loader path runs one transaction per instrument per run, spanning the
//! price upserts and the matching job-detail row. Quality verdicts are
//! written outside that transaction, best-effort.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use mdi_core::{Environment, InstrumentKind, JobStatus, Operation};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::connection::{PgPool, PgPooledConnection};
use crate::models::{
  EtlJob, Exchange, Instrument, JobCounterColumns, NewEtlJob, NewJobDetail, NewPriceRow,
  NewQualityVerdict, PriceRow,
};

#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("Connection pool error: {0}")]
  Pool(String),

  #[error("Database error: {0}")]
  Database(#[from] diesel::result::Error),

  #[error("Duplicate scheduler run id: {0}")]
  DuplicateRun(String),

  #[error("Job {0} already finalized")]
  AlreadyFinalized(i64),

  #[error("Job {0} is no longer running")]
  JobClosed(i64),

  #[error("Unknown exchange code: {0}")]
  UnknownExchange(String),

  #[error("Job status '{0}' is not terminal")]
  NonTerminalStatus(String),
}

impl RepositoryError {
  /// Whether retrying the enclosing instrument once is worthwhile.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      RepositoryError::Pool(_)
        | RepositoryError::Database(diesel::result::Error::DatabaseError(
          DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
          _,
        ))
    )
  }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository state feeding the mode resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentState {
  pub row_count: i64,
  pub max_date: Option<NaiveDate>,
}

/// Result of one instrument's price load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
  pub inserted: usize,
  pub updated: usize,
  pub skipped: usize,
}

impl UpsertOutcome {
  pub fn affected(&self) -> usize {
    self.inserted + self.updated
  }

  pub fn processed(&self) -> usize {
    self.inserted + self.updated + self.skipped
  }
}

/// Incoming rows split against the stored hashes.
#[derive(Debug, Clone, Default)]
pub struct PartitionedRows {
  pub to_insert: Vec<NewPriceRow>,
  pub to_update: Vec<NewPriceRow>,
  pub skipped: usize,
}

/// Split incoming rows by comparing content hashes with storage.
///
/// Unseen dates insert; a matching stored hash skips; a differing hash
/// updates (a provider restatement). Pure so the idempotence law is
/// testable without a database.
pub fn partition_rows(
  rows: Vec<NewPriceRow>,
  stored: &HashMap<NaiveDate, String>,
) -> PartitionedRows {
  let mut partitioned = PartitionedRows::default();

  for row in rows {
    match stored.get(&row.trading_date) {
      None => partitioned.to_insert.push(row),
      Some(hash) if *hash == row.raw_hash => partitioned.skipped += 1,
      Some(_) => partitioned.to_update.push(row),
    }
  }

  partitioned
}

/// The operation label recorded on a job-detail row.
pub fn dominant_operation(outcome: &UpsertOutcome) -> Operation {
  if outcome.inserted > 0 {
    Operation::Insert
  } else if outcome.updated > 0 {
    Operation::Update
  } else {
    Operation::Skip
  }
}

/// High-level persistence operations over one environment's schema.
pub struct PriceRepository {
  pool: PgPool,
  environment: Environment,
}

impl PriceRepository {
  pub fn new(pool: PgPool, environment: Environment) -> Self {
    Self { pool, environment }
  }

  pub fn environment(&self) -> Environment {
    self.environment
  }

  fn conn(&self) -> RepositoryResult<PgPooledConnection> {
    self.pool.get().map_err(|e| RepositoryError::Pool(e.to_string()))
  }

  /// Insert-if-absent lookup of an instrument id; idempotent.
  pub fn resolve_instrument(
    &self,
    symbol: &str,
    kind: InstrumentKind,
    exchange_code: &str,
    currency: &str,
  ) -> RepositoryResult<Instrument> {
    let mut conn = self.conn()?;

    let exchange = Exchange::find_by_code(&mut conn, exchange_code)?
      .ok_or_else(|| RepositoryError::UnknownExchange(exchange_code.to_string()))?;

    Ok(Instrument::find_or_create(&mut conn, symbol, kind.as_str(), exchange.id, currency)?)
  }

  /// Row count and newest trading date for the mode resolver.
  pub fn instrument_state(&self, instrument_id: i32) -> RepositoryResult<InstrumentState> {
    let mut conn = self.conn()?;
    let (row_count, max_date) = PriceRow::state_for_instrument(&mut conn, instrument_id)?;
    Ok(InstrumentState { row_count, max_date })
  }

  /// Open a job row in `running` state.
  ///
  /// A second run carrying the same scheduler run id trips the unique
  /// index and is reported as [`RepositoryError::DuplicateRun`].
  pub fn open_job(
    &self,
    job_name: &str,
    scheduler_run_id: Option<&str>,
    metadata: Option<serde_json::Value>,
  ) -> RepositoryResult<EtlJob> {
    let mut conn = self.conn()?;

    let result = NewEtlJob {
      job_name,
      environment: self.environment.as_str(),
      scheduler_run_id,
      started_at: Utc::now(),
      status: JobStatus::Running.as_str(),
      metadata,
    }
    .insert(&mut conn);

    match result {
      Ok(job) => Ok(job),
      Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
        Err(RepositoryError::DuplicateRun(scheduler_run_id.unwrap_or("<none>").to_string()))
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Load one instrument's validated rows in a single transaction.
  ///
  /// The transaction spans the price upserts, the instrument's seen
  /// window, and the matching job-detail row, so observable progress and
  /// data stay consistent. Rows are written ascending by date.
  ///
  /// The transaction first takes the job's row lock and confirms the
  /// job is still `running`; a straggler worker whose run was already
  /// finalized (the whole-run deadline fired while this load sat on the
  /// blocking pool) rolls back and surfaces
  /// [`RepositoryError::JobClosed`] instead of committing into a closed
  /// job.
  pub fn load_instrument_prices(
    &self,
    job_id: i64,
    instrument_id: i32,
    mut rows: Vec<NewPriceRow>,
    processing_ms: i64,
  ) -> RepositoryResult<UpsertOutcome> {
    rows.sort_by_key(|r| r.trading_date);

    let mut conn = self.conn()?;

    let result = conn.transaction::<UpsertOutcome, diesel::result::Error, _>(|conn| {
      if !EtlJob::lock_running(conn, job_id)? {
        return Err(diesel::result::Error::RollbackTransaction);
      }

      if rows.is_empty() {
        NewJobDetail {
          job_id,
          instrument_id,
          operation: Operation::Skip.as_str(),
          records_affected: 0,
          processing_ms,
          error_text: None,
        }
        .insert(conn)?;
        return Ok(UpsertOutcome::default());
      }

      let earliest = rows[0].trading_date;
      let latest = rows[rows.len() - 1].trading_date;

      let stored: HashMap<NaiveDate, String> =
        PriceRow::stored_hashes(conn, instrument_id, earliest, latest)?.into_iter().collect();

      let partitioned = partition_rows(rows, &stored);

      let inserted = NewPriceRow::bulk_insert(conn, &partitioned.to_insert)?;

      let mut updated = 0;
      for row in &partitioned.to_update {
        updated += row.apply_update(conn)?;
      }

      Instrument::advance_seen_window(conn, instrument_id, earliest, latest)?;

      let outcome = UpsertOutcome { inserted, updated, skipped: partitioned.skipped };

      NewJobDetail {
        job_id,
        instrument_id,
        operation: dominant_operation(&outcome).as_str(),
        records_affected: outcome.affected() as i32,
        processing_ms,
        error_text: None,
      }
      .insert(conn)?;

      Ok(outcome)
    });

    let outcome = match result {
      Ok(outcome) => outcome,
      Err(diesel::result::Error::RollbackTransaction) => {
        warn!(job_id, instrument_id, "job closed before load committed, rolled back");
        return Err(RepositoryError::JobClosed(job_id));
      }
      Err(e) => return Err(e.into()),
    };

    debug!(
      job_id,
      instrument_id,
      inserted = outcome.inserted,
      updated = outcome.updated,
      skipped = outcome.skipped,
      "instrument load committed"
    );

    Ok(outcome)
  }

  /// Record a failed instrument outside any price transaction.
  ///
  /// No detail row is written once the job has left `running`; a
  /// straggler error report for a finalized job is dropped.
  pub fn record_instrument_error(
    &self,
    job_id: i64,
    instrument_id: i32,
    reason: &str,
    processing_ms: i64,
  ) -> RepositoryResult<()> {
    let mut conn = self.conn()?;

    let written = conn.transaction::<bool, diesel::result::Error, _>(|conn| {
      if !EtlJob::lock_running(conn, job_id)? {
        return Ok(false);
      }

      NewJobDetail {
        job_id,
        instrument_id,
        operation: Operation::Error.as_str(),
        records_affected: 0,
        processing_ms,
        error_text: Some(reason),
      }
      .insert(conn)?;

      Ok(true)
    })?;

    if !written {
      warn!(job_id, instrument_id, "job closed, dropping instrument error detail");
    }

    Ok(())
  }

  /// Append quality verdicts, best-effort.
  ///
  /// A failing verdict write never invalidates committed prices; the
  /// error is logged and the count written so far is returned. Verdicts
  /// for a job that has left `running` are dropped.
  pub fn write_quality_verdicts(&self, verdicts: &[NewQualityVerdict]) -> usize {
    let Some(first) = verdicts.first() else {
      return 0;
    };
    let job_id = first.job_id;

    let mut conn = match self.conn() {
      Ok(conn) => conn,
      Err(e) => {
        warn!(error = %e, "could not persist quality verdicts");
        return 0;
      }
    };

    let result = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
      if !EtlJob::lock_running(conn, job_id)? {
        return Ok(0);
      }
      NewQualityVerdict::bulk_insert(conn, verdicts)
    });

    match result {
      Ok(0) => {
        warn!(job_id, "job closed, dropping quality verdicts");
        0
      }
      Ok(written) => written,
      Err(e) => {
        warn!(error = %e, "quality verdict write failed");
        0
      }
    }
  }

  /// Apply the job's single terminal transition.
  pub fn finalize_job(
    &self,
    job_id: i64,
    status: JobStatus,
    counters: JobCounterColumns,
    error_summary: Option<&str>,
  ) -> RepositoryResult<()> {
    if !status.is_terminal() {
      return Err(RepositoryError::NonTerminalStatus(status.to_string()));
    }

    let mut conn = self.conn()?;
    let affected = EtlJob::finalize(&mut conn, job_id, status.as_str(), counters, error_summary)?;

    if affected == 0 {
      return Err(RepositoryError::AlreadyFinalized(job_id));
    }

    Ok(())
  }

  /// The most recent `limit` stored rows, ascending, for quality checks.
  pub fn recent_prices(&self, instrument_id: i32, limit: i64) -> RepositoryResult<Vec<PriceRow>> {
    let mut conn = self.conn()?;
    Ok(PriceRow::recent(&mut conn, instrument_id, limit)?)
  }

  /// Recent job rows, newest first.
  pub fn recent_jobs(&self, limit: i64) -> RepositoryResult<Vec<EtlJob>> {
    let mut conn = self.conn()?;
    Ok(EtlJob::recent(&mut conn, limit)?)
  }

  /// Janitor: fail `running` jobs whose heartbeat window has lapsed.
  pub fn mark_stale_jobs(&self, max_age: chrono::Duration) -> RepositoryResult<usize> {
    let cutoff = Utc::now() - max_age;
    let mut conn = self.conn()?;

    let stale = EtlJob::stale_running(&mut conn, cutoff)?;
    let mut failed = 0;

    for job in stale {
      let affected = EtlJob::finalize(
        &mut conn,
        job.id,
        JobStatus::Failed.as_str(),
        JobCounterColumns::default(),
        Some("janitor: no heartbeat within the expected window"),
      )?;
      failed += affected;
    }

    Ok(failed)
  }
}

/// The repository surface one pipeline run consumes.
///
/// Abstracted as a trait so orchestration can run against a test double;
/// implementations must refuse every write once the owning job has left
/// `running`, the contract the deadline handling relies on.
pub trait IngestRepository: Send + Sync {
  fn resolve_instrument(
    &self,
    symbol: &str,
    kind: InstrumentKind,
    exchange_code: &str,
    currency: &str,
  ) -> RepositoryResult<Instrument>;

  fn instrument_state(&self, instrument_id: i32) -> RepositoryResult<InstrumentState>;

  fn open_job(
    &self,
    job_name: &str,
    scheduler_run_id: Option<&str>,
    metadata: Option<serde_json::Value>,
  ) -> RepositoryResult<EtlJob>;

  fn load_instrument_prices(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: Vec<NewPriceRow>,
    processing_ms: i64,
  ) -> RepositoryResult<UpsertOutcome>;

  fn record_instrument_error(
    &self,
    job_id: i64,
    instrument_id: i32,
    reason: &str,
    processing_ms: i64,
  ) -> RepositoryResult<()>;

  fn write_quality_verdicts(&self, verdicts: &[NewQualityVerdict]) -> usize;

  fn finalize_job(
    &self,
    job_id: i64,
    status: JobStatus,
    counters: JobCounterColumns,
    error_summary: Option<&str>,
  ) -> RepositoryResult<()>;

  fn recent_prices(&self, instrument_id: i32, limit: i64) -> RepositoryResult<Vec<PriceRow>>;
}

impl IngestRepository for PriceRepository {
  fn resolve_instrument(
    &self,
    symbol: &str,
    kind: InstrumentKind,
    exchange_code: &str,
    currency: &str,
  ) -> RepositoryResult<Instrument> {
    PriceRepository::resolve_instrument(self, symbol, kind, exchange_code, currency)
  }

  fn instrument_state(&self, instrument_id: i32) -> RepositoryResult<InstrumentState> {
    PriceRepository::instrument_state(self, instrument_id)
  }

  fn open_job(
    &self,
    job_name: &str,
    scheduler_run_id: Option<&str>,
    metadata: Option<serde_json::Value>,
  ) -> RepositoryResult<EtlJob> {
    PriceRepository::open_job(self, job_name, scheduler_run_id, metadata)
  }

  fn load_instrument_prices(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: Vec<NewPriceRow>,
    processing_ms: i64,
  ) -> RepositoryResult<UpsertOutcome> {
    PriceRepository::load_instrument_prices(self, job_id, instrument_id, rows, processing_ms)
  }

  fn record_instrument_error(
    &self,
    job_id: i64,
    instrument_id: i32,
    reason: &str,
    processing_ms: i64,
  ) -> RepositoryResult<()> {
    PriceRepository::record_instrument_error(self, job_id, instrument_id, reason, processing_ms)
  }

  fn write_quality_verdicts(&self, verdicts: &[NewQualityVerdict]) -> usize {
    PriceRepository::write_quality_verdicts(self, verdicts)
  }

  fn finalize_job(
    &self,
    job_id: i64,
    status: JobStatus,
    counters: JobCounterColumns,
    error_summary: Option<&str>,
  ) -> RepositoryResult<()> {
    PriceRepository::finalize_job(self, job_id, status, counters, error_summary)
  }

  fn recent_prices(&self, instrument_id: i32, limit: i64) -> RepositoryResult<Vec<PriceRow>> {
    PriceRepository::recent_prices(self, instrument_id, limit)
  }
}
