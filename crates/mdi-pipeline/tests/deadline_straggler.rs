//! Hard-deadline straggler behavior.
//!
//! When the whole-run deadline fires, workers still in async I/O are
//! cancelled with the fan-out future, but a worker already inside its
//! blocking database load keeps running on the blocking pool. The
//! repository contract closes that hole: any write for a job that has
//! left `running` is refused. The fake repository here enforces exactly
//! the check the Postgres implementation performs inside the load
//! transaction, so the race is exercised without a database.

use chrono::{Local, NaiveDate, Utc};
use mdi_core::{ExtractorConfig, InstrumentKind, JobStatus, TradingCalendar};
use mdi_database_postgres::models::{
  EtlJob, Instrument, JobCounterColumns, NewPriceRow, NewQualityVerdict, PriceRow,
};
use mdi_database_postgres::{
  IngestRepository, InstrumentState, RepositoryError, RepositoryResult, UpsertOutcome,
};
use mdi_pipeline::{Orchestrator, PipelineConfig, TriggerEvent, WatchItem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory repository honoring the refuse-after-finalize contract.
struct FakeRepository {
  load_delay: Duration,
  finalized: Mutex<Option<JobStatus>>,
  details: Mutex<Vec<String>>,
  refused_loads: AtomicUsize,
}

impl FakeRepository {
  fn new(load_delay: Duration) -> Self {
    Self {
      load_delay,
      finalized: Mutex::new(None),
      details: Mutex::new(Vec::new()),
      refused_loads: AtomicUsize::new(0),
    }
  }

  fn is_finalized(&self) -> bool {
    self.finalized.lock().unwrap().is_some()
  }

  fn final_status(&self) -> Option<JobStatus> {
    *self.finalized.lock().unwrap()
  }

  fn detail_operations(&self) -> Vec<String> {
    self.details.lock().unwrap().clone()
  }
}

impl IngestRepository for FakeRepository {
  fn resolve_instrument(
    &self,
    symbol: &str,
    kind: InstrumentKind,
    _exchange_code: &str,
    currency: &str,
  ) -> RepositoryResult<Instrument> {
    Ok(Instrument {
      id: 1,
      symbol: symbol.to_string(),
      kind: kind.as_str().to_string(),
      exchange_id: 1,
      currency: currency.to_string(),
      is_active: true,
      first_seen: None,
      last_seen: None,
      created_at: Utc::now(),
    })
  }

  fn instrument_state(&self, _instrument_id: i32) -> RepositoryResult<InstrumentState> {
    // Healthy state so the run resolves to incremental
    Ok(InstrumentState { row_count: 1000, max_date: Some(Local::now().date_naive()) })
  }

  fn open_job(
    &self,
    job_name: &str,
    scheduler_run_id: Option<&str>,
    metadata: Option<serde_json::Value>,
  ) -> RepositoryResult<EtlJob> {
    Ok(EtlJob {
      id: 1,
      job_name: job_name.to_string(),
      environment: "test".to_string(),
      scheduler_run_id: scheduler_run_id.map(str::to_string),
      started_at: Utc::now(),
      finished_at: None,
      status: "running".to_string(),
      records_processed: 0,
      records_inserted: 0,
      records_updated: 0,
      records_skipped: 0,
      records_failed: 0,
      quality_failed: 0,
      error_summary: None,
      metadata,
    })
  }

  fn load_instrument_prices(
    &self,
    job_id: i64,
    _instrument_id: i32,
    rows: Vec<NewPriceRow>,
    _processing_ms: i64,
  ) -> RepositoryResult<UpsertOutcome> {
    std::thread::sleep(self.load_delay);

    // The check the Postgres load performs inside its transaction
    if self.is_finalized() {
      self.refused_loads.fetch_add(1, Ordering::SeqCst);
      return Err(RepositoryError::JobClosed(job_id));
    }

    self.details.lock().unwrap().push("insert".to_string());
    Ok(UpsertOutcome { inserted: rows.len(), updated: 0, skipped: 0 })
  }

  fn record_instrument_error(
    &self,
    _job_id: i64,
    _instrument_id: i32,
    _reason: &str,
    _processing_ms: i64,
  ) -> RepositoryResult<()> {
    if self.is_finalized() {
      return Ok(());
    }
    self.details.lock().unwrap().push("error".to_string());
    Ok(())
  }

  fn write_quality_verdicts(&self, _verdicts: &[NewQualityVerdict]) -> usize {
    0
  }

  fn finalize_job(
    &self,
    job_id: i64,
    status: JobStatus,
    _counters: JobCounterColumns,
    _error_summary: Option<&str>,
  ) -> RepositoryResult<()> {
    let mut finalized = self.finalized.lock().unwrap();
    if finalized.is_some() {
      return Err(RepositoryError::AlreadyFinalized(job_id));
    }
    *finalized = Some(status);
    Ok(())
  }

  fn recent_prices(&self, _instrument_id: i32, _limit: i64) -> RepositoryResult<Vec<PriceRow>> {
    Ok(Vec::new())
  }
}

fn csv_body() -> String {
  let yesterday = Local::now().date_naive() - chrono::Duration::days(1);
  format!("Date,Open,High,Low,Close,Volume\n{yesterday},6.40,6.55,6.35,6.50,98000\n")
}

fn pipeline_config(provider_url: &str) -> PipelineConfig {
  PipelineConfig {
    instruments: vec![WatchItem::new("XTB", InstrumentKind::Stock, "PLN")],
    workers: 1,
    soft_timeout: Duration::from_secs(10),
    extractor: ExtractorConfig {
      base_url: format!("{provider_url}/q/d/l/"),
      min_delay_secs: 0.0,
      timeout_secs: 5,
      max_retries: 1,
      backoff_base_ms: 10,
    },
    ..PipelineConfig::default()
  }
}

fn trigger_event() -> TriggerEvent {
  TriggerEvent {
    environment: "test".parse().unwrap(),
    // A regular Friday session, so the calendar gate passes
    logical_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
    scheduler_run_id: Some("deadline-test".to_string()),
    params_blob: None,
    manual: true,
    is_catchup: false,
  }
}

/// A load that outlives the hard deadline must not land a row in the
/// finalized job: the orchestrator closes the job, and the straggler's
/// commit is refused when it finally wakes up.
#[tokio::test(flavor = "multi_thread")]
async fn straggler_load_cannot_write_after_finalize() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(200).set_body_string(csv_body()))
    .mount(&server)
    .await;

  let fake = Arc::new(FakeRepository::new(Duration::from_millis(600)));

  let mut config = pipeline_config(&server.uri());
  config.hard_deadline = Duration::from_millis(200);

  let orchestrator =
    Orchestrator::new(fake.clone(), TradingCalendar::default(), config);
  let summary = orchestrator.run(&trigger_event()).await.unwrap();

  // The deadline fired with zero finished instruments
  assert_eq!(summary.status, JobStatus::Failed);
  assert_eq!(summary.counters.instruments_ok, 0);
  assert_eq!(fake.final_status(), Some(JobStatus::Failed));

  // Let the detached blocking load run to completion, then observe
  // that its write was refused rather than committed
  tokio::time::sleep(Duration::from_millis(800)).await;

  assert_eq!(fake.refused_loads.load(Ordering::SeqCst), 1);
  assert!(
    fake.detail_operations().is_empty(),
    "straggler wrote a job detail into a finalized job"
  );
}

/// Control case: with a fast load the same setup commits its detail row
/// and finalizes completed.
#[tokio::test(flavor = "multi_thread")]
async fn fast_load_commits_before_the_deadline() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(200).set_body_string(csv_body()))
    .mount(&server)
    .await;

  let fake = Arc::new(FakeRepository::new(Duration::ZERO));

  let orchestrator = Orchestrator::new(
    fake.clone(),
    TradingCalendar::default(),
    pipeline_config(&server.uri()),
  );
  let summary = orchestrator.run(&trigger_event()).await.unwrap();

  assert_eq!(summary.status, JobStatus::Completed);
  assert_eq!(summary.counters.inserted, 1);
  assert_eq!(fake.final_status(), Some(JobStatus::Completed));
  assert_eq!(fake.detail_operations(), vec!["insert".to_string()]);
  assert_eq!(fake.refused_loads.load(Ordering::SeqCst), 0);
}
