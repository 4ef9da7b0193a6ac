//! Scenario tests for the decision and aggregation seams of a run.
//!
//! These exercise the pure pipeline layers end to end: parameter
//! parsing, gate decisions, per-instrument mode resolution, and counter
//! aggregation into a terminal job status. Provider and database I/O
//! have their own tests next to the client and repository code.

use chrono::NaiveDate;
use mdi_core::{FetchBound, JobStatus};
use mdi_database_postgres::{InstrumentState, UpsertOutcome};
use mdi_pipeline::{
  InstrumentReport, JobCounters, ModePolicy, ResolvedMode, RunParams, SchedulerContext,
  resolve_mode,
};
use serde_json::json;

fn trading_day() -> NaiveDate {
  // A regular Friday session
  NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn context(date: NaiveDate) -> SchedulerContext {
  SchedulerContext { manual: false, logical_date: date, is_catchup: false }
}

fn report(symbol: &str, outcome: UpsertOutcome, rejected: usize) -> InstrumentReport {
  InstrumentReport {
    symbol: symbol.to_string(),
    result: Ok(outcome),
    rejected,
    quality_failed: 0,
    quality_errors: 0,
    elapsed_ms: 40,
  }
}

fn error_report(symbol: &str, reason: &str) -> InstrumentReport {
  InstrumentReport {
    symbol: symbol.to_string(),
    result: Err(reason.to_string()),
    rejected: 0,
    quality_failed: 0,
    quality_errors: 0,
    elapsed_ms: 11,
  }
}

/// Fresh incremental on a trading day: empty state escalates both
/// instruments to deep history and the job completes.
#[test]
fn fresh_incremental_escalates_to_deep_history() {
  let params = RunParams::parse(Some(&json!({"extraction_mode": "smart"}))).unwrap();
  let empty = InstrumentState { row_count: 0, max_date: None };
  let policy = ModePolicy::default();

  for symbol in ["XTB", "CDR"] {
    let mode =
      resolve_mode(symbol, &params, &context(trading_day()), &empty, trading_day(), &policy);
    assert_eq!(mode, ResolvedMode::Historical(1000));
    assert_eq!(mode.bound(), FetchBound::LastN(1000));
  }

  let mut counters = JobCounters::default();
  counters.absorb(&report("XTB", UpsertOutcome { inserted: 1000, updated: 0, skipped: 0 }, 0));
  counters.absorb(&report("CDR", UpsertOutcome { inserted: 1000, updated: 0, skipped: 0 }, 0));

  assert_eq!(counters.final_status(25), JobStatus::Completed);
  assert_eq!(counters.processed(), 2000);
  assert_eq!(counters.inserted, 2000);
  assert_eq!(counters.updated, 0);
}

/// Re-running the same day against healthy state resolves incremental
/// and the hash-matched row counts as a skip.
#[test]
fn rerun_same_day_is_incremental_and_skips() {
  let params = RunParams::parse(None).unwrap();
  let healthy = InstrumentState { row_count: 1000, max_date: Some(trading_day()) };
  let policy = ModePolicy::default();

  let mode =
    resolve_mode("XTB", &params, &context(trading_day()), &healthy, trading_day(), &policy);
  assert_eq!(mode, ResolvedMode::Incremental);
  assert_eq!(mode.bound(), FetchBound::LatestOnly);

  let mut counters = JobCounters::default();
  counters.absorb(&report("XTB", UpsertOutcome { inserted: 0, updated: 0, skipped: 1 }, 0));

  assert_eq!(counters.final_status(25), JobStatus::Completed);
  assert_eq!(counters.processed(), 1);
  assert_eq!(counters.inserted, 0);
  assert_eq!(counters.skipped, 1);
}

/// A restated close on an overlapping historical window produces
/// updates, not inserts.
#[test]
fn overlapping_correction_updates() {
  let blob = json!({"extraction_mode": "historical", "instruments": {"A": "historical"}});
  let params = RunParams::parse(Some(&blob)).unwrap();
  let healthy = InstrumentState { row_count: 1000, max_date: Some(trading_day()) };
  let policy = ModePolicy::default();

  // Layer 1 for A, layer 2 for B: both land on historical(500)
  let mode_a =
    resolve_mode("A", &params, &context(trading_day()), &healthy, trading_day(), &policy);
  let mode_b =
    resolve_mode("B", &params, &context(trading_day()), &healthy, trading_day(), &policy);
  assert_eq!(mode_a, ResolvedMode::Historical(500));
  assert_eq!(mode_b, ResolvedMode::Historical(500));

  let mut counters = JobCounters::default();
  counters.absorb(&report("A", UpsertOutcome { inserted: 0, updated: 1, skipped: 499 }, 0));
  counters.absorb(&report("B", UpsertOutcome { inserted: 0, updated: 0, skipped: 500 }, 0));

  assert_eq!(counters.final_status(25), JobStatus::Completed);
  assert!(counters.updated >= 1);
}

/// The weekend gate applies unless the run explicitly asks for history.
#[test]
fn weekend_gate_and_explicit_bypass() {
  let saturday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
  let calendar = mdi_core::TradingCalendar::default();

  assert!(!calendar.is_trading_day(saturday));

  let empty = RunParams::parse(None).unwrap();
  assert!(!empty.bypasses_gate());

  let incremental =
    RunParams::parse(Some(&json!({"extraction_mode": "incremental"}))).unwrap();
  assert!(!incremental.bypasses_gate());

  let backfill =
    RunParams::parse(Some(&json!({"extraction_mode": "full_backfill"}))).unwrap();
  assert!(backfill.bypasses_gate());

  // target_date steers the gate away from the logical date
  let redirected = RunParams::parse(Some(&json!({"target_date": "2024-06-14"}))).unwrap();
  assert!(calendar.is_trading_day(redirected.effective_date(saturday)));
}

/// One malformed instrument leaves its siblings durable and the job
/// partial, with counters satisfying the processed identity.
#[test]
fn partial_failure_keeps_siblings() {
  let mut counters = JobCounters::default();
  counters.absorb(&report("XTB", UpsertOutcome { inserted: 1, updated: 0, skipped: 0 }, 0));
  counters.absorb(&error_report("CDR", "missing required column: volume"));
  counters.absorb(&report("PKO", UpsertOutcome { inserted: 0, updated: 0, skipped: 1 }, 0));

  assert_eq!(counters.final_status(25), JobStatus::Partial);
  assert_eq!(counters.instruments_ok, 2);
  assert_eq!(counters.instruments_failed, 1);
  assert_eq!(
    counters.processed(),
    counters.inserted + counters.updated + counters.skipped + counters.failed
  );
}

/// Full backfill twice: the second pass is all skips and changes no
/// counters except skipped.
#[test]
fn full_backfill_replay_is_idempotent() {
  let params = RunParams::parse(Some(&json!({"extraction_mode": "full_backfill"}))).unwrap();
  let policy = ModePolicy::default();
  let any_state = InstrumentState { row_count: 5000, max_date: Some(trading_day()) };

  let mode =
    resolve_mode("XTB", &params, &context(trading_day()), &any_state, trading_day(), &policy);
  assert_eq!(mode, ResolvedMode::FullBackfill);
  assert_eq!(mode.bound(), FetchBound::All);

  let mut first = JobCounters::default();
  first.absorb(&report("XTB", UpsertOutcome { inserted: 5000, updated: 0, skipped: 0 }, 0));
  assert_eq!(first.final_status(25), JobStatus::Completed);
  assert_eq!(first.inserted, 5000);

  let mut second = JobCounters::default();
  second.absorb(&report("XTB", UpsertOutcome { inserted: 0, updated: 0, skipped: 5000 }, 0));
  assert_eq!(second.final_status(25), JobStatus::Completed);
  assert_eq!(second.inserted, 0);
  assert_eq!(second.updated, 0);
  assert_eq!(second.skipped, 5000);
}

/// Catch-up runs escalate incremental decisions but leave explicit
/// overrides untouched.
#[test]
fn catchup_escalation_respects_overrides() {
  let healthy = InstrumentState { row_count: 1000, max_date: Some(trading_day()) };
  let policy = ModePolicy::default();
  let catchup =
    SchedulerContext { manual: false, logical_date: trading_day(), is_catchup: true };

  let bare = RunParams::parse(None).unwrap();
  let escalated = resolve_mode("XTB", &bare, &catchup, &healthy, trading_day(), &policy);
  assert_eq!(escalated, ResolvedMode::Historical(500));

  let explicit =
    RunParams::parse(Some(&json!({"extraction_mode": "incremental"}))).unwrap();
  let pinned = resolve_mode("XTB", &explicit, &catchup, &healthy, trading_day(), &policy);
  assert_eq!(pinned, ResolvedMode::Incremental);
}

/// Instrument order never changes per-instrument decisions.
#[test]
fn resolution_is_order_independent() {
  let params = RunParams::parse(Some(&json!({"instruments": {"CDR": "full_backfill"}}))).unwrap();
  let policy = ModePolicy::default();
  let state = InstrumentState { row_count: 40, max_date: Some(trading_day()) };

  let forward: Vec<ResolvedMode> = ["XTB", "CDR", "PKO"]
    .iter()
    .map(|s| resolve_mode(s, &params, &context(trading_day()), &state, trading_day(), &policy))
    .collect();

  let mut reversed: Vec<ResolvedMode> = ["PKO", "CDR", "XTB"]
    .iter()
    .map(|s| resolve_mode(s, &params, &context(trading_day()), &state, trading_day(), &policy))
    .collect();
  reversed.reverse();

  assert_eq!(forward, reversed);
  assert_eq!(forward[1], ResolvedMode::FullBackfill);
}
