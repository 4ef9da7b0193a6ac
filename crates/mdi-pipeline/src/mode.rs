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

//! Extraction-mode resolution
//!
//! The decision procedure is layered, first match wins, evaluated
//! independently per instrument:
//!
//! 1. per-symbol override from the run parameters
//! 2. concrete global `extraction_mode`
//! 3. repository state (empty, stale, thin, or healthy)
//! 4. catch-up escalation of an incremental choice
//! 5. safety default: incremental
//!
//! Centralized here as one pure function so the whole procedure is
//! unit-testable without a scheduler or a database.

use chrono::NaiveDate;
use mdi_core::{ExtractionMode, FetchBound};
use mdi_database_postgres::InstrumentState;

use crate::trigger::RunParams;

/// Tunable sentinels for the state-based layer.
#[derive(Debug, Clone)]
pub struct ModePolicy {
  /// History depth for empty or thin instruments
  pub deep_rows: u32,

  /// History depth for stale instruments and catch-up escalation
  pub refresh_rows: u32,

  /// Below this row count the instrument is considered thin
  pub min_row_count: i64,

  /// A max date older than this many calendar days is stale
  pub staleness_days: i64,
}

impl Default for ModePolicy {
  fn default() -> Self {
    Self { deep_rows: 1000, refresh_rows: 500, min_row_count: 30, staleness_days: 7 }
  }
}

/// Scheduler-supplied run context.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerContext {
  /// Manually triggered rather than scheduled
  pub manual: bool,

  /// The scheduler's logical date for this run
  pub logical_date: NaiveDate,

  /// Whether this run replays a missed interval
  pub is_catchup: bool,
}

/// The concrete extraction decision for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
  Incremental,
  Historical(u32),
  FullBackfill,
}

impl ResolvedMode {
  /// The provider bound this mode maps to.
  pub fn bound(&self) -> FetchBound {
    match self {
      ResolvedMode::Incremental => FetchBound::LatestOnly,
      ResolvedMode::Historical(n) => FetchBound::LastN(*n),
      ResolvedMode::FullBackfill => FetchBound::All,
    }
  }
}

impl std::fmt::Display for ResolvedMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ResolvedMode::Incremental => write!(f, "incremental"),
      ResolvedMode::Historical(n) => write!(f, "historical({n})"),
      ResolvedMode::FullBackfill => write!(f, "full_backfill"),
    }
  }
}

fn concretize(mode: ExtractionMode, policy: &ModePolicy) -> Option<ResolvedMode> {
  match mode {
    ExtractionMode::Incremental => Some(ResolvedMode::Incremental),
    ExtractionMode::Historical => Some(ResolvedMode::Historical(policy.refresh_rows)),
    ExtractionMode::FullBackfill => Some(ResolvedMode::FullBackfill),
    ExtractionMode::Smart => None,
  }
}

fn state_based(state: &InstrumentState, today: NaiveDate, policy: &ModePolicy) -> ResolvedMode {
  if state.row_count == 0 {
    return ResolvedMode::Historical(policy.deep_rows);
  }

  if let Some(max_date) = state.max_date {
    if (today - max_date).num_days() > policy.staleness_days {
      return ResolvedMode::Historical(policy.refresh_rows);
    }
  }

  if state.row_count < policy.min_row_count {
    return ResolvedMode::Historical(policy.deep_rows);
  }

  ResolvedMode::Incremental
}

/// Resolve the extraction mode for one instrument on one run.
pub fn resolve_mode(
  symbol: &str,
  params: &RunParams,
  context: &SchedulerContext,
  state: &InstrumentState,
  today: NaiveDate,
  policy: &ModePolicy,
) -> ResolvedMode {
  // Layer 1: explicit per-symbol override
  if let Some(mode) = params.instruments.get(symbol) {
    if let Some(resolved) = concretize(*mode, policy) {
      return resolved;
    }
  }

  // Layer 2: concrete global mode
  if let Some(mode) = params.extraction_mode {
    if let Some(resolved) = concretize(mode, policy) {
      return resolved;
    }
  }

  // Layer 3: repository state
  let from_state = state_based(state, today, policy);

  // Layer 4: catch-up runs never trust a bare incremental
  if context.is_catchup && from_state == ResolvedMode::Incremental {
    return ResolvedMode::Historical(policy.refresh_rows);
  }

  // Layer 5: the state rule is total, so this is already the safety default
  from_state
}
