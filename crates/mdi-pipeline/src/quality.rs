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

//! Data-quality evaluation over freshly committed price rows
//!
//! Verdicts are computed from rows re-read out of storage after the
//! instrument's transaction commits and are written outside that
//! transaction, so a failing check never invalidates valid data.

use chrono::Duration;
use mdi_core::{Severity, TradingCalendar};
use mdi_database_postgres::models::{NewQualityVerdict, PriceRow};

/// Tunable thresholds for the rule set.
#[derive(Debug, Clone)]
pub struct QualityPolicy {
  /// Trailing window for the volume median
  pub volume_window: usize,

  /// Volume above `factor * median(window)` is anomalous
  pub volume_factor: f64,

  /// |ln(close_t / close_{t-1})| above this is a jump
  pub price_jump_threshold: f64,

  /// Error-severity verdicts above this demote a completed job to partial
  pub max_error_verdicts: usize,
}

impl Default for QualityPolicy {
  fn default() -> Self {
    Self { volume_window: 20, volume_factor: 10.0, price_jump_threshold: 0.25, max_error_verdicts: 25 }
  }
}

/// Everything one instrument's evaluation produced.
#[derive(Debug, Default)]
pub struct QualityReport {
  pub verdicts: Vec<NewQualityVerdict>,

  /// Verdicts with `is_valid = false`
  pub failed: usize,

  /// Failing verdicts at error severity
  pub errors: usize,
}

/// Rule evaluator for one (exchange, policy) pair.
#[derive(Debug, Clone)]
pub struct QualityChecker {
  policy: QualityPolicy,
  calendar: TradingCalendar,
}

impl QualityChecker {
  pub fn new(policy: QualityPolicy, calendar: TradingCalendar) -> Self {
    Self { policy, calendar }
  }

  pub fn policy(&self) -> &QualityPolicy {
    &self.policy
  }

  /// Evaluate all rules for one instrument's stored rows.
  ///
  /// `rows` must be ascending by trading date, as the repository's
  /// `recent_prices` returns them.
  pub fn evaluate(&self, job_id: i64, instrument_id: i32, rows: &[PriceRow]) -> QualityReport {
    let mut report = QualityReport::default();
    if rows.is_empty() {
      return report;
    }

    self.check_ohlc(job_id, instrument_id, rows, &mut report);
    self.check_gaps(job_id, instrument_id, rows, &mut report);
    self.check_volume(job_id, instrument_id, rows, &mut report);
    self.check_jumps(job_id, instrument_id, rows, &mut report);

    report
  }

  /// Stored rows must still satisfy the loader's OHLC ordering.
  fn check_ohlc(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: &[PriceRow],
    report: &mut QualityReport,
  ) {
    let mut violations = 0;

    for row in rows {
      let body_low = row.open.min(row.close);
      let body_high = row.open.max(row.close);

      if row.low > body_low || row.high < body_high {
        violations += 1;
        report.push_failing(NewQualityVerdict {
          job_id,
          instrument_id,
          rule_name: "ohlc_monotonicity".to_string(),
          metric_value: Some(row.close),
          min_threshold: Some(row.low),
          max_threshold: Some(row.high),
          is_valid: false,
          severity: Severity::Error.as_str().to_string(),
        });
      }
    }

    if violations == 0 {
      report.push_passing(job_id, instrument_id, "ohlc_monotonicity", rows.len());
    }
  }

  /// Consecutive stored rows should be adjacent trading days.
  fn check_gaps(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: &[PriceRow],
    report: &mut QualityReport,
  ) {
    let mut violations = 0;

    for pair in rows.windows(2) {
      let gap_start = pair[0].trading_date + Duration::days(1);
      let gap_end = pair[1].trading_date - Duration::days(1);
      let missing = self.calendar.trading_days_in_range(gap_start, gap_end).len();

      if missing > 0 {
        violations += 1;
        report.push_failing(NewQualityVerdict {
          job_id,
          instrument_id,
          rule_name: "calendar_gap".to_string(),
          metric_value: Some(missing as f64),
          min_threshold: None,
          max_threshold: Some(0.0),
          is_valid: false,
          severity: Severity::Warn.as_str().to_string(),
        });
      }
    }

    if violations == 0 {
      report.push_passing(job_id, instrument_id, "calendar_gap", rows.len());
    }
  }

  /// Volume spikes against the trailing median.
  fn check_volume(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: &[PriceRow],
    report: &mut QualityReport,
  ) {
    // A tiny trailing window makes the median meaningless
    const MIN_WINDOW: usize = 5;
    let mut violations = 0;

    for (ix, row) in rows.iter().enumerate() {
      let window_start = ix.saturating_sub(self.policy.volume_window);
      let trailing: Vec<i64> = rows[window_start..ix].iter().map(|r| r.volume).collect();

      if trailing.len() < MIN_WINDOW {
        continue;
      }

      let median = median_volume(&trailing);
      let ceiling = self.policy.volume_factor * median;

      if median > 0.0 && (row.volume as f64) > ceiling {
        violations += 1;
        report.push_failing(NewQualityVerdict {
          job_id,
          instrument_id,
          rule_name: "volume_anomaly".to_string(),
          metric_value: Some(row.volume as f64),
          min_threshold: None,
          max_threshold: Some(ceiling),
          is_valid: false,
          severity: Severity::Warn.as_str().to_string(),
        });
      }
    }

    if violations == 0 {
      report.push_passing(job_id, instrument_id, "volume_anomaly", rows.len());
    }
  }

  /// Log-return jumps between consecutive closes.
  fn check_jumps(
    &self,
    job_id: i64,
    instrument_id: i32,
    rows: &[PriceRow],
    report: &mut QualityReport,
  ) {
    let threshold = self.policy.price_jump_threshold;
    let mut violations = 0;

    for pair in rows.windows(2) {
      let log_return = (pair[1].close / pair[0].close).ln();

      if log_return.abs() > threshold {
        violations += 1;
        report.push_failing(NewQualityVerdict {
          job_id,
          instrument_id,
          rule_name: "price_jump".to_string(),
          metric_value: Some(log_return),
          min_threshold: Some(-threshold),
          max_threshold: Some(threshold),
          is_valid: false,
          severity: Severity::Warn.as_str().to_string(),
        });
      }
    }

    if violations == 0 {
      report.push_passing(job_id, instrument_id, "price_jump", rows.len());
    }
  }
}

impl QualityReport {
  fn push_failing(&mut self, verdict: NewQualityVerdict) {
    self.failed += 1;
    if verdict.severity == Severity::Error.as_str() {
      self.errors += 1;
    }
    self.verdicts.push(verdict);
  }

  fn push_passing(&mut self, job_id: i64, instrument_id: i32, rule: &str, rows_checked: usize) {
    self.verdicts.push(NewQualityVerdict {
      job_id,
      instrument_id,
      rule_name: rule.to_string(),
      metric_value: Some(rows_checked as f64),
      min_threshold: None,
      max_threshold: None,
      is_valid: true,
      severity: Severity::Info.as_str().to_string(),
    });
  }
}

fn median_volume(values: &[i64]) -> f64 {
  let mut sorted = values.to_vec();
  sorted.sort_unstable();

  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
  } else {
    sorted[mid] as f64
  }
}
