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

//! Validated daily OHLCV record
//!
//! [`PriceRecord::parse`] is the single validating constructor: every
//! record that exists in memory has already passed field parsing, the
//! OHLC invariants, and the future-date check, and carries its content
//! hash computed exactly once.

use chrono::NaiveDate;
use mdi_core::{Error, Result};
use sha2::{Digest, Sha256};

/// One validated daily observation for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
  pub date: NaiveDate,
  pub open: f64,
  pub high: f64,
  pub low: f64,
  pub close: f64,
  pub volume: i64,
  pub raw_hash: String,
}

impl PriceRecord {
  /// Parse and validate one provider row.
  ///
  /// Rejections are reported as [`Error::RecordRejected`] so the caller
  /// can count them without failing the batch; any other variant is a
  /// batch-level problem.
  #[allow(clippy::too_many_arguments)]
  pub fn parse(
    symbol: &str,
    date_str: &str,
    open_str: &str,
    high_str: &str,
    low_str: &str,
    close_str: &str,
    volume_str: &str,
    today: NaiveDate,
  ) -> Result<Self> {
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")?;

    if date > today {
      return Err(Error::RecordRejected(format!("{symbol} {date}: future trading date")));
    }

    let open = parse_price(symbol, date, "open", open_str)?;
    let high = parse_price(symbol, date, "high", high_str)?;
    let low = parse_price(symbol, date, "low", low_str)?;
    let close = parse_price(symbol, date, "close", close_str)?;

    // Index rows can carry an empty volume field
    let volume_str = volume_str.trim();
    let volume: i64 = if volume_str.is_empty() {
      0
    } else {
      volume_str.parse().map_err(|_| {
        Error::RecordRejected(format!("{symbol} {date}: unparseable volume '{volume_str}'"))
      })?
    };

    if volume < 0 {
      return Err(Error::RecordRejected(format!("{symbol} {date}: negative volume {volume}")));
    }

    if low > open.min(close) || high < open.max(close) {
      return Err(Error::RecordRejected(format!(
        "{symbol} {date}: OHLC out of order (o={open} h={high} l={low} c={close})"
      )));
    }

    let raw_hash = content_hash(symbol, date, open, high, low, close, volume);

    Ok(Self { date, open, high, low, close, volume, raw_hash })
  }
}

fn parse_price(symbol: &str, date: NaiveDate, field: &str, raw: &str) -> Result<f64> {
  let value: f64 = raw.trim().parse().map_err(|_| {
    Error::RecordRejected(format!("{symbol} {date}: unparseable {field} '{}'", raw.trim()))
  })?;

  if value <= 0.0 || !value.is_finite() {
    return Err(Error::RecordRejected(format!("{symbol} {date}: non-positive {field} {value}")));
  }

  Ok(value)
}

/// Stable digest over the canonical record tuple.
///
/// Prices are rendered at fixed precision before hashing so the digest
/// does not depend on how the provider formatted the number.
pub fn content_hash(
  symbol: &str,
  date: NaiveDate,
  open: f64,
  high: f64,
  low: f64,
  close: f64,
  volume: i64,
) -> String {
  let canonical = format!(
    "{}|{}|{:.4}|{:.4}|{:.4}|{:.4}|{}",
    symbol.to_uppercase(),
    date.format("%Y-%m-%d"),
    open,
    high,
    low,
    close,
    volume
  );

  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
  }

  #[test]
  fn test_parse_valid_row() {
    let rec =
      PriceRecord::parse("XTB", "2024-06-13", "6.50", "6.80", "6.40", "6.75", "125000", today())
        .unwrap();

    assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 6, 13).unwrap());
    assert_eq!(rec.open, 6.50);
    assert_eq!(rec.high, 6.80);
    assert_eq!(rec.low, 6.40);
    assert_eq!(rec.close, 6.75);
    assert_eq!(rec.volume, 125_000);
    assert_eq!(rec.raw_hash.len(), 64);
  }

  #[test]
  fn test_rejects_future_date() {
    let err =
      PriceRecord::parse("XTB", "2024-06-15", "6.50", "6.80", "6.40", "6.75", "100", today())
        .unwrap_err();
    assert!(matches!(err, Error::RecordRejected(_)));
    assert!(err.to_string().contains("future"));
  }

  #[test]
  fn test_rejects_high_below_low() {
    let err =
      PriceRecord::parse("XTB", "2024-06-13", "6.50", "6.10", "6.40", "6.05", "100", today())
        .unwrap_err();
    assert!(matches!(err, Error::RecordRejected(_)));
  }

  #[test]
  fn test_rejects_close_above_high() {
    let err =
      PriceRecord::parse("XTB", "2024-06-13", "6.50", "6.60", "6.40", "6.90", "100", today())
        .unwrap_err();
    assert!(matches!(err, Error::RecordRejected(_)));
  }

  #[test]
  fn test_rejects_non_positive_price() {
    let err = PriceRecord::parse("XTB", "2024-06-13", "0", "6.60", "6.40", "6.50", "100", today())
      .unwrap_err();
    assert!(err.to_string().contains("non-positive"));
  }

  #[test]
  fn test_rejects_negative_volume() {
    let err =
      PriceRecord::parse("XTB", "2024-06-13", "6.50", "6.60", "6.40", "6.50", "-5", today())
        .unwrap_err();
    assert!(matches!(err, Error::RecordRejected(_)));
  }

  #[test]
  fn test_empty_volume_defaults_to_zero() {
    let rec = PriceRecord::parse("WIG20", "2024-06-13", "2500", "2520", "2490", "2510", "", today())
      .unwrap();
    assert_eq!(rec.volume, 0);
  }

  #[test]
  fn test_unparseable_date_is_not_a_reject() {
    // A garbage date is a batch-level parse problem, not a counted reject
    let err = PriceRecord::parse("XTB", "13/06/2024", "6.5", "6.6", "6.4", "6.5", "100", today())
      .unwrap_err();
    assert!(matches!(err, Error::ParseDate(_)));
  }

  #[test]
  fn test_hash_is_deterministic() {
    let d = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
    let a = content_hash("XTB", d, 6.5, 6.8, 6.4, 6.75, 125_000);
    let b = content_hash("XTB", d, 6.5, 6.8, 6.4, 6.75, 125_000);
    assert_eq!(a, b);
  }

  #[test]
  fn test_hash_ignores_formatting_noise() {
    let d = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
    // 6.5 and 6.5000 canonicalize identically; symbol case is folded
    let a = content_hash("XTB", d, 6.5, 6.8, 6.4, 6.75, 125_000);
    let b = content_hash("xtb", d, 6.5000, 6.80, 6.40, 6.7500, 125_000);
    assert_eq!(a, b);
  }

  #[test]
  fn test_hash_detects_restated_close() {
    let d = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
    let a = content_hash("XTB", d, 6.5, 6.8, 6.4, 6.75, 125_000);
    let b = content_hash("XTB", d, 6.5, 6.8, 6.4, 6.76, 125_000);
    assert_ne!(a, b);
  }
}
