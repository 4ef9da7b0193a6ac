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

//! CSV payload parsing for the daily-quotes provider
//!
//! The provider answers with a `Date,Open,High,Low,Close,Volume` header
//! and one row per trading day. Header validation is strict; row
//! validation rejects individual rows without failing the batch.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use mdi_core::{Error, Result};
use tracing::{debug, warn};

use crate::record::PriceRecord;

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Result of parsing one provider response.
#[derive(Debug, Clone)]
pub struct ParsedBatch {
  /// Validated records, ascending by date
  pub records: Vec<PriceRecord>,

  /// Rows dropped by per-row validation
  pub rejected: usize,
}

impl ParsedBatch {
  pub fn empty() -> Self {
    Self { records: Vec::new(), rejected: 0 }
  }
}

/// Parse a daily CSV response body for `symbol`.
///
/// An empty (or "no data") body is a valid zero-row response. A missing
/// required column fails the whole batch.
pub fn parse_daily_csv(symbol: &str, body: &str, today: NaiveDate) -> Result<ParsedBatch> {
  let trimmed = body.trim();
  if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no data") {
    debug!(%symbol, "provider returned no data rows");
    return Ok(ParsedBatch::empty());
  }

  let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(trimmed.as_bytes());

  let headers = reader.headers().map_err(|e| Error::Parse(format!("unreadable header: {e}")))?;
  let lowered: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();

  let mut positions = [0usize; 6];
  for (slot, required) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
    *slot = lowered
      .iter()
      .position(|h| h == required)
      .ok_or_else(|| Error::MissingColumn(required.to_string()))?;
  }
  let [date_ix, open_ix, high_ix, low_ix, close_ix, volume_ix] = positions;

  let mut records = Vec::new();
  let mut rejected = 0usize;

  for row in reader.records() {
    let row = row.map_err(|e| Error::Parse(format!("malformed CSV row: {e}")))?;

    let field = |ix: usize| row.get(ix).unwrap_or("");

    match PriceRecord::parse(
      symbol,
      field(date_ix),
      field(open_ix),
      field(high_ix),
      field(low_ix),
      field(close_ix),
      field(volume_ix),
      today,
    ) {
      Ok(record) => records.push(record),
      Err(Error::RecordRejected(reason)) => {
        warn!(%symbol, %reason, "rejected provider row");
        rejected += 1;
      }
      Err(Error::ParseDate(e)) => {
        warn!(%symbol, error = %e, raw = field(date_ix), "rejected provider row with bad date");
        rejected += 1;
      }
      Err(other) => return Err(other),
    }
  }

  records.sort_by_key(|r| r.date);

  debug!(%symbol, parsed = records.len(), rejected, "parsed provider batch");
  Ok(ParsedBatch { records, rejected })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
  }

  const GOOD_BODY: &str = "\
Date,Open,High,Low,Close,Volume
2024-06-12,6.40,6.55,6.35,6.50,98000
2024-06-13,6.50,6.80,6.40,6.75,125000
2024-06-11,6.30,6.45,6.25,6.40,87000
";

  #[test]
  fn test_parse_orders_ascending() {
    let batch = parse_daily_csv("XTB", GOOD_BODY, today()).unwrap();
    assert_eq!(batch.rejected, 0);

    let dates: Vec<_> = batch.records.iter().map(|r| r.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-06-11", "2024-06-12", "2024-06-13"]);
  }

  #[test]
  fn test_header_is_case_insensitive() {
    let body = "\
DATE,open,High,LOW,Close,volume
2024-06-13,6.50,6.80,6.40,6.75,125000
";
    let batch = parse_daily_csv("XTB", body, today()).unwrap();
    assert_eq!(batch.records.len(), 1);
  }

  #[test]
  fn test_missing_column_fails_batch() {
    let body = "\
Date,Open,High,Low,Close
2024-06-13,6.50,6.80,6.40,6.75
";
    let err = parse_daily_csv("XTB", body, today()).unwrap_err();
    assert!(matches!(err, Error::MissingColumn(ref c) if c == "volume"));
  }

  #[test]
  fn test_bad_rows_are_counted_not_fatal() {
    let body = "\
Date,Open,High,Low,Close,Volume
2024-06-12,6.40,6.55,6.35,6.50,98000
2024-06-13,6.50,6.10,6.40,6.75,125000
2024-06-20,6.50,6.80,6.40,6.75,125000
not-a-date,6.50,6.80,6.40,6.75,125000
";
    // one OHLC violation, one future date, one bad date
    let batch = parse_daily_csv("XTB", body, today()).unwrap();
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.rejected, 3);
  }

  #[test]
  fn test_empty_body_is_empty_batch() {
    let batch = parse_daily_csv("XTB", "", today()).unwrap();
    assert!(batch.records.is_empty());
    assert_eq!(batch.rejected, 0);
  }

  #[test]
  fn test_no_data_body_is_empty_batch() {
    let batch = parse_daily_csv("XTB", "No data", today()).unwrap();
    assert!(batch.records.is_empty());
  }

  #[test]
  fn test_header_only_is_empty_batch() {
    let batch = parse_daily_csv("XTB", "Date,Open,High,Low,Close,Volume\n", today()).unwrap();
    assert!(batch.records.is_empty());
    assert_eq!(batch.rejected, 0);
  }

  #[test]
  fn test_extra_columns_are_ignored() {
    let body = "\
Date,Open,High,Low,Close,Volume,OpenInt
2024-06-13,6.50,6.80,6.40,6.75,125000,0
";
    let batch = parse_daily_csv("XTB", body, today()).unwrap();
    assert_eq!(batch.records.len(), 1);
  }
}
