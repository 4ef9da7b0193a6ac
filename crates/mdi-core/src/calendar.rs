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

//! Trading calendar for the reference exchange
//!
//! Classifies civil dates as trading or non-trading and derives adjacent
//! and bounded trading-day sets. All operations are pure functions over
//! the exchange description; none of them fail.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashSet;
use std::sync::Once;
use tracing::warn;

/// Walking back from a date stops after this many steps.
const MAX_BACKTRACK_DAYS: u32 = 10;

static EMPTY_HOLIDAYS_WARNING: Once = Once::new();

/// Immutable description of a market: identity, session times, closures.
#[derive(Debug, Clone)]
pub struct ExchangeSpec {
  pub code: String,
  pub name: String,
  pub timezone: String,
  pub market_open: NaiveTime,
  pub market_close: NaiveTime,
  pub holidays: HashSet<NaiveDate>,
}

impl ExchangeSpec {
  /// Warsaw Stock Exchange, the default reference market.
  ///
  /// The holiday set covers fixed-date closures plus the Easter-linked
  /// closures (Good Friday, Easter Monday, Corpus Christi) for
  /// 2000-2035.
  pub fn wse() -> Self {
    let mut holidays = HashSet::new();

    for year in 2000..=2035 {
      for (month, day) in
        [(1, 1), (1, 6), (5, 1), (5, 3), (8, 15), (11, 1), (11, 11), (12, 24), (12, 25), (12, 26), (12, 31)]
      {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
          holidays.insert(d);
        }
      }

      let easter = easter_sunday(year);
      holidays.insert(easter - Duration::days(2)); // Good Friday
      holidays.insert(easter + Duration::days(1)); // Easter Monday
      holidays.insert(easter + Duration::days(60)); // Corpus Christi
    }

    Self {
      code: "WSE".to_string(),
      name: "Warsaw Stock Exchange".to_string(),
      timezone: "Europe/Warsaw".to_string(),
      market_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
      market_close: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
      holidays,
    }
  }
}

/// Gregorian Easter Sunday (Meeus/Jones/Butcher).
fn easter_sunday(year: i32) -> NaiveDate {
  let a = year % 19;
  let b = year / 100;
  let c = year % 100;
  let d = b / 4;
  let e = b % 4;
  let f = (b + 8) / 25;
  let g = (b - f + 1) / 3;
  let h = (19 * a + b - d - g + 15) % 30;
  let i = c / 4;
  let k = c % 4;
  let l = (32 + 2 * e + 2 * i - h - k) % 7;
  let m = (a + 11 * h + 22 * l) / 451;
  let month = (h + l - 7 * m + 114) / 31;
  let day = (h + l - 7 * m + 114) % 31 + 1;
  NaiveDate::from_ymd_opt(year, month as u32, day as u32)
    .expect("computus always yields a valid March/April date")
}

/// Calendar-aware gate and range helpers over one exchange.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
  spec: ExchangeSpec,
}

impl TradingCalendar {
  pub fn new(spec: ExchangeSpec) -> Self {
    if spec.holidays.is_empty() {
      EMPTY_HOLIDAYS_WARNING.call_once(|| {
        warn!(
          exchange = %spec.code,
          "holiday set not initialized; treating all weekdays as trading days"
        );
      });
    }
    Self { spec }
  }

  pub fn spec(&self) -> &ExchangeSpec {
    &self.spec
  }

  /// Whether the exchange is open for business on `date`.
  pub fn is_trading_day(&self, date: NaiveDate) -> bool {
    match date.weekday() {
      Weekday::Sat | Weekday::Sun => false,
      _ => !self.spec.holidays.contains(&date),
    }
  }

  /// The closest trading day strictly before `date`.
  ///
  /// Walks backward one day at a time, bounded at ten steps; the longest
  /// real closure streak (Christmas into a weekend) is well under that.
  pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
    let mut candidate = date - Duration::days(1);
    for _ in 0..MAX_BACKTRACK_DAYS {
      if self.is_trading_day(candidate) {
        return candidate;
      }
      candidate -= Duration::days(1);
    }
    warn!(%date, "no trading day found within {} steps", MAX_BACKTRACK_DAYS);
    candidate
  }

  /// Trading days in `[start, end]`, ascending. Empty when `start > end`.
  pub fn trading_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
      if self.is_trading_day(current) {
        days.push(current);
      }
      current += Duration::days(1);
    }
    days
  }

  /// Whether the market is in session at the given local wall-clock time.
  pub fn is_market_open_now(&self, now_local: NaiveDateTime) -> bool {
    if !self.is_trading_day(now_local.date()) {
      return false;
    }
    let t = now_local.time();
    t >= self.spec.market_open && t < self.spec.market_close
  }
}

impl Default for TradingCalendar {
  fn default() -> Self {
    Self::new(ExchangeSpec::wse())
  }
}
