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

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::daily_prices;

/// One stored daily OHLCV observation.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = daily_prices)]
pub struct PriceRow {
  pub id: i64,
  pub instrument_id: i32,
  pub trading_date: NaiveDate,
  pub open: f64,
  pub high: f64,
  pub low: f64,
  pub close: f64,
  pub volume: i64,
  pub raw_hash: String,
  pub loaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = daily_prices)]
pub struct NewPriceRow {
  pub instrument_id: i32,
  pub trading_date: NaiveDate,
  pub open: f64,
  pub high: f64,
  pub low: f64,
  pub close: f64,
  pub volume: i64,
  pub raw_hash: String,
}

impl NewPriceRow {
  /// Chunked bulk insert, rows already ordered ascending by date.
  pub fn bulk_insert(
    conn: &mut PgConnection,
    records: &[NewPriceRow],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    const BATCH_SIZE: usize = 1000;
    let mut total_inserted = 0;

    for chunk in records.chunks(BATCH_SIZE) {
      let inserted = insert_into(daily_prices::table).values(chunk).execute(conn)?;
      total_inserted += inserted;
    }

    Ok(total_inserted)
  }

  /// Overwrite the stored row for this (instrument, date) with restated
  /// values. `loaded_at` is the only column a replay is allowed to move
  /// without a content change.
  pub fn apply_update(&self, conn: &mut PgConnection) -> Result<usize, diesel::result::Error> {
    use crate::schema::daily_prices::dsl::*;

    diesel::update(
      daily_prices
        .filter(instrument_id.eq(self.instrument_id))
        .filter(trading_date.eq(self.trading_date)),
    )
    .set((
      open.eq(self.open),
      high.eq(self.high),
      low.eq(self.low),
      close.eq(self.close),
      volume.eq(self.volume),
      raw_hash.eq(&self.raw_hash),
      loaded_at.eq(diesel::dsl::now),
    ))
    .execute(conn)
  }
}

impl PriceRow {
  /// Stored (date, hash) pairs for one instrument within a date window.
  pub fn stored_hashes(
    conn: &mut PgConnection,
    target_instrument: i32,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<(NaiveDate, String)>, diesel::result::Error> {
    use crate::schema::daily_prices::dsl::*;

    daily_prices
      .filter(instrument_id.eq(target_instrument))
      .filter(trading_date.ge(from))
      .filter(trading_date.le(to))
      .select((trading_date, raw_hash))
      .order(trading_date.asc())
      .load(conn)
  }

  /// The most recent `limit` rows, returned ascending by date.
  pub fn recent(
    conn: &mut PgConnection,
    target_instrument: i32,
    limit: i64,
  ) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::daily_prices::dsl::*;

    let mut rows: Vec<PriceRow> = daily_prices
      .filter(instrument_id.eq(target_instrument))
      .order(trading_date.desc())
      .limit(limit)
      .load(conn)?;

    rows.reverse();
    Ok(rows)
  }

  /// Row count and max trading date, feeding the mode resolver.
  pub fn state_for_instrument(
    conn: &mut PgConnection,
    target_instrument: i32,
  ) -> Result<(i64, Option<NaiveDate>), diesel::result::Error> {
    use crate::schema::daily_prices::dsl::*;
    use diesel::dsl::{count_star, max};

    daily_prices
      .filter(instrument_id.eq(target_instrument))
      .select((count_star(), max(trading_date)))
      .first(conn)
  }
}
