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

//! Reference-data models: exchanges and instruments

use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{exchanges, instruments};

// ===== Exchange =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = exchanges)]
pub struct Exchange {
  pub id: i32,
  pub code: String,
  pub name: String,
  pub timezone: String,
  pub market_open: chrono::NaiveTime,
  pub market_close: chrono::NaiveTime,
}

impl Exchange {
  /// Get an exchange by its short code
  pub fn find_by_code(
    conn: &mut PgConnection,
    exchange_code: &str,
  ) -> Result<Option<Self>, diesel::result::Error> {
    use crate::schema::exchanges::dsl::*;

    exchanges.filter(code.eq(exchange_code)).first::<Exchange>(conn).optional()
  }
}

// ===== Instrument =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = instruments)]
pub struct Instrument {
  pub id: i32,
  pub symbol: String,
  pub kind: String,
  pub exchange_id: i32,
  pub currency: String,
  pub is_active: bool,
  pub first_seen: Option<NaiveDate>,
  pub last_seen: Option<NaiveDate>,
  pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = instruments)]
pub struct NewInstrument<'a> {
  pub symbol: &'a str,
  pub kind: &'a str,
  pub exchange_id: i32,
  pub currency: &'a str,
  pub is_active: bool,
}

impl Instrument {
  /// Find an existing instrument or create it on first encounter.
  ///
  /// Insert races resolve through the (symbol, exchange_id) uniqueness;
  /// the post-conflict re-select returns whichever row won.
  pub fn find_or_create(
    conn: &mut PgConnection,
    instrument_symbol: &str,
    instrument_kind: &str,
    owning_exchange_id: i32,
    quote_currency: &str,
  ) -> Result<Self, diesel::result::Error> {
    use crate::schema::instruments::dsl::*;

    let existing = instruments
      .filter(symbol.eq(instrument_symbol))
      .filter(exchange_id.eq(owning_exchange_id))
      .first::<Instrument>(conn)
      .optional()?;

    if let Some(instrument) = existing {
      return Ok(instrument);
    }

    diesel::insert_into(instruments)
      .values(NewInstrument {
        symbol: instrument_symbol,
        kind: instrument_kind,
        exchange_id: owning_exchange_id,
        currency: quote_currency,
        is_active: true,
      })
      .on_conflict_do_nothing()
      .execute(conn)?;

    instruments
      .filter(symbol.eq(instrument_symbol))
      .filter(exchange_id.eq(owning_exchange_id))
      .first::<Instrument>(conn)
  }

  /// Advance the observed trading-date window after a load.
  ///
  /// `first_seen` only ever moves backward, `last_seen` only forward.
  pub fn advance_seen_window(
    conn: &mut PgConnection,
    instrument_id: i32,
    earliest: NaiveDate,
    latest: NaiveDate,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::instruments::dsl::*;
    use diesel::dsl::sql;
    use diesel::sql_types::{Date, Nullable};

    diesel::update(instruments.find(instrument_id))
      .set((
        first_seen.eq(sql::<Nullable<Date>>("LEAST(first_seen, ")
          .bind::<Date, _>(earliest)
          .sql(")")),
        last_seen.eq(sql::<Nullable<Date>>("GREATEST(last_seen, ")
          .bind::<Date, _>(latest)
          .sql(")")),
      ))
      .execute(conn)
  }

  /// All active instruments for one exchange
  pub fn active_for_exchange(
    conn: &mut PgConnection,
    owning_exchange_id: i32,
  ) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::instruments::dsl::*;

    instruments
      .filter(exchange_id.eq(owning_exchange_id))
      .filter(is_active.eq(true))
      .order(symbol.asc())
      .load(conn)
  }
}
