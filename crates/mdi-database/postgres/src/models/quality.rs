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

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::quality_verdicts;

/// One persisted data-quality verdict.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = quality_verdicts)]
pub struct QualityVerdictRow {
  pub id: i64,
  pub job_id: i64,
  pub instrument_id: i32,
  pub rule_name: String,
  pub metric_value: Option<f64>,
  pub min_threshold: Option<f64>,
  pub max_threshold: Option<f64>,
  pub is_valid: bool,
  pub severity: String,
  pub checked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = quality_verdicts)]
pub struct NewQualityVerdict {
  pub job_id: i64,
  pub instrument_id: i32,
  pub rule_name: String,
  pub metric_value: Option<f64>,
  pub min_threshold: Option<f64>,
  pub max_threshold: Option<f64>,
  pub is_valid: bool,
  pub severity: String,
}

impl NewQualityVerdict {
  /// Insert a batch of verdicts for one (job, instrument)
  pub fn bulk_insert(
    conn: &mut PgConnection,
    verdicts: &[NewQualityVerdict],
  ) -> Result<usize, diesel::result::Error> {
    use diesel::insert_into;

    insert_into(quality_verdicts::table).values(verdicts).execute(conn)
  }
}

impl QualityVerdictRow {
  /// All verdicts for one job, oldest first
  pub fn for_job(
    conn: &mut PgConnection,
    owning_job: i64,
  ) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::quality_verdicts::dsl::*;

    quality_verdicts.filter(job_id.eq(owning_job)).order(checked_at.asc()).load(conn)
  }
}
