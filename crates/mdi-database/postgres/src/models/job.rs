/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-dot-]browne[-at-]dwightjbrowne[-dot-]com
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


//! Job tracking models for pipeline run monitoring

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{etl_job_details, etl_jobs};

// ===== EtlJob =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = etl_jobs)]
pub struct EtlJob {
  pub id: i64,
  pub job_name: String,
  pub environment: String,
  pub scheduler_run_id: Option<String>,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub status: String,
  pub records_processed: i32,
  pub records_inserted: i32,
  pub records_updated: i32,
  pub records_skipped: i32,
  pub records_failed: i32,
  pub quality_failed: i32,
  pub error_summary: Option<String>,
  pub metadata: Option<serde_json::Value>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = etl_jobs)]
pub struct NewEtlJob<'a> {
  pub job_name: &'a str,
  pub environment: &'a str,
  pub scheduler_run_id: Option<&'a str>,
  pub started_at: DateTime<Utc>,
  pub status: &'a str,
  pub metadata: Option<serde_json::Value>,
}

/// Aggregate counters written at finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounterColumns {
  pub processed: i32,
  pub inserted: i32,
  pub updated: i32,
  pub skipped: i32,
  pub failed: i32,
  pub quality_failed: i32,
}

impl<'a> NewEtlJob<'a> {
  /// Insert the job row in `running` state
  pub fn insert(self, conn: &mut PgConnection) -> Result<EtlJob, diesel::result::Error> {
    use crate::schema::etl_jobs::dsl::*;

    diesel::insert_into(etl_jobs).values(&self).get_result(conn)
  }
}

impl EtlJob {
  /// Apply the single terminal transition for a job.
  ///
  /// Only a row still in `running` is eligible; the returned count is 0
  /// when the job was already finalized.
  pub fn finalize(
    conn: &mut PgConnection,
    job_id: i64,
    terminal_status: &str,
    counters: JobCounterColumns,
    error_text: Option<&str>,
  ) -> Result<usize, diesel::result::Error> {
    use crate::schema::etl_jobs::dsl::*;

    diesel::update(etl_jobs.find(job_id).filter(status.eq("running")))
      .set((
        status.eq(terminal_status),
        finished_at.eq(Some(Utc::now())),
        records_processed.eq(counters.processed),
        records_inserted.eq(counters.inserted),
        records_updated.eq(counters.updated),
        records_skipped.eq(counters.skipped),
        records_failed.eq(counters.failed),
        quality_failed.eq(counters.quality_failed),
        error_summary.eq(error_text),
      ))
      .execute(conn)
  }

  /// Take the job's row lock and report whether it is still `running`.
  ///
  /// Callers hold the lock until their transaction ends, so a
  /// concurrent `finalize` serializes either entirely before this call
  /// (0 rows here) or entirely after the caller's commit. Writers use
  /// this to refuse work for a job that already reached its terminal
  /// state.
  pub fn lock_running(
    conn: &mut PgConnection,
    owning_job: i64,
  ) -> Result<bool, diesel::result::Error> {
    use crate::schema::etl_jobs::dsl::*;

    let locked = etl_jobs
      .find(owning_job)
      .filter(status.eq("running"))
      .select(id)
      .for_update()
      .first::<i64>(conn)
      .optional()?;

    Ok(locked.is_some())
  }

  /// Most recent jobs, newest first
  pub fn recent(conn: &mut PgConnection, limit: i64) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::etl_jobs::dsl::*;

    etl_jobs.order(started_at.desc()).limit(limit).load(conn)
  }

  /// Running jobs whose heartbeat window has lapsed
  pub fn stale_running(
    conn: &mut PgConnection,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::etl_jobs::dsl::*;

    etl_jobs
      .filter(status.eq("running"))
      .filter(started_at.lt(cutoff))
      .order(started_at.asc())
      .load(conn)
  }
}

// ===== JobDetail =====
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = etl_job_details)]
pub struct JobDetail {
  pub id: i64,
  pub job_id: i64,
  pub instrument_id: i32,
  pub operation: String,
  pub records_affected: i32,
  pub processing_ms: i64,
  pub error_text: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = etl_job_details)]
pub struct NewJobDetail<'a> {
  pub job_id: i64,
  pub instrument_id: i32,
  pub operation: &'a str,
  pub records_affected: i32,
  pub processing_ms: i64,
  pub error_text: Option<&'a str>,
}

impl<'a> NewJobDetail<'a> {
  /// Insert one per-instrument outcome row; insert-only, never mutated
  pub fn insert(self, conn: &mut PgConnection) -> Result<usize, diesel::result::Error> {
    use crate::schema::etl_job_details::dsl::*;

    diesel::insert_into(etl_job_details).values(&self).execute(conn)
  }
}

impl JobDetail {
  /// All detail rows for one job, oldest first
  pub fn for_job(
    conn: &mut PgConnection,
    owning_job: i64,
  ) -> Result<Vec<Self>, diesel::result::Error> {
    use crate::schema::etl_job_details::dsl::*;

    etl_job_details.filter(job_id.eq(owning_job)).order(created_at.asc()).load(conn)
  }
}
