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

//! # mdi-database-postgres
//!
//! Postgres persistence for the market data ingest pipeline.
//!
//! One database hosts the `dev_stock_data`, `test_stock_data`, and
//! `prod_stock_data` schemas; a pool built by [`connection::build_pool`]
//! serves exactly one of them, stamping the session `search_path` on
//! every connection it opens. [`repository::PriceRepository`] exposes the
//! idempotent operations the pipeline uses: instrument resolution, price
//! upserts with hash-based change detection, job tracking, and quality
//! verdict persistence.

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{PgPool, PgPooledConnection, build_pool, establish_connection};
pub use repository::{
  IngestRepository, InstrumentState, PartitionedRows, PriceRepository, RepositoryError,
  RepositoryResult, UpsertOutcome, dominant_operation, partition_rows,
};
