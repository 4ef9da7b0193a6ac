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

//! # mdi-core
//!
//! Core types, configuration, and error handling for the market data
//! ingest pipeline.
//!
//! This crate provides the foundational components shared across all
//! pipeline crates:
//!
//! - [`AppConfig`], [`DatabaseConfig`], [`ExtractorConfig`] - environment-driven configuration
//! - [`Error`] and [`Result`] - unified error handling
//! - [`Environment`], [`ExtractionMode`], [`JobStatus`] - shared domain vocabulary
//! - [`TradingCalendar`] - exchange trading-day classification
//!
//! ## Example
//!
//! ```
//! use mdi_core::{Environment, ExtractionMode};
//!
//! let env: Environment = "prod".parse().unwrap();
//! assert_eq!(env.schema_name(), "prod_stock_data");
//! let mode = ExtractionMode::Incremental;
//! assert!(mode.is_concrete());
//! ```

pub mod calendar;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::{ExchangeSpec, TradingCalendar};
pub use config::{AppConfig, DatabaseConfig, ExtractorConfig};
pub use error::{Error, Result};
pub use types::{
  Environment, ExtractionMode, FetchBound, InstrumentKind, JobStatus, Operation, Severity,
};

/// Default daily-quotes CSV endpoint
pub const DEFAULT_PROVIDER_URL: &str = "https://stooq.com/q/d/l/";

/// Polite minimum delay between provider requests, in seconds
pub const DEFAULT_MIN_DELAY_SECS: f64 = 2.0;

/// Default per-run worker pool ceiling
pub const DEFAULT_WORKERS: usize = 4;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_provider_url() {
    assert!(DEFAULT_PROVIDER_URL.starts_with("https://"));
  }

  #[test]
  fn test_default_min_delay() {
    assert_eq!(DEFAULT_MIN_DELAY_SECS, 2.0);
  }

  #[test]
  fn test_default_workers() {
    assert_eq!(DEFAULT_WORKERS, 4);
  }
}
