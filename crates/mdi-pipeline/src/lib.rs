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

//! # mdi-pipeline
//!
//! Orchestration for the daily market data ingest:
//!
//! - [`trigger::TriggerEvent`] and [`trigger::RunParams`] - the
//!   scheduler-facing adapter with defensive parameter parsing
//! - [`mode::resolve_mode`] - the layered extraction-mode decision
//! - [`orchestrator::Orchestrator`] - gate, fan-out, isolation, finalize
//! - [`quality::QualityChecker`] - post-commit data-quality verdicts
//! - [`job_tracker::JobTracker`] - one job row, one terminal transition
//!
//! Extraction is handled by `mdi-client`, persistence by
//! `mdi-database-postgres`; this crate wires them into replayable,
//! fault-isolated runs.

pub mod error;
pub mod job_tracker;
pub mod mode;
pub mod orchestrator;
pub mod quality;
pub mod trigger;

pub use error::{PipelineError, PipelineResult};
pub use job_tracker::{InstrumentReport, JobCounters, JobTracker};
pub use mode::{ModePolicy, ResolvedMode, SchedulerContext, resolve_mode};
pub use orchestrator::{
  Orchestrator, PipelineConfig, RunSummary, WatchItem, default_universe,
};
pub use quality::{QualityChecker, QualityPolicy, QualityReport};
pub use trigger::{RunParams, TriggerEvent};
