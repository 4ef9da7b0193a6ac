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

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of one pipeline invocation.
///
/// `Running` is the only non-terminal state; a job transitions out of it
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
  Running,
  Completed,
  Partial,
  Failed,
  Skipped,
}

impl JobStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      JobStatus::Running => "running",
      JobStatus::Completed => "completed",
      JobStatus::Partial => "partial",
      JobStatus::Failed => "failed",
      JobStatus::Skipped => "skipped",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, JobStatus::Running)
  }

  /// Process exit code in CLI mode.
  pub fn exit_code(&self) -> i32 {
    match self {
      JobStatus::Completed | JobStatus::Skipped => 0,
      JobStatus::Failed => 1,
      JobStatus::Partial => 2,
      JobStatus::Running => 1,
    }
  }
}

impl std::fmt::Display for JobStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for JobStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "running" => Ok(JobStatus::Running),
      "completed" => Ok(JobStatus::Completed),
      "partial" => Ok(JobStatus::Partial),
      "failed" => Ok(JobStatus::Failed),
      "skipped" => Ok(JobStatus::Skipped),
      other => Err(format!("unknown job status '{other}'")),
    }
  }
}

/// Outcome recorded for one (job, instrument) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
  Insert,
  Update,
  Skip,
  Error,
}

impl Operation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operation::Insert => "insert",
      Operation::Update => "update",
      Operation::Skip => "skip",
      Operation::Error => "error",
    }
  }
}

impl std::fmt::Display for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Severity of one quality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Warn,
  Error,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::Info => "info",
      Severity::Warn => "warn",
      Severity::Error => "error",
    }
  }
}

impl std::fmt::Display for Severity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
