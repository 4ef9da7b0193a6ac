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

/// Extraction mode as it appears in scheduler parameters.
///
/// `Smart` is a request to let repository state decide; it is never the
/// final resolution for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
  Incremental,
  Historical,
  FullBackfill,
  Smart,
}

impl ExtractionMode {
  /// Concrete modes can be applied directly; `Smart` defers to state.
  pub fn is_concrete(&self) -> bool {
    !matches!(self, ExtractionMode::Smart)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ExtractionMode::Incremental => "incremental",
      ExtractionMode::Historical => "historical",
      ExtractionMode::FullBackfill => "full_backfill",
      ExtractionMode::Smart => "smart",
    }
  }
}

impl std::fmt::Display for ExtractionMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for ExtractionMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "incremental" => Ok(ExtractionMode::Incremental),
      "historical" => Ok(ExtractionMode::Historical),
      "full_backfill" => Ok(ExtractionMode::FullBackfill),
      "smart" => Ok(ExtractionMode::Smart),
      other => Err(format!("unknown extraction mode '{other}'")),
    }
  }
}

/// How much history one extraction request asks the provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchBound {
  /// Only the most recent trading day
  LatestOnly,

  /// The last `n` calendar rows
  LastN(u32),

  /// Entire available history in one response
  All,
}

impl std::fmt::Display for FetchBound {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FetchBound::LatestOnly => write!(f, "latest_only"),
      FetchBound::LastN(n) => write!(f, "last_{n}"),
      FetchBound::All => write!(f, "all"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mode_display() {
    assert_eq!(ExtractionMode::Incremental.to_string(), "incremental");
    assert_eq!(ExtractionMode::Historical.to_string(), "historical");
    assert_eq!(ExtractionMode::FullBackfill.to_string(), "full_backfill");
    assert_eq!(ExtractionMode::Smart.to_string(), "smart");
  }

  #[test]
  fn test_mode_from_str() {
    assert_eq!("incremental".parse::<ExtractionMode>().unwrap(), ExtractionMode::Incremental);
    assert_eq!("full_backfill".parse::<ExtractionMode>().unwrap(), ExtractionMode::FullBackfill);
    assert!("bulk".parse::<ExtractionMode>().is_err());
  }

  #[test]
  fn test_concreteness() {
    assert!(ExtractionMode::Incremental.is_concrete());
    assert!(ExtractionMode::Historical.is_concrete());
    assert!(ExtractionMode::FullBackfill.is_concrete());
    assert!(!ExtractionMode::Smart.is_concrete());
  }

  #[test]
  fn test_bound_display() {
    assert_eq!(FetchBound::LatestOnly.to_string(), "latest_only");
    assert_eq!(FetchBound::LastN(500).to_string(), "last_500");
    assert_eq!(FetchBound::All.to_string(), "all");
  }

  #[test]
  fn test_serde_snake_case() {
    let json = serde_json::to_string(&ExtractionMode::FullBackfill).unwrap();
    assert_eq!(json, "\"full_backfill\"");
  }
}
