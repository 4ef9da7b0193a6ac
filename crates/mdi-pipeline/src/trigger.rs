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

//! Scheduler-facing trigger adapter
//!
//! Translates one external invocation (environment, logical date, run id,
//! parameter blob) into one orchestrator call. The blob is parsed
//! defensively: unknown keys are ignored with a warning, known keys with
//! invalid values fail fast before any database write.

use chrono::NaiveDate;
use mdi_core::{Environment, ExtractionMode};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};

const KNOWN_KEYS: [&str; 3] = ["extraction_mode", "instruments", "target_date"];

/// One external scheduler invocation.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
  pub environment: Environment,

  /// The scheduler's logical (data-interval) date, exchange-local
  pub logical_date: NaiveDate,

  /// Opaque scheduler run identifier; unique per (environment, run)
  pub scheduler_run_id: Option<String>,

  /// Raw parameter blob as handed over by the scheduler
  pub params_blob: Option<Value>,

  /// Manually triggered rather than interval-scheduled
  pub manual: bool,

  /// Whether the scheduler marked this run as catch-up/backfill
  pub is_catchup: bool,
}

/// Validated run parameters extracted from the blob.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
  /// Global mode override (layer 2)
  pub extraction_mode: Option<ExtractionMode>,

  /// Per-symbol overrides (layer 1); concrete modes only
  pub instruments: HashMap<String, ExtractionMode>,

  /// Overrides the scheduler's logical date for the calendar gate
  pub target_date: Option<NaiveDate>,
}

impl RunParams {
  /// Parse a scheduler parameter blob.
  pub fn parse(blob: Option<&Value>) -> PipelineResult<Self> {
    let Some(blob) = blob else {
      return Ok(Self::default());
    };

    let object = blob
      .as_object()
      .ok_or_else(|| PipelineError::InvalidParams("parameter blob must be an object".into()))?;

    for key in object.keys() {
      if !KNOWN_KEYS.contains(&key.as_str()) {
        warn!(%key, "ignoring unknown parameter key");
      }
    }

    let mut params = Self::default();

    if let Some(raw) = object.get("extraction_mode") {
      let text = raw.as_str().ok_or_else(|| {
        PipelineError::InvalidParams("extraction_mode must be a string".into())
      })?;
      params.extraction_mode =
        Some(text.parse().map_err(|e: String| PipelineError::InvalidParams(e))?);
    }

    if let Some(raw) = object.get("instruments") {
      let map = raw.as_object().ok_or_else(|| {
        PipelineError::InvalidParams("instruments must be an object of symbol -> mode".into())
      })?;

      for (symbol, value) in map {
        let text = value.as_str().ok_or_else(|| {
          PipelineError::InvalidParams(format!("mode for '{symbol}' must be a string"))
        })?;
        let mode: ExtractionMode =
          text.parse().map_err(|e: String| PipelineError::InvalidParams(e))?;

        if !mode.is_concrete() {
          return Err(PipelineError::InvalidParams(format!(
            "per-instrument mode for '{symbol}' must be concrete, got '{mode}'"
          )));
        }

        params.instruments.insert(symbol.clone(), mode);
      }
    }

    if let Some(raw) = object.get("target_date") {
      let text = raw
        .as_str()
        .ok_or_else(|| PipelineError::InvalidParams("target_date must be a string".into()))?;
      let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| PipelineError::InvalidParams(format!("invalid target_date '{text}': {e}")))?;
      params.target_date = Some(date);
    }

    Ok(params)
  }

  /// The date the calendar gate evaluates.
  pub fn effective_date(&self, logical_date: NaiveDate) -> NaiveDate {
    self.target_date.unwrap_or(logical_date)
  }

  /// Whether the run explicitly asked for history and may bypass the gate.
  pub fn bypasses_gate(&self) -> bool {
    matches!(
      self.extraction_mode,
      Some(ExtractionMode::Historical) | Some(ExtractionMode::FullBackfill)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_missing_blob_is_default() {
    let params = RunParams::parse(None).unwrap();
    assert!(params.extraction_mode.is_none());
    assert!(params.instruments.is_empty());
    assert!(params.target_date.is_none());
  }

  #[test]
  fn test_full_blob() {
    let blob = json!({
      "extraction_mode": "smart",
      "instruments": {"XTB": "full_backfill", "CDR": "historical"},
      "target_date": "2024-06-14"
    });
    let params = RunParams::parse(Some(&blob)).unwrap();

    assert_eq!(params.extraction_mode, Some(ExtractionMode::Smart));
    assert_eq!(params.instruments.get("XTB"), Some(&ExtractionMode::FullBackfill));
    assert_eq!(params.instruments.get("CDR"), Some(&ExtractionMode::Historical));
    assert_eq!(params.target_date, Some(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()));
  }

  #[test]
  fn test_unknown_keys_are_ignored() {
    let blob = json!({"extraction_mode": "incremental", "retries": 9});
    let params = RunParams::parse(Some(&blob)).unwrap();
    assert_eq!(params.extraction_mode, Some(ExtractionMode::Incremental));
  }

  #[test]
  fn test_invalid_mode_fails_fast() {
    let blob = json!({"extraction_mode": "bulk"});
    let err = RunParams::parse(Some(&blob)).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidParams(_)));
  }

  #[test]
  fn test_non_string_mode_fails_fast() {
    let blob = json!({"extraction_mode": 3});
    assert!(RunParams::parse(Some(&blob)).is_err());
  }

  #[test]
  fn test_smart_per_instrument_is_rejected() {
    let blob = json!({"instruments": {"XTB": "smart"}});
    let err = RunParams::parse(Some(&blob)).unwrap_err();
    assert!(err.to_string().contains("concrete"));
  }

  #[test]
  fn test_invalid_target_date_fails_fast() {
    let blob = json!({"target_date": "14/06/2024"});
    assert!(RunParams::parse(Some(&blob)).is_err());
  }

  #[test]
  fn test_non_object_blob_fails_fast() {
    let blob = json!(["incremental"]);
    assert!(RunParams::parse(Some(&blob)).is_err());
  }

  #[test]
  fn test_effective_date_prefers_target() {
    let logical = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
    let target = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

    let mut params = RunParams::default();
    assert_eq!(params.effective_date(logical), logical);

    params.target_date = Some(target);
    assert_eq!(params.effective_date(logical), target);
  }

  #[test]
  fn test_gate_bypass() {
    let mut params = RunParams::default();
    assert!(!params.bypasses_gate());

    params.extraction_mode = Some(ExtractionMode::Incremental);
    assert!(!params.bypasses_gate());

    params.extraction_mode = Some(ExtractionMode::Historical);
    assert!(params.bypasses_gate());

    params.extraction_mode = Some(ExtractionMode::FullBackfill);
    assert!(params.bypasses_gate());
  }
}
