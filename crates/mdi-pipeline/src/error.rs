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

use mdi_database_postgres::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("Invalid run parameters: {0}")]
  InvalidParams(String),

  #[error("Duplicate run: {0}")]
  DuplicateRun(String),

  #[error("Extraction error: {0}")]
  Extraction(#[from] mdi_core::Error),

  #[error("Repository error: {0}")]
  Repository(RepositoryError),

  #[error("Worker task error: {0}")]
  Worker(String),
}

impl From<RepositoryError> for PipelineError {
  fn from(err: RepositoryError) -> Self {
    match err {
      RepositoryError::DuplicateRun(id) => PipelineError::DuplicateRun(id),
      other => PipelineError::Repository(other),
    }
  }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_invalid_params() {
    let err = PipelineError::InvalidParams("extraction_mode must be a string".to_string());
    assert_eq!(err.to_string(), "Invalid run parameters: extraction_mode must be a string");
  }

  #[test]
  fn test_duplicate_run_is_lifted_from_repository() {
    let err: PipelineError = RepositoryError::DuplicateRun("run-42".to_string()).into();
    assert!(matches!(err, PipelineError::DuplicateRun(ref id) if id == "run-42"));
  }

  #[test]
  fn test_other_repository_errors_stay_wrapped() {
    let err: PipelineError = RepositoryError::AlreadyFinalized(7).into();
    assert!(matches!(err, PipelineError::Repository(_)));
  }
}
