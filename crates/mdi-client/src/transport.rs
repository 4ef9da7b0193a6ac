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

use mdi_core::{Error, ExtractorConfig, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// HTTP transport for provider requests
///
/// Handles the low-level HTTP communication with the CSV quote provider:
/// request execution, status classification, and retries with exponential
/// backoff for transient failures. Permanent failures (4xx, bad URL) are
/// surfaced immediately.
pub struct Transport {
  client: Client,
  max_retries: u32,
  backoff_base_ms: u64,
}

impl Transport {
  /// Create a new transport instance
  pub fn new(config: &ExtractorConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent("mdi-client/0.2")
      .build()
      .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, max_retries: config.max_retries, backoff_base_ms: config.backoff_base_ms })
  }

  /// Execute a GET request and return the response body.
  ///
  /// Transient failures retry up to `max_retries` with exponential
  /// backoff; non-transient failures return on the first attempt.
  #[instrument(skip(self), fields(url = %url))]
  pub async fn get_text(&self, url: Url) -> Result<String> {
    let mut last_error = None;

    for attempt in 1..=self.max_retries {
      match self.execute(url.clone()).await {
        Ok(body) => return Ok(body),
        Err(e) if e.is_transient() => {
          warn!(attempt, error = %e, "transient provider failure");
          last_error = Some(e);

          if attempt < self.max_retries {
            let delay = Duration::from_millis(self.backoff_base_ms * 2_u64.pow(attempt - 1));
            tokio::time::sleep(delay).await;
          }
        }
        Err(e) => return Err(e),
      }
    }

    Err(last_error.unwrap_or_else(|| Error::Network("Max retries exceeded".to_string())))
  }

  async fn execute(&self, url: Url) -> Result<String> {
    debug!("Making request to: {}", url);

    let response = self.client.get(url).send().await.map_err(|e| {
      if e.is_timeout() {
        Error::Network(format!("Request timed out: {e}"))
      } else {
        Error::Network(format!("Request failed: {e}"))
      }
    })?;

    let status = response.status();
    if status.is_server_error() {
      return Err(Error::Network(format!("HTTP {status}")));
    }
    if !status.is_success() {
      return Err(Error::Provider(format!("HTTP {status}")));
    }

    response.text().await.map_err(|e| Error::Network(format!("Failed to read body: {e}")))
  }
}

impl std::fmt::Debug for Transport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Transport").field("max_retries", &self.max_retries).finish()
  }
}
