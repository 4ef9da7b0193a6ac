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

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use governor::{
  Quota, RateLimiter,
  clock::DefaultClock,
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
};
use mdi_core::{Error, ExtractorConfig, FetchBound, InstrumentKind, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use crate::parser::{ParsedBatch, parse_daily_csv};
use crate::transport::Transport;

/// Calendar cushion when converting a trading-row count to a date range:
/// weekends plus holiday streaks.
const RANGE_SLACK_DAYS: i64 = 14;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate-limited client for the daily-quotes CSV provider
///
/// One client issues at most one outstanding request and spaces
/// successive requests by the configured minimum delay. Workers that
/// fetch concurrently each own their own client.
pub struct QuoteClient {
  transport: Transport,
  rate_limiter: Option<DirectLimiter>,
  base_url: Url,
  request_lock: Mutex<()>,
}

impl QuoteClient {
  /// Create a new provider client
  pub fn new(config: &ExtractorConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| Error::Config(format!("Invalid provider base URL: {e}")))?;

    let rate_limiter = if config.min_delay_secs > 0.0 {
      Quota::with_period(Duration::from_secs_f64(config.min_delay_secs)).map(RateLimiter::direct)
    } else {
      None
    };

    Ok(Self {
      transport: Transport::new(config)?,
      rate_limiter,
      base_url,
      request_lock: Mutex::new(()),
    })
  }

  /// Fetch the daily series for one symbol within the requested bound.
  ///
  /// Returns validated records ascending by date; an empty batch is a
  /// valid outcome (provider has no rows for the window).
  #[instrument(skip(self), fields(symbol = %symbol, bound = %bound))]
  pub async fn daily(
    &self,
    symbol: &str,
    kind: InstrumentKind,
    bound: FetchBound,
  ) -> Result<ParsedBatch> {
    // Held across the whole request: one outstanding request per client
    let _outstanding = self.request_lock.lock().await;

    if let Some(limiter) = &self.rate_limiter {
      limiter.until_ready().await;
    }

    let today = Local::now().date_naive();
    let url = self.build_url(symbol, bound, today);

    debug!(?kind, %url, "fetching daily series");
    let body = self.transport.get_text(url).await?;

    let mut batch = parse_daily_csv(symbol, &body, today)?;
    truncate_to_bound(&mut batch, bound);
    Ok(batch)
  }

  /// Provider query URL for one (symbol, bound) request.
  ///
  /// Bounded fetches are expressed as a date window wide enough to cover
  /// the requested number of trading rows; the batch is truncated after
  /// parsing.
  fn build_url(&self, symbol: &str, bound: FetchBound, today: NaiveDate) -> Url {
    let mut url = self.base_url.clone();
    {
      let mut query = url.query_pairs_mut();
      query.append_pair("s", &symbol.to_ascii_lowercase());
      query.append_pair("i", "d");

      let start = match bound {
        FetchBound::LatestOnly => Some(today - ChronoDuration::days(RANGE_SLACK_DAYS)),
        FetchBound::LastN(n) => {
          // ~5 trading days per 7 calendar days
          let calendar_days = (i64::from(n) * 7 + 4) / 5 + RANGE_SLACK_DAYS;
          Some(today - ChronoDuration::days(calendar_days))
        }
        FetchBound::All => None,
      };

      if let Some(start) = start {
        query.append_pair("d1", &start.format("%Y%m%d").to_string());
        query.append_pair("d2", &today.format("%Y%m%d").to_string());
      }
    }
    url
  }
}

fn truncate_to_bound(batch: &mut ParsedBatch, bound: FetchBound) {
  let keep = match bound {
    FetchBound::LatestOnly => 1,
    FetchBound::LastN(n) => n as usize,
    FetchBound::All => return,
  };

  if batch.records.len() > keep {
    let cut = batch.records.len() - keep;
    batch.records.drain(..cut);
  }
}

impl std::fmt::Debug for QuoteClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QuoteClient").field("base_url", &self.base_url.as_str()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn test_config(base: &str) -> ExtractorConfig {
    ExtractorConfig {
      base_url: format!("{base}/q/d/l/"),
      min_delay_secs: 0.0,
      timeout_secs: 5,
      max_retries: 2,
      backoff_base_ms: 10,
    }
  }

  fn csv_body() -> String {
    let today = Local::now().date_naive();
    let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
    for back in (1..=5).rev() {
      let date = today - ChronoDuration::days(back);
      body.push_str(&format!("{date},6.40,6.55,6.35,6.50,98000\n"));
    }
    body
  }

  #[tokio::test]
  async fn test_daily_latest_only_returns_one_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/q/d/l/"))
      .and(query_param("s", "xtb"))
      .and(query_param("i", "d"))
      .respond_with(ResponseTemplate::new(200).set_body_string(csv_body()))
      .mount(&server)
      .await;

    let client = QuoteClient::new(&test_config(&server.uri())).unwrap();
    let batch =
      client.daily("XTB", InstrumentKind::Stock, FetchBound::LatestOnly).await.unwrap();

    assert_eq!(batch.records.len(), 1);
    // Truncation keeps the most recent row
    let newest = Local::now().date_naive() - ChronoDuration::days(1);
    assert_eq!(batch.records[0].date, newest);
  }

  #[tokio::test]
  async fn test_daily_last_n_truncates_oldest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_string(csv_body()))
      .mount(&server)
      .await;

    let client = QuoteClient::new(&test_config(&server.uri())).unwrap();
    let batch =
      client.daily("XTB", InstrumentKind::Stock, FetchBound::LastN(3)).await.unwrap();

    assert_eq!(batch.records.len(), 3);
    assert!(batch.records.windows(2).all(|w| w[0].date < w[1].date));
  }

  #[tokio::test]
  async fn test_daily_all_keeps_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_string(csv_body()))
      .mount(&server)
      .await;

    let client = QuoteClient::new(&test_config(&server.uri())).unwrap();
    let batch = client.daily("XTB", InstrumentKind::Stock, FetchBound::All).await.unwrap();

    assert_eq!(batch.records.len(), 5);
  }

  #[tokio::test]
  async fn test_daily_empty_response_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_string("No data"))
      .mount(&server)
      .await;

    let client = QuoteClient::new(&test_config(&server.uri())).unwrap();
    let batch =
      client.daily("GHOST", InstrumentKind::Stock, FetchBound::LatestOnly).await.unwrap();

    assert!(batch.records.is_empty());
  }

  #[test]
  fn test_build_url_bounded_window() {
    let config = ExtractorConfig {
      base_url: "https://quotes.example.com/q/d/l/".to_string(),
      ..Default::default()
    };
    let client = QuoteClient::new(&config).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

    let url = client.build_url("XTB", FetchBound::LastN(5), today);
    let query = url.query().unwrap();

    assert!(query.contains("s=xtb"));
    assert!(query.contains("i=d"));
    assert!(query.contains("d2=20240614"));
    // 5 rows -> 7 calendar days + slack
    assert!(query.contains("d1=20240524"));
  }

  #[test]
  fn test_build_url_all_has_no_window() {
    let config = ExtractorConfig {
      base_url: "https://quotes.example.com/q/d/l/".to_string(),
      ..Default::default()
    };
    let client = QuoteClient::new(&config).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

    let url = client.build_url("XTB", FetchBound::All, today);
    let query = url.query().unwrap();

    assert!(!query.contains("d1="));
    assert!(!query.contains("d2="));
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    let config =
      ExtractorConfig { base_url: "not a url".to_string(), ..Default::default() };
    assert!(QuoteClient::new(&config).is_err());
  }
}
