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

//! # mdi-client
//!
//! Rate-limited extraction client for the daily-quotes CSV provider.
//!
//! The client issues one HTTP GET per (symbol, bound) request, parses the
//! CSV payload, validates every row, and returns records that are ready
//! for the loader:
//!
//! - [`QuoteClient`] - request pacing, URL construction, bound handling
//! - [`PriceRecord`] - the validated record with its content hash
//! - [`parse_daily_csv`] - header and row validation
//!
//! Database persistence is handled by the consuming pipeline crates.

pub mod client;
pub mod parser;
pub mod record;
pub mod transport;

pub use client::QuoteClient;
pub use parser::{ParsedBatch, parse_daily_csv};
pub use record::{PriceRecord, content_hash};
pub use transport::Transport;
