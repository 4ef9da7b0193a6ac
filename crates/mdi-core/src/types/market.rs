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

/// Kind of tradable entity carried by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
  Stock,
  Index,
}

impl InstrumentKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      InstrumentKind::Stock => "stock",
      InstrumentKind::Index => "index",
    }
  }
}

impl std::fmt::Display for InstrumentKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for InstrumentKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "stock" | "equity" => Ok(InstrumentKind::Stock),
      "index" => Ok(InstrumentKind::Index),
      other => Err(format!("unknown instrument kind '{other}'")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    assert_eq!(InstrumentKind::Stock.to_string(), "stock");
    assert_eq!(InstrumentKind::Index.to_string(), "index");
  }

  #[test]
  fn test_from_str() {
    assert_eq!("stock".parse::<InstrumentKind>().unwrap(), InstrumentKind::Stock);
    assert_eq!("equity".parse::<InstrumentKind>().unwrap(), InstrumentKind::Stock);
    assert_eq!("Index".parse::<InstrumentKind>().unwrap(), InstrumentKind::Index);
    assert!("bond".parse::<InstrumentKind>().is_err());
  }
}
