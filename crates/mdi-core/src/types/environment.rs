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

/// Logical deployment environment.
///
/// Each environment owns its own Postgres schema; all statements for a run
/// execute with the schema resolved from this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  Dev,
  Test,
  Prod,
}

impl Environment {
  /// Schema owning this environment's tables.
  ///
  /// Derived from the enum, never from raw user input, so it is safe to
  /// splice into a `SET search_path` statement.
  pub fn schema_name(&self) -> &'static str {
    match self {
      Environment::Dev => "dev_stock_data",
      Environment::Test => "test_stock_data",
      Environment::Prod => "prod_stock_data",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Environment::Dev => "dev",
      Environment::Test => "test",
      Environment::Prod => "prod",
    }
  }
}

impl std::fmt::Display for Environment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Environment {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "dev" | "development" => Ok(Environment::Dev),
      "test" => Ok(Environment::Test),
      "prod" | "production" => Ok(Environment::Prod),
      other => Err(format!("unknown environment '{other}'")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_schema_names() {
    assert_eq!(Environment::Dev.schema_name(), "dev_stock_data");
    assert_eq!(Environment::Test.schema_name(), "test_stock_data");
    assert_eq!(Environment::Prod.schema_name(), "prod_stock_data");
  }

  #[test]
  fn test_display() {
    assert_eq!(Environment::Dev.to_string(), "dev");
    assert_eq!(Environment::Test.to_string(), "test");
    assert_eq!(Environment::Prod.to_string(), "prod");
  }

  #[test]
  fn test_from_str_aliases() {
    assert_eq!("development".parse::<Environment>().unwrap(), Environment::Dev);
    assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
    assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
  }

  #[test]
  fn test_from_str_rejects_unknown() {
    assert!("staging".parse::<Environment>().is_err());
  }

  #[test]
  fn test_serde_roundtrip() {
    let json = serde_json::to_string(&Environment::Prod).unwrap();
    assert_eq!(json, "\"prod\"");
    let back: Environment = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Environment::Prod);
  }
}
