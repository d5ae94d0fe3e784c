// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Accumulator configuration: similarity threshold and retention strategy.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// How raw similarity values are treated before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionStrategy {
    /// Keep the raw similarity value.
    #[default]
    Signed,
    /// Keep the absolute value of the similarity.
    Magnitude,
}

impl RetentionStrategy {
    /// Transform a raw similarity under this strategy.
    pub fn apply(self, score: f64) -> f64 {
        match self {
            RetentionStrategy::Signed => score,
            RetentionStrategy::Magnitude => score.abs(),
        }
    }
}

impl TryFrom<i32> for RetentionStrategy {
    type Error = Error;

    /// Convert from the integer codes used by older model configurations.
    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(RetentionStrategy::Signed),
            1 => Ok(RetentionStrategy::Magnitude),
            c => Err(Error::InvalidRetention(c)),
        }
    }
}

impl FromStr for RetentionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "signed" => Ok(RetentionStrategy::Signed),
            "magnitude" | "abs" => Ok(RetentionStrategy::Magnitude),
            _ => Err(Error::UnknownRetention(s.to_string())),
        }
    }
}

/// Parameters for a similarity matrix accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// Similarities at or below this value are discarded.
    pub threshold: f64,
    pub retention: RetentionStrategy,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        AccumulatorConfig {
            threshold: 0.0,
            retention: RetentionStrategy::Signed,
        }
    }
}

impl AccumulatorConfig {
    pub fn new(threshold: f64, retention: RetentionStrategy) -> Self {
        AccumulatorConfig {
            threshold,
            retention,
        }
    }

    /// Load a configuration from JSON, filling in defaults for missing keys.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply the retention strategy and threshold to a raw similarity.
    ///
    /// Returns `None` if the value should be dropped.  NaN never passes.
    pub fn admit(&self, score: f64) -> Option<f64> {
        let score = self.retention.apply(score);
        if score > self.threshold {
            Some(score)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_codes() {
        assert_eq!(
            RetentionStrategy::try_from(0).unwrap(),
            RetentionStrategy::Signed
        );
        assert_eq!(
            RetentionStrategy::try_from(1).unwrap(),
            RetentionStrategy::Magnitude
        );
        assert!(matches!(
            RetentionStrategy::try_from(2),
            Err(Error::InvalidRetention(2))
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "Magnitude".parse::<RetentionStrategy>().unwrap(),
            RetentionStrategy::Magnitude
        );
        assert_eq!(
            "signed".parse::<RetentionStrategy>().unwrap(),
            RetentionStrategy::Signed
        );
        assert!(matches!(
            "square".parse::<RetentionStrategy>(),
            Err(Error::UnknownRetention(_))
        ));
    }

    #[test]
    fn test_json_config() {
        let cfg = AccumulatorConfig::from_json(r#"{"threshold": 0.3, "retention": "magnitude"}"#)
            .unwrap();
        assert_eq!(cfg.threshold, 0.3);
        assert_eq!(cfg.retention, RetentionStrategy::Magnitude);
    }

    #[test]
    fn test_json_defaults() {
        let cfg = AccumulatorConfig::from_json("{}").unwrap();
        assert_eq!(cfg, AccumulatorConfig::default());
    }

    #[test]
    fn test_json_bad_retention() {
        let res = AccumulatorConfig::from_json(r#"{"retention": "cubed"}"#);
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn test_admit_signed() {
        let cfg = AccumulatorConfig::new(0.0, RetentionStrategy::Signed);
        assert_eq!(cfg.admit(0.5), Some(0.5));
        assert_eq!(cfg.admit(0.0), None);
        assert_eq!(cfg.admit(-0.5), None);
        assert_eq!(cfg.admit(f64::NAN), None);
    }

    #[test]
    fn test_admit_magnitude() {
        let cfg = AccumulatorConfig::new(0.3, RetentionStrategy::Magnitude);
        assert_eq!(cfg.admit(-0.9), Some(0.9));
        assert_eq!(cfg.admit(-0.3), None);
        assert_eq!(cfg.admit(0.2), None);
    }
}
