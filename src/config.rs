//! The single source of truth for encoder configuration.
//!
//! `EncoderConfig` is created once at the application boundary (e.g. from a
//! JSON document) and passed down by shared reference. All knobs that affect
//! the produced byte streams live here, so that "same input + same config"
//! yields byte-identical output.

use serde::{Deserialize, Serialize};

use crate::encoding::IterationOrder;
use crate::error::CsxError;

/// Configuration for the substructure analyzer, encoder and CSX assembler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct EncoderConfig {
    /// Minimum run frequency for a delta run to be considered for pattern
    /// encoding.
    #[serde(default = "default_min_limit")]
    pub min_limit: u64,

    /// Maximum number of nonzeros a single pattern unit may cover. Bounded
    /// by the control stream's one-byte unit size, minus one element of
    /// headroom for the row-jump prefix.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Minimum fraction of the partition's nonzeros a delta value must cover
    /// to survive statistics filtering.
    #[serde(default = "default_min_perc")]
    pub min_perc: f64,

    /// Additional iteration orders to exclude from planning, on top of the
    /// always-ignored `None`, `BlockRow(1)` and `BlockCol(1)`.
    #[serde(default)]
    pub ignore: Vec<IterationOrder>,

    /// Emit fixed-width absolute column references instead of delta varints
    /// for each unit's leading column.
    #[serde(default)]
    pub full_column_indices: bool,

    /// Optional cap on the number of planner rounds. `None` runs until no
    /// candidate encoding clears the threshold.
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            min_limit: default_min_limit(),
            max_limit: default_max_limit(),
            min_perc: default_min_perc(),
            ignore: Vec::new(),
            full_column_indices: false,
            max_rounds: None,
        }
    }
}

impl EncoderConfig {
    /// Loads a configuration from a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, CsxError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn default_min_limit() -> u64 {
    4
}

/// One element below the unit size ceiling, leaving headroom for the
/// row-jump varint.
fn default_max_limit() -> u64 {
    254
}

fn default_min_perc() -> f64 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EncoderConfig::default();
        assert_eq!(cfg.min_limit, 4);
        assert_eq!(cfg.max_limit, 254);
        assert!((cfg.min_perc - 0.1).abs() < 1e-12);
        assert!(!cfg.full_column_indices);
        assert!(cfg.ignore.is_empty());
        assert_eq!(cfg.max_rounds, None);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let cfg = EncoderConfig::from_json(r#"{"min_limit": 6}"#).unwrap();
        assert_eq!(cfg.min_limit, 6);
        assert_eq!(cfg.max_limit, 254);
    }

    #[test]
    fn from_json_parses_ignore_set() {
        let cfg = EncoderConfig::from_json(
            r#"{"ignore": ["vertical", {"block_row": 3}]}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.ignore,
            vec![IterationOrder::Vertical, IterationOrder::BlockRow(3)]
        );
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(EncoderConfig::from_json("{not json").is_err());
    }
}
