//! Resolver configuration.
//!
//! Defaults match the deployed schema (Chinese column names, `预测值` suffix,
//! `预测值表` predicted-values table). Any field may be overridden from JSON.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Appended to a value type to name its predicted counterpart.
    pub predicted_suffix: String,
    /// Table joined for plan comparisons.
    pub predicted_table: String,
    /// Timestamp column shared by every metric table.
    pub time_column: String,
    /// Region column of the plant table.
    pub region_column: String,
    /// Plant-type column of the plant table.
    pub plant_type_column: String,
    /// Plant-name column of the plant table.
    pub plant_name_column: String,
    /// Installed-capacity column of the plant table.
    pub capacity_column: String,
    /// This year's utilisation-hours column.
    pub usage_hours_column: String,
    /// Last year's utilisation-hours column.
    pub last_year_usage_hours_column: String,
    /// Load above this is reported as high (MW).
    pub high_load_threshold: f64,
    /// Load above this (and not high) is reported as medium (MW).
    pub medium_load_threshold: f64,
    /// Require synthesized SQL to parse as a single SELECT.
    pub strict_sql: bool,
    /// Anchor for 今天/昨天/本月/上月; the local date when unset.
    pub reference_date: Option<NaiveDate>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            predicted_suffix: "预测值".to_string(),
            predicted_table: "预测值表".to_string(),
            time_column: "时间".to_string(),
            region_column: "所在地区".to_string(),
            plant_type_column: "类型".to_string(),
            plant_name_column: "厂站名称".to_string(),
            capacity_column: "装机容量".to_string(),
            usage_hours_column: "年利用小时数".to_string(),
            last_year_usage_hours_column: "去年利用小时数".to_string(),
            high_load_threshold: 50_000.0,
            medium_load_threshold: 30_000.0,
            strict_sql: false,
            reference_date: None,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid resolver config")?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Name of the predicted counterpart of `value_type`.
    pub fn predicted_value_type(&self, value_type: &str) -> String {
        format!("{value_type}{}", self.predicted_suffix)
    }

    fn check(&self) -> Result<()> {
        if self.medium_load_threshold > self.high_load_threshold {
            anyhow::bail!(
                "medium_load_threshold ({}) exceeds high_load_threshold ({})",
                self.medium_load_threshold,
                self.high_load_threshold
            );
        }
        if self.predicted_suffix.is_empty() {
            anyhow::bail!("predicted_suffix must not be empty");
        }
        Ok(())
    }
}
