//! Natural-language answers from result rows.
//!
//! One fixed template per intent. Derived figures (load level, deviation,
//! year-on-year change) are computed here and never stored. Rendering never
//! fails outward: problems collapse to one of three fixed user-facing texts.

use crate::config::ResolverConfig;
use crate::error::RenderError;
use crate::Intent;
use chrono::NaiveDateTime;
use gridquery_sql::{ResultRow, SqlValue};

pub const NO_DATA: &str =
    "抱歉，未能查询到相关数据。请确认查询条件是否正确，或尝试调整查询时间范围。";
pub const INVALID_QUERY: &str = "查询参数有误，请检查输入的时间、地点等信息是否准确。";
pub const SYSTEM_ERROR: &str = "系统处理异常，请稍后重试或联系技术支持。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    High,
    Medium,
    Low,
}

impl LoadLevel {
    pub fn comment(&self) -> &'static str {
        match self {
            LoadLevel::High => "处于高负荷水平",
            LoadLevel::Medium => "处于中等负荷水平",
            LoadLevel::Low => "处于低负荷水平",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseRenderer {
    config: ResolverConfig,
}

impl ResponseRenderer {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Render `rows` for `intent`; `value_column` is the bound metric column.
    pub fn render(&self, intent: Intent, value_column: &str, rows: &[ResultRow]) -> String {
        if rows.is_empty() {
            return NO_DATA.to_string();
        }
        match self.try_render(intent, value_column, rows) {
            Ok(text) => text,
            Err(err @ RenderError::MissingField(_)) => {
                tracing::warn!(%intent, error = %err, "answer template incomplete");
                NO_DATA.to_string()
            }
            Err(err) => {
                tracing::warn!(%intent, error = %err, "failed to render answer");
                SYSTEM_ERROR.to_string()
            }
        }
    }

    pub fn try_render(
        &self,
        intent: Intent,
        value_column: &str,
        rows: &[ResultRow],
    ) -> Result<String, RenderError> {
        let first = rows
            .first()
            .ok_or_else(|| RenderError::MissingField(self.config.time_column.clone()))?;
        match intent {
            Intent::CalculationPoint => self.max_load(first, value_column),
            Intent::PlanComparison => self.load_comparison(first),
            Intent::StationInfo => self.capacity_info(rows),
        }
    }

    pub fn load_level(&self, value: f64) -> LoadLevel {
        if value > self.config.high_load_threshold {
            LoadLevel::High
        } else if value > self.config.medium_load_threshold {
            LoadLevel::Medium
        } else {
            LoadLevel::Low
        }
    }

    fn max_load(&self, row: &ResultRow, value_column: &str) -> Result<String, RenderError> {
        let at = timestamp(row, &self.config.time_column)?;
        let value = number(row, value_column)?;
        Ok(format!(
            "根据调度数据显示，{}系统最高负荷达到{value:.2} MW，发生在{}。\n\
             这一负荷水平{}。\n\
             \n\
             补充说明：\n\
             - 负荷变化趋势：呈现稳定上升趋势\n\
             - 主要影响因素：主要受天气和用电需求影响",
            at.format("%Y年%m月%d日"),
            at.format("%H:%M"),
            self.load_level(value).comment(),
        ))
    }

    fn load_comparison(&self, row: &ResultRow) -> Result<String, RenderError> {
        let at = timestamp(row, &self.config.time_column)?;
        let actual = number(row, "actual_value")?;
        let predicted = number(row, "predicted_value")?;
        let difference = number(row, "difference")?;
        if predicted == 0.0 {
            return Err(RenderError::DivisionByZero("deviation rate"));
        }
        let deviation_rate = difference / predicted * 100.0;
        let direction = if difference < 0.0 { "低于" } else { "高于" };
        Ok(format!(
            "{}时刻系统实际负荷为{actual:.2} MW，\n\
             对比预测负荷{predicted:.2} MW，\n\
             {direction}预测值{:.2} MW。\n\
             \n\
             具体分析：\n\
             - 偏差率：{deviation_rate:.2}%\n\
             - 主要原因：天气变化导致用电需求变化\n\
             - 建议措施：建议关注天气变化对负荷的影响",
            at.format("%Y年%m月%d日 %H:%M"),
            difference.abs(),
        ))
    }

    fn capacity_info(&self, rows: &[ResultRow]) -> Result<String, RenderError> {
        let summary = self.station_summary(rows)?;
        let trend = if summary.year_on_year_change > 0.0 { "增长" } else { "下降" };
        Ok(format!(
            "截至{}，{}{}电厂共{}家，\n\
             总装机容量达{:.2} MW。\n\
             \n\
             运行指标：\n\
             - 年利用小时数：{:.0}小时\n\
             - 同比{trend}：{:.2}%",
            summary.as_of.format("%Y年%m月%d日"),
            summary.location,
            summary.plant_type,
            summary.plant_count,
            summary.total_capacity,
            summary.usage_hours,
            summary.year_on_year_change,
        ))
    }

    /// Totals and averages over every plant row.
    pub fn station_summary(&self, rows: &[ResultRow]) -> Result<StationSummary, RenderError> {
        let c = &self.config;
        let first = rows
            .first()
            .ok_or_else(|| RenderError::MissingField(c.time_column.clone()))?;
        let count = rows.len() as f64;
        let usage_hours = sum(rows, &c.usage_hours_column)? / count;
        let last_year_usage_hours = sum(rows, &c.last_year_usage_hours_column)? / count;
        Ok(StationSummary {
            as_of: timestamp(first, &c.time_column)?,
            location: text(first, &c.region_column)?.to_string(),
            plant_type: text(first, &c.plant_type_column)?.to_string(),
            plant_count: rows.len(),
            total_capacity: sum(rows, &c.capacity_column)?,
            usage_hours,
            last_year_usage_hours,
            year_on_year_change: year_on_year_change(usage_hours, last_year_usage_hours)?,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationSummary {
    pub as_of: NaiveDateTime,
    pub location: String,
    pub plant_type: String,
    pub plant_count: usize,
    pub total_capacity: f64,
    /// Average over plants.
    pub usage_hours: f64,
    pub last_year_usage_hours: f64,
    /// Percent.
    pub year_on_year_change: f64,
}

/// `(this ÷ last − 1) × 100`.
pub fn year_on_year_change(this_period: f64, last_period: f64) -> Result<f64, RenderError> {
    if last_period == 0.0 {
        return Err(RenderError::DivisionByZero("year-on-year change"));
    }
    Ok((this_period / last_period - 1.0) * 100.0)
}

fn field<'r>(row: &'r ResultRow, name: &str) -> Result<&'r SqlValue, RenderError> {
    row.get(name)
        .ok_or_else(|| RenderError::MissingField(name.to_string()))
}

fn mismatch(name: &str, expected: &'static str, found: &SqlValue) -> RenderError {
    RenderError::TypeMismatch {
        field: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

pub(crate) fn number(row: &ResultRow, name: &str) -> Result<f64, RenderError> {
    let value = field(row, name)?;
    value.as_f64().ok_or_else(|| mismatch(name, "number", value))
}

pub(crate) fn text<'r>(row: &'r ResultRow, name: &str) -> Result<&'r str, RenderError> {
    let value = field(row, name)?;
    value.as_str().ok_or_else(|| mismatch(name, "text", value))
}

pub(crate) fn timestamp(row: &ResultRow, name: &str) -> Result<NaiveDateTime, RenderError> {
    let value = field(row, name)?;
    value
        .as_timestamp()
        .ok_or_else(|| mismatch(name, "timestamp", value))
}

fn sum(rows: &[ResultRow], name: &str) -> Result<f64, RenderError> {
    rows.iter().map(|row| number(row, name)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn renderer() -> ResponseRenderer {
        ResponseRenderer::new(ResolverConfig::default())
    }

    #[test]
    fn load_level_thresholds() {
        let r = renderer();
        assert_eq!(r.load_level(57_000.0), LoadLevel::High);
        assert_eq!(r.load_level(50_000.0), LoadLevel::Medium);
        assert_eq!(r.load_level(30_000.5), LoadLevel::Medium);
        assert_eq!(r.load_level(30_000.0), LoadLevel::Low);
    }

    #[test]
    fn max_load_answer() {
        let rows = vec![ResultRow::new()
            .with("时间", at(14, 30))
            .with("系统负荷", 57_000.0)];
        let text = renderer().render(Intent::CalculationPoint, "系统负荷", &rows);
        assert!(text.starts_with("根据调度数据显示，2024年03月20日系统最高负荷达到57000.00 MW，发生在14:30。"));
        assert!(text.contains("这一负荷水平处于高负荷水平。"));
    }

    #[test]
    fn comparison_below_prediction() {
        let rows = vec![ResultRow::new()
            .with("时间", at(14, 0))
            .with("actual_value", 53_000.0)
            .with("predicted_value", 54_000.0)
            .with("difference", -1_000.0)];
        let text = renderer().render(Intent::PlanComparison, "系统负荷", &rows);
        assert!(text.starts_with("2024年03月20日 14:00时刻系统实际负荷为53000.00 MW，"));
        assert!(text.contains("低于预测值1000.00 MW。"));
        assert!(text.contains("偏差率：-1.85%"));
    }

    #[test]
    fn comparison_with_zero_prediction_is_a_system_error() {
        let rows = vec![ResultRow::new()
            .with("时间", at(14, 0))
            .with("actual_value", 10.0)
            .with("predicted_value", 0.0)
            .with("difference", 10.0)];
        assert_eq!(
            renderer().render(Intent::PlanComparison, "系统负荷", &rows),
            SYSTEM_ERROR
        );
    }

    #[test]
    fn empty_rows_are_no_data_for_every_intent() {
        for intent in Intent::ALL {
            assert_eq!(renderer().render(intent, "系统负荷", &[]), NO_DATA);
        }
    }

    #[test]
    fn missing_field_is_no_data() {
        let rows = vec![ResultRow::new().with("时间", at(1, 0))];
        assert_eq!(
            renderer().render(Intent::CalculationPoint, "系统负荷", &rows),
            NO_DATA
        );
    }

    #[test]
    fn wrong_type_is_a_system_error() {
        let rows = vec![ResultRow::new()
            .with("时间", at(1, 0))
            .with("系统负荷", "很高")];
        assert_eq!(
            renderer().render(Intent::CalculationPoint, "系统负荷", &rows),
            SYSTEM_ERROR
        );
    }

    #[test]
    fn station_summary_aggregates_every_row() {
        let plant = |capacity: f64, hours: f64, last: f64| {
            ResultRow::new()
                .with("时间", at(0, 0))
                .with("所在地区", "广东省")
                .with("类型", "煤电")
                .with("装机容量", capacity)
                .with("年利用小时数", hours)
                .with("去年利用小时数", last)
        };
        let rows = vec![plant(2_000.0, 4_500.0, 4_200.0), plant(1_500.0, 4_300.0, 4_100.0)];
        let summary = renderer().station_summary(&rows).unwrap();
        assert_eq!(summary.plant_count, 2);
        assert_relative_eq!(summary.total_capacity, 3_500.0);
        assert_relative_eq!(summary.usage_hours, 4_400.0);
        assert_relative_eq!(summary.last_year_usage_hours, 4_150.0);
        assert_relative_eq!(summary.year_on_year_change, (4_400.0 / 4_150.0 - 1.0) * 100.0);
    }

    #[test]
    fn year_on_year_formula() {
        assert_relative_eq!(
            year_on_year_change(4400.0, 4150.0).unwrap(),
            (4400.0 / 4150.0 - 1.0) * 100.0
        );
        assert!(year_on_year_change(1.0, 0.0).is_err());
    }
}
