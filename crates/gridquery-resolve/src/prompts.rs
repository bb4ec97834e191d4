//! Prompt text handed to the search driver's language model.
//!
//! These strings are configuration data: the resolver never parses what the
//! model answers with them. Missing slots render as empty text.

use crate::error::RenderError;
use crate::render::{number, timestamp, ResponseRenderer};
use crate::{EntityBag, Intent, SchemaBinding};
use gridquery_sql::ResultRow;

pub const SYSTEM_PROMPT: &str = "你是一个专业的电力调度员和数据分析师。请按照以下步骤思考问题：\n\
1. 理解用户查询意图\n\
2. 提取关键实体信息\n\
3. 生成数据库查询语句\n\
4. 分析查询结果\n\
5. 生成专业的回答\n\
\n\
请确保每一步都清晰可见，并保持专业性。";

pub fn intent_prompt(query: &str) -> String {
    format!(
        "请分析以下查询属于哪种类型：\n\
         1. 计算点查询（如：最大值、最小值）\n\
         2. 计划比较查询（如：实际值与预测值比较）\n\
         3. 场站信息查询（如：装机容量、利用小时数）\n\
         \n\
         用户查询：{query}"
    )
}

/// Query-generation prompt for the step that precedes execution.
pub fn sql_prompt(intent: Intent, entities: &EntityBag, binding: Option<&SchemaBinding>) -> String {
    let time = entities.time.as_deref().unwrap_or_default();
    let value_type = entities.value_type.as_deref().unwrap_or_default();
    let location = entities.location.as_deref().unwrap_or_default();
    let table = binding.map(|b| b.table_name.as_str()).unwrap_or_default();

    let (target, requirement) = match intent {
        Intent::CalculationPoint => (
            format!("{value_type}的最大值"),
            "需要返回最大值及其对应时间",
        ),
        Intent::PlanComparison => (
            format!("{value_type}与预测值的比较"),
            "需要返回实际值、预测值及其差值",
        ),
        Intent::StationInfo => (
            format!("{location}的{value_type}"),
            "需要返回统计值和同比数据",
        ),
    };

    format!(
        "请根据以下信息生成SQL查询:\n\
         1. 查询目标: {target}\n\
         2. 时间范围: {time}\n\
         3. 表名: {table}\n\
         4. 查询要求: {requirement}"
    )
}

/// Answer-phrasing prompt filled with the figures the renderer derives:
/// the value and its time for a calculation point, actual against predicted
/// for a comparison, and totals over every plant row for station info.
pub fn response_prompt(
    renderer: &ResponseRenderer,
    intent: Intent,
    value_column: &str,
    rows: &[ResultRow],
) -> Result<String, RenderError> {
    let time_column = renderer.config().time_column.as_str();
    let stamp = |row: &ResultRow| -> Result<String, RenderError> {
        Ok(timestamp(row, time_column)?
            .format("%Y-%m-%d %H:%M:%S")
            .to_string())
    };
    let first = rows
        .first()
        .ok_or_else(|| RenderError::MissingField(time_column.to_string()))?;

    let (kind, facts, focus) = match intent {
        Intent::CalculationPoint => (
            "系统负荷最高值",
            vec![
                format!("负荷值：{:.2} MW", number(first, value_column)?),
                format!("发生时间：{}", stamp(first)?),
            ],
            "回答要简洁明了",
        ),
        Intent::PlanComparison => (
            "系统负荷与预测值比较",
            vec![
                format!("当前负荷值：{:.2} MW", number(first, "actual_value")?),
                format!("预测负荷值：{:.2} MW", number(first, "predicted_value")?),
                format!("差值：{:.2} MW", number(first, "difference")?),
                format!("时间：{}", stamp(first)?),
            ],
            "说明实际值与预测值的差异",
        ),
        Intent::StationInfo => {
            let summary = renderer.station_summary(rows)?;
            (
                "电厂信息统计",
                vec![
                    format!("地区：{}", summary.location),
                    format!("电厂数量：{}", summary.plant_count),
                    format!("总装机容量：{:.2} MW", summary.total_capacity),
                    format!("年利用小时数：{:.0}", summary.usage_hours),
                    format!("同比变化：{:.2}%", summary.year_on_year_change),
                ],
                "包含所有重要统计信息",
            )
        }
    };

    let mut prompt = String::from("你是一个专业的电力调度员。请根据以下数据生成一个自然、专业的回答：\n");
    prompt.push_str(&format!("- 查询类型：{kind}\n"));
    for fact in facts {
        prompt.push_str(&format!("- {fact}\n"));
    }
    prompt.push_str(&format!(
        "\n要求：\n1. 使用专业的表达方式\n2. {focus}\n3. 保留数值的准确性"
    ));
    Ok(prompt)
}
