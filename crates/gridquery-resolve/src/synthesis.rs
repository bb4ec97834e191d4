//! Deterministic query synthesis.
//!
//! One fixed template per intent. Entity values are always bound as `?`
//! parameters; table and column names come from the schema binding and the
//! configuration and are checked as [`Ident`]s before they are quoted in.

use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::time::{TimeResolver, TimeWindow};
use crate::{EntityBag, Intent, SchemaBinding, Slot};
use gridquery_sql::{Ident, SqlBuilder, SqlQuery, SqlValue};

pub struct QuerySynthesizer<'a> {
    config: &'a ResolverConfig,
    time: TimeResolver,
}

impl<'a> QuerySynthesizer<'a> {
    pub fn new(config: &'a ResolverConfig, time: TimeResolver) -> Self {
        Self { config, time }
    }

    /// Pure in `(intent, entities, binding)` for a fixed reference date.
    pub fn synthesize(
        &self,
        intent: Intent,
        entities: &EntityBag,
        binding: &SchemaBinding,
    ) -> Result<SqlQuery, ResolveError> {
        if let Some(slot) = entities.first_missing(intent) {
            return Err(fail(intent, format!("missing `{slot}` slot")));
        }

        let ident = |name: &str| Ident::new(name).map_err(|e| fail(intent, e.to_string()));
        let table = ident(binding.table_name.as_str())?;
        let column = ident(binding.column_name.as_str())?;
        let time_col = ident(self.config.time_column.as_str())?;

        let mut sql = SqlBuilder::new();
        match intent {
            Intent::CalculationPoint => {
                let window = self.window(intent, entities)?;
                sql.push_str("SELECT ")
                    .push_ident(&time_col)
                    .push_str(", ")
                    .push_ident(&column)
                    .push_str(" FROM ")
                    .push_ident(&table)
                    .push_str(" WHERE ")
                    .push_ident(&column)
                    .push_str(" = (SELECT MAX(")
                    .push_ident(&column)
                    .push_str(") FROM ")
                    .push_ident(&table)
                    .push_str(" WHERE ");
                push_between(&mut sql, None, &time_col, window);
                sql.push_str(") AND ");
                push_between(&mut sql, None, &time_col, window);
            }
            Intent::PlanComparison => {
                let window = self.window(intent, entities)?;
                let predicted = ident(self.config.predicted_table.as_str())?;
                sql.push_str("SELECT ")
                    .push_qualified("a", &time_col)
                    .push_str(" AS ")
                    .push_ident(&time_col)
                    .push_str(", ")
                    .push_qualified("a", &column)
                    .push_str(" AS actual_value, ")
                    .push_qualified("b", &column)
                    .push_str(" AS predicted_value, (")
                    .push_qualified("a", &column)
                    .push_str(" - ")
                    .push_qualified("b", &column)
                    .push_str(") AS difference FROM ")
                    .push_ident(&table)
                    .push_str(" a JOIN ")
                    .push_ident(&predicted)
                    .push_str(" b ON ")
                    .push_qualified("a", &time_col)
                    .push_str(" = ")
                    .push_qualified("b", &time_col)
                    .push_str(" WHERE ");
                push_between(&mut sql, Some("a"), &time_col, window);
            }
            Intent::StationInfo => {
                let c = self.config;
                let mut columns = Vec::new();
                for name in [
                    &c.time_column,
                    &c.plant_name_column,
                    &c.region_column,
                    &c.plant_type_column,
                    &c.capacity_column,
                    &c.usage_hours_column,
                    &c.last_year_usage_hours_column,
                ] {
                    columns.push(ident(name.as_str())?);
                }
                if !columns.contains(&column) {
                    columns.push(column.clone());
                }
                let region = ident(c.region_column.as_str())?;
                let plant_type = ident(c.plant_type_column.as_str())?;

                sql.push_str("SELECT ");
                for col in &columns {
                    sql.push_ident(col).push_str(", ");
                }
                sql.push_str("LAG(")
                    .push_ident(&column)
                    .push_str(", 1) OVER (ORDER BY ")
                    .push_ident(&time_col)
                    .push_str(") AS prev_value FROM ")
                    .push_ident(&table)
                    .push_str(" WHERE ")
                    .push_ident(&region)
                    .push_str(" = ");
                let location = entities
                    .get(Slot::Location)
                    .or(binding.location.as_deref())
                    .unwrap_or_default();
                sql.push_param(SqlValue::from(location));
                if let Some(kind) = entities.get(Slot::PlantType) {
                    sql.push_str(" AND ")
                        .push_ident(&plant_type)
                        .push_str(" = ")
                        .push_param(SqlValue::from(kind));
                }
                if entities.get(Slot::Time).is_some() {
                    let window = self.window(intent, entities)?;
                    sql.push_str(" AND ");
                    push_between(&mut sql, None, &time_col, window);
                }
            }
        }

        sql.build().map_err(|e| fail(intent, e.to_string()))
    }

    fn window(&self, intent: Intent, entities: &EntityBag) -> Result<TimeWindow, ResolveError> {
        let expr = entities
            .get(Slot::Time)
            .ok_or_else(|| fail(intent, "missing `time` slot".to_string()))?;
        self.time
            .resolve(expr)
            .ok_or_else(|| fail(intent, format!("unrecognised time expression `{expr}`")))
    }
}

fn fail(intent: Intent, reason: String) -> ResolveError {
    ResolveError::Synthesis { intent, reason }
}

/// A single day binds both bounds as that date. A longer window binds its end
/// as the last second of the final day so timestamps on that day are included.
fn push_between(sql: &mut SqlBuilder, alias: Option<&str>, column: &Ident, window: TimeWindow) {
    let end = match window.end.and_hms_opt(23, 59, 59) {
        Some(last_second) if !window.is_single_day() => SqlValue::Timestamp(last_second),
        _ => SqlValue::Date(window.end),
    };
    match alias {
        Some(alias) => sql.push_qualified(alias, column),
        None => sql.push_ident(column),
    };
    sql.push_str(" BETWEEN ")
        .push_param(SqlValue::Date(window.start))
        .push_str(" AND ")
        .push_param(end);
}
