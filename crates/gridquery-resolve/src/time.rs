//! Time-slot resolution into concrete date windows.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date window bound into `BETWEEN ? AND ?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Resolves time expressions relative to a fixed reference date.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    reference: NaiveDate,
}

impl TimeResolver {
    pub fn new(reference: NaiveDate) -> Self {
        Self { reference }
    }

    /// Anchored at today's local date.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    /// `YYYY-MM-DD` is a single day; relative words resolve against the
    /// reference date. Anything else yields `None`.
    pub fn resolve(&self, expr: &str) -> Option<TimeWindow> {
        match expr.trim() {
            "今天" => Some(TimeWindow::day(self.reference)),
            "昨天" => self.reference.pred_opt().map(TimeWindow::day),
            "本月" => month_of(self.reference),
            "上月" => first_of_month(self.reference)
                .and_then(|first| first.pred_opt())
                .and_then(month_of),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .ok()
                .map(TimeWindow::day),
        }
    }
}

fn first_of_month(day: NaiveDate) -> Option<NaiveDate> {
    day.with_day(1)
}

fn month_of(day: NaiveDate) -> Option<TimeWindow> {
    let start = first_of_month(day)?;
    let next_month = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
    };
    Some(TimeWindow {
        start,
        end: next_month.pred_opt()?,
    })
}
