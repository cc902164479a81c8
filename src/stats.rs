//! Completion statistics over a range of days.

use crate::tables::Task;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub days: Vec<DayStats>,
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
    pub subtasks_total: usize,
    pub subtasks_completed: usize,
}

pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Summarizes `tasks` for each of `days` consecutive days starting at `start`.
///
/// Tasks outside the range and library templates are ignored.
pub fn summarize_days(tasks: &[Task], start: NaiveDate, days: i64) -> RangeStats {
    let mut summary = RangeStats {
        days: Vec::with_capacity(days.max(0) as usize),
        total: 0,
        completed: 0,
        percent: 0,
        subtasks_total: 0,
        subtasks_completed: 0,
    };

    let dates = (0..days).map_while(|offset| start.checked_add_signed(Duration::days(offset)));
    for date in dates {
        let mut day = DayStats {
            date,
            total: 0,
            completed: 0,
            percent: 0,
        };
        for task in tasks.iter().filter(|t| !t.is_saved && t.date == Some(date)) {
            day.total += 1;
            if task.completed {
                day.completed += 1;
            }
            summary.subtasks_total += task.subtasks.0.len();
            summary.subtasks_completed += task.subtasks.0.iter().filter(|s| s.completed).count();
        }
        day.percent = percent(day.completed, day.total);
        summary.total += day.total;
        summary.completed += day.completed;
        summary.days.push(day);
    }

    summary.percent = percent(summary.completed, summary.total);
    summary
}
