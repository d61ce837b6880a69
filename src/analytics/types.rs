use serde::Serialize;

/// A task count for the current month alongside the prior month's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthOverMonth {
    pub this_month: u64,
    pub last_month: u64,
}

impl MonthOverMonth {
    pub fn new(this_month: u64, last_month: u64) -> Self {
        Self {
            this_month,
            last_month,
        }
    }

    /// `this_month - last_month`; negative when the count dropped.
    pub fn difference(&self) -> i64 {
        self.this_month as i64 - self.last_month as i64
    }
}

/// Month-over-month task metrics for a workspace or project.
///
/// Each `*_count` is the current month's value; each `*_difference` is the
/// current month minus the previous month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub task_count: u64,
    pub task_difference: i64,
    pub assignee_task_count: u64,
    pub assignee_task_difference: i64,
    pub completed_task_count: u64,
    pub completed_task_difference: i64,
    pub incomplete_task_count: u64,
    pub incomplete_task_difference: i64,
    pub overdue_task_count: u64,
    pub overdue_task_difference: i64,
}

impl AnalyticsResult {
    pub fn from_counts(
        total: MonthOverMonth,
        assigned: MonthOverMonth,
        incomplete: MonthOverMonth,
        completed: MonthOverMonth,
        overdue: MonthOverMonth,
    ) -> Self {
        Self {
            task_count: total.this_month,
            task_difference: total.difference(),
            assignee_task_count: assigned.this_month,
            assignee_task_difference: assigned.difference(),
            completed_task_count: completed.this_month,
            completed_task_difference: completed.difference(),
            incomplete_task_count: incomplete.this_month,
            incomplete_task_difference: incomplete.difference(),
            overdue_task_count: overdue.this_month,
            overdue_task_difference: overdue.difference(),
        }
    }
}
