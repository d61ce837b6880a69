use chrono::{DateTime, Utc};

use crate::date_util::to_iso;

/// Task attributes that can appear in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    WorkspaceId,
    ProjectId,
    AssigneeId,
    Status,
    DueDate,
    CreatedAt,
}

impl TaskField {
    /// Column name in the `tasks` table.
    pub fn column(&self) -> &'static str {
        match self {
            TaskField::WorkspaceId => "workspace_id",
            TaskField::ProjectId => "project_id",
            TaskField::AssigneeId => "assignee_id",
            TaskField::Status => "status",
            TaskField::DueDate => "due_date",
            TaskField::CreatedAt => "created_at",
        }
    }
}

/// One predicate against a task attribute. Values are compared as stored
/// text; instants are rendered with [`to_iso`] so that ordering holds.
///
/// `Between` is inclusive at both ends, `LessThan` is strict, and a missing
/// (NULL) attribute never satisfies a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equal(TaskField, String),
    NotEqual(TaskField, String),
    LessThan(TaskField, String),
    Between(TaskField, String, String),
}

impl Filter {
    pub fn equal(field: TaskField, value: impl Into<String>) -> Self {
        Filter::Equal(field, value.into())
    }

    pub fn not_equal(field: TaskField, value: impl Into<String>) -> Self {
        Filter::NotEqual(field, value.into())
    }

    pub fn before(field: TaskField, t: &DateTime<Utc>) -> Self {
        Filter::LessThan(field, to_iso(t))
    }

    pub fn between(field: TaskField, low: &DateTime<Utc>, high: &DateTime<Utc>) -> Self {
        Filter::Between(field, to_iso(low), to_iso(high))
    }

    pub fn field(&self) -> TaskField {
        match self {
            Filter::Equal(f, _)
            | Filter::NotEqual(f, _)
            | Filter::LessThan(f, _)
            | Filter::Between(f, _, _) => *f,
        }
    }

    /// SQL predicate with positional placeholders, plus the values to bind.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let col = self.field().column();
        match self {
            Filter::Equal(_, v) => (format!("{col} = ?"), vec![v.clone()]),
            Filter::NotEqual(_, v) => (format!("{col} != ?"), vec![v.clone()]),
            Filter::LessThan(_, v) => (format!("{col} < ?"), vec![v.clone()]),
            Filter::Between(_, lo, hi) => {
                (format!("{col} BETWEEN ? AND ?"), vec![lo.clone(), hi.clone()])
            }
        }
    }
}

/// Combine filters into a `WHERE` clause (empty string when there are none).
pub fn where_clause(filters: &[Filter]) -> (String, Vec<String>) {
    if filters.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut predicates = Vec::with_capacity(filters.len());
    let mut params = Vec::new();
    for filter in filters {
        let (sql, values) = filter.to_sql();
        predicates.push(sql);
        params.extend(values);
    }
    (format!("WHERE {}", predicates.join(" AND ")), params)
}
