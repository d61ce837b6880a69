use chrono::{DateTime, Utc};

use crate::date_util::to_iso;
use crate::error::Result;
use crate::model::{Scope, TaskStatus};
use crate::query::filter::{Filter, TaskField};
use crate::query::window::MonthWindow;
use crate::store::TaskStore;

/// Builder for task filters. Every call adds one predicate; all predicates
/// must hold for a task to match.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    filters: Vec<Filter>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the workspace or project named by `scope`.
    pub fn scope(self, scope: &Scope) -> Self {
        match scope {
            Scope::Workspace(id) => self.workspace(id),
            Scope::Project(id) => self.project(id),
        }
    }

    pub fn workspace(mut self, id: &str) -> Self {
        self.filters.push(Filter::equal(TaskField::WorkspaceId, id));
        self
    }

    pub fn project(mut self, id: &str) -> Self {
        self.filters.push(Filter::equal(TaskField::ProjectId, id));
        self
    }

    pub fn assignee(mut self, id: &str) -> Self {
        self.filters.push(Filter::equal(TaskField::AssigneeId, id));
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.filters
            .push(Filter::equal(TaskField::Status, status.as_str()));
        self
    }

    pub fn not_status(mut self, status: TaskStatus) -> Self {
        self.filters
            .push(Filter::not_equal(TaskField::Status, status.as_str()));
        self
    }

    /// Tasks whose due date is strictly before `t`.
    pub fn due_before(mut self, t: &DateTime<Utc>) -> Self {
        self.filters.push(Filter::before(TaskField::DueDate, t));
        self
    }

    /// Tasks due exactly at `t`.
    pub fn due_on(mut self, t: &DateTime<Utc>) -> Self {
        self.filters
            .push(Filter::equal(TaskField::DueDate, to_iso(t)));
        self
    }

    /// Tasks created inside the window, bounds included.
    pub fn created_within(mut self, window: &MonthWindow) -> Self {
        self.filters.push(Filter::between(
            TaskField::CreatedAt,
            &window.start(),
            &window.end(),
        ));
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn into_filters(self) -> Vec<Filter> {
        self.filters
    }

    /// Count matching tasks in `store`.
    pub async fn count(self, store: &dyn TaskStore) -> Result<u64> {
        store.count_tasks(self.filters).await
    }
}
