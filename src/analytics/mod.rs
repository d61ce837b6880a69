pub mod types;

pub use types::*;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Scope, TaskStatus};
use crate::query::{MonthWindow, TaskQuery};
use crate::store::{require_member, require_project, MemberStore, ProjectStore, TaskStore};

/// The five task counts reported by [`compute_analytics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Total,
    Assigned,
    Incomplete,
    Completed,
    Overdue,
}

impl Metric {
    /// Filters for this metric, before the creation-month window is applied.
    ///
    /// Overdue compares the due date against `now` for both months, so last
    /// month's figure counts tasks created then that are overdue today.
    pub fn query(&self, scope: &Scope, assignee_id: &str, now: &DateTime<Utc>) -> TaskQuery {
        let q = TaskQuery::new().scope(scope);
        match self {
            Metric::Total => q,
            Metric::Assigned => q.assignee(assignee_id),
            Metric::Incomplete => q.not_status(TaskStatus::Done),
            Metric::Completed => q.status(TaskStatus::Done),
            Metric::Overdue => q.not_status(TaskStatus::Done).due_before(now),
        }
    }
}

/// Count tasks for the current and previous calendar month (by creation
/// time) across five metrics, and report each month-over-month difference.
///
/// The caller must already have authorized the requester; see
/// [`workspace_analytics`] and [`project_analytics`]. Any failed count fails
/// the whole computation.
pub async fn compute_analytics(
    store: &dyn TaskStore,
    scope: &Scope,
    assignee_id: &str,
    now: DateTime<Utc>,
) -> Result<AnalyticsResult> {
    let this_month = MonthWindow::containing(now);
    let last_month = this_month.previous();
    log::debug!(
        "analytics for {} {}: {} vs {}",
        scope.kind(),
        scope.id(),
        this_month.to_key(),
        last_month.to_key()
    );

    let count = |metric: Metric| {
        month_over_month(store, metric, scope, assignee_id, now, this_month, last_month)
    };
    let (total, assigned, incomplete, completed, overdue) = futures::try_join!(
        count(Metric::Total),
        count(Metric::Assigned),
        count(Metric::Incomplete),
        count(Metric::Completed),
        count(Metric::Overdue),
    )?;

    Ok(AnalyticsResult::from_counts(
        total, assigned, incomplete, completed, overdue,
    ))
}

async fn month_over_month(
    store: &dyn TaskStore,
    metric: Metric,
    scope: &Scope,
    assignee_id: &str,
    now: DateTime<Utc>,
    this_month: MonthWindow,
    last_month: MonthWindow,
) -> Result<MonthOverMonth> {
    let base = metric.query(scope, assignee_id, &now);
    let (this, last) = futures::try_join!(
        base.clone().created_within(&this_month).count(store),
        base.created_within(&last_month).count(store),
    )?;
    Ok(MonthOverMonth::new(this, last))
}

/// Analytics for a workspace, on behalf of `user_id`.
pub async fn workspace_analytics<S>(
    store: &S,
    workspace_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<AnalyticsResult>
where
    S: TaskStore + MemberStore,
{
    require_member(store, workspace_id, user_id).await?;
    compute_analytics(store, &Scope::Workspace(workspace_id.to_string()), user_id, now).await
}

/// Analytics for a project, on behalf of `user_id`. Membership is checked
/// against the workspace that owns the project.
pub async fn project_analytics<S>(
    store: &S,
    project_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<AnalyticsResult>
where
    S: TaskStore + MemberStore + ProjectStore,
{
    let project = require_project(store, project_id).await?;
    require_member(store, &project.workspace_id, user_id).await?;
    compute_analytics(store, &Scope::Project(project.id), user_id, now).await
}
