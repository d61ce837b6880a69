//! Seams between the request logic and whatever holds the documents.
//!
//! [`crate::storage::Database`] implements every trait here; tests substitute
//! stubs.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{Member, Project};
use crate::query::Filter;

/// Read access to task counts.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Number of tasks satisfying every filter.
    async fn count_tasks(&self, filters: Vec<Filter>) -> Result<u64>;
}

/// Membership lookup used for authorization.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn find_member(&self, workspace_id: &str, user_id: &str) -> Result<Option<Member>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>>;
}

/// Resolve the requester's membership, or fail with `Unauthorized`.
pub async fn require_member(
    members: &dyn MemberStore,
    workspace_id: &str,
    user_id: &str,
) -> Result<Member> {
    match members.find_member(workspace_id, user_id).await? {
        Some(member) => Ok(member),
        None => {
            log::warn!("user {user_id} is not a member of workspace {workspace_id}");
            Err(Error::unauthorized())
        }
    }
}

/// Fetch a project, or fail with `NotFound`.
pub async fn require_project(projects: &dyn ProjectStore, project_id: &str) -> Result<Project> {
    projects
        .find_project(project_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("project {project_id}")))
}
