use std::collections::BTreeSet;

use serde::Deserialize;

use crate::date_util::{now_iso, parse_instant, to_iso};
use crate::error::{Error, Result};
use crate::model::{new_id, required_name, Task, TaskStatus};
use crate::query::TaskQuery;
use crate::storage::{repository, Database};
use crate::store::{require_member, require_project, MemberStore};

/// Gap left between neighbouring tasks in a status column.
pub const POSITION_STEP: i64 = 1000;
pub const MIN_POSITION: i64 = 1000;
pub const MAX_POSITION: i64 = 1_000_000;

/// Query parameters for listing tasks. Only the workspace is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<String>,
}

impl TaskFilter {
    pub fn workspace(id: impl Into<String>) -> Self {
        Self {
            workspace_id: id.into(),
            ..Self::default()
        }
    }

    fn to_query(&self) -> Result<TaskQuery> {
        let mut query = TaskQuery::new().workspace(&self.workspace_id);
        if let Some(project_id) = non_empty(&self.project_id) {
            query = query.project(project_id);
        }
        if let Some(assignee_id) = non_empty(&self.assignee_id) {
            query = query.assignee(assignee_id);
        }
        if let Some(status) = self.status {
            query = query.status(status);
        }
        if let Some(due) = non_empty(&self.due_date) {
            query = query.due_on(&parse_instant(due)?);
        }
        Ok(query)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Normalise a user-supplied due date to storage form.
fn due_date_value(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(to_iso(&parse_instant(s)?))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub workspace_id: String,
    pub project_id: String,
    pub assignee_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<String>,
}

/// Partial update. `description` and `due_date` are cleared by an empty
/// string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub due_date: Option<String>,
    pub position: Option<i64>,
}

/// One entry of a board drag-and-drop batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMove {
    pub id: String,
    pub status: TaskStatus,
    pub position: i64,
}

fn check_position(position: i64) -> Result<()> {
    if !(MIN_POSITION..=MAX_POSITION).contains(&position) {
        return Err(Error::Validation(format!(
            "position must be between {MIN_POSITION} and {MAX_POSITION}, got {position}"
        )));
    }
    Ok(())
}

async fn load_task(db: &Database, task_id: &str) -> Result<Task> {
    let id = task_id.to_string();
    db.reader()
        .call(move |conn| repository::get_task(conn, &id))
        .await?
        .ok_or_else(|| Error::NotFound(format!("task {task_id}")))
}

/// Position one step past the end of a status column.
async fn next_position(db: &Database, workspace_id: &str, status: TaskStatus) -> Result<i64> {
    let workspace_id = workspace_id.to_string();
    let max = db
        .reader()
        .call(move |conn| repository::max_position(conn, &workspace_id, status))
        .await?;
    Ok(max.map_or(MIN_POSITION, |p| p + POSITION_STEP))
}

async fn check_project_in_workspace(db: &Database, project_id: &str, workspace_id: &str) -> Result<()> {
    let project = require_project(db, project_id).await?;
    if project.workspace_id != workspace_id {
        return Err(Error::Validation(format!(
            "project {project_id} does not belong to workspace {workspace_id}"
        )));
    }
    Ok(())
}

async fn check_assignee(db: &Database, workspace_id: &str, assignee_id: &str) -> Result<()> {
    if db.find_member(workspace_id, assignee_id).await?.is_none() {
        return Err(Error::Validation(format!(
            "assignee {assignee_id} is not a member of workspace {workspace_id}"
        )));
    }
    Ok(())
}

/// Tasks matching `filter`, newest first.
pub async fn list_tasks(db: &Database, filter: &TaskFilter, user_id: &str) -> Result<Vec<Task>> {
    require_member(db, &filter.workspace_id, user_id).await?;
    let filters = filter.to_query()?.into_filters();
    Ok(db
        .reader()
        .call(move |conn| repository::list_tasks(conn, &filters))
        .await?)
}

/// Create a task at the end of its status column.
pub async fn create_task(db: &Database, user_id: &str, input: NewTask) -> Result<Task> {
    require_member(db, &input.workspace_id, user_id).await?;
    check_project_in_workspace(db, &input.project_id, &input.workspace_id).await?;
    check_assignee(db, &input.workspace_id, &input.assignee_id).await?;

    let name = required_name("name", &input.name)?;
    let due_date = due_date_value(input.due_date.as_deref())?;
    let position = next_position(db, &input.workspace_id, input.status).await?;
    let now = now_iso();

    let task = Task {
        id: new_id(),
        workspace_id: input.workspace_id,
        project_id: input.project_id,
        assignee_id: input.assignee_id,
        name,
        description: input.description.filter(|d| !d.is_empty()),
        status: input.status,
        due_date,
        position,
        created_at: now.clone(),
        updated_at: now,
    };
    db.writer()
        .call({
            let task = task.clone();
            move |conn| repository::insert_task(conn, &task)
        })
        .await?;

    log::info!("created task {} in project {}", task.id, task.project_id);
    Ok(task)
}

pub async fn get_task(db: &Database, task_id: &str, user_id: &str) -> Result<Task> {
    let task = load_task(db, task_id).await?;
    require_member(db, &task.workspace_id, user_id).await?;
    Ok(task)
}

pub async fn update_task(db: &Database, task_id: &str, user_id: &str, update: TaskUpdate) -> Result<Task> {
    let mut task = get_task(db, task_id, user_id).await?;

    if let Some(name) = &update.name {
        task.name = required_name("name", name)?;
    }
    if let Some(description) = update.description {
        task.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(project_id) = update.project_id {
        if project_id != task.project_id {
            check_project_in_workspace(db, &project_id, &task.workspace_id).await?;
            task.project_id = project_id;
        }
    }
    if let Some(assignee_id) = update.assignee_id {
        if assignee_id != task.assignee_id {
            check_assignee(db, &task.workspace_id, &assignee_id).await?;
            task.assignee_id = assignee_id;
        }
    }
    if update.due_date.is_some() {
        task.due_date = due_date_value(update.due_date.as_deref())?;
    }
    match (update.status, update.position) {
        (_, Some(position)) => {
            check_position(position)?;
            if let Some(status) = update.status {
                task.status = status;
            }
            task.position = position;
        }
        (Some(status), None) if status != task.status => {
            task.position = next_position(db, &task.workspace_id, status).await?;
            task.status = status;
        }
        _ => {}
    }
    task.updated_at = now_iso();

    db.writer()
        .call({
            let task = task.clone();
            move |conn| repository::update_task(conn, &task)
        })
        .await?;
    Ok(task)
}

/// Delete a task. Returns its id.
pub async fn delete_task(db: &Database, task_id: &str, user_id: &str) -> Result<String> {
    let task = get_task(db, task_id, user_id).await?;
    db.writer()
        .call({
            let id = task.id.clone();
            move |conn| repository::delete_task(conn, &id)
        })
        .await?;
    log::info!("deleted task {task_id}");
    Ok(task.id)
}

/// Apply a batch of status/position changes atomically. Every task must
/// belong to the same workspace, and the caller must be a member of it.
pub async fn bulk_update_tasks(db: &Database, moves: Vec<TaskMove>, user_id: &str) -> Result<Vec<Task>> {
    if moves.is_empty() {
        return Ok(Vec::new());
    }
    for m in &moves {
        check_position(m.position)?;
    }

    let ids: Vec<String> = moves.iter().map(|m| m.id.clone()).collect();
    let existing = db
        .reader()
        .call(move |conn| {
            let conn: &rusqlite::Connection = conn;
            ids.iter()
                .map(|id| repository::get_task(conn, id).map(|t| (id.clone(), t)))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .await?;

    let mut workspaces = BTreeSet::new();
    for (id, task) in &existing {
        match task {
            Some(task) => {
                workspaces.insert(task.workspace_id.clone());
            }
            None => return Err(Error::NotFound(format!("task {id}"))),
        }
    }
    if workspaces.len() > 1 {
        return Err(Error::Validation(
            "All tasks must belong to the same workspace".into(),
        ));
    }
    if let Some(workspace_id) = workspaces.first() {
        require_member(db, workspace_id, user_id).await?;
    }

    let updated = db
        .writer()
        .call(move |conn| apply_moves(conn, &moves, &now_iso()))
        .await?
        .map_err(|id| Error::NotFound(format!("task {id}")))?;

    log::info!("moved {} tasks", updated.len());
    Ok(updated)
}

/// Apply every move in one transaction. A task that has disappeared rolls
/// the whole batch back and is returned as `Err(id)`.
fn apply_moves(
    conn: &mut rusqlite::Connection,
    moves: &[TaskMove],
    updated_at: &str,
) -> rusqlite::Result<std::result::Result<Vec<Task>, String>> {
    let tx = conn.transaction()?;
    let mut tasks = Vec::with_capacity(moves.len());
    for m in moves {
        if !repository::move_task(&tx, &m.id, m.status, m.position, updated_at)? {
            return Ok(Err(m.id.clone()));
        }
        match repository::get_task(&tx, &m.id)? {
            Some(task) => tasks.push(task),
            None => return Ok(Err(m.id.clone())),
        }
    }
    tx.commit()?;
    Ok(Ok(tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::{seed_member, seed_project, seed_task, seed_user, seed_workspace};

    async fn seeded() -> Database {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "alice")?;
                seed_member(conn, "w1", "bob", "MEMBER")?;
                seed_project(conn, "p1", "w1")?;
                seed_project(conn, "p2", "w1")?;
                seed_workspace(conn, "w2", "zed")?;
                seed_project(conn, "px", "w2")?;
                seed_user(conn, "outsider")?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        db
    }

    fn new_task(name: &str, status: TaskStatus) -> NewTask {
        NewTask {
            workspace_id: "w1".into(),
            project_id: "p1".into(),
            assignee_id: "bob".into(),
            name: name.into(),
            description: None,
            status,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_positions_step_per_column() {
        let db = seeded().await;
        let a = create_task(&db, "alice", new_task("a", TaskStatus::Todo)).await.unwrap();
        let b = create_task(&db, "alice", new_task("b", TaskStatus::Todo)).await.unwrap();
        let c = create_task(&db, "alice", new_task("c", TaskStatus::Done)).await.unwrap();

        assert_eq!(a.position, 1000);
        assert_eq!(b.position, 2000);
        assert_eq!(c.position, 1000);
    }

    #[tokio::test]
    async fn test_create_task_validates_project_and_assignee() {
        let db = seeded().await;

        let mut foreign_project = new_task("x", TaskStatus::Todo);
        foreign_project.project_id = "px".into();
        let err = create_task(&db, "alice", foreign_project).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let mut stranger = new_task("x", TaskStatus::Todo);
        stranger.assignee_id = "outsider".into();
        let err = create_task(&db, "alice", stranger).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = create_task(&db, "outsider", new_task("x", TaskStatus::Todo))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_create_task_normalises_due_date() {
        let db = seeded().await;
        let mut input = new_task("due", TaskStatus::Todo);
        input.due_date = Some("2024-03-10".into());
        let task = create_task(&db, "bob", input).await.unwrap();
        assert_eq!(task.due_date.as_deref(), Some("2024-03-10T00:00:00.000Z"));

        let mut bad = new_task("bad", TaskStatus::Todo);
        bad.due_date = Some("next tuesday".into());
        assert!(matches!(
            create_task(&db, "bob", bad).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_filters() {
        let db = seeded().await;
        db.writer()
            .call(|conn| {
                seed_task(conn, "t1", "p1", "alice", TaskStatus::Todo, Some("2024-03-10"), "2024-03-01")?;
                seed_task(conn, "t2", "p2", "bob", TaskStatus::Done, None, "2024-03-02")?;
                seed_task(conn, "t3", "p1", "bob", TaskStatus::Todo, None, "2024-03-03")?;
                seed_task(conn, "tx", "px", "zed", TaskStatus::Todo, None, "2024-03-03")
            })
            .await
            .unwrap();

        let ids = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.id).collect::<Vec<_>>();

        let all = list_tasks(&db, &TaskFilter::workspace("w1"), "bob").await.unwrap();
        assert_eq!(ids(all), vec!["t3", "t2", "t1"]);

        let filter = TaskFilter {
            project_id: Some("p1".into()),
            status: Some(TaskStatus::Todo),
            ..TaskFilter::workspace("w1")
        };
        assert_eq!(ids(list_tasks(&db, &filter, "bob").await.unwrap()), vec!["t3", "t1"]);

        let filter = TaskFilter {
            assignee_id: Some("bob".into()),
            ..TaskFilter::workspace("w1")
        };
        assert_eq!(ids(list_tasks(&db, &filter, "bob").await.unwrap()), vec!["t3", "t2"]);

        let filter = TaskFilter {
            due_date: Some("2024-03-10".into()),
            project_id: Some(String::new()),
            ..TaskFilter::workspace("w1")
        };
        assert_eq!(ids(list_tasks(&db, &filter, "bob").await.unwrap()), vec!["t1"]);

        let err = list_tasks(&db, &TaskFilter::workspace("w1"), "zed").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_update_task_status_moves_to_column_end() {
        let db = seeded().await;
        create_task(&db, "alice", new_task("done", TaskStatus::Done)).await.unwrap();
        let task = create_task(&db, "alice", new_task("todo", TaskStatus::Todo)).await.unwrap();

        let updated = update_task(
            &db,
            &task.id,
            "bob",
            TaskUpdate {
                status: Some(TaskStatus::Done),
                description: Some("shipped".into()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.position, 2000);
        assert_eq!(updated.description.as_deref(), Some("shipped"));
        assert_eq!(get_task(&db, &task.id, "alice").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_task_rejects_foreign_project() {
        let db = seeded().await;
        let task = create_task(&db, "alice", new_task("t", TaskStatus::Todo)).await.unwrap();
        let err = update_task(
            &db,
            &task.id,
            "alice",
            TaskUpdate {
                project_id: Some("px".into()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let moved = update_task(
            &db,
            &task.id,
            "alice",
            TaskUpdate {
                project_id: Some("p2".into()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.project_id, "p2");
    }

    #[tokio::test]
    async fn test_delete_task() {
        let db = seeded().await;
        let task = create_task(&db, "alice", new_task("t", TaskStatus::Todo)).await.unwrap();

        let err = delete_task(&db, &task.id, "zed").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        assert_eq!(delete_task(&db, &task.id, "bob").await.unwrap(), task.id);
        assert!(matches!(
            get_task(&db, &task.id, "bob").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_bulk_update_moves_tasks() {
        let db = seeded().await;
        let a = create_task(&db, "alice", new_task("a", TaskStatus::Todo)).await.unwrap();
        let b = create_task(&db, "alice", new_task("b", TaskStatus::Todo)).await.unwrap();

        let moves = vec![
            TaskMove {
                id: a.id.clone(),
                status: TaskStatus::InProgress,
                position: 1000,
            },
            TaskMove {
                id: b.id.clone(),
                status: TaskStatus::Todo,
                position: 5000,
            },
        ];
        let updated = bulk_update_tasks(&db, moves, "bob").await.unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].status, TaskStatus::InProgress);
        assert_eq!(updated[1].position, 5000);
    }

    #[tokio::test]
    async fn test_missing_task_rolls_back_batch() {
        let db = seeded().await;
        let a = create_task(&db, "alice", new_task("a", TaskStatus::Todo)).await.unwrap();

        let moves = vec![
            TaskMove {
                id: a.id.clone(),
                status: TaskStatus::Done,
                position: 3000,
            },
            TaskMove {
                id: "gone".into(),
                status: TaskStatus::Done,
                position: 4000,
            },
        ];
        let outcome = db
            .writer()
            .call(move |conn| apply_moves(conn, &moves, &now_iso()))
            .await
            .unwrap();
        assert_eq!(outcome, Err("gone".to_string()));

        // The first move was rolled back with the rest
        let reloaded = get_task(&db, &a.id, "alice").await.unwrap();
        assert_eq!(reloaded, a);
    }

    #[tokio::test]
    async fn test_bulk_update_rejects_mixed_workspaces() {
        let db = seeded().await;
        db.writer()
            .call(|conn| {
                seed_task(conn, "t1", "p1", "alice", TaskStatus::Todo, None, "2024-03-01")?;
                seed_task(conn, "tx", "px", "zed", TaskStatus::Todo, None, "2024-03-01")
            })
            .await
            .unwrap();

        let moves = vec![
            TaskMove {
                id: "t1".into(),
                status: TaskStatus::Done,
                position: 1000,
            },
            TaskMove {
                id: "tx".into(),
                status: TaskStatus::Done,
                position: 1000,
            },
        ];
        let err = bulk_update_tasks(&db, moves, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Nothing was applied
        let t1 = get_task(&db, "t1", "alice").await.unwrap();
        assert_eq!(t1.status, TaskStatus::Todo);

        let bad_position = vec![TaskMove {
            id: "t1".into(),
            status: TaskStatus::Done,
            position: 0,
        }];
        assert!(matches!(
            bulk_update_tasks(&db, bad_position, "alice").await.unwrap_err(),
            Error::Validation(_)
        ));

        let foreign = vec![TaskMove {
            id: "tx".into(),
            status: TaskStatus::Done,
            position: 1000,
        }];
        assert!(matches!(
            bulk_update_tasks(&db, foreign, "alice").await.unwrap_err(),
            Error::Unauthorized(_)
        ));
    }
}
