use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::model::{
    Member, MemberProfile, MemberRole, Project, Task, TaskStatus, User, Workspace,
};
use crate::query::filter::{where_clause, Filter};

/// Parse an enum stored as TEXT, reporting a conversion failure on bad data.
fn parse_column<T: std::str::FromStr<Err = crate::Error>>(
    row: &Row<'_>,
    idx: usize,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: crate::Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Users & sessions ───────────────────────────────────────────────

pub fn insert_user(conn: &Connection, user: &User, created_at: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (user_id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.email, created_at],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT user_id, name, email FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn insert_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    created_at: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, created_at],
    )?;
    Ok(())
}

/// The user a session token belongs to, if the token is known.
pub fn find_session_user(conn: &Connection, token: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT user_id FROM sessions WHERE token = ?1",
        params![token],
        |row| row.get(0),
    )
    .optional()
}

// ── Workspaces ─────────────────────────────────────────────────────

const WORKSPACE_COLUMNS: &str =
    "w.workspace_id, w.name, w.image_url, w.user_id, w.invite_code, w.created_at, w.updated_at";

fn workspace_from_row(row: &Row<'_>) -> Result<Workspace, rusqlite::Error> {
    Ok(Workspace {
        id: row.get(0)?,
        name: row.get(1)?,
        image_url: row.get(2)?,
        user_id: row.get(3)?,
        invite_code: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn insert_workspace(conn: &Connection, ws: &Workspace) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO workspaces (workspace_id, name, image_url, user_id, invite_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            ws.id,
            ws.name,
            ws.image_url,
            ws.user_id,
            ws.invite_code,
            ws.created_at,
            ws.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_workspace(conn: &Connection, workspace_id: &str) -> Result<Option<Workspace>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces w WHERE w.workspace_id = ?1"),
        params![workspace_id],
        workspace_from_row,
    )
    .optional()
}

/// Workspaces the user belongs to, newest first.
pub fn list_workspaces_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<Workspace>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORKSPACE_COLUMNS} FROM workspaces w
         JOIN members m ON m.workspace_id = w.workspace_id
         WHERE m.user_id = ?1
         ORDER BY w.created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], workspace_from_row)?;
    rows.collect()
}

pub fn update_workspace(
    conn: &Connection,
    workspace_id: &str,
    name: &str,
    image_url: Option<&str>,
    updated_at: &str,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE workspaces SET name = ?2, image_url = ?3, updated_at = ?4 WHERE workspace_id = ?1",
        params![workspace_id, name, image_url, updated_at],
    )?;
    Ok(count > 0)
}

pub fn set_invite_code(
    conn: &Connection,
    workspace_id: &str,
    invite_code: &str,
    updated_at: &str,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE workspaces SET invite_code = ?2, updated_at = ?3 WHERE workspace_id = ?1",
        params![workspace_id, invite_code, updated_at],
    )?;
    Ok(count > 0)
}

/// Delete a workspace; members, projects and tasks go with it.
pub fn delete_workspace(conn: &Connection, workspace_id: &str) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "DELETE FROM workspaces WHERE workspace_id = ?1",
        params![workspace_id],
    )?;
    Ok(count > 0)
}

// ── Members ────────────────────────────────────────────────────────

fn member_from_row(row: &Row<'_>) -> Result<Member, rusqlite::Error> {
    Ok(Member {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        user_id: row.get(2)?,
        role: parse_column::<MemberRole>(row, 3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert_member(conn: &Connection, member: &Member) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO members (member_id, workspace_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            member.id,
            member.workspace_id,
            member.user_id,
            member.role.as_str(),
            member.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_member(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> Result<Option<Member>, rusqlite::Error> {
    conn.query_row(
        "SELECT member_id, workspace_id, user_id, role, created_at
         FROM members WHERE workspace_id = ?1 AND user_id = ?2",
        params![workspace_id, user_id],
        member_from_row,
    )
    .optional()
}

pub fn get_member(conn: &Connection, member_id: &str) -> Result<Option<Member>, rusqlite::Error> {
    conn.query_row(
        "SELECT member_id, workspace_id, user_id, role, created_at
         FROM members WHERE member_id = ?1",
        params![member_id],
        member_from_row,
    )
    .optional()
}

/// Members of a workspace with their user's name and email, oldest first.
pub fn list_members(
    conn: &Connection,
    workspace_id: &str,
) -> Result<Vec<MemberProfile>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT m.member_id, m.workspace_id, m.user_id, m.role, m.created_at, u.name, u.email
         FROM members m
         LEFT JOIN users u ON u.user_id = m.user_id
         WHERE m.workspace_id = ?1
         ORDER BY m.created_at, m.member_id",
    )?;
    let rows = stmt.query_map(params![workspace_id], |row| {
        Ok(MemberProfile {
            member: member_from_row(row)?,
            name: row.get(5)?,
            email: row.get(6)?,
        })
    })?;
    rows.collect()
}

pub fn count_members(conn: &Connection, workspace_id: &str) -> Result<u64, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM members WHERE workspace_id = ?1",
        params![workspace_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn update_member_role(
    conn: &Connection,
    member_id: &str,
    role: MemberRole,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE members SET role = ?2 WHERE member_id = ?1",
        params![member_id, role.as_str()],
    )?;
    Ok(count > 0)
}

pub fn delete_member(conn: &Connection, member_id: &str) -> Result<bool, rusqlite::Error> {
    let count = conn.execute("DELETE FROM members WHERE member_id = ?1", params![member_id])?;
    Ok(count > 0)
}

// ── Projects ───────────────────────────────────────────────────────

const PROJECT_COLUMNS: &str = "project_id, workspace_id, name, image_url, created_at, updated_at";

fn project_from_row(row: &Row<'_>) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert_project(conn: &Connection, project: &Project) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO projects (project_id, workspace_id, name, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            project.id,
            project.workspace_id,
            project.name,
            project.image_url,
            project.created_at,
            project.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
        params![project_id],
        project_from_row,
    )
    .optional()
}

/// Projects in a workspace, newest first.
pub fn list_projects(conn: &Connection, workspace_id: &str) -> Result<Vec<Project>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE workspace_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![workspace_id], project_from_row)?;
    rows.collect()
}

pub fn update_project(
    conn: &Connection,
    project_id: &str,
    name: &str,
    image_url: Option<&str>,
    updated_at: &str,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE projects SET name = ?2, image_url = ?3, updated_at = ?4 WHERE project_id = ?1",
        params![project_id, name, image_url, updated_at],
    )?;
    Ok(count > 0)
}

/// Delete a project and its tasks.
pub fn delete_project(conn: &Connection, project_id: &str) -> Result<bool, rusqlite::Error> {
    let count = conn.execute("DELETE FROM projects WHERE project_id = ?1", params![project_id])?;
    Ok(count > 0)
}

// ── Tasks ──────────────────────────────────────────────────────────

const TASK_COLUMNS: &str = "task_id, workspace_id, project_id, assignee_id, name, description, \
                            status, due_date, position, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        assignee_id: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        status: parse_column::<TaskStatus>(row, 6)?,
        due_date: row.get(7)?,
        position: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub fn insert_task(conn: &Connection, task: &Task) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({TASK_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            task.id,
            task.workspace_id,
            task.project_id,
            task.assignee_id,
            task.name,
            task.description,
            task.status.as_str(),
            task.due_date,
            task.position,
            task.created_at,
            task.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_task(conn: &Connection, task_id: &str) -> Result<Option<Task>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"),
        params![task_id],
        task_from_row,
    )
    .optional()
}

/// Tasks matching every filter, newest first.
pub fn list_tasks(conn: &Connection, filters: &[Filter]) -> Result<Vec<Task>, rusqlite::Error> {
    let (where_sql, values) = where_clause(filters);
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks {where_sql} ORDER BY created_at DESC, task_id");
    log::debug!("list_tasks: {sql} {values:?}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), task_from_row)?;
    rows.collect()
}

/// Number of tasks matching every filter.
pub fn count_tasks(conn: &Connection, filters: &[Filter]) -> Result<u64, rusqlite::Error> {
    let (where_sql, values) = where_clause(filters);
    let sql = format!("SELECT COUNT(*) FROM tasks {where_sql}");
    log::debug!("count_tasks: {sql} {values:?}");
    let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count as u64)
}

/// Highest `position` in a workspace's status column, if the column has tasks.
pub fn max_position(
    conn: &Connection,
    workspace_id: &str,
    status: TaskStatus,
) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT MAX(position) FROM tasks WHERE workspace_id = ?1 AND status = ?2",
        params![workspace_id, status.as_str()],
        |row| row.get(0),
    )
}

/// Overwrite the mutable columns of a task.
pub fn update_task(conn: &Connection, task: &Task) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE tasks SET
            project_id = ?2, assignee_id = ?3, name = ?4, description = ?5,
            status = ?6, due_date = ?7, position = ?8, updated_at = ?9
         WHERE task_id = ?1",
        params![
            task.id,
            task.project_id,
            task.assignee_id,
            task.name,
            task.description,
            task.status.as_str(),
            task.due_date,
            task.position,
            task.updated_at,
        ],
    )?;
    Ok(count > 0)
}

pub fn move_task(
    conn: &Connection,
    task_id: &str,
    status: TaskStatus,
    position: i64,
    updated_at: &str,
) -> Result<bool, rusqlite::Error> {
    let count = conn.execute(
        "UPDATE tasks SET status = ?2, position = ?3, updated_at = ?4 WHERE task_id = ?1",
        params![task_id, status.as_str(), position, updated_at],
    )?;
    Ok(count > 0)
}

pub fn delete_task(conn: &Connection, task_id: &str) -> Result<bool, rusqlite::Error> {
    let count = conn.execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{TaskField, TaskQuery};
    use crate::storage::fixtures::{seed_member, seed_project, seed_task, seed_workspace};
    use crate::storage::Database;

    #[tokio::test]
    async fn test_workspace_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                let ws = get_workspace(conn, "w1")?.unwrap();
                assert_eq!(ws.invite_code, "CODE42");
                assert_eq!(ws.user_id, "u1");

                assert!(update_workspace(conn, "w1", "Renamed", Some("https://img"), "2024-02-01T00:00:00.000Z")?);
                let ws = get_workspace(conn, "w1")?.unwrap();
                assert_eq!(ws.name, "Renamed");
                assert_eq!(ws.image_url.as_deref(), Some("https://img"));

                assert!(set_invite_code(conn, "w1", "NEWONE", "2024-02-02T00:00:00.000Z")?);
                assert_eq!(get_workspace(conn, "w1")?.unwrap().invite_code, "NEWONE");

                assert!(!update_workspace(conn, "missing", "x", None, "2024-02-01T00:00:00.000Z")?);
                assert_eq!(get_workspace(conn, "missing")?, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_workspaces_for_user_only_includes_memberships() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_workspace(conn, "w2", "u2")?;
                seed_member(conn, "w2", "u1", "MEMBER")?;
                seed_workspace(conn, "w3", "u3")?;

                let ids: Vec<String> = list_workspaces_for_user(conn, "u1")?
                    .into_iter()
                    .map(|w| w.id)
                    .collect();
                assert_eq!(ids.len(), 2);
                assert!(ids.contains(&"w1".to_string()));
                assert!(ids.contains(&"w2".to_string()));
                assert!(list_workspaces_for_user(conn, "nobody")?.is_empty());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_member_crud() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_member(conn, "w1", "u2", "MEMBER")?;

                let m = find_member(conn, "w1", "u2")?.unwrap();
                assert_eq!(m.role, MemberRole::Member);
                assert_eq!(find_member(conn, "w1", "u9")?, None);
                assert_eq!(count_members(conn, "w1")?, 2);

                assert!(update_member_role(conn, &m.id, MemberRole::Admin)?);
                assert_eq!(get_member(conn, &m.id)?.unwrap().role, MemberRole::Admin);

                let profiles = list_members(conn, "w1")?;
                assert_eq!(profiles.len(), 2);
                assert!(profiles.iter().any(|p| p.name.as_deref() == Some("User u2")));

                assert!(delete_member(conn, &m.id)?);
                assert!(!delete_member(conn, &m.id)?);
                assert_eq!(count_members(conn, "w1")?, 1);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_membership_rejected() {
        let db = Database::open_memory().await.unwrap();

        let result = db
            .writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_member(conn, "w1", "u1", "MEMBER")
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_count_tasks_with_filters() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_project(conn, "p1", "w1")?;
                seed_task(conn, "t1", "p1", "u1", TaskStatus::Done, None, "2024-03-01")?;
                seed_task(conn, "t2", "p1", "u2", TaskStatus::Todo, Some("2024-03-10"), "2024-03-02")?;
                seed_task(conn, "t3", "p1", "u1", TaskStatus::Todo, None, "2024-03-03")?;

                let all = TaskQuery::new().workspace("w1").into_filters();
                assert_eq!(count_tasks(conn, &all)?, 3);

                let open = TaskQuery::new()
                    .workspace("w1")
                    .not_status(TaskStatus::Done)
                    .into_filters();
                assert_eq!(count_tasks(conn, &open)?, 2);

                let mine = TaskQuery::new().project("p1").assignee("u1").into_filters();
                assert_eq!(count_tasks(conn, &mine)?, 2);

                // NULL due dates never satisfy a comparison
                let due = vec![Filter::LessThan(TaskField::DueDate, "9999-12-31T00:00:00.000Z".into())];
                assert_eq!(count_tasks(conn, &due)?, 1);

                assert_eq!(count_tasks(conn, &[])?, 3);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_tasks_newest_first() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_project(conn, "p1", "w1")?;
                seed_task(conn, "old", "p1", "u1", TaskStatus::Todo, None, "2024-01-05")?;
                seed_task(conn, "new", "p1", "u1", TaskStatus::Todo, None, "2024-03-05")?;

                let tasks = list_tasks(conn, &TaskQuery::new().workspace("w1").into_filters())?;
                let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["new", "old"]);
                assert_eq!(tasks[0].status, TaskStatus::Todo);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_max_position_per_column() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_project(conn, "p1", "w1")?;
                assert_eq!(max_position(conn, "w1", TaskStatus::Todo)?, None);

                seed_task(conn, "t1", "p1", "u1", TaskStatus::Todo, None, "2024-03-01")?;
                assert!(move_task(conn, "t1", TaskStatus::Todo, 3000, "2024-03-02T00:00:00.000Z")?);
                assert_eq!(max_position(conn, "w1", TaskStatus::Todo)?, Some(3000));
                assert_eq!(max_position(conn, "w1", TaskStatus::Done)?, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_workspace_cascades() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                seed_project(conn, "p1", "w1")?;
                seed_task(conn, "t1", "p1", "u1", TaskStatus::Todo, None, "2024-03-01")?;

                assert!(delete_workspace(conn, "w1")?);
                assert_eq!(get_project(conn, "p1")?, None);
                assert_eq!(get_task(conn, "t1")?, None);
                assert_eq!(find_member(conn, "w1", "u1")?, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                seed_workspace(conn, "w1", "u1")?;
                assert_eq!(find_session_user(conn, "tok-u1")?, Some("u1".to_string()));
                assert_eq!(find_session_user(conn, "bogus")?, None);
                assert_eq!(get_user(conn, "u1")?.unwrap().email.as_deref(), Some("u1@example.com"));
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
