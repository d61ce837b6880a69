//! Row builders shared by tests across the crate.

use rusqlite::{params, Connection};

use crate::date_util::{parse_instant, to_iso};
use crate::model::TaskStatus;

const SEEDED_AT: &str = "2024-01-01T00:00:00.000Z";

fn iso(s: &str) -> String {
    to_iso(&parse_instant(s).expect("fixture dates are valid"))
}

/// A user with a session token equal to `tok-{user_id}`.
pub fn seed_user(conn: &Connection, user_id: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO users (user_id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, format!("User {user_id}"), format!("{user_id}@example.com"), SEEDED_AT],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![format!("tok-{user_id}"), user_id, SEEDED_AT],
    )?;
    Ok(())
}

/// A workspace (invite code `CODE42`) with `admin_id` as its admin member.
pub fn seed_workspace(
    conn: &Connection,
    workspace_id: &str,
    admin_id: &str,
) -> Result<(), rusqlite::Error> {
    seed_user(conn, admin_id)?;
    conn.execute(
        "INSERT INTO workspaces (workspace_id, name, image_url, user_id, invite_code, created_at, updated_at)
         VALUES (?1, ?2, NULL, ?3, 'CODE42', ?4, ?4)",
        params![workspace_id, format!("Workspace {workspace_id}"), admin_id, SEEDED_AT],
    )?;
    seed_member(conn, workspace_id, admin_id, "ADMIN")
}

pub fn seed_member(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
    role: &str,
) -> Result<(), rusqlite::Error> {
    seed_user(conn, user_id)?;
    conn.execute(
        "INSERT INTO members (member_id, workspace_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![format!("m-{workspace_id}-{user_id}"), workspace_id, user_id, role, SEEDED_AT],
    )?;
    Ok(())
}

pub fn seed_project(
    conn: &Connection,
    project_id: &str,
    workspace_id: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO projects (project_id, workspace_id, name, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, NULL, ?4, ?4)",
        params![project_id, workspace_id, format!("Project {project_id}"), SEEDED_AT],
    )?;
    Ok(())
}

/// A task in `project_id`'s workspace. Dates accept `YYYY-MM-DD` or RFC 3339.
pub fn seed_task(
    conn: &Connection,
    task_id: &str,
    project_id: &str,
    assignee_id: &str,
    status: TaskStatus,
    due_date: Option<&str>,
    created_at: &str,
) -> Result<(), rusqlite::Error> {
    let workspace_id: String = conn.query_row(
        "SELECT workspace_id FROM projects WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?;
    let created_at = iso(created_at);
    conn.execute(
        "INSERT INTO tasks (
            task_id, workspace_id, project_id, assignee_id, name, description,
            status, due_date, position, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, 1000, ?8, ?8)",
        params![
            task_id,
            workspace_id,
            project_id,
            assignee_id,
            format!("Task {task_id}"),
            status.as_str(),
            due_date.map(iso),
            created_at,
        ],
    )?;
    Ok(())
}
