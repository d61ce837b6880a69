use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

use crate::date_util::now_iso;
use crate::error::{Error, Result};
use crate::model::{new_id, required_name, Member, MemberRole, Workspace, WorkspaceInfo};
use crate::storage::{repository, Database};
use crate::store::require_member;

pub const INVITE_CODE_LEN: usize = 6;

/// Random alphanumeric invite code.
pub fn generate_invite_code(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: String,
    pub image_url: Option<String>,
}

/// Partial update. An empty `image_url` removes the image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

/// Resolve the requester's membership and insist on the admin role.
pub async fn require_admin(db: &Database, workspace_id: &str, user_id: &str) -> Result<Member> {
    let member = require_member(db, workspace_id, user_id).await?;
    if member.role != MemberRole::Admin {
        log::warn!("user {user_id} is not an admin of workspace {workspace_id}");
        return Err(Error::Unauthorized(
            "You are not authorized to manage this workspace".into(),
        ));
    }
    Ok(member)
}

async fn load_workspace(db: &Database, workspace_id: &str) -> Result<Workspace> {
    let id = workspace_id.to_string();
    db.reader()
        .call(move |conn| repository::get_workspace(conn, &id))
        .await?
        .ok_or_else(|| Error::NotFound(format!("workspace {workspace_id}")))
}

/// Workspaces the user is a member of, newest first.
pub async fn list_workspaces(db: &Database, user_id: &str) -> Result<Vec<Workspace>> {
    let user_id = user_id.to_string();
    Ok(db
        .reader()
        .call(move |conn| repository::list_workspaces_for_user(conn, &user_id))
        .await?)
}

pub async fn get_workspace(db: &Database, workspace_id: &str, user_id: &str) -> Result<Workspace> {
    require_member(db, workspace_id, user_id).await?;
    load_workspace(db, workspace_id).await
}

/// Name and image of a workspace, readable without membership so that an
/// invite link can show what the user is about to join.
pub async fn workspace_info(db: &Database, workspace_id: &str) -> Result<WorkspaceInfo> {
    let ws = load_workspace(db, workspace_id).await?;
    Ok(WorkspaceInfo {
        id: ws.id,
        name: ws.name,
        image_url: ws.image_url,
    })
}

/// Create a workspace and make its creator the first admin.
pub async fn create_workspace(db: &Database, user_id: &str, input: NewWorkspace) -> Result<Workspace> {
    let now = now_iso();
    let workspace = Workspace {
        id: new_id(),
        name: required_name("name", &input.name)?,
        image_url: input.image_url.filter(|url| !url.is_empty()),
        user_id: user_id.to_string(),
        invite_code: generate_invite_code(INVITE_CODE_LEN),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    let admin = Member {
        id: new_id(),
        workspace_id: workspace.id.clone(),
        user_id: user_id.to_string(),
        role: MemberRole::Admin,
        created_at: now,
    };

    db.writer()
        .call({
            let workspace = workspace.clone();
            move |conn| {
                let tx = conn.transaction()?;
                repository::insert_workspace(&tx, &workspace)?;
                repository::insert_member(&tx, &admin)?;
                tx.commit()?;
                Ok::<(), rusqlite::Error>(())
            }
        })
        .await?;

    log::info!("created workspace {} for user {user_id}", workspace.id);
    Ok(workspace)
}

pub async fn update_workspace(
    db: &Database,
    workspace_id: &str,
    user_id: &str,
    update: WorkspaceUpdate,
) -> Result<Workspace> {
    require_admin(db, workspace_id, user_id).await?;
    let existing = load_workspace(db, workspace_id).await?;

    let name = match update.name {
        Some(name) => required_name("name", &name)?,
        None => existing.name,
    };
    let image_url = match update.image_url {
        Some(url) if url.is_empty() => None,
        Some(url) => Some(url),
        None => existing.image_url,
    };

    db.writer()
        .call({
            let id = workspace_id.to_string();
            move |conn| {
                repository::update_workspace(conn, &id, &name, image_url.as_deref(), &now_iso())
            }
        })
        .await?;
    load_workspace(db, workspace_id).await
}

/// Delete a workspace with its members, projects and tasks. Returns the id.
pub async fn delete_workspace(db: &Database, workspace_id: &str, user_id: &str) -> Result<String> {
    require_admin(db, workspace_id, user_id).await?;
    let id = workspace_id.to_string();
    let deleted = db
        .writer()
        .call({
            let id = id.clone();
            move |conn| repository::delete_workspace(conn, &id)
        })
        .await?;
    if !deleted {
        return Err(Error::NotFound(format!("workspace {workspace_id}")));
    }
    log::info!("deleted workspace {workspace_id}");
    Ok(id)
}

/// Replace the invite code; links carrying the old code stop working.
pub async fn reset_invite_code(db: &Database, workspace_id: &str, user_id: &str) -> Result<Workspace> {
    require_admin(db, workspace_id, user_id).await?;
    db.writer()
        .call({
            let id = workspace_id.to_string();
            let code = generate_invite_code(INVITE_CODE_LEN);
            move |conn| repository::set_invite_code(conn, &id, &code, &now_iso())
        })
        .await?;
    load_workspace(db, workspace_id).await
}

/// Join a workspace as a regular member using its invite code.
pub async fn join_workspace(
    db: &Database,
    workspace_id: &str,
    user_id: &str,
    code: &str,
) -> Result<Workspace> {
    let member = Member {
        id: new_id(),
        workspace_id: workspace_id.to_string(),
        user_id: user_id.to_string(),
        role: MemberRole::Member,
        created_at: now_iso(),
    };
    let code = code.to_string();

    // Check and insert in one writer transaction; concurrent joins serialise.
    let outcome = db
        .writer()
        .call(move |conn| -> rusqlite::Result<Result<Workspace>> {
            let tx = conn.transaction()?;
            if repository::find_member(&tx, &member.workspace_id, &member.user_id)?.is_some() {
                return Ok(Err(Error::Validation(
                    "You are already a member of this workspace".into(),
                )));
            }
            let Some(workspace) = repository::get_workspace(&tx, &member.workspace_id)? else {
                return Ok(Err(Error::NotFound(format!(
                    "workspace {}",
                    member.workspace_id
                ))));
            };
            if workspace.invite_code != code {
                return Ok(Err(Error::Validation("Invalid invite code".into())));
            }
            repository::insert_member(&tx, &member)?;
            tx.commit()?;
            Ok(Ok(workspace))
        })
        .await?;
    let workspace = outcome?;

    log::info!("user {user_id} joined workspace {workspace_id}");
    Ok(workspace)
}
