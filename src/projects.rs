use serde::Deserialize;

use crate::date_util::now_iso;
use crate::error::{Error, Result};
use crate::model::{new_id, required_name, Project};
use crate::storage::{repository, Database};
use crate::store::{require_member, require_project};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub workspace_id: String,
    pub name: String,
    pub image_url: Option<String>,
}

/// Partial update. An empty `image_url` removes the image.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

/// Projects of a workspace, newest first.
pub async fn list_projects(db: &Database, workspace_id: &str, user_id: &str) -> Result<Vec<Project>> {
    require_member(db, workspace_id, user_id).await?;
    let workspace_id = workspace_id.to_string();
    Ok(db
        .reader()
        .call(move |conn| repository::list_projects(conn, &workspace_id))
        .await?)
}

pub async fn get_project(db: &Database, project_id: &str, user_id: &str) -> Result<Project> {
    let project = require_project(db, project_id).await?;
    require_member(db, &project.workspace_id, user_id).await?;
    Ok(project)
}

pub async fn create_project(db: &Database, user_id: &str, input: NewProject) -> Result<Project> {
    require_member(db, &input.workspace_id, user_id).await?;

    let now = now_iso();
    let project = Project {
        id: new_id(),
        workspace_id: input.workspace_id,
        name: required_name("name", &input.name)?,
        image_url: input.image_url.filter(|url| !url.is_empty()),
        created_at: now.clone(),
        updated_at: now,
    };
    db.writer()
        .call({
            let project = project.clone();
            move |conn| repository::insert_project(conn, &project)
        })
        .await?;

    log::info!("created project {} in workspace {}", project.id, project.workspace_id);
    Ok(project)
}

pub async fn update_project(
    db: &Database,
    project_id: &str,
    user_id: &str,
    update: ProjectUpdate,
) -> Result<Project> {
    let existing = get_project(db, project_id, user_id).await?;

    let name = match update.name {
        Some(name) => required_name("name", &name)?,
        None => existing.name.clone(),
    };
    let image_url = match update.image_url {
        Some(url) if url.is_empty() => None,
        Some(url) => Some(url),
        None => existing.image_url.clone(),
    };
    let updated_at = now_iso();

    db.writer()
        .call({
            let id = existing.id.clone();
            let name = name.clone();
            let image_url = image_url.clone();
            let updated_at = updated_at.clone();
            move |conn| repository::update_project(conn, &id, &name, image_url.as_deref(), &updated_at)
        })
        .await?;

    Ok(Project {
        name,
        image_url,
        updated_at,
        ..existing
    })
}

/// Delete a project and all of its tasks. Returns the id.
pub async fn delete_project(db: &Database, project_id: &str, user_id: &str) -> Result<String> {
    let project = get_project(db, project_id, user_id).await?;
    let deleted = db
        .writer()
        .call({
            let id = project.id.clone();
            move |conn| repository::delete_project(conn, &id)
        })
        .await?;
    if !deleted {
        return Err(Error::NotFound(format!("project {project_id}")));
    }
    log::info!("deleted project {project_id}");
    Ok(project.id)
}
