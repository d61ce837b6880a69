//! Project route handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::analytics::{self, AnalyticsResult};
use crate::error::Result;
use crate::model::Project;
use crate::projects::{self as service, NewProject, ProjectUpdate};
use crate::web::auth::CurrentUser;
use crate::web::error::{Data, Deleted};
use crate::web::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub workspace_id: String,
}

pub async fn list_projects(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Data<Vec<Project>>> {
    Ok(Data::new(
        service::list_projects(&state.db, &query.workspace_id, user.id()).await?,
    ))
}

pub async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewProject>,
) -> Result<Data<Project>> {
    Ok(Data::new(service::create_project(&state.db, user.id(), req).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> Result<Data<Project>> {
    Ok(Data::new(service::get_project(&state.db, &project_id, user.id()).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    Json(req): Json<ProjectUpdate>,
) -> Result<Data<Project>> {
    Ok(Data::new(
        service::update_project(&state.db, &project_id, user.id(), req).await?,
    ))
}

pub async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> Result<Data<Deleted>> {
    let id = service::delete_project(&state.db, &project_id, user.id()).await?;
    Ok(Data::new(Deleted { id }))
}

pub async fn project_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> Result<Data<AnalyticsResult>> {
    let result =
        analytics::project_analytics(&state.db, &project_id, user.id(), Utc::now()).await?;
    Ok(Data::new(result))
}
