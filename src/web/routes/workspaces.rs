//! Workspace route handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::analytics::{self, AnalyticsResult};
use crate::error::Result;
use crate::model::{Workspace, WorkspaceInfo};
use crate::web::auth::CurrentUser;
use crate::web::error::{Data, Deleted};
use crate::web::state::AppState;
use crate::workspaces::{self as service, NewWorkspace, WorkspaceUpdate};

#[derive(Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Data<Vec<Workspace>>> {
    Ok(Data::new(service::list_workspaces(&state.db, user.id()).await?))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewWorkspace>,
) -> Result<Data<Workspace>> {
    Ok(Data::new(service::create_workspace(&state.db, user.id(), req).await?))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
) -> Result<Data<Workspace>> {
    Ok(Data::new(
        service::get_workspace(&state.db, &workspace_id, user.id()).await?,
    ))
}

pub async fn get_workspace_info(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(workspace_id): Path<String>,
) -> Result<Data<WorkspaceInfo>> {
    Ok(Data::new(service::workspace_info(&state.db, &workspace_id).await?))
}

pub async fn update_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
    Json(req): Json<WorkspaceUpdate>,
) -> Result<Data<Workspace>> {
    Ok(Data::new(
        service::update_workspace(&state.db, &workspace_id, user.id(), req).await?,
    ))
}

pub async fn delete_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
) -> Result<Data<Deleted>> {
    let id = service::delete_workspace(&state.db, &workspace_id, user.id()).await?;
    Ok(Data::new(Deleted { id }))
}

pub async fn reset_invite_code(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
) -> Result<Data<Workspace>> {
    Ok(Data::new(
        service::reset_invite_code(&state.db, &workspace_id, user.id()).await?,
    ))
}

pub async fn join_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Data<Workspace>> {
    Ok(Data::new(
        service::join_workspace(&state.db, &workspace_id, user.id(), &req.code).await?,
    ))
}

pub async fn workspace_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<String>,
) -> Result<Data<AnalyticsResult>> {
    let result =
        analytics::workspace_analytics(&state.db, &workspace_id, user.id(), Utc::now()).await?;
    Ok(Data::new(result))
}
