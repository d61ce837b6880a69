//! Member route handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::members as service;
use crate::model::{Member, MemberProfile, MemberRole};
use crate::web::auth::CurrentUser;
use crate::web::error::{Data, Deleted};
use crate::web::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembersQuery {
    pub workspace_id: String,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: MemberRole,
}

pub async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListMembersQuery>,
) -> Result<Data<Vec<MemberProfile>>> {
    Ok(Data::new(
        service::list_members(&state.db, &query.workspace_id, user.id()).await?,
    ))
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(member_id): Path<String>,
) -> Result<Data<Deleted>> {
    let id = service::remove_member(&state.db, &member_id, user.id()).await?;
    Ok(Data::new(Deleted { id }))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(member_id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Data<Member>> {
    Ok(Data::new(
        service::update_member_role(&state.db, &member_id, req.role, user.id()).await?,
    ))
}
