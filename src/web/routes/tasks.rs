//! Task route handlers.

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::error::Result;
use crate::model::Task;
use crate::tasks::{self as service, NewTask, TaskFilter, TaskMove, TaskUpdate};
use crate::web::auth::CurrentUser;
use crate::web::error::{Data, Deleted};
use crate::web::state::AppState;

pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<TaskFilter>,
) -> Result<Data<Vec<Task>>> {
    Ok(Data::new(service::list_tasks(&state.db, &filter, user.id()).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewTask>,
) -> Result<Data<Task>> {
    Ok(Data::new(service::create_task(&state.db, user.id(), req).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> Result<Data<Task>> {
    Ok(Data::new(service::get_task(&state.db, &task_id, user.id()).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    Json(req): Json<TaskUpdate>,
) -> Result<Data<Task>> {
    Ok(Data::new(
        service::update_task(&state.db, &task_id, user.id(), req).await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> Result<Data<Deleted>> {
    let id = service::delete_task(&state.db, &task_id, user.id()).await?;
    Ok(Data::new(Deleted { id }))
}

pub async fn bulk_update_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(moves): Json<Vec<TaskMove>>,
) -> Result<Data<Vec<Task>>> {
    Ok(Data::new(
        service::bulk_update_tasks(&state.db, moves, user.id()).await?,
    ))
}
