//! Planzo HTTP API.
//!
//! Axum router over the domain services. Every route lives under `/api` and
//! requires a session; see [`auth::CurrentUser`].

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::storage::Database;

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Workspaces
        .route(
            "/workspaces",
            get(routes::workspaces::list_workspaces).post(routes::workspaces::create_workspace),
        )
        .route(
            "/workspaces/{workspace_id}",
            get(routes::workspaces::get_workspace)
                .patch(routes::workspaces::update_workspace)
                .delete(routes::workspaces::delete_workspace),
        )
        .route(
            "/workspaces/{workspace_id}/info",
            get(routes::workspaces::get_workspace_info),
        )
        .route(
            "/workspaces/{workspace_id}/reset-invite-code",
            post(routes::workspaces::reset_invite_code),
        )
        .route(
            "/workspaces/{workspace_id}/join",
            post(routes::workspaces::join_workspace),
        )
        .route(
            "/workspaces/{workspace_id}/analytics",
            get(routes::workspaces::workspace_analytics),
        )
        // Projects
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/{project_id}",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/projects/{project_id}/analytics",
            get(routes::projects::project_analytics),
        )
        // Tasks
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/bulk-update", post(routes::tasks::bulk_update_tasks))
        .route(
            "/tasks/{task_id}",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        // Members
        .route("/members", get(routes::members::list_members))
        .route(
            "/members/{member_id}",
            axum::routing::patch(routes::members::update_member_role)
                .delete(routes::members::remove_member),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// One `info` line per request with method, path, status and latency.
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    log::info!(
        "{method} {path} -> {} ({} ms)",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Run the web server until it is shut down.
pub async fn run_server(db: Database, config: &ServerConfig) -> Result<()> {
    let app = create_router(AppState::new(db));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| Error::Config(format!("cannot bind {}: {e}", config.bind)))?;
    log::info!("Planzo API listening on http://{}", config.bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Other(format!("server error: {e}")))?;
    Ok(())
}
