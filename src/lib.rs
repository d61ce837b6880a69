pub mod analytics;
pub mod config;
pub mod date_util;
pub mod error;
pub mod members;
pub mod model;
pub mod projects;
pub mod query;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod users;
pub mod web;
pub mod workspaces;

pub use analytics::{compute_analytics, project_analytics, workspace_analytics, AnalyticsResult};
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use model::{Member, MemberRole, Project, Scope, Task, TaskStatus, User, Workspace};
pub use query::{Filter, MonthWindow, TaskField, TaskQuery};
pub use storage::Database;
pub use store::{MemberStore, ProjectStore, TaskStore};
