pub mod repository;

#[cfg(test)]
pub(crate) mod fixtures;

use async_trait::async_trait;
use rusqlite_migration::{Migrations, M};

use crate::config::default_db_path;
use crate::error::{Error, Result};
use crate::model::{Member, Project};
use crate::query::Filter;
use crate::store::{MemberStore, ProjectStore, TaskStore};

/// Database wraps two `tokio_rusqlite::Connection` instances (writer + reader)
/// using WAL mode for concurrent access. The writer serializes writes via
/// `tokio_rusqlite`'s internal channel; the reader can proceed without blocking.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// Open the database at the default path (`~/.planzo/planzo.db`).
    pub async fn open() -> Result<Self> {
        let path = default_db_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Error::Config(e.to_string()))?;
        }
        Self::open_at(path).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("opening database at {}", path.display());

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let reader = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_reader(&reader).await?;

        Ok(Self { writer, reader })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // For in-memory, we share the same connection for reader/writer
        // since in-memory DBs are per-connection.
        Ok(Self {
            reader: writer.clone(),
            writer,
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            let migrations =
                Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))]);
            migrations.to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Get a reference to the writer connection.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Get a reference to the reader connection.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }
}

#[async_trait]
impl TaskStore for Database {
    async fn count_tasks(&self, filters: Vec<Filter>) -> Result<u64> {
        let count = self
            .reader()
            .call(move |conn| repository::count_tasks(conn, &filters))
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl MemberStore for Database {
    async fn find_member(&self, workspace_id: &str, user_id: &str) -> Result<Option<Member>> {
        let workspace_id = workspace_id.to_string();
        let user_id = user_id.to_string();
        let member = self
            .reader()
            .call(move |conn| repository::find_member(conn, &workspace_id, &user_id))
            .await?;
        Ok(member)
    }
}

#[async_trait]
impl ProjectStore for Database {
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>> {
        let project_id = project_id.to_string();
        let project = self
            .reader()
            .call(move |conn| repository::get_project(conn, &project_id))
            .await?;
        Ok(project)
    }
}
