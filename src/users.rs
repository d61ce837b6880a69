//! Local users and their session tokens.
//!
//! Login flows live elsewhere; this module only records users and the opaque
//! bearer tokens the HTTP layer accepts.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::date_util::now_iso;
use crate::error::{Error, Result};
use crate::model::{new_id, required_name, User};
use crate::storage::{repository, Database};

pub const SESSION_TOKEN_LEN: usize = 32;

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Register a user and issue a first session token.
pub async fn create_user(db: &Database, name: &str, email: Option<&str>) -> Result<(User, String)> {
    let user = User {
        id: new_id(),
        name: required_name("name", name)?,
        email: email.map(str::trim).filter(|e| !e.is_empty()).map(String::from),
    };
    let token = generate_token();

    db.writer()
        .call({
            let user = user.clone();
            let token = token.clone();
            move |conn| {
                let now = now_iso();
                let tx = conn.transaction()?;
                repository::insert_user(&tx, &user, &now)?;
                repository::insert_session(&tx, &token, &user.id, &now)?;
                tx.commit()
            }
        })
        .await?;

    log::info!("created user {}", user.id);
    Ok((user, token))
}

/// Issue an additional session token for an existing user.
pub async fn issue_session(db: &Database, user_id: &str) -> Result<String> {
    let id = user_id.to_string();
    let token = generate_token();
    let issued = db
        .writer()
        .call({
            let token = token.clone();
            move |conn| -> rusqlite::Result<bool> {
                if repository::get_user(conn, &id)?.is_none() {
                    return Ok(false);
                }
                repository::insert_session(conn, &token, &id, &now_iso())?;
                Ok(true)
            }
        })
        .await?;
    if !issued {
        return Err(Error::NotFound(format!("user {user_id}")));
    }
    Ok(token)
}

/// The user a bearer token belongs to. Unknown tokens are `Unauthorized`.
pub async fn resolve_session(db: &Database, token: &str) -> Result<User> {
    let token = token.to_string();
    let user = db
        .reader()
        .call(move |conn| -> rusqlite::Result<Option<User>> {
            match repository::find_session_user(conn, &token)? {
                Some(user_id) => repository::get_user(conn, &user_id),
                None => Ok(None),
            }
        })
        .await?;
    user.ok_or_else(|| {
        log::debug!("rejected unknown session token");
        Error::unauthorized()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_user_issues_session() {
        let db = Database::open_memory().await.unwrap();
        let (user, token) = create_user(&db, " Ada ", Some("ada@example.com")).await.unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(token.len(), SESSION_TOKEN_LEN);

        let resolved = resolve_session(&db, &token).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let db = Database::open_memory().await.unwrap();
        let err = resolve_session(&db, "nope").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_issue_session() {
        let db = Database::open_memory().await.unwrap();
        let (user, first) = create_user(&db, "Ada", None).await.unwrap();
        let second = issue_session(&db, &user.id).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(resolve_session(&db, &second).await.unwrap().id, user.id);

        assert!(matches!(
            issue_session(&db, "ghost").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
