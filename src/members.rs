use crate::error::{Error, Result};
use crate::model::{Member, MemberProfile, MemberRole};
use crate::storage::{repository, Database};
use crate::store::require_member;

/// Members of a workspace, visible to any member.
pub async fn list_members(db: &Database, workspace_id: &str, user_id: &str) -> Result<Vec<MemberProfile>> {
    require_member(db, workspace_id, user_id).await?;
    let workspace_id = workspace_id.to_string();
    Ok(db
        .reader()
        .call(move |conn| repository::list_members(conn, &workspace_id))
        .await?)
}

/// The member row plus the size of its workspace.
async fn load_member(db: &Database, member_id: &str) -> Result<(Member, u64)> {
    let id = member_id.to_string();
    let found = db
        .reader()
        .call(move |conn| -> rusqlite::Result<Option<(Member, u64)>> {
            let Some(member) = repository::get_member(conn, &id)? else {
                return Ok(None);
            };
            let count = repository::count_members(conn, &member.workspace_id)?;
            Ok(Some((member, count)))
        })
        .await?;
    found.ok_or_else(|| Error::NotFound(format!("member {member_id}")))
}

/// Remove a member. Admins may remove anyone; others only themselves.
/// A workspace always keeps at least one member.
pub async fn remove_member(db: &Database, member_id: &str, user_id: &str) -> Result<String> {
    let (target, count) = load_member(db, member_id).await?;
    let requester = require_member(db, &target.workspace_id, user_id).await?;

    if requester.id != target.id && requester.role != MemberRole::Admin {
        log::warn!("user {user_id} tried to remove member {member_id} without admin role");
        return Err(Error::unauthorized());
    }
    if count <= 1 {
        return Err(Error::Validation("Cannot delete the only member".into()));
    }

    let id = target.id.clone();
    db.writer()
        .call(move |conn| repository::delete_member(conn, &id))
        .await?;
    log::info!("removed member {member_id} from workspace {}", target.workspace_id);
    Ok(target.id)
}

/// Change a member's role. Admin only.
pub async fn update_member_role(
    db: &Database,
    member_id: &str,
    role: MemberRole,
    user_id: &str,
) -> Result<Member> {
    let (target, count) = load_member(db, member_id).await?;
    let requester = require_member(db, &target.workspace_id, user_id).await?;

    if requester.role != MemberRole::Admin {
        log::warn!("user {user_id} tried to change role of {member_id} without admin role");
        return Err(Error::unauthorized());
    }
    if count <= 1 && role != MemberRole::Admin {
        return Err(Error::Validation("Cannot downgrade the only member".into()));
    }

    let id = target.id.clone();
    db.writer()
        .call(move |conn| repository::update_member_role(conn, &id, role))
        .await?;
    Ok(Member { role, ..target })
}
