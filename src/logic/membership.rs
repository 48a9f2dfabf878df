//! Groups and who is in them.

use crate::{
    dal::DB,
    error::{FieldErrors, Result},
    logic::access::{authorize, Action},
    schema::{GroupDetail, GroupSummary, Membership, TravelGroup},
};
use futures::try_join;
use log::info;

/// The longest a group's name may be, in characters.
pub const MAX_GROUP_NAME_LEN: usize = 100;

/// Returns whether the user is a member of the group.
pub async fn is_member(db: &DB, user: i64, group: i64) -> Result<bool> {
    Ok(db.get_membership(user, group).await?.is_some())
}

/// Creates a group, with its creator as its first admin.
pub async fn create_group(
    db: &DB,
    user: i64,
    name: String,
    description: String,
) -> Result<TravelGroup> {
    let name = name.trim().to_string();
    let mut errors = FieldErrors::default();
    if name.is_empty() {
        errors.add("name", "Your group needs a name.");
    } else if name.chars().count() > MAX_GROUP_NAME_LEN {
        errors.add(
            "name",
            format!("Group names can be at most {} characters.", MAX_GROUP_NAME_LEN),
        );
    }
    errors.into_result()?;

    let group = db
        .create_group(user, name, description.trim().to_string())
        .await?;
    info!("User {} created group {} ({:?})", user, group.id, group.name);
    Ok(group)
}

/// Adds the user to the group. Joining a group you're already in does nothing.
pub async fn join(db: &DB, user: i64, group: i64) -> Result<Membership> {
    db.join_group(user, group).await
}

/// Removes the user from the group.
pub async fn leave(db: &DB, user: i64, group: i64) -> Result<()> {
    db.leave_group(user, group).await
}

/// Lists the groups the user belongs to, newest first.
pub async fn list_groups(db: &DB, user: i64) -> Result<Vec<GroupSummary>> {
    db.list_groups(user).await
}

/// Gets everything shown on a group's page. Only members may see it.
pub async fn group_detail(db: &DB, user: i64, group: i64) -> Result<GroupDetail> {
    let me = authorize(db, user, group, Action::View).await?;
    let (group, members, places) = try_join!(
        db.get_group(group),
        db.list_members(group),
        db.list_group_places(group, user),
    )?;
    Ok(GroupDetail {
        group,
        me,
        members,
        places,
    })
}

/// Gets a group, if the user may see it.
pub async fn get_group(db: &DB, user: i64, group: i64) -> Result<TravelGroup> {
    let _ = authorize(db, user, group, Action::View).await?;
    db.get_group(group).await
}
