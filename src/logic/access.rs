//! Who may do what to a group.

use crate::{
    dal::DB,
    error::{Error, Result},
    schema::Membership,
};

/// Something a user wants to do within a group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Read the group or anything in it.
    View,

    /// Add to the group: save a place, recommend one.
    Contribute,

    /// Change or remove something in the group that was created by `created_by`.
    Modify {
        /// Who created the thing being changed, if they still exist.
        created_by: Option<i64>,
    },
}

/// Decides whether `user`, whose membership in the group is `membership`, may perform `action`.
///
/// Members may view and contribute. Changing something additionally requires having created it
/// or being an admin of the group.
pub fn permits(user: i64, membership: Option<&Membership>, action: Action) -> bool {
    let membership = match membership {
        Some(membership) if membership.user_id == user => membership,
        _ => return false,
    };
    match action {
        Action::View | Action::Contribute => true,
        Action::Modify { created_by } => membership.is_admin || created_by == Some(user),
    }
}

/// Checks that `user` may perform `action` in `group`, returning their membership.
///
/// A user who may not view a group is told it doesn't exist, rather than that they aren't allowed
/// to see it.
pub async fn authorize(db: &DB, user: i64, group: i64, action: Action) -> Result<Membership> {
    let membership = db.get_membership(user, group).await?;
    match membership {
        Some(membership) if permits(user, Some(&membership), action) => Ok(membership),
        None if action == Action::View => Err(Error::NotFound("group")),
        _ => Err(Error::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::{permits, Action};
    use crate::schema::Membership;
    use chrono::NaiveDate;

    fn membership(user: i64, is_admin: bool) -> Membership {
        Membership {
            id: 1,
            group_id: 7,
            user_id: user,
            is_admin,
            joined_at: NaiveDate::from_ymd_opt(2026, 10, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
        }
    }

    #[test]
    fn outsiders_may_do_nothing() {
        for &action in &[
            Action::View,
            Action::Contribute,
            Action::Modify { created_by: Some(3) },
        ] {
            assert!(!permits(3, None, action));
        }
    }

    #[test]
    fn someone_elses_membership_does_not_count() {
        let m = membership(4, true);
        assert!(!permits(3, Some(&m), Action::View));
    }

    #[test]
    fn members_may_view_and_contribute() {
        let m = membership(3, false);
        assert!(permits(3, Some(&m), Action::View));
        assert!(permits(3, Some(&m), Action::Contribute));
    }

    #[test]
    fn only_creators_and_admins_may_modify() {
        let member = membership(3, false);
        assert!(permits(3, Some(&member), Action::Modify { created_by: Some(3) }));
        assert!(!permits(3, Some(&member), Action::Modify { created_by: Some(4) }));
        assert!(!permits(3, Some(&member), Action::Modify { created_by: None }));

        let admin = membership(3, true);
        assert!(permits(3, Some(&admin), Action::Modify { created_by: Some(4) }));
        assert!(permits(3, Some(&admin), Action::Modify { created_by: None }));
    }
}
