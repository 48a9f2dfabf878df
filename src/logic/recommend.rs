//! Recommending places.

use crate::{
    dal::DB,
    error::Result,
    logic::access::{authorize, Action},
    schema::ToggleOutcome,
};
use log::debug;

/// Flips the user's recommendation of a place saved to a group: recommending it if they haven't,
/// withdrawing the recommendation if they have. Only members of the group may vote.
pub async fn toggle(db: &DB, user: i64, link: i64) -> Result<ToggleOutcome> {
    let (link, _) = db.get_link(link).await?;
    let _ = authorize(db, user, link.group_id, Action::Contribute).await?;
    let outcome = db.toggle_recommendation(user, link.id).await?;
    debug!(
        "User {} toggled link {}: {:?} ({})",
        user, link.id, outcome.state, outcome.count
    );
    Ok(outcome)
}
