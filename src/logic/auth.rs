//! Authentication-related logic.

use crate::{
    dal::DB,
    error::{Error, Result},
    schema::User,
};
use uuid::Uuid;

/// Returns the user authenticated by the given token, if any.
pub async fn authed_user(db: &DB, token: &str) -> Result<User> {
    let token = token
        .parse::<Uuid>()
        .map_err(|_| Error::NotFound("session"))?;
    db.get_auth_user(token).await
}

/// Creates a user and a session token that never expires, returning both.
pub async fn register(db: &DB, name: String) -> Result<(User, Uuid)> {
    let name = name.trim().to_string();
    if name.chars().count() < 3 {
        return Err(Error::invalid("name", "Names must be at least 3 characters."));
    }
    if !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '-') {
        return Err(Error::invalid(
            "name",
            "Names may only contain letters, digits, '_' and '-'.",
        ));
    }

    let user = db.create_user(name).await?;
    let token = db.create_auth(user.id, None).await?;
    Ok((user, token))
}
