use crate::{
    dal::DB,
    error::Error,
    logic,
    router::{errors::NotLoggedIn, util::with},
    schema::User,
};
use warp::{Filter, Rejection};

/// A filter that optionally authenticates the user via their `auth` cookie. An unknown or expired
/// token is the same as no token.
pub fn auth_opt(db: DB) -> impl Clone + Filter<Extract = (Option<User>,), Error = Rejection> {
    warp::cookie::optional("auth")
        .and(with(db))
        .and_then(parse_auth_cookie)
}

/// A filter that requires the user to be authenticated via their `auth` cookie.
pub fn auth(db: DB) -> impl Clone + Filter<Extract = (User,), Error = Rejection> {
    auth_opt(db).and_then(|me: Option<User>| async move {
        me.ok_or_else(|| warp::reject::custom(NotLoggedIn))
    })
}

async fn parse_auth_cookie(token: Option<String>, db: DB) -> Result<Option<User>, Rejection> {
    let token = match token {
        Some(token) => token,
        None => return Ok(None),
    };
    match logic::auth::authed_user(&db, &token).await {
        Ok(user) => Ok(Some(user)),
        Err(Error::NotFound(_)) => Ok(None),
        Err(err) => Err(warp::reject::custom(err)),
    }
}
