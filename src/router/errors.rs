use crate::{error::Error, util::log_err, view::render_html_with_status};
use log::error;
use serde_json::json;
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::{json, with_status, Reply, Response},
    Rejection,
};

impl Reject for Error {}

/// The rejection for a page that needs a logged-in user when there isn't one.
#[derive(Debug)]
pub struct NotLoggedIn;

impl Reject for NotLoggedIn {}

/// The HTTP status an error should be reported with.
pub fn status_of(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Forbidden => StatusCode::FORBIDDEN,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The message shown to the user for an error. Internal errors get logged here, and the user gets
/// a generic message.
pub fn message_of(err: &Error) -> String {
    match err {
        Error::Validation(errs) => errs.to_string(),
        Error::NotFound(what) => format!("That {} doesn't exist.", what),
        Error::Forbidden => "You aren't allowed to do that.".to_string(),
        Error::Conflict(msg) => msg.clone(),
        Error::Internal(err) => {
            log_err(err);
            "Something went wrong on our end.".to_string()
        }
    }
}

/// Renders an error as a JSON reply, for the routes scripts talk to.
pub fn json_error(err: Error) -> Response {
    let status = status_of(&err);
    let body = match err {
        Error::Validation(ref errs) => json!({ "success": false, "errors": errs }),
        ref err => json!({ "success": false, "error": message_of(err) }),
    };
    with_status(json(&body), status).into_response()
}

/// Turns the rejections our handlers produce into error pages. Anything else (unmatched routes,
/// bad methods, malformed bodies) is left to warp.
pub async fn recover(rejection: Rejection) -> Result<Response, Rejection> {
    let (status, message) = if let Some(err) = rejection.find::<Error>() {
        (status_of(err), message_of(err))
    } else if rejection.find::<NotLoggedIn>().is_some() {
        (
            StatusCode::UNAUTHORIZED,
            "You need to be logged in to see this page.".to_string(),
        )
    } else {
        return Err(rejection);
    };

    render_html_with_status(
        status,
        "error.html",
        json!({ "me": null, "status": status.as_u16(), "message": message }),
    )
    .or_else(|rejection| Ok(last_chance(status, &message, rejection)))
}

/// A last-chance handler for when even the error page can't be rendered. (Probably
/// template-related problems...)
fn last_chance(status: StatusCode, message: &str, rejection: Rejection) -> Response {
    error!("Couldn't render the error page: {:?}", rejection);
    let msg = format!("{} {}\n\n{}", status.as_u16(), status, message);
    with_status(msg, status).into_response()
}
