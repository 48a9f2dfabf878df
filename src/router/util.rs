use crate::error::Error;
use std::convert::Infallible;
use warp::{
    http::{header::LOCATION, StatusCode},
    reply::{Reply, Response},
    Filter, Rejection,
};

/// An extension trait for Results.
pub trait ResultExt<T>: Sized {
    /// Converts an error to a `warp::Rejection`.
    fn err_to_rejection(self) -> Result<T, Rejection>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn err_to_rejection(self) -> Result<T, Rejection> {
        self.map_err(warp::reject::custom)
    }
}

/// Passes a clone of the value to each request.
pub fn with<T: 'static + Clone + Send + Sync>(
    t: T,
) -> impl Clone + Filter<Extract = (T,), Error = Infallible> {
    warp::any().map(move || t.clone())
}

/// A `302 Found` to the given location.
pub fn redirect(location: &str) -> Response {
    warp::reply::with_header(StatusCode::FOUND, LOCATION, location).into_response()
}

/// Parses an optional number from a form field, where the empty string means "absent". Something
/// that isn't a number becomes NaN, so that it fails validation rather than going missing.
pub fn parse_opt_f64(s: &str) -> Option<f64> {
    match s.trim() {
        "" => None,
        s => Some(s.parse().unwrap_or(std::f64::NAN)),
    }
}

/// Like `parse_opt_f64`, but for IDs.
pub fn parse_opt_i64(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_opt_f64, parse_opt_i64};

    #[test]
    fn form_numbers() {
        assert_eq!(parse_opt_f64(""), None);
        assert_eq!(parse_opt_f64(" 37.579 "), Some(37.579));
        assert!(parse_opt_f64("north").unwrap().is_nan());
        assert_eq!(parse_opt_i64(""), None);
        assert_eq!(parse_opt_i64("12"), Some(12));
    }
}
