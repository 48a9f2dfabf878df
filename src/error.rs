//! The errors the domain logic can produce.

use failure::Fail;
use serde_derive::Serialize;
use std::fmt;

/// A convenient alias for results in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error from an operation on the planner.
#[derive(Debug, Fail)]
pub enum Error {
    /// The input was missing something or malformed; one entry per bad field.
    #[fail(display = "Invalid input: {}", _0)]
    Validation(FieldErrors),

    /// The named kind of thing doesn't exist (or the user isn't allowed to know it does).
    #[fail(display = "{} not found", _0)]
    NotFound(&'static str),

    /// The user may see the resource, but may not do this to it.
    #[fail(display = "Forbidden")]
    Forbidden,

    /// The operation would duplicate something that must be unique.
    #[fail(display = "{}", _0)]
    Conflict(String),

    /// Something went wrong that the user can't do anything about.
    #[fail(display = "{}", _0)]
    Internal(failure::Error),
}

impl Error {
    /// Creates a validation error for a single field.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Error {
        Error::Validation(FieldErrors(vec![FieldError {
            field,
            message: message.into(),
        }]))
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Error {
        match err {
            diesel::result::Error::NotFound => Error::NotFound("record"),
            err => Error::Internal(err.into()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Error {
        Error::Internal(err.into())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Error {
        Error::Internal(err.into())
    }
}

impl From<failure::Error> for Error {
    fn from(err: failure::Error) -> Error {
        Error::Internal(err)
    }
}

/// A problem with a single input field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    /// The name of the field.
    pub field: &'static str,

    /// What's wrong with it.
    pub message: String,
}

/// The problems with a whole form.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    /// Records a problem with a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        })
    }

    /// Returns whether the given field has a problem.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|err| err.field == field)
    }

    /// Succeeds if no problems were recorded.
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                fmt.write_str("; ")?;
            }
            first = false;
            write!(fmt, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}
