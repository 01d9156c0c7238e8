use std::collections::BTreeMap;

use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error, warn};
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    request,
    response::{self, Responder},
    serde::json::{json, Value},
    Request,
};
use thiserror::Error;

use crate::{
    logging::RequestId,
    model::{api::envelope::ApiResponse, mongodb::Id},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Per-field validation messages.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("{message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("User has already voted in this election")]
    AlreadyVoted,
    #[error("Result for election {0} has already been declared")]
    ResultAlreadyDeclared(Id),
    #[error("Candidate validation failed")]
    CandidacyRejected(Vec<String>),
    #[error("Election {0} has already ended")]
    ElectionClosed(Id),
    #[error("Election {0} is not ongoing")]
    ElectionNotOngoing(Id),
    #[error("Election {0} is not completed")]
    ElectionNotCompleted(Id),
    #[error("No candidates found for election {0}")]
    NoCandidates(Id),
    #[error("Candidate {candidate} does not stand in election {election}")]
    CandidateNotInElection { candidate: Id, election: Id },
    #[error("User does not belong to the election's constituency")]
    ConstituencyMismatch,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Internal(_) => Status::InternalServerError,
            Self::Jwt(_) | Self::Unauthorized(_) => Status::Unauthorized,
            Self::Validation { .. } | Self::CandidacyRejected(_) => Status::BadRequest,
            Self::NotFound(_) | Self::CandidateNotInElection { .. } => Status::NotFound,
            Self::Conflict(_) | Self::AlreadyVoted | Self::ResultAlreadyDeclared(_) => {
                Status::Conflict
            }
            Self::ElectionClosed(_)
            | Self::ElectionNotOngoing(_)
            | Self::ElectionNotCompleted(_)
            | Self::NoCandidates(_) => Status::UnprocessableEntity,
            Self::ConstituencyMismatch | Self::Forbidden(_) => Status::Forbidden,
        }
    }

    /// Fail a request guard with this error. The message is kept with the
    /// request so the catcher can render it.
    pub fn fail_guard<T>(self, req: &Request<'_>) -> request::Outcome<T, Error> {
        req.local_cache(|| GuardFailure::from(&self));
        request::Outcome::Failure((self.status(), self))
    }

    /// The structured detail payload for the `errors` field of the response.
    fn details(&self) -> Value {
        match self {
            Self::Validation { fields, .. } => json!(fields),
            Self::CandidacyRejected(messages) => json!(messages),
            other => json!(other.to_string()),
        }
    }
}

/// The error a request guard failed with, cached on the request.
#[derive(Debug, Default)]
pub struct GuardFailure(Option<(String, Value)>);

impl GuardFailure {
    /// The error cached on `req`, if a guard failed.
    pub fn of<'r>(req: &'r Request<'_>) -> Option<(&'r str, &'r Value)> {
        req.local_cache(GuardFailure::default)
            .0
            .as_ref()
            .map(|(message, errors)| (message.as_str(), errors))
    }
}

impl From<&Error> for GuardFailure {
    fn from(err: &Error) -> Self {
        Self(Some((err.to_string(), err.details())))
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        let response = if status == Status::InternalServerError {
            // Never leak internals to the caller.
            error!("req{id} {} {} failed: {:?}", req.method(), req.uri(), self);
            ApiResponse::<()>::failure(status, "Something went wrong", None)
        } else {
            if status == Status::Unauthorized || status == Status::Forbidden {
                warn!("req{id} {} {} rejected: {}", req.method(), req.uri(), self);
            } else {
                debug!("req{id} {} {} failed: {}", req.method(), req.uri(), self);
            }
            ApiResponse::<()>::failure(status, self.to_string(), Some(self.details()))
        };
        response.respond_to(req)
    }
}
