use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
};
use thiserror::Error;

use crate::logging::RequestId;
use crate::voting::BallotError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Ballot(#[from] BallotError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Status(Status::InternalServerError, message.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Ballot(_) => Status::UnprocessableEntity,
            Self::Status(status, _) => *status,
        };

        let id = req.local_cache(RequestId::next);
        if status.class() == StatusClass::ServerError {
            error!("req{id} failed: {self}");
        } else {
            warn!("req{id} rejected: {self}");
        }

        Err(status)
    }
}
