use std::convert::From;

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use db::DbError;

use crate::responder::ErrorData;

/// Error type for the web application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("There was an error with the Actix blocking pool. Cause: {}", cause)]
    Actix { cause: String },

    #[error("{}", message)]
    NotFound { message: String },

    #[error("{}", message)]
    InvalidRequest { message: String },

    #[error("{}", cause)]
    Db { cause: String },

    #[error("There was an error rendering the image.")]
    Template,
}

#[derive(Error, Debug)]
#[error("Error: {}", _0)]
/// Error to display as JSON
pub struct JsonError(pub Error);

impl From<Error> for JsonError {
    fn from(f: Error) -> Self {
        JsonError(f)
    }
}

impl From<DbError> for JsonError {
    fn from(e: DbError) -> Self {
        JsonError(match e {
            DbError::NotFound { .. } | DbError::NoTranslationsFound => Error::NotFound {
                message: e.to_string(),
            },
            DbError::Validation { message } => Error::InvalidRequest { message },
            DbError::DatasetNotFound { .. } | DbError::Schema { .. } | DbError::Engine { .. } => {
                Error::Db {
                    cause: e.to_string(),
                }
            }
        })
    }
}

impl From<BlockingError> for JsonError {
    fn from(e: BlockingError) -> Self {
        JsonError(Error::Actix {
            cause: e.to_string(),
        })
    }
}

impl ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            Error::Actix { .. } | Error::Db { .. } | Error::Template => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Unhandled: {}", &self.0);
        }
        HttpResponse::build(status).json(ErrorData::from_error(&self.0))
    }
}
