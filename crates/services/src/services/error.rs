use db::{
    DbErr,
    models::{contributor::ContributorError, user::UserError},
};
use thiserror::Error;
use utils_jwt::JwtError;

use super::authorization::DenyReason;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,
    #[error("No active account found with the given credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Forbidden(#[from] DenyReason),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Token(#[from] JwtError),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<UserError> for ServiceError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(err) => Self::Database(err),
            UserError::UserNotFound => Self::NotFound("User"),
            UserError::UsernameTaken => Self::validation("username", err.to_string()),
            UserError::Underage => Self::validation("birth_date", err.to_string()),
        }
    }
}

impl From<ContributorError> for ServiceError {
    fn from(err: ContributorError) -> Self {
        match err {
            ContributorError::Database(err) => Self::Database(err),
            ContributorError::ProjectNotFound => Self::NotFound("Project"),
            ContributorError::UserNotFound | ContributorError::AlreadyContributor => {
                Self::validation("user_id", err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_become_field_errors() {
        let err: ServiceError = UserError::Underage.into();
        assert!(matches!(
            err,
            ServiceError::Validation {
                field: "birth_date",
                ..
            }
        ));

        let err: ServiceError = ContributorError::AlreadyContributor.into();
        assert!(matches!(err, ServiceError::Validation { field: "user_id", .. }));

        let err: ServiceError = ContributorError::ProjectNotFound.into();
        assert!(matches!(err, ServiceError::NotFound("Project")));
    }
}
