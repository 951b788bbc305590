use crate::models::Role;
use crate::ports::{AuthError, StoreError};
use saude_types::TextError;
use saude_uuid::{RecordId, UuidError};

/// Failure of a service operation.
///
/// The `Display` text of every variant is meant to be shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("account {account_id} is not a {expected}")]
    WrongRole { account_id: RecordId, expected: Role },
    #[error("doctor is not linked to patient {0}")]
    NotLinked(RecordId),
    #[error("vital record {0} belongs to another patient")]
    NotOwner(RecordId),

    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "profile write failed and the new credential could not be removed (account: {account_id}): write={write_error}; cleanup={cleanup_error}"
    )]
    CompensationFailed {
        account_id: RecordId,
        #[source]
        write_error: StoreError,
        cleanup_error: AuthError,
    },
}

impl From<TextError> for ServiceError {
    fn from(e: TextError) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}

impl From<UuidError> for ServiceError {
    fn from(e: UuidError) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
