use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Credential could not be resolved to an identity")]
    Unauthorized,
}

impl From<IdentityError> for CoreError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthorized => CoreError::Unauthorized,
        }
    }
}
