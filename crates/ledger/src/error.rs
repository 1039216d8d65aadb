use core_types::CoreError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient buying power. Required: {required}, Available: {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Fill quantity must be non-zero")]
    ZeroQuantityFill,
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => CoreError::InsufficientFunds {
                required,
                available,
            },
            other => CoreError::Validation(other.to_string()),
        }
    }
}
