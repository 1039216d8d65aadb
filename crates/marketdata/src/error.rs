use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("No current price available for symbol: {0}")]
    Unavailable(String),
}
