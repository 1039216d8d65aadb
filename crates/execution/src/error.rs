use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Execution collaborator did not respond in time")]
    Timeout,

    #[error("Execution collaborator rejected the request: {0}")]
    Rejected(String),

    #[error("Transport failure talking to the execution collaborator: {0}")]
    Transport(String),
}
