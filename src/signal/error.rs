use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("unknown signal request action '{0}'")]
    RequestActionUnknown(String),
    #[error("signal request failed: {0}")]
    RequestFailed(String),
}
