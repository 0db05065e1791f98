use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store is not connected")]
    NotConnected,
    #[error("document id '{0}' already exists")]
    IdExists(String),
    #[error("document id '{0}' is unknown")]
    IdInvalid(String),
    #[error("blob handle {0} is unknown")]
    UnknownBlobHandle(Uuid),
    #[error("value at path '{0}' could not be decoded: {1}")]
    DecodeUnknownType(String, String),
    #[error("reconnect budget of {0:?} exhausted")]
    ReconnectBudgetExhausted(std::time::Duration),
}
