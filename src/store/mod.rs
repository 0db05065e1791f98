//! Persistent per-workflow data store: document, backend contract and the
//! reconnect-with-backoff decorator.

pub mod backend;
pub mod document;
pub mod error;
pub mod reconnect;

pub use backend::{InMemoryBackend, StoreBackend};
pub use document::{Section, StoreHandle};
pub use error::StoreError;
pub use reconnect::ReconnectingBackend;
