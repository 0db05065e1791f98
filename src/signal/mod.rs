//! Synchronous request/response signal bus between running jobs and the
//! workflow driver.

pub mod broker;
pub mod client;
pub mod dag_signal;
pub mod error;
pub mod request;
pub mod server;
pub mod task_signal;

pub use broker::{Broker, InMemoryBroker};
pub use client::SignalClient;
pub use dag_signal::DagSignalClient;
pub use error::SignalError;
pub use request::{Request, Response};
pub use server::SignalServer;
pub use task_signal::TaskSignalClient;
