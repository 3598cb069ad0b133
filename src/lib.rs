//! Pluggable logging facade with a resilient TCP log-shipping backend.
//!
//! A [`Dispatcher`] formats records and hands them to one active
//! [`Backend`]. Two backends ship with the crate:
//!
//! - [`ShippingClient`] buffers records in a bounded queue and delivers them
//!   in order to a remote collector over a persistent TCP (or TLS)
//!   connection, reconnecting with exponential backoff.
//! - [`StreamBackend`] writes timestamped lines to stderr or any writer.
//!
//! [`init_from_env`] selects between them from `LOG_ENTRIES_TOKEN`,
//! `LOG_ENTRIES_ENDPOINT` and `LOG_ENTRIES_PORT`.

pub mod backend;
pub mod config;
pub mod dispatcher;
mod global;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
mod logging_macros;
pub mod memory_backend;
pub mod parameter;
pub mod query_trace;
pub mod record;
pub mod shipper;
pub mod stream_backend;
#[cfg(feature = "tracing-compat")]
pub mod tracing_compat;

pub use backend::{Backend, BackendError};
pub use config::{backend_from_config, backend_from_env};
pub use dispatcher::{DEFAULT_FATAL_GRACE, Dispatcher, FATAL_EXIT_CODE};
pub use global::{global, init_from_env};
pub use level::{Level, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::LogBridge;
pub use memory_backend::MemoryBackend;
pub use parameter::{KeyValue, Parameter};
pub use query_trace::{QueryLogLevel, QueryLogger, SLOW_QUERY_THRESHOLD};
pub use record::{CallSite, format_data};
pub use shipper::{EagerConnectError, ShipError, ShipperConfig, ShippingClient};
pub use stream_backend::StreamBackend;
#[cfg(feature = "tracing-compat")]
pub use tracing_compat::DispatchLayer;
