//! Backend selection from configuration.
//!
//! A configured token selects the [`ShippingClient`]; without one, records
//! go to stderr through a [`StreamBackend`].

use std::sync::Arc;

use log::{info, warn};

use crate::{
    backend::Backend,
    shipper::{ConfigError, ShipperConfig, ShippingClient},
    stream_backend::StreamBackend,
};

/// Build the backend described by `config`.
///
/// A shipping client is started immediately. When its first connection
/// attempt fails the failure is logged and the client is returned anyway;
/// its delivery loop keeps retrying in the background.
pub fn backend_from_config(config: Option<ShipperConfig>) -> Arc<dyn Backend> {
    let Some(config) = config else {
        info!("logship: no collector token configured, logging to stderr");
        return Arc::new(StreamBackend::stderr());
    };
    let client = match ShippingClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            warn!("logship: {err}; retrying in the background");
            err.into_client()
        }
    };
    client.start();
    Arc::new(client)
}

/// Build the backend selected by the process environment.
pub fn backend_from_env() -> Result<Arc<dyn Backend>, ConfigError> {
    ShipperConfig::from_env().map(backend_from_config)
}
