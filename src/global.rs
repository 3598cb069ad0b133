//! Process-wide dispatcher for callers that do not thread one through.
//!
//! Nothing else in the crate reads this state; libraries should prefer an
//! explicit [`Dispatcher`].

use log::warn;
use once_cell::sync::OnceCell;

use crate::{config::backend_from_env, dispatcher::Dispatcher, shipper::ConfigError};

static GLOBAL: OnceCell<Dispatcher> = OnceCell::new();

/// Initialise the global dispatcher from the environment.
///
/// Later calls return the already initialised dispatcher without reading
/// the environment again.
pub fn init_from_env() -> Result<&'static Dispatcher, ConfigError> {
    GLOBAL.get_or_try_init(|| backend_from_env().map(Dispatcher::new))
}

/// The global dispatcher, initialised from the environment on first use.
///
/// An invalid environment falls back to stderr after a warning.
pub fn global() -> &'static Dispatcher {
    GLOBAL.get_or_init(|| match backend_from_env() {
        Ok(backend) => Dispatcher::new(backend),
        Err(err) => {
            warn!("logship: {err}; logging to stderr");
            Dispatcher::stderr()
        }
    })
}
