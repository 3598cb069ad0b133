//! Compatibility bridge for the Rust `log` crate.
//!
//! [`LogBridge`] implements `log::Log` and forwards records emitted through
//! the `log` macros to a [`Dispatcher`] as structured records. Records whose
//! target belongs to this crate are written straight to stderr: the shipping
//! client reports its own failures through `log`, and routing those back
//! into the client would feed the failure loop.

use std::sync::Arc;

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::{dispatcher::Dispatcher, level::Level, record::CallSite};

const OWN_TARGET: &str = "logship";

/// Adapter implementing the Rust `log::Log` trait.
pub struct LogBridge {
    dispatcher: Arc<Dispatcher>,
    max_level: LevelFilter,
}

fn map_log_level(level: log::Level) -> Level {
    match level {
        log::Level::Trace | log::Level::Debug => Level::Debug,
        log::Level::Info => Level::Info,
        log::Level::Warn => Level::Warn,
        log::Level::Error => Level::Error,
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        map_log_level(level)
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl LogBridge {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Install the bridge as the global `log` logger.
    ///
    /// Fails when another global logger is already set.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if record.level() > self.max_level {
            return;
        }
        if is_own_target(record.target()) {
            eprintln!("{} {}: {}", record.level(), record.target(), record.args());
            return;
        }

        let message = record.args().to_string();
        let target = ("target", record.target());
        match record.file() {
            Some(file) => {
                let site = CallSite::new(
                    file,
                    record.module_path().unwrap_or_default(),
                    record.line().unwrap_or(0),
                );
                self.dispatcher
                    .data(&site, record.level().into(), &message, &[&target]);
            }
            None => self
                .dispatcher
                .data_untagged(record.level().into(), &message, &[&target]),
        }
    }

    fn flush(&self) {
        self.dispatcher.flush();
    }
}

impl std::fmt::Debug for LogBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBridge")
            .field("max_level", &self.max_level)
            .finish_non_exhaustive()
    }
}
