//! Local fallback backend writing to a byte stream.
//!
//! `StreamBackend` is used when no collector token is configured. Each line
//! is prefixed with a local `YYYY/MM/DD HH:MM:SS` timestamp and written
//! synchronously, so fatal records reach the stream before the process
//! exits.

use std::{
    any::Any,
    io::{self, Write},
};

use chrono::Local;
use parking_lot::Mutex;

use crate::backend::{Backend, BackendError, terminate_line};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Backend that writes records to an `io::Write` stream.
pub struct StreamBackend {
    writer: Mutex<Box<dyn Write + Send>>,
    timestamps: bool,
}

impl StreamBackend {
    /// Backend writing to `stderr`.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Backend writing to `stdout`.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Backend writing to an arbitrary stream.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            writer: Mutex::new(Box::new(writer)),
            timestamps: true,
        }
    }

    /// Disable the timestamp prefix.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }
}

impl Backend for StreamBackend {
    fn handle(&self, line: &str) -> Result<(), BackendError> {
        let line = terminate_line(line);
        let mut writer = self.writer.lock();
        if self.timestamps {
            write!(writer, "{} ", Local::now().format(TIMESTAMP_FORMAT))?;
        }
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> bool {
        self.writer.lock().flush().is_ok()
    }

    fn needs_exit_grace(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for StreamBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBackend")
            .field("timestamps", &self.timestamps)
            .finish()
    }
}
