//! A backend that accumulates lines in memory.
//!
//! Useful for asserting on emitted records in tests, both inside this crate
//! and in downstream code that swaps it into a [`Dispatcher`](crate::Dispatcher).

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Backend, BackendError};

/// Backend that stores every line it receives.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    lines: Arc<Mutex<Vec<String>>>,
    finals: Arc<Mutex<Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of lines received through [`Backend::handle`].
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Snapshot of lines received through [`Backend::handle_final`].
    pub fn final_lines(&self) -> Vec<String> {
        self.finals.lock().clone()
    }
}

impl Backend for MemoryBackend {
    fn handle(&self, line: &str) -> Result<(), BackendError> {
        self.lines.lock().push(line.to_owned());
        Ok(())
    }

    fn handle_final(&self, line: &str) -> Result<(), BackendError> {
        self.finals.lock().push(line.to_owned());
        Ok(())
    }

    fn needs_exit_grace(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
