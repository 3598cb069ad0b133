//! The backend contract consumed by the [`Dispatcher`](crate::Dispatcher).

use std::any::Any;
use std::borrow::Cow;
use std::io;

use thiserror::Error;

use crate::shipper::ShipError;

/// Errors reported by a backend while accepting a record.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend has been shut down and no longer accepts records.
    #[error("backend is closed")]
    Closed,
    /// Writing to a local stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Synchronous delivery to the remote collector failed.
    #[error(transparent)]
    Ship(#[from] ShipError),
}

/// Trait implemented by every logging backend.
///
/// Each call to [`handle`](Backend::handle) produces exactly one outbound
/// record. Implementations return as soon as the record is accepted and only
/// block for backpressure.
pub trait Backend: Send + Sync {
    /// Accept one formatted line.
    fn handle(&self, line: &str) -> Result<(), BackendError>;

    /// Deliver one line synchronously. Called right before the process
    /// terminates, so implementations should not rely on background work.
    fn handle_final(&self, line: &str) -> Result<(), BackendError> {
        self.handle(line)?;
        self.flush();
        Ok(())
    }

    /// Flush buffered records, returning `true` when everything was written.
    fn flush(&self) -> bool {
        true
    }

    /// Whether the process should pause after [`handle_final`](Backend::handle_final)
    /// before exiting. Backends that finish writing inside the call return
    /// `false`.
    fn needs_exit_grace(&self) -> bool {
        true
    }

    /// Return the backend as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Append the line terminator unless `line` already ends with one.
pub(crate) fn terminate_line(line: &str) -> Cow<'_, str> {
    if line.ends_with('\n') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{line}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingBackend {
        lines: Mutex<Vec<String>>,
        flushes: Mutex<usize>,
    }

    impl Backend for CountingBackend {
        fn handle(&self, line: &str) -> Result<(), BackendError> {
            self.lines.lock().push(line.to_owned());
            Ok(())
        }

        fn flush(&self) -> bool {
            *self.flushes.lock() += 1;
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn default_handle_final_handles_then_flushes() {
        let backend = CountingBackend::default();
        backend.handle_final("bye").expect("final delivery");
        assert_eq!(*backend.lines.lock(), vec!["bye".to_owned()]);
        assert_eq!(*backend.flushes.lock(), 1);
        assert!(backend.needs_exit_grace());
    }

    #[test]
    fn terminate_line_adds_single_newline() {
        assert_eq!(terminate_line("a"), "a\n");
        assert_eq!(terminate_line("a\n"), "a\n");
        assert!(matches!(terminate_line("a\n"), Cow::Borrowed(_)));
    }
}
