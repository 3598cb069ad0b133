//! The logging facade.
//!
//! A [`Dispatcher`] owns exactly one active [`Backend`] at a time and turns
//! every emit call into exactly one formatted line for it. The backend can be
//! swapped while other threads are logging; in-flight calls finish against
//! the backend they started with.

use std::{fmt, process, sync::Arc, thread, time::Duration};

use log::{error, warn};
use parking_lot::RwLock;

use crate::{
    backend::Backend,
    level::Level,
    parameter::KeyValue,
    record::{CallSite, format_data},
    stream_backend::StreamBackend,
};

/// Pause between handing over the final record and exiting.
pub const DEFAULT_FATAL_GRACE: Duration = Duration::from_secs(2);
/// Exit status used by [`Dispatcher::fatal`] and [`Dispatcher::panic`].
pub const FATAL_EXIT_CODE: i32 = 1;

/// Routes formatted records to the active backend.
pub struct Dispatcher {
    backend: RwLock<Arc<dyn Backend>>,
    fatal_grace: Duration,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend: RwLock::new(backend),
            fatal_grace: DEFAULT_FATAL_GRACE,
        }
    }

    /// Dispatcher writing timestamped lines to stderr.
    pub fn stderr() -> Self {
        Self::new(Arc::new(StreamBackend::stderr()))
    }

    /// Override how long [`fatal`](Self::fatal) waits before exiting.
    pub fn with_fatal_grace(mut self, grace: Duration) -> Self {
        self.fatal_grace = grace;
        self
    }

    /// Replace the active backend, returning the previous one.
    pub fn set_backend(&self, backend: Arc<dyn Backend>) -> Arc<dyn Backend> {
        std::mem::replace(&mut *self.backend.write(), backend)
    }

    /// The active backend.
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend.read())
    }

    fn emit(&self, line: &str) {
        let backend = self.backend();
        if let Err(err) = backend.handle(strip_terminator(line)) {
            warn!("logship: backend rejected record: {err}");
        }
    }

    /// Emit a message prefixed with the `file:function:line` tag of `site`.
    pub fn print(&self, site: &CallSite, args: fmt::Arguments<'_>) {
        self.emit(&format!("{} {args}", site.tag()));
    }

    /// Emit a message without call-site information.
    pub fn print_untagged(&self, args: fmt::Arguments<'_>) {
        self.emit(&args.to_string());
    }

    /// Emit a structured record carrying the location of `site`.
    pub fn data(&self, site: &CallSite, level: Level, message: &str, params: &[&dyn KeyValue]) {
        self.emit(&format_data(level, message, Some(site), params));
    }

    /// Emit a structured record without location attributes.
    pub fn data_untagged(&self, level: Level, message: &str, params: &[&dyn KeyValue]) {
        self.emit(&format_data(level, message, None, params));
    }

    /// Deliver a tagged message synchronously, then exit with status 1.
    pub fn fatal(&self, site: &CallSite, args: fmt::Arguments<'_>) -> ! {
        self.terminate(&format!("{} {args}", site.tag()))
    }

    /// Same delivery and exit as [`fatal`](Self::fatal). The process exits
    /// instead of unwinding so the final record cannot be lost to a panic
    /// hook or an abort.
    pub fn panic(&self, site: &CallSite, args: fmt::Arguments<'_>) -> ! {
        self.terminate(&format!("{} {args}", site.tag()))
    }

    /// Hand `line` to the backend's synchronous path and return how long to
    /// pause before exiting. Failures are logged and otherwise ignored.
    pub(crate) fn deliver_final(&self, line: &str) -> Duration {
        let backend = self.backend();
        if let Err(err) = backend.handle_final(strip_terminator(line)) {
            error!("logship: final record not delivered: {err}");
        }
        if backend.needs_exit_grace() {
            self.fatal_grace
        } else {
            Duration::ZERO
        }
    }

    fn terminate(&self, line: &str) -> ! {
        let grace = self.deliver_final(line);
        if !grace.is_zero() {
            thread::sleep(grace);
        }
        process::exit(FATAL_EXIT_CODE)
    }

    /// Flush the active backend.
    pub fn flush(&self) -> bool {
        self.backend().flush()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fatal_grace", &self.fatal_grace)
            .finish_non_exhaustive()
    }
}

/// Backends terminate records themselves; drop one caller-supplied newline
/// so `println`-style input does not produce an empty record.
fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}
