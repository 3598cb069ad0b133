//! Logging macros that capture the call site.
//!
//! Each macro records `file!()`, `line!()` and `module_path!()` where it is
//! invoked and passes them to a [`Dispatcher`](crate::Dispatcher) as a
//! [`CallSite`](crate::CallSite). The module path stands in for the function
//! name in the `method` attribute and the print tag.
//!
//! # Examples
//!
//! ```rust
//! use logship::{Dispatcher, Level, MemoryBackend, logship_data, logship_print};
//! use std::sync::Arc;
//!
//! let memory = MemoryBackend::new();
//! let log = Dispatcher::new(Arc::new(memory.clone()));
//! logship_print!(log, "listening on port {}", 8080);
//! logship_data!(log, Level::Warn, "slow request", "path" => "/health", "ms" => 812);
//! assert_eq!(memory.lines().len(), 2);
//! ```

/// Build a [`CallSite`](crate::CallSite) for the current source location.
#[macro_export]
macro_rules! logship_call_site {
    () => {
        $crate::CallSite::new(::core::file!(), ::core::module_path!(), ::core::line!())
    };
}

/// Emit a `format!`-style message tagged with the call site.
#[macro_export]
macro_rules! logship_print {
    ($dispatcher:expr, $($arg:tt)+) => {
        $dispatcher.print(&$crate::logship_call_site!(), ::core::format_args!($($arg)+))
    };
}

/// Emit a tagged message synchronously and terminate the process with
/// status 1.
#[macro_export]
macro_rules! logship_fatal {
    ($dispatcher:expr, $($arg:tt)+) => {
        $dispatcher.fatal(&$crate::logship_call_site!(), ::core::format_args!($($arg)+))
    };
}

/// Like [`logship_fatal!`], routed through [`Dispatcher::panic`](crate::Dispatcher::panic).
#[macro_export]
macro_rules! logship_panic {
    ($dispatcher:expr, $($arg:tt)+) => {
        $dispatcher.panic(&$crate::logship_call_site!(), ::core::format_args!($($arg)+))
    };
}

/// Emit a structured record with location attributes.
///
/// Extra attributes are written as `key => value` pairs, where the key is a
/// string and the value implements `Display`.
#[macro_export]
macro_rules! logship_data {
    ($dispatcher:expr, $level:expr, $message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $dispatcher.data(
            &$crate::logship_call_site!(),
            $level,
            ::core::convert::AsRef::<str>::as_ref(&$message),
            &[$(&($key, $value) as &dyn $crate::KeyValue),*],
        )
    };
}
