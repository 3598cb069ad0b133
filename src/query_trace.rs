//! Query tracing adapter for database layers.
//!
//! [`QueryLogger`] mirrors the hooks ORMs typically expose (leveled
//! messages plus a per-query trace callback) and turns them into structured
//! records on a [`Dispatcher`].

use std::{
    error::Error,
    fmt::Display,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    dispatcher::Dispatcher,
    level::Level,
    parameter::{KeyValue, Parameter},
    record::CallSite,
};

/// Queries running longer than this are reported as slow.
pub const SLOW_QUERY_THRESHOLD: Duration = Duration::from_secs(5);

/// Verbosity of a [`QueryLogger`]. Each level includes the ones before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryLogLevel {
    Silent = 1,
    Error,
    Warn,
    Info,
}

#[derive(Clone, Debug)]
pub struct QueryLogger {
    dispatcher: Arc<Dispatcher>,
    level: QueryLogLevel,
}

impl QueryLogger {
    /// `debugging` enables per-query info records; otherwise only slow
    /// queries and failures are reported.
    pub fn new(dispatcher: Arc<Dispatcher>, debugging: bool) -> Self {
        let level = if debugging {
            QueryLogLevel::Info
        } else {
            QueryLogLevel::Warn
        };
        Self { dispatcher, level }
    }

    /// Copy of this logger at a different level.
    pub fn with_level(&self, level: QueryLogLevel) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            level,
        }
    }

    pub fn level(&self) -> QueryLogLevel {
        self.level
    }

    #[track_caller]
    pub fn info(&self, message: &str, params: &[&dyn Display]) {
        if self.level >= QueryLogLevel::Info {
            self.display(CallSite::caller(), Level::Info, message, params);
        }
    }

    #[track_caller]
    pub fn warn(&self, message: &str, params: &[&dyn Display]) {
        if self.level >= QueryLogLevel::Warn {
            self.display(CallSite::caller(), Level::Warn, message, params);
        }
    }

    #[track_caller]
    pub fn error(&self, message: &str, params: &[&dyn Display]) {
        if self.level >= QueryLogLevel::Error {
            self.display(CallSite::caller(), Level::Error, message, params);
        }
    }

    fn display(&self, site: CallSite, level: Level, message: &str, params: &[&dyn Display]) {
        let numbered: Vec<_> = params
            .iter()
            .enumerate()
            .map(|(index, value)| Parameter::new(format!("param_{index}"), value.to_string()))
            .collect();
        let refs: Vec<&dyn KeyValue> = numbered.iter().map(|p| p as &dyn KeyValue).collect();
        self.dispatcher.data(&site, level, message, &refs);
    }

    /// Report a finished query that started at `begin`.
    ///
    /// `query` is only invoked when a record is emitted and returns the SQL
    /// text and the number of affected rows.
    pub fn trace<F>(&self, site: &CallSite, begin: Instant, query: F, err: Option<&dyn Error>)
    where
        F: FnOnce() -> (String, i64),
    {
        self.trace_elapsed(site, begin.elapsed(), query, err);
    }

    /// [`trace`](Self::trace) with a precomputed duration.
    pub fn trace_elapsed<F>(
        &self,
        site: &CallSite,
        elapsed: Duration,
        query: F,
        err: Option<&dyn Error>,
    ) where
        F: FnOnce() -> (String, i64),
    {
        if self.level <= QueryLogLevel::Silent {
            return;
        }
        let file = Parameter::new("file", format!("{}:{}", site.file(), site.line()));
        let duration = Parameter::new(
            "duration",
            format!("{:.3}ms", elapsed.as_secs_f64() * 1e3),
        );
        let reportable_err = err
            .map(ToString::to_string)
            .filter(|text| !text.contains("record not found"));

        let (level, message, detail) = match reportable_err {
            Some(text) if self.level >= QueryLogLevel::Error => {
                (Level::Error, "error executing query", Parameter::new("error", text))
            }
            _ if elapsed > SLOW_QUERY_THRESHOLD && self.level >= QueryLogLevel::Warn => (
                Level::Warn,
                "warning executing query",
                Parameter::new(
                    "slow_log",
                    format!("SLOW SQL >= {}s", SLOW_QUERY_THRESHOLD.as_secs()),
                ),
            ),
            _ if self.level == QueryLogLevel::Info => {
                let (sql, rows) = query();
                let rows = Parameter::new("rows", rows);
                let sql = Parameter::new("sql", sql);
                self.dispatcher.data(
                    site,
                    Level::Info,
                    "executing sql query",
                    &[&file, &duration, &rows, &sql],
                );
                return;
            }
            _ => return,
        };
        let (sql, rows) = query();
        let rows = Parameter::new("rows", rows);
        let sql = Parameter::new("sql", sql);
        self.dispatcher
            .data(site, level, message, &[&file, &detail, &duration, &rows, &sql]);
    }
}
