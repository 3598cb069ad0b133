//! `tracing` integration.
//!
//! [`DispatchLayer`] turns `tracing` events into structured records on a
//! [`Dispatcher`]. The event's `message` field becomes the record message and
//! every other field becomes an attribute, in the order the event recorded
//! them. Span context is not included.

use std::{fmt, sync::Arc};

use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

use crate::{dispatcher::Dispatcher, level::Level, parameter::KeyValue, record::CallSite};

/// A `tracing` layer forwarding events to a [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct DispatchLayer {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchLayer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

fn map_tracing_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Info,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::ERROR => Level::Error,
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name(), value));
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

impl<S> Layer<S> for DispatchLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let params: Vec<&dyn KeyValue> = collector
            .fields
            .iter()
            .map(|pair| pair as &dyn KeyValue)
            .collect();
        let level = map_tracing_level(metadata.level());
        match metadata.file() {
            Some(file) => {
                let site = CallSite::new(
                    file,
                    metadata.module_path().unwrap_or_default(),
                    metadata.line().unwrap_or(0),
                );
                self.dispatcher
                    .data(&site, level, &collector.message, &params);
            }
            None => self
                .dispatcher
                .data_untagged(level, &collector.message, &params),
        }
    }
}
