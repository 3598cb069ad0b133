//! Scripted connector used by the shipper unit tests.

use std::{
    collections::VecDeque,
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use super::{
    error::ShipError,
    transport::{Connector, Link},
};

/// How links produced by a successful connect behave on write.
#[derive(Clone, Copy, Debug)]
pub(crate) enum WriteBehaviour {
    Accept,
    Fail,
}

struct RecordingLink {
    sink: Arc<Mutex<Vec<u8>>>,
    behaviour: WriteBehaviour,
}

impl Write for RecordingLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.behaviour {
            WriteBehaviour::Accept => {
                self.sink.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
            WriteBehaviour::Fail => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connector that follows a fixed script of outcomes.
///
/// `Err(())` entries fail the attempt with a dial error. Once the script is
/// exhausted every attempt falls back to `fallback`.
pub(crate) struct ScriptedConnector {
    script: VecDeque<Result<WriteBehaviour, ()>>,
    fallback: Option<WriteBehaviour>,
    attempts: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedConnector {
    pub(crate) fn new(script: Vec<Result<WriteBehaviour, ()>>) -> Self {
        Self {
            script: script.into(),
            fallback: None,
            attempts: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn always_accepting() -> Self {
        Self::new(Vec::new()).then(WriteBehaviour::Accept)
    }

    /// Behaviour once the script runs out.
    pub(crate) fn then(mut self, behaviour: WriteBehaviour) -> Self {
        self.fallback = Some(behaviour);
        self
    }

    pub(crate) fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    pub(crate) fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl Connector for ScriptedConnector {
    fn endpoint(&self) -> String {
        "scripted:0".into()
    }

    fn connect(&mut self) -> Result<Link, ShipError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .pop_front()
            .unwrap_or(self.fallback.ok_or(()));
        match outcome {
            Ok(behaviour) => Ok(Box::new(RecordingLink {
                sink: Arc::clone(&self.written),
                behaviour,
            })),
            Err(()) => Err(ShipError::Dial {
                endpoint: self.endpoint(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "scripted refusal"),
            }),
        }
    }
}
