//! In-memory connector for unit tests

use super::transport::{Connector, EventSink, TransportEvent, TransportLink};
use hypersockets::{ClientEvent, HyperSocketError, WsMessage};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct MockState {
    opened: Vec<u64>,
    closed: Vec<u64>,
    frames: Vec<(u64, WsMessage)>,
    sinks: Vec<(u64, EventSink)>,
    fail_open: bool,
}

/// Records every transport opened and every frame sent through it
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Generations of every transport opened so far
    pub(crate) fn opened(&self) -> Vec<u64> {
        self.state.lock().opened.clone()
    }

    pub(crate) fn closed(&self) -> Vec<u64> {
        self.state.lock().closed.clone()
    }

    pub(crate) fn last_generation(&self) -> u64 {
        self.state.lock().opened.last().copied().unwrap_or(0)
    }

    /// Drain frames sent so far
    pub(crate) fn take_frames(&self) -> Vec<WsMessage> {
        self.state
            .lock()
            .frames
            .drain(..)
            .map(|(_, frame)| frame)
            .collect()
    }

    /// Push an event through the sink handed to the transport of `generation`
    pub(crate) fn emit(&self, generation: u64, kind: ClientEvent) {
        let state = self.state.lock();
        if let Some((_, sink)) = state.sinks.iter().find(|(g, _)| *g == generation) {
            let _ = sink.send(TransportEvent { generation, kind });
        }
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        _url: &str,
        generation: u64,
        sink: EventSink,
    ) -> hypersockets::Result<Box<dyn TransportLink>> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(HyperSocketError::NoRuntime("mock refused".into()));
        }
        state.opened.push(generation);
        state.sinks.push((generation, sink));
        Ok(Box::new(MockLink {
            generation,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockLink {
    generation: u64,
    state: Arc<Mutex<MockState>>,
}

impl TransportLink for MockLink {
    fn send(&self, message: WsMessage) -> hypersockets::Result<()> {
        self.state.lock().frames.push((self.generation, message));
        Ok(())
    }

    fn close(&self) {
        self.state.lock().closed.push(self.generation);
    }
}
