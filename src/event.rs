//! Structured event stream emitted by the block pipeline and scheduler.
//!
//! Carries a type/id/size/time/hash payload and a JSON-ish `toString`, the
//! way progress used to be printed directly from call sites deep in the
//! pipeline — those call sites now emit an [`Event`] to a [`Listener`]
//! instead. This is the *only* observability surface the core exposes;
//! logging/progress-reporting live entirely outside the core as listener
//! implementations.

use std::fmt;
use std::time::Instant;

/// Kind of event emitted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    CompressionStart,
    BeforeTransform,
    AfterTransform,
    BeforeEntropy,
    AfterEntropy,
    CompressionEnd,
    DecompressionStart,
    BeforeEntropyDecode,
    AfterEntropyDecode,
    BeforeInverseTransform,
    AfterInverseTransform,
    DecompressionEnd,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CompressionStart => "COMPRESSION_START",
            EventType::BeforeTransform => "BEFORE_TRANSFORM",
            EventType::AfterTransform => "AFTER_TRANSFORM",
            EventType::BeforeEntropy => "BEFORE_ENTROPY",
            EventType::AfterEntropy => "AFTER_ENTROPY",
            EventType::CompressionEnd => "COMPRESSION_END",
            EventType::DecompressionStart => "DECOMPRESSION_START",
            EventType::BeforeEntropyDecode => "DECOMPRESSION_BEFORE_ENTROPY",
            EventType::AfterEntropyDecode => "DECOMPRESSION_AFTER_ENTROPY",
            EventType::BeforeInverseTransform => "DECOMPRESSION_BEFORE_TRANSFORM",
            EventType::AfterInverseTransform => "DECOMPRESSION_AFTER_TRANSFORM",
            EventType::DecompressionEnd => "DECOMPRESSION_END",
        }
    }
}

/// One emitted event: block id, size, timestamp, and an optional checksum.
///
/// `time` is an opaque monotonic marker (mirrors kanzi's C++ implementation's
/// `clock_t evtTime`, which is likewise only meaningful as a delta between
/// two events, never as a wall-clock value).
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    /// Block id this event concerns, or `None` for stream-level events.
    pub block_id: Option<u64>,
    pub size: u64,
    pub time: Instant,
    pub checksum: Option<u32>,
}

impl Event {
    pub fn new(event_type: EventType, block_id: Option<u64>, size: u64) -> Self {
        Event { event_type, block_id, size, time: Instant::now(), checksum: None }
    }

    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = Some(checksum);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ \"type\":\"{}\"", self.event_type.as_str())?;
        if let Some(id) = self.block_id {
            write!(f, ", \"id\":{id}")?;
        }
        write!(f, ", \"size\":{}", self.size)?;
        if let Some(hash) = self.checksum {
            write!(f, ", \"hash\":\"{hash:08X}\"")?;
        }
        write!(f, " }}")
    }
}

/// Receives events emitted synchronously from the task that raises them.
///
/// Listeners are called synchronously from the task that emits; they must
/// be thread-safe, since a multi-job run fans the same listener set out
/// across every concurrent block task. Implementations are therefore
/// required to be `Send + Sync`.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// A thread-safe collection of listeners, snapshotted (cloned as an `Arc`
/// list) per batch by the scheduler before handing it to concurrent tasks.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<std::sync::Arc<dyn Listener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        ListenerSet { listeners: Vec::new() }
    }

    pub fn add(&mut self, listener: std::sync::Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn notify(&self, event: &Event) {
        for l in &self.listeners {
            l.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingListener(AtomicUsize);
    impl Listener for CountingListener {
        fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notifies_all_listeners() {
        let counter = Arc::new(CountingListener(AtomicUsize::new(0)));
        let mut set = ListenerSet::new();
        set.add(counter.clone());
        set.add(counter.clone());
        set.notify(&Event::new(EventType::AfterEntropy, Some(1), 42));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn display_includes_checksum_when_present() {
        let ev = Event::new(EventType::AfterEntropy, Some(3), 10).with_checksum(0xDEADBEEF);
        let s = ev.to_string();
        assert!(s.contains("DEADBEEF"));
        assert!(s.contains("\"id\":3"));
    }
}
