//! Lightweight metrics hooks for recording RAID-5 client events.
//!
//! Mirrors the install-once global-sink pattern used elsewhere in this
//! ecosystem for disk/RAID IO metrics: a CLI binary installs a concrete
//! `MetricsSink` (e.g. one that streams batches out over gRPC), and the
//! block layer records through it without knowing or caring who is listening.

use std::sync::{Arc, OnceLock};

/// `IoOpType` describes a read or write operation.
#[derive(Copy, Clone, Debug)]
pub enum IoOpType {
    Read,
    Write,
}

/// `RaidOp` captures one logical `Get`/`Put` call at the client layer.
#[derive(Clone, Debug)]
pub struct RaidOp {
    pub op: IoOpType,
    pub block: u64,
    pub bytes: u64,
    pub latency_seconds: f64,
    pub degraded: bool,
    pub error: bool,
}

/// `ServerEvent` captures a transition in a server's observed health, or a
/// corruption detection, as tracked by the client's fail-fast memory.
#[derive(Clone, Debug)]
pub enum ServerEvent {
    Disconnected { server: usize },
    CorruptedBlock { server: usize, block: u64 },
    Repaired { server: usize },
}

/// `MetricsSink` records RAID-5 client events.
pub trait MetricsSink: Send + Sync + 'static {
    /// `record_raid_op` records a completed (or failed) `Get`/`Put`.
    fn record_raid_op(&self, op: RaidOp);
    /// `record_server_event` records a server health transition.
    fn record_server_event(&self, event: ServerEvent);
}

static METRICS_SINK: OnceLock<Arc<dyn MetricsSink>> = OnceLock::new();

/// `install_metrics_sink` installs a global metrics sink.
///
/// # Returns
/// `true` if the sink was installed, `false` if one was already registered.
pub fn install_metrics_sink(sink: Arc<dyn MetricsSink>) -> bool {
    METRICS_SINK.set(sink).is_ok()
}

/// `is_enabled` reports whether a metrics sink has been installed.
pub fn is_enabled() -> bool {
    METRICS_SINK.get().is_some()
}

/// `record_raid_op` forwards a RAID-5 operation to the installed sink, if any.
pub fn record_raid_op(op: RaidOp) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_raid_op(op);
    }
}

/// `record_server_event` forwards a server health transition, if a sink is installed.
pub fn record_server_event(event: ServerEvent) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_server_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestSink {
        raid_ops: Mutex<Vec<RaidOp>>,
        events: Mutex<Vec<ServerEvent>>,
    }

    impl MetricsSink for TestSink {
        fn record_raid_op(&self, op: RaidOp) {
            self.raid_ops.lock().unwrap().push(op);
        }

        fn record_server_event(&self, event: ServerEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn metrics_sink_records_ops_and_events_when_enabled() {
        let sink = Arc::new(TestSink {
            raid_ops: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        });

        // OnceLock means only the first test to run this installs; tolerate that.
        let _ = install_metrics_sink(sink.clone());
        assert!(is_enabled());

        record_raid_op(RaidOp {
            op: IoOpType::Write,
            block: 5,
            bytes: 128,
            latency_seconds: 0.01,
            degraded: false,
            error: false,
        });
        record_server_event(ServerEvent::Disconnected { server: 1 });

        // Another sink may already own the global slot from a previous test;
        // only assert when this call actually owns it.
        if Arc::ptr_eq(
            &sink,
            &METRICS_SINK
                .get()
                .cloned()
                .expect("sink installed by someone"),
        ) {
            assert_eq!(sink.raid_ops.lock().unwrap().len(), 1);
            assert_eq!(sink.events.lock().unwrap().len(), 1);
        }
    }
}
