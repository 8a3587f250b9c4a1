//! Progress events and cooperative cancellation: spec.md §4.8.
//!
//! Sinks are injected function values rather than a trait hierarchy — spec
//! §9's "polymorphic sinks" note — so the CLI can wire in an `indicatif` bar
//! and tests can wire in a `Vec`-collecting closure. A sink must be callable
//! from any worker thread/task and must never be invoked while the caller
//! holds an internal lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ScanProgress { files_seen: usize },
    StageProgress {
        stage_name: &'static str,
        done: usize,
        total: usize,
    },
    Warning { path: PathBuf, message: String },
    Done { summary: String },
}

/// Anything that can receive progress events. Implemented for any
/// `Fn(ProgressEvent) + Send + Sync` closure, so callers rarely need to name
/// this trait directly.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// A sink that discards every event — the default for programmatic use.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Single-writer, many-reader cooperative stop flag.
#[derive(Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stride at which the scanner re-checks its "events per second" budget via
/// a counter-mod check rather than a timer (spec.md §4.2): emit at most once
/// every `SCAN_PROGRESS_STRIDE` files discovered.
pub const SCAN_PROGRESS_STRIDE: usize = 32;

/// Computes the stage progress reporting stride: `max(1, total / 200)`
/// (spec.md §4.5).
pub fn stage_progress_stride(total: usize) -> usize {
    (total / 200).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn stop_token_observed_across_clones() {
        let token = StopToken::new();
        let clone = token.clone();
        assert!(!clone.is_stopped());
        token.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn closures_implement_progress_sink() {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events2 = Arc::clone(&events);
        let sink = move |e: ProgressEvent| events2.lock().unwrap().push(e);
        sink.emit(ProgressEvent::Done {
            summary: "ok".into(),
        });
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn stage_stride_floor_is_one() {
        assert_eq!(stage_progress_stride(0), 1);
        assert_eq!(stage_progress_stride(199), 1);
        assert_eq!(stage_progress_stride(400), 2);
    }
}
