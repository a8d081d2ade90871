use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::report::ProgressReport;

/// Receives the reports the debouncer lets through.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: ProgressReport);
}

#[derive(Default)]
struct DebounceSlot {
    pending: Option<ProgressReport>,
    timer: Option<JoinHandle<()>>,
    // Bumped on every submit/cancel; a timer may only flush the window it
    // was started for.
    generation: u64,
}

/// Collapses bursts of progress reports into at most one delivery per
/// debounce window.
///
/// The pending slot is last-write-wins: a newer report replaces an
/// undelivered one and restarts the window. When the window elapses the
/// most recent report is delivered exactly once and the slot is cleared.
/// [`cancel`](Self::cancel) discards the pending report without delivery.
///
/// At most one timer exists at a time; `submit` must be called from within
/// a tokio runtime.
pub struct ReportDebouncer {
    window: Duration,
    sink: Arc<dyn ReportSink>,
    slot: Arc<Mutex<DebounceSlot>>,
}

impl ReportDebouncer {
    pub fn new(window: Duration, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            window,
            sink,
            slot: Arc::new(Mutex::new(DebounceSlot::default())),
        }
    }

    /// Replace any pending report with `report` and restart the window.
    pub fn submit(&self, report: ProgressReport) {
        let mut slot = self.slot.lock().unwrap();

        slot.pending = Some(report);
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let generation = slot.generation;
        let window = self.window;
        let sink = Arc::clone(&self.sink);
        let slot_handle = Arc::clone(&self.slot);

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let flushed = {
                let mut slot = slot_handle.lock().unwrap();
                // A later submit or cancel owns the slot now.
                if slot.generation != generation {
                    return;
                }
                slot.pending.take()
            };
            if let Some(report) = flushed {
                sink.deliver(report).await;
            }
        }));
    }

    /// Discard the pending report, guaranteeing it is never delivered.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.pending = None;
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.slot.lock().unwrap().pending.is_some()
    }
}

impl Drop for ReportDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
