use std::sync::Mutex;

/// Receives human-readable progress while a run advances. Purely advisory:
/// nothing a sink does can change the outcome of the run.
pub trait ProgressSink {
    fn update(&self, message: &str);

    fn progress(&self, _current: usize, _total: usize) {}
}

/// Forwards progress to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&self, message: &str) {
        tracing::info!(target: "segscale::progress", "{message}");
    }

    fn progress(&self, current: usize, total: usize) {
        tracing::debug!(target: "segscale::progress", current, total, "progress");
    }
}

/// Keeps every message, in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn update(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
