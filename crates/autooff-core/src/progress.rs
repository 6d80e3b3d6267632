use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Receives human-readable progress text at phase transitions
pub trait ProgressSink: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Shared cancellation flag, set by the user and polled by a run
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Forwards progress text to the log
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn set_text(&self, text: &str) {
        tracing::info!("{}", text);
    }
}

/// Keeps every progress message, in order
#[derive(Debug, Default)]
pub struct ProgressLog {
    messages: Mutex<Vec<String>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl ProgressSink for ProgressLog {
    fn set_text(&self, text: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        flag.cancel();
        assert!(observer.is_cancelled());

        observer.reset();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn test_progress_log_keeps_order() {
        let log = ProgressLog::new();
        log.set_text("Preparing...");
        log.set_text("Opening all sections...");
        assert_eq!(log.messages(), vec!["Preparing...", "Opening all sections..."]);
    }
}
