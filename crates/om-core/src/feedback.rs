//! Progress, message and cancellation channel passed explicitly through every
//! stage. Nothing here is process-global: callers own the context.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-supplied progress/cancellation context.
///
/// All methods default to no-ops so implementors only override what they
/// surface.
pub trait Feedback {
    /// Polled between pipeline stages, never in the middle of a seam search.
    fn is_cancelled(&self) -> bool {
        false
    }

    fn info(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Discards every message and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedback;

impl Feedback for NoopFeedback {}

/// Forwards messages to the `log` facade.
#[derive(Debug, Default)]
pub struct LogFeedback {
    cancelled: AtomicBool,
}

impl LogFeedback {
    pub const TARGET: &'static str = "orthomosaic";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Feedback for LogFeedback {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn info(&self, message: &str) {
        log::info!(target: Self::TARGET, "{message}");
    }

    fn warning(&self, message: &str) {
        log::warn!(target: Self::TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        log::error!(target: Self::TARGET, "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Collects messages in memory, e.g. for hosts that render them later.
#[derive(Debug, Default)]
pub struct MemoryFeedback {
    messages: Mutex<Vec<(Level, String)>>,
    cancelled: AtomicBool,
}

impl MemoryFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages().iter().filter(|(l, _)| *l == level).count()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push((level, message.to_owned()));
        }
    }
}

impl Feedback for MemoryFeedback {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::{Feedback, Level, LogFeedback, MemoryFeedback, NoopFeedback};

    #[test]
    fn noop_never_cancels() {
        let fb = NoopFeedback;
        fb.info("ignored");
        assert!(!fb.is_cancelled());
    }

    #[test]
    fn memory_feedback_records_levels_in_order() {
        let fb = MemoryFeedback::new();
        fb.info("a");
        fb.warning("b");
        fb.error("c");
        fb.warning("d");

        let msgs = fb.messages();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1], (Level::Warning, "b".to_owned()));
        assert_eq!(fb.count(Level::Warning), 2);

        assert!(!fb.is_cancelled());
        fb.cancel();
        assert!(fb.is_cancelled());
    }

    #[test]
    fn log_feedback_cancel_flag() {
        let fb = LogFeedback::new();
        assert!(!fb.is_cancelled());
        fb.cancel();
        assert!(fb.is_cancelled());
    }
}
