//! Diagnostics sinks threaded through expansion and merging.

use std::sync::{Mutex, PoisonError};

use log::Level;

/// Receives progress and warning messages from pipeline stages.
///
/// Implementations must be `Sync`: masters may be compiled in parallel.
pub trait Diagnostics: Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, level: Level, message: &str) {
        log::log!(level, "{message}");
    }
}

/// Records messages in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages reported at `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let sink = CollectingDiagnostics::new();
        sink.info("first");
        sink.warn("second");
        sink.info("third");

        assert_eq!(sink.entries().len(), 3);
        assert_eq!(sink.messages(Level::Info), ["first", "third"]);
        assert_eq!(sink.messages(Level::Warn), ["second"]);
    }

    #[test]
    fn keeps_collecting_after_a_panic_while_locked() {
        let sink = CollectingDiagnostics::new();
        sink.info("before");
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = sink.entries.lock().unwrap();
            panic!("poison");
        }));
        assert!(sink.entries.is_poisoned());

        sink.warn("after");
        assert_eq!(sink.messages(Level::Info), ["before"]);
        assert_eq!(sink.messages(Level::Warn), ["after"]);
    }
}
