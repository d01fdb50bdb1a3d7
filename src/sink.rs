//! Destinations for lifecycle log lines.
//!
//! Every resource reports its construction, destruction and actions to a
//! [`LifecycleSink`]. The binaries print to stdout; tests record the lines
//! and assert on their order.

use colored::Colorize;
use std::sync::{Arc, Mutex, PoisonError};

pub trait LifecycleSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Prints each line to stdout, optionally highlighting lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink {
    color: bool,
}

impl StdoutSink {
    pub fn new(color: bool) -> Self {
        StdoutSink { color }
    }
}

impl LifecycleSink for StdoutSink {
    fn emit(&self, line: &str) {
        if !self.color {
            println!("{}", line);
        } else if line.ends_with("Constructor") {
            println!("{}", line.green());
        } else if line.ends_with("Destructor") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

/// Keeps every emitted line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_matching(&self, suffix: &str) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|line| line.ends_with(suffix))
            .count()
    }

    pub fn constructed(&self) -> usize {
        self.count_matching("Constructor")
    }

    pub fn destroyed(&self) -> usize {
        self.count_matching("Destructor")
    }

    /// Resources constructed through this sink that have not been destroyed yet.
    pub fn live(&self) -> usize {
        self.constructed().saturating_sub(self.destroyed())
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LifecycleSink for RecordingSink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
