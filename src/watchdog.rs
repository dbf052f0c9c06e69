use crate::prelude::*;

/// Failure count at which the process restarts.
pub const FAILURE_CEILING: u32 = 20;

/// Process-wide failure counter.
///
/// Every failed step adds one, every successful step takes one away (never
/// below zero). It does not care which subsystem is failing; once the
/// ceiling is reached `tripped()` stays true and the only way out is a
/// restart.
#[derive(Clone, Debug)]
pub struct FailureCounter {
    count: u32,
    ceiling: u32,
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(FAILURE_CEILING)
    }
}

impl FailureCounter {
    pub fn new(ceiling: u32) -> Self {
        Self { count: 0, ceiling }
    }

    pub fn fail(&mut self, err: &Error) {
        self.count = self.count.saturating_add(1);
        warn!("{} ({}), failure counter: {}", err, err.subsystem(), self.count);
    }

    pub fn succeed(&mut self) {
        self.count = self.count.saturating_sub(1);
    }

    /// Folds an operation's outcome into the counter.
    pub fn record<T>(&mut self, result: &Result<T, Error>) {
        match result {
            Ok(_) => self.succeed(),
            Err(err) => self.fail(err),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn tripped(&self) -> bool {
        self.count >= self.ceiling
    }
}
