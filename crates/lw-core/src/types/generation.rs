//! Compile-generation counter.
//!
//! A compile generation numbers each recompilation pass so that log lines
//! from the same pass can be correlated. It carries no correctness meaning.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The number of a recompilation pass, starting at 1.
///
/// # Examples
///
/// ```
/// use lw_core::CompileGeneration;
///
/// let generation = CompileGeneration::new(2);
/// assert_eq!(generation.get(), 2);
/// assert_eq!(generation.to_string(), "2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompileGeneration(u64);

impl CompileGeneration {
    /// Wraps a raw generation number.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw generation number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CompileGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monotonically increasing, thread-safe generation counter.
///
/// Advanced once per recompilation pass (not per mapping). Concurrent
/// triggers each receive a distinct generation.
///
/// # Examples
///
/// ```
/// use lw_core::GenerationCounter;
///
/// let counter = GenerationCounter::new();
/// assert_eq!(counter.current().get(), 0);
/// assert_eq!(counter.advance().get(), 1);
/// assert_eq!(counter.advance().get(), 2);
/// assert_eq!(counter.current().get(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GenerationCounter(AtomicU64);

impl GenerationCounter {
    /// Creates a counter that has not started any pass yet.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation and returns it.
    #[inline]
    pub fn advance(&self) -> CompileGeneration {
        CompileGeneration(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns the most recently started generation (0 before the first pass).
    #[inline]
    #[must_use]
    pub fn current(&self) -> CompileGeneration {
        CompileGeneration(self.0.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_generation_starts_at_zero() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.current(), CompileGeneration::new(0));
    }

    #[test]
    fn test_generation_advance_is_monotonic() {
        let counter = GenerationCounter::new();
        let first = counter.advance();
        let second = counter.advance();
        assert!(second > first);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_generation_concurrent_advances_are_distinct() {
        let counter = Arc::new(GenerationCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..100).map(|_| counter.advance().get()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();
        seen.dedup();

        assert_eq!(seen.len(), 800);
        assert_eq!(counter.current().get(), 800);
    }
}
