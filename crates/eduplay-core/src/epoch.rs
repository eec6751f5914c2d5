//! Session generation tokens.
//!
//! Every capture session gets a fresh [`Epoch`]. Asynchronous work started on
//! behalf of a session carries that epoch, and its result is applied only if
//! the session is still the current one.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch#{}", self.0)
    }
}

/// Mints strictly increasing epochs. Never hands out the same value twice.
#[derive(Debug, Default)]
pub struct EpochCounter {
    last: u64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Epoch {
        self.last += 1;
        Epoch(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epochs_increase() {
        let mut counter = EpochCounter::new();
        let a = counter.next();
        let b = counter.next();
        assert_eq!(a.value(), 1);
        assert!(b > a);
        assert_ne!(a, b);
        assert_eq!(b.to_string(), "epoch#2");
    }
}
