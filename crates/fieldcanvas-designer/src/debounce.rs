//! Per-key cancellable timers driven by an explicit clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Deadline map keyed by `K`. Scheduling an already pending key replaces its
/// deadline instead of queuing a second timer.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    deadlines: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Starts or restarts the timer for `key`. Returns true if one was replaced.
    pub fn schedule(&mut self, key: K, now: Instant) -> bool {
        self.deadlines.insert(key, now + self.delay).is_some()
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Removes and returns every key whose deadline has passed, oldest first.
    pub fn due(&mut self, now: Instant) -> Vec<K> {
        let mut fired: Vec<(K, Instant)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(k, d)| (k.clone(), *d))
            .collect();
        fired.sort_by_key(|(_, deadline)| *deadline);
        for (key, _) in &fired {
            self.deadlines.remove(key);
        }
        fired.into_iter().map(|(k, _)| k).collect()
    }

    /// Removes and returns every pending key regardless of deadline.
    pub fn drain_all(&mut self) -> Vec<K> {
        let mut all: Vec<(K, Instant)> = self.deadlines.drain().collect();
        all.sort_by_key(|(_, deadline)| *deadline);
        all.into_iter().map(|(k, _)| k).collect()
    }

    /// Moves a pending timer to a new key, keeping its deadline.
    pub fn rekey(&mut self, from: &K, to: K) -> bool {
        match self.deadlines.remove(from) {
            Some(deadline) => {
                self.deadlines.insert(to, deadline);
                true
            }
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
