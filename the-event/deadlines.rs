use std::{
  hash::Hash,
  time::Duration,
};

use hashbrown::HashMap;
use tokio::time::Instant;

/// Independent debounce windows, one per key. Scheduling a key again restarts
/// its window; the earlier deadline is forgotten.
#[derive(Debug, Clone)]
pub struct Deadlines<K> {
  window:  Duration,
  pending: HashMap<K, Instant, foldhash::fast::RandomState>,
}

impl<K: Copy + Eq + Hash> Deadlines<K> {
  pub fn new(window: Duration) -> Self {
    Self {
      window,
      pending: HashMap::default(),
    }
  }

  pub fn window(&self) -> Duration {
    self.window
  }

  pub fn len(&self) -> usize {
    self.pending.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn contains(&self, key: K) -> bool {
    self.pending.contains_key(&key)
  }

  /// Restart the window of `key` at `now`.
  pub fn schedule(&mut self, key: K, now: Instant) {
    self.pending.insert(key, now + self.window);
  }

  pub fn cancel(&mut self, key: K) -> bool {
    self.pending.remove(&key).is_some()
  }

  /// Earliest pending deadline.
  pub fn next(&self) -> Option<Instant> {
    self.pending.values().min().copied()
  }

  /// Remove and return every key whose window has passed at `now`.
  pub fn take_elapsed(&mut self, now: Instant) -> Vec<K> {
    let mut elapsed = Vec::new();
    self.pending.retain(|key, deadline| {
      if *deadline > now {
        return true;
      }
      elapsed.push(*key);
      false
    });
    elapsed
  }
}
