//! Keyed scalar metrics: timing counters, debug flags, post-processing
//! scalars. Pure observability, no correctness role (spec §3).
//!
//! Shape follows a rolling-window averaged counter behind a global atomic
//! collection toggle, adapted from mesh/LOD counters to force/timing/
//! degenerate counters.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime toggle for metrics collection, checked at each accumulation
/// site so a disabled run pays no bookkeeping cost.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for recent samples (e.g. per-step timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }
}

impl RollingWindow<f64> {
  /// Division happens here, at read time, never during accumulation (see
  /// the `d_avg_*` Open Question decision in `DESIGN.md`).
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }
  }
}

impl Default for RollingWindow<f64> {
  fn default() -> Self {
    Self::new(256)
  }
}

/// Per-run counters plus the free-form keyed scalar map from spec §3.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
  pub step_time_us: RollingWindow<f64>,
  pub contact_rebuild_time_us: RollingWindow<f64>,
  pub degenerate_m_i_count: u64,
  pub degenerate_direction_count: u64,
  pub broken_bond_count: u64,
  keyed: HashMap<String, f64>,
}

impl SimMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_step_time_us(&mut self, us: f64) {
    if is_enabled() {
      self.step_time_us.push(us);
    }
  }

  pub fn record_contact_rebuild_time_us(&mut self, us: f64) {
    if is_enabled() {
      self.contact_rebuild_time_us.push(us);
    }
  }

  pub fn note_degenerate_m_i(&mut self) {
    self.degenerate_m_i_count += 1;
  }

  pub fn note_degenerate_direction(&mut self) {
    self.degenerate_direction_count += 1;
  }

  pub fn set_keyed(&mut self, key: &str, value: f64) {
    self.keyed.insert(key.to_string(), value);
  }

  pub fn get_keyed(&self, key: &str) -> Option<f64> {
    self.keyed.get(key).copied()
  }

  pub fn avg_step_time_us(&self) -> f64 {
    self.step_time_us.average()
  }

  pub fn avg_contact_rebuild_time_us(&self) -> f64 {
    self.contact_rebuild_time_us.average()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rolling_window_average_divides_at_read_time() {
    let mut w = RollingWindow::<f64>::new(3);
    w.push(1.0);
    w.push(2.0);
    w.push(3.0);
    assert!((w.average() - 2.0).abs() < 1e-12);
    w.push(4.0);
    assert!((w.average() - 3.0).abs() < 1e-12, "oldest sample should have been evicted");
  }

  #[test]
  fn keyed_scalars_round_trip() {
    let mut m = SimMetrics::new();
    m.set_keyed("penetration", 0.05);
    assert_eq!(m.get_keyed("penetration"), Some(0.05));
    assert_eq!(m.get_keyed("missing"), None);
  }
}
