//! Bond-fracture store: one bit per (owner, neighbor) bond.
//!
//! Packed bit array with O(1) `get`/`set`. `bitvec` is the ecosystem crate
//! for this rather than a hand-rolled bit-packing scheme.

use bitvec::prelude::{BitBox, Lsb0};

/// Per-node bitset of broken-bond flags, one entry per peridynamic
/// neighbor in `N_pd(i)`, sized once at construction and never resized.
pub struct FractureStore {
  bits: Vec<BitBox<u64, Lsb0>>,
}

impl FractureStore {
  /// Allocate one all-false bitset per node, sized to `neighbor_counts[i]`.
  pub fn new(neighbor_counts: &[usize]) -> Self {
    Self {
      bits: neighbor_counts.iter().map(|&n| BitBox::from_bitslice(&bitvec::bitvec![u64, Lsb0; 0; n])).collect(),
    }
  }

  pub fn get(&self, node: usize, bond: usize) -> bool {
    self.bits[node][bond]
  }

  /// Set the bond's broken bit. Irreversibility is the caller's (the
  /// material's) responsibility: this store never clears a bit itself.
  pub fn set(&mut self, node: usize, bond: usize, value: bool) {
    self.bits[node].set(bond, value);
  }

  pub fn bond_count(&self, node: usize) -> usize {
    self.bits[node].len()
  }

  pub fn node_count(&self) -> usize {
    self.bits.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bits_start_false_and_are_sized_per_node() {
    let store = FractureStore::new(&[3, 0, 5]);
    assert_eq!(store.bond_count(0), 3);
    assert_eq!(store.bond_count(1), 0);
    assert_eq!(store.bond_count(2), 5);
    assert!(!store.get(2, 4));
  }

  #[test]
  fn set_is_observable_and_irreversibility_is_the_callers_job() {
    let mut store = FractureStore::new(&[2]);
    store.set(0, 1, true);
    assert!(store.get(0, 1));
    assert!(!store.get(0, 0));
    store.set(0, 1, false);
    assert!(!store.get(0, 1), "store itself allows clearing; policy lives in the material");
  }
}
