//! A binary min-heap whose entries can be re-prioritised in place. A map from
//! key to heap slot is kept alongside the heap so `contains` is constant time
//! and `update_priority` only sifts the one entry
//!

use std::collections::HashMap;
use std::hash::Hash;

use ordered_float::OrderedFloat;

/// Min-heap of keys ordered by an `f32` priority
#[derive(Clone, Debug, Default)]
pub struct IndexedMinHeap<K: Copy + Eq + Hash> {
	/// Heap ordered entries
	nodes: Vec<(OrderedFloat<f32>, K)>,
	/// Slot of each key within `nodes`
	positions: HashMap<K, usize>,
}

impl<K: Copy + Eq + Hash> IndexedMinHeap<K> {
	/// Create an empty heap
	pub fn new() -> Self {
		IndexedMinHeap {
			nodes: Vec::new(),
			positions: HashMap::new(),
		}
	}
	/// Number of queued keys
	pub fn len(&self) -> usize {
		self.nodes.len()
	}
	/// Whether nothing is queued
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
	/// Whether `key` is queued
	pub fn contains(&self, key: &K) -> bool {
		self.positions.contains_key(key)
	}
	/// Priority of a queued key
	pub fn get_priority(&self, key: &K) -> Option<f32> {
		self.positions.get(key).map(|i| self.nodes[*i].0 .0)
	}
	/// Smallest priority entry without removing it
	pub fn peek(&self) -> Option<(K, f32)> {
		self.nodes.first().map(|(p, k)| (*k, p.0))
	}
	/// Queue a key, a key already queued has its priority replaced instead
	pub fn push(&mut self, key: K, priority: f32) {
		if self.update_priority(&key, priority) {
			return;
		}
		let i = self.nodes.len();
		self.nodes.push((OrderedFloat(priority), key));
		self.positions.insert(key, i);
		self.sift_up(i);
	}
	/// Remove and return the smallest priority entry
	pub fn pop(&mut self) -> Option<(K, f32)> {
		if self.nodes.is_empty() {
			return None;
		}
		let last = self.nodes.len() - 1;
		self.swap(0, last);
		let (priority, key) = self.nodes.pop()?;
		self.positions.remove(&key);
		if !self.nodes.is_empty() {
			self.sift_down(0);
		}
		Some((key, priority.0))
	}
	/// Change the priority of a queued key, returns `false` if it isn't
	/// queued
	pub fn update_priority(&mut self, key: &K, priority: f32) -> bool {
		let Some(&i) = self.positions.get(key) else {
			return false;
		};
		let old = self.nodes[i].0;
		self.nodes[i].0 = OrderedFloat(priority);
		if OrderedFloat(priority) < old {
			self.sift_up(i);
		} else {
			self.sift_down(i);
		}
		true
	}
	/// Swap two slots keeping the position map in step
	fn swap(&mut self, a: usize, b: usize) {
		self.nodes.swap(a, b);
		self.positions.insert(self.nodes[a].1, a);
		self.positions.insert(self.nodes[b].1, b);
	}
	/// Move an entry towards the root while it beats its parent
	fn sift_up(&mut self, mut i: usize) {
		while i > 0 {
			let parent = (i - 1) / 2;
			if self.nodes[i].0 < self.nodes[parent].0 {
				self.swap(i, parent);
				i = parent;
			} else {
				break;
			}
		}
	}
	/// Move an entry towards the leaves while a child beats it
	fn sift_down(&mut self, mut i: usize) {
		let len = self.nodes.len();
		loop {
			let left = 2 * i + 1;
			let right = left + 1;
			let mut smallest = i;
			if left < len && self.nodes[left].0 < self.nodes[smallest].0 {
				smallest = left;
			}
			if right < len && self.nodes[right].0 < self.nodes[smallest].0 {
				smallest = right;
			}
			if smallest == i {
				break;
			}
			self.swap(i, smallest);
			i = smallest;
		}
	}
}
