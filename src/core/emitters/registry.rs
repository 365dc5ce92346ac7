//=========================================================================
// Emitter Registry
//=========================================================================
//
// Canonical set of live light emitters, keyed by spatial cell.
//
// Architecture:
//   add() ──> HashMap<CellPos, Emitter> <── tick() (decay + removal)
//                      │
//                      ├─> AdapterBridge (proxy diff, live reads)
//                      └─> TextureChannel (per-frame encode)
//
// Capacity pressure is handled by evicting the emitters closest to
// expiry, never by rejecting the add.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

//=== Internal Dependencies ===============================================

use super::Emitter;
use crate::core::math::{CellPos, Rgb, Vec3};

//=== SharedRegistry ======================================================

/// Shared-read handle to the registry.
///
/// The subsystem keeps write ownership; bridge proxies hold clones and read
/// the registry live whenever a backend queries them. Everything stays on
/// the step thread, hence `Rc`.
pub type SharedRegistry = Rc<RefCell<EmitterRegistry>>;

//=== EmitterRegistry =====================================================

/// Bounded collection of decaying emitters.
pub struct EmitterRegistry {
    emitters: HashMap<CellPos, Emitter>,
    capacity: usize,
    eviction_batch: usize,
}

impl EmitterRegistry {
    //--- Construction -----------------------------------------------------

    /// Creates a registry holding at most `capacity` emitters.
    ///
    /// When full, each insertion of a new cell evicts at least
    /// `eviction_batch` emitters at once so pruning does not run every add.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize, eviction_batch: usize) -> Self {
        assert!(capacity > 0, "Emitter capacity must be positive");
        Self {
            emitters: HashMap::with_capacity(capacity),
            capacity,
            eviction_batch: eviction_batch.max(1),
        }
    }

    /// Wraps the registry into a [`SharedRegistry`].
    pub fn into_shared(self) -> SharedRegistry {
        Rc::new(RefCell::new(self))
    }

    //--- Mutation ---------------------------------------------------------

    /// Inserts or replaces the emitter at `cell`.
    ///
    /// Never fails. Replacing an existing cell never evicts; inserting a new
    /// cell into a full registry first evicts the soonest-to-expire
    /// emitters.
    pub fn add(&mut self, cell: CellPos, color: Rgb, brightness: u8, lifetime_steps: u32) {
        if !self.emitters.contains_key(&cell) && self.emitters.len() >= self.capacity {
            self.evict_soonest_expiring();
        }

        self.emitters
            .insert(cell, Emitter::new(cell, color, brightness, lifetime_steps));
    }

    /// Adds an emitter in the cell containing a world position.
    pub fn add_at(&mut self, position: Vec3, color: Rgb, brightness: u8, lifetime_steps: u32) {
        self.add(CellPos::containing(position), color, brightness, lifetime_steps);
    }

    /// Adds `count` evenly spaced emitters along a segment.
    ///
    /// Emitter `i` sits at `from + (to - from) * i / count`, so the segment
    /// start is always lit and the end point belongs to the next segment.
    pub fn add_segment(
        &mut self,
        from: Vec3,
        to: Vec3,
        count: u32,
        color: Rgb,
        brightness: u8,
        lifetime_steps: u32,
    ) {
        for i in 0..count {
            let t = f64::from(i) / f64::from(count);
            self.add_at(from.lerp(to, t), color, brightness, lifetime_steps);
        }
    }

    /// Advances every emitter by one step and drops the ones that died.
    ///
    /// Must be called exactly once per simulation step; the registry does not
    /// guard against double ticks.
    pub fn tick(&mut self) {
        if self.emitters.is_empty() {
            return;
        }
        self.emitters.retain(|_, emitter| !emitter.tick());
    }

    /// Removes every emitter.
    pub fn clear_all(&mut self) {
        self.emitters.clear();
    }

    //--- Queries ----------------------------------------------------------

    /// Decayed brightness at `cell`, or `None` when no emitter lives there.
    pub fn current_brightness(&self, cell: CellPos) -> Option<u8> {
        self.emitters.get(&cell).map(Emitter::current_brightness)
    }

    /// Raw color at `cell`, or `None` when no emitter lives there.
    pub fn color_at(&self, cell: CellPos) -> Option<Rgb> {
        self.emitters.get(&cell).map(Emitter::color)
    }

    pub fn get(&self, cell: CellPos) -> Option<&Emitter> {
        self.emitters.get(&cell)
    }

    pub fn contains(&self, cell: CellPos) -> bool {
        self.emitters.contains_key(&cell)
    }

    /// Closest emitter strictly within `max_range` of `cell`.
    ///
    /// Linear scan; the population is bounded.
    pub fn nearest(&self, cell: CellPos, max_range: f64) -> Option<&Emitter> {
        let mut best: Option<&Emitter> = None;
        let mut best_dist = max_range * max_range;

        for emitter in self.emitters.values() {
            let dist = emitter.cell().distance_squared(cell);
            if dist < best_dist {
                best_dist = dist;
                best = Some(emitter);
            }
        }

        best
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over live emitters in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Emitter> {
        self.emitters.values()
    }

    /// Iterates over occupied cells in unspecified order.
    pub fn cells(&self) -> impl Iterator<Item = CellPos> + '_ {
        self.emitters.keys().copied()
    }

    //--- Eviction ---------------------------------------------------------

    /// Drops the emitters with the fewest remaining ticks.
    ///
    /// Dying emitters are the least noticeable ones to remove, so this is
    /// deliberately not LRU.
    fn evict_soonest_expiring(&mut self) {
        let overflow = self.emitters.len() + 1 - self.capacity;
        let count = self.eviction_batch.max(overflow).min(self.emitters.len());

        let mut by_expiry: Vec<(u32, CellPos)> = self
            .emitters
            .values()
            .map(|e| (e.ticks_remaining(), e.cell()))
            .collect();
        by_expiry.sort_unstable();

        for (_, cell) in by_expiry.into_iter().take(count) {
            self.emitters.remove(&cell);
        }

        debug!(
            "Emitter registry at capacity ({}), evicted {} soonest-expiring emitters",
            self.capacity, count
        );
    }
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::new(300, 50)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
