//=========================================================================
// Entity Trackers
//=========================================================================
//
// Bookkeeping for lights that follow a moving object.
//
// The moving object is never owned: trackers hold a `Weak` reference and
// a liveness timestamp refreshed by `ping`. A tracker is stale when the
// reference no longer resolves, the object reports itself removed, or it
// has not been pinged within the TTL.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Weak;
use std::time::{Duration, Instant};

//=== Internal Dependencies ===============================================

use super::SharedLight;
use crate::core::math::{Rgb, Vec3};

//=== MovingSource ========================================================

/// Identifier of the moving object that owns a light chain.
pub type OwnerId = u32;

/// A simulated object lights can follow (projectile, thrown item...).
///
/// Positions are the object's location at the previous and the current
/// simulation step; proxies interpolate between them at render time.
pub trait MovingSource: Send + Sync {
    fn previous_position(&self) -> Vec3;

    fn current_position(&self) -> Vec3;

    /// Whether the host already despawned the object.
    fn is_removed(&self) -> bool {
        false
    }
}

/// Weak reference to a moving source, as held by trackers and proxies.
pub type SourceRef = Weak<dyn MovingSource>;

//=== ChainSlot ===========================================================

/// Chain index used by a single, non-chained light.
pub const SINGLE_SLOT: i32 = -1;

/// Longest chain a single owner can carry.
pub const MAX_CHAIN_LENGTH: usize = 8;

/// Placement of one proxy within a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSlot {
    /// `-1` for a single light, otherwise 0-based position behind the head.
    pub index: i32,
    pub spacing: f64,
    pub color: Rgb,
}

impl ChainSlot {
    pub fn single(color: Rgb) -> Self {
        Self {
            index: SINGLE_SLOT,
            spacing: 0.0,
            color,
        }
    }

    /// Backward distance from the head along the direction of travel.
    pub fn trailing_distance(&self) -> f64 {
        if self.index <= 0 {
            0.0
        } else {
            f64::from(self.index) * self.spacing
        }
    }
}

/// Builds the slots of a chain of `count` lights, clamped to
/// `1..=MAX_CHAIN_LENGTH`.
pub fn chain_slots(count: usize, spacing: f64, color: Rgb) -> Vec<ChainSlot> {
    let len = count.clamp(1, MAX_CHAIN_LENGTH);
    (0..len)
        .map_while(|i| i32::try_from(i).ok())
        .map(|index| ChainSlot {
            index,
            spacing,
            color,
        })
        .collect()
}

//=== EntityTrackedLight ==================================================

/// Lights bridged for one moving owner.
pub struct EntityTrackedLight {
    owner: OwnerId,
    source: SourceRef,
    chain: Vec<(ChainSlot, SharedLight)>,
    last_seen_at: Instant,
}

impl EntityTrackedLight {
    pub(crate) fn new(
        owner: OwnerId,
        source: SourceRef,
        chain: Vec<(ChainSlot, SharedLight)>,
        now: Instant,
    ) -> Self {
        Self {
            owner,
            source,
            chain,
            last_seen_at: now,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn last_seen_at(&self) -> Instant {
        self.last_seen_at
    }

    pub fn slots(&self) -> impl Iterator<Item = &ChainSlot> {
        self.chain.iter().map(|(slot, _)| slot)
    }

    pub fn proxies(&self) -> impl Iterator<Item = &SharedLight> {
        self.chain.iter().map(|(_, light)| light)
    }

    pub fn proxy_count(&self) -> usize {
        self.chain.len()
    }

    /// Marks the owner as still observed.
    pub(crate) fn ping(&mut self, now: Instant) {
        self.last_seen_at = now;
    }

    /// Consumes the tracker, yielding its proxies for removal.
    pub(crate) fn into_proxies(self) -> impl Iterator<Item = SharedLight> {
        self.chain.into_iter().map(|(_, light)| light)
    }

    /// True when the owner is gone or has not been pinged within `ttl`.
    pub(crate) fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        if now.saturating_duration_since(self.last_seen_at) > ttl {
            return true;
        }
        match self.source.upgrade() {
            Some(source) => source.is_removed(),
            None => true,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_has_no_offset() {
        let slot = ChainSlot::single(Rgb::GREEN);
        assert_eq!(slot.index, SINGLE_SLOT);
        assert_eq!(slot.trailing_distance(), 0.0);
    }

    #[test]
    fn chain_slots_trail_by_spacing() {
        let slots = chain_slots(4, 0.5, Rgb::GREEN);
        let distances: Vec<f64> = slots.iter().map(ChainSlot::trailing_distance).collect();
        assert_eq!(distances, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn empty_chain_still_gets_a_head() {
        assert_eq!(chain_slots(0, 1.0, Rgb::GREEN).len(), 1);
    }

    #[test]
    fn oversized_chain_is_capped() {
        let slots = chain_slots(usize::MAX, 0.5, Rgb::GREEN);
        assert_eq!(slots.len(), MAX_CHAIN_LENGTH);
        assert_eq!(slots.last().map(|s| s.index), Some(MAX_CHAIN_LENGTH as i32 - 1));
    }
}
