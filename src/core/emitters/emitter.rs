//=========================================================================
// Emitter
//=========================================================================
//
// A single short-lived positional light with linearly decaying brightness.
//
// Lifecycle: new() → tick() ... tick() → is_dead() → removed by registry
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::config::clamp_light_level;
use crate::core::math::{channel_to_u8, CellPos, Rgb};

//=== Emitter =============================================================

/// Registry-owned light source.
///
/// `brightness` is the configured peak. The visible value is always derived
/// from the remaining lifetime, see [`Emitter::current_brightness`].
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    cell: CellPos,
    brightness: u8,
    ticks_remaining: u32,
    ticks_total: u32,
    color: Rgb,
}

impl Emitter {
    /// Creates an emitter at full lifetime.
    ///
    /// Brightness is clamped to 1..=15 and a zero lifetime is raised to one
    /// step so the emitter is visible for at least one step.
    pub fn new(cell: CellPos, color: Rgb, brightness: u8, lifetime_steps: u32) -> Self {
        let lifetime = lifetime_steps.max(1);
        Self {
            cell,
            brightness: clamp_light_level(brightness),
            ticks_remaining: lifetime,
            ticks_total: lifetime,
            color,
        }
    }

    //--- Accessors --------------------------------------------------------

    pub fn cell(&self) -> CellPos {
        self.cell
    }

    /// Configured peak brightness.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    pub fn ticks_total(&self) -> u32 {
        self.ticks_total
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn is_dead(&self) -> bool {
        self.ticks_remaining == 0
    }

    //--- Derived Values ---------------------------------------------------

    /// Remaining lifetime as a fraction in [0, 1].
    pub fn remaining_fraction(&self) -> f32 {
        self.ticks_remaining as f32 / self.ticks_total as f32
    }

    /// Decayed brightness: `max(1, brightness * remaining / total)`.
    ///
    /// Never drops below 1 while the emitter is alive; callers observe 0
    /// only through the registry once the emitter has been removed.
    pub fn current_brightness(&self) -> u8 {
        let scaled = u64::from(self.brightness) * u64::from(self.ticks_remaining)
            / u64::from(self.ticks_total);
        scaled.max(1) as u8
    }

    /// Color packed as `0xAARRGGBB` with alpha tracking the remaining lifetime.
    pub fn packed_argb(&self) -> u32 {
        let alpha = u32::from(channel_to_u8(self.remaining_fraction()));
        (alpha << 24) | self.color.to_rgb24()
    }

    //--- Mutation (registry only) -----------------------------------------

    /// Advances one step. Returns true once the emitter has died.
    pub(super) fn tick(&mut self) -> bool {
        self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
        self.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_emitter_starts_at_peak() {
        let e = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 20);
        assert_eq!(e.current_brightness(), 12);
        assert_eq!(e.ticks_remaining(), 20);
        assert_eq!(e.ticks_total(), 20);
    }

    #[test]
    fn brightness_and_lifetime_are_clamped() {
        let e = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 40, 0);
        assert_eq!(e.brightness(), 15);
        assert_eq!(e.ticks_total(), 1);

        let dim = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 0, 5);
        assert_eq!(dim.brightness(), 1);
    }

    #[test]
    fn brightness_decays_but_never_below_one_while_alive() {
        let mut e = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 20);
        let mut last = e.current_brightness();
        for _ in 0..19 {
            assert!(!e.tick());
            let now = e.current_brightness();
            assert!(now <= last);
            assert!(now >= 1);
            last = now;
        }
        assert!(e.tick());
    }

    #[test]
    fn half_life_brightness() {
        let mut e = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 20);
        for _ in 0..10 {
            e.tick();
        }
        assert_eq!(e.current_brightness(), 6);
    }

    #[test]
    fn longest_lifetime_keeps_full_brightness() {
        let mut e = Emitter::new(CellPos::new(0, 0, 0), Rgb::GREEN, 15, u32::MAX);
        assert_eq!(e.current_brightness(), 15);

        e.tick();
        assert_eq!(e.current_brightness(), 14);
        assert!(!e.is_dead());
    }

    #[test]
    fn packed_argb_alpha_follows_lifetime() {
        let mut e = Emitter::new(CellPos::new(0, 0, 0), Rgb::new(1.0, 0.0, 0.0), 12, 2);
        assert_eq!(e.packed_argb(), 0xFFFF_0000);
        e.tick();
        assert_eq!(e.packed_argb() >> 24, 127);
    }
}
