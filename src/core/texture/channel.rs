//=========================================================================
// Texture Channel
//=========================================================================
//
// Packs live emitters into a tiny two-row image for shader consumers that
// have no object-level lighting API.
//
// Layout (width = slot count, height = 2, texels are 0xAARRGGBB):
//
//   row 0: R,G,B = viewer-relative position, each axis mapped from
//                  [-range, range] to [0, 255]
//          A     = decayed intensity (brightness / 15)
//   row 1: R,G,B = emitter color, A = 255
//
// Slots without an emitter, or whose emitter lies outside the range on
// any axis, are written as zero.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::config::MAX_LIGHT_LEVEL;
use crate::core::emitters::{Emitter, EmitterRegistry};
use crate::core::math::{channel_to_u8, Vec3};

//=== Constants ===========================================================

/// Rows of the image: position/intensity and color.
pub const TEXTURE_ROWS: usize = 2;

const POSITION_ROW: usize = 0;
const COLOR_ROW: usize = 1;

//=== TextureChannel ======================================================

/// CPU-side image of the trail-light texture.
pub struct TextureChannel {
    slots: usize,
    range: f32,
    texels: Vec<u32>,
    dirty: bool,
}

impl TextureChannel {
    //--- Construction -----------------------------------------------------

    /// Creates an all-zero texture with `slots` columns.
    ///
    /// # Panics
    ///
    /// Panics if `slots == 0` or `range <= 0.0`.
    pub fn new(slots: usize, range: f32) -> Self {
        assert!(slots > 0, "Texture slot count must be positive");
        assert!(range > 0.0, "Texture position range must be positive");

        Self {
            slots,
            range,
            texels: vec![0; slots * TEXTURE_ROWS],
            dirty: true,
        }
    }

    //--- Encoding ---------------------------------------------------------

    /// Re-encodes the registry relative to `viewer`.
    ///
    /// Emitters fill slots freshest first, so when more emitters are alive
    /// than slots exist, the ones dropped are those closest to expiry.
    /// Returns the number of slots written with a light.
    pub fn encode(&mut self, registry: &EmitterRegistry, viewer: Vec3) -> usize {
        let mut emitters: Vec<&Emitter> = registry.iter().collect();
        emitters.sort_unstable_by(|a, b| {
            b.ticks_remaining()
                .cmp(&a.ticks_remaining())
                .then_with(|| a.cell().cmp(&b.cell()))
        });

        let mut written = 0;
        for slot in 0..self.slots {
            let encoded = emitters
                .get(slot)
                .and_then(|emitter| self.encode_emitter(emitter, viewer));

            match encoded {
                Some((position, color)) => {
                    self.write(slot, position, color);
                    written += 1;
                }
                None => self.write(slot, 0, 0),
            }
        }

        if written > 0 {
            debug!("Encoded {} trail light texels", written);
        }
        written
    }

    /// Zeroes every slot.
    pub fn clear(&mut self) {
        if self.is_zeroed() {
            return;
        }
        self.texels.fill(0);
        self.dirty = true;
    }

    fn encode_emitter(&self, emitter: &Emitter, viewer: Vec3) -> Option<(u32, u32)> {
        let offset = emitter.cell().center() - viewer;
        let range = f64::from(self.range);
        if offset.x.abs() > range || offset.y.abs() > range || offset.z.abs() > range {
            return None;
        }

        let r = self.normalize_axis(offset.x);
        let g = self.normalize_axis(offset.y);
        let b = self.normalize_axis(offset.z);
        let intensity = f32::from(emitter.current_brightness()) / f32::from(MAX_LIGHT_LEVEL);
        let a = channel_to_u8(intensity);

        let position = pack_argb(a, r, g, b);
        let color = 0xFF00_0000 | emitter.color().to_rgb24();
        Some((position, color))
    }

    fn normalize_axis(&self, delta: f64) -> u8 {
        let normalized = (delta / f64::from(self.range) + 1.0) * 0.5;
        channel_to_u8(normalized as f32)
    }

    fn write(&mut self, slot: usize, position: u32, color: u32) {
        for (row, value) in [(POSITION_ROW, position), (COLOR_ROW, color)] {
            let texel = &mut self.texels[row * self.slots + slot];
            if *texel != value {
                *texel = value;
                self.dirty = true;
            }
        }
    }

    //--- Access -----------------------------------------------------------

    pub fn width(&self) -> usize {
        self.slots
    }

    pub fn height(&self) -> usize {
        TEXTURE_ROWS
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    /// Texel at `(slot, row)`, or `None` outside the image.
    pub fn texel(&self, slot: usize, row: usize) -> Option<u32> {
        if slot >= self.slots || row >= TEXTURE_ROWS {
            return None;
        }
        Some(self.texels[row * self.slots + slot])
    }

    /// Row-major texels.
    pub fn texels(&self) -> &[u32] {
        &self.texels
    }

    /// Row-major texels as raw bytes, ready for a GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn is_zeroed(&self) -> bool {
        self.texels.iter().all(|&t| t == 0)
    }

    /// Returns whether any texel changed since the last call, and resets
    /// the flag. A fresh texture starts dirty. Hosts use it to skip
    /// redundant uploads.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for TextureChannel {
    fn default() -> Self {
        Self::new(64, 256.0)
    }
}

fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::{CellPos, Rgb};

    #[test]
    fn empty_registry_encodes_all_zero() {
        let registry = EmitterRegistry::default();
        let mut texture = TextureChannel::default();

        assert_eq!(texture.encode(&registry, Vec3::ZERO), 0);
        assert!(texture.is_zeroed());
        assert_eq!(texture.texels().len(), 128);
    }

    #[test]
    fn emitter_at_viewer_encodes_mid_range() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(0, 0, 0), Rgb::new(1.0, 0.0, 0.0), 15, 20);
        let mut texture = TextureChannel::default();

        let written = texture.encode(&registry, Vec3::new(0.5, 0.5, 0.5));

        assert_eq!(written, 1);
        assert_eq!(texture.texel(0, 0), Some(0xFF7F_7F7F));
        assert_eq!(texture.texel(0, 1), Some(0xFFFF_0000));
        assert_eq!(texture.texel(1, 0), Some(0));
    }

    #[test]
    fn intensity_follows_decay() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(0, 0, 0), Rgb::GREEN, 10, 2);
        registry.tick();
        let mut texture = TextureChannel::default();

        texture.encode(&registry, Vec3::new(0.5, 0.5, 0.5));

        // Brightness 10 * 1/2 = 5 → 5/15 * 255 = 85.
        let alpha = texture.texel(0, 0).unwrap() >> 24;
        assert_eq!(alpha, 85);
    }

    #[test]
    fn out_of_range_emitter_is_zeroed_not_clamped() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(300, 0, 0), Rgb::GREEN, 12, 20);
        let mut texture = TextureChannel::default();

        assert_eq!(texture.encode(&registry, Vec3::ZERO), 0);
        assert!(texture.is_zeroed());
    }

    #[test]
    fn range_edges_map_to_extremes() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(9, 0, 0), Rgb::GREEN, 12, 20);
        let mut texture = TextureChannel::new(4, 10.0);

        // Offset x = +10 exactly (inside), y and z = 0.
        texture.encode(&registry, Vec3::new(-0.5, 0.5, 0.5));

        let texel = texture.texel(0, 0).unwrap();
        assert_eq!((texel >> 16) & 0xFF, 255);
        assert_eq!((texel >> 8) & 0xFF, 127);
    }

    #[test]
    fn dead_emitter_absent_from_next_encode() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(10, 64, 10), Rgb::GREEN, 12, 20);
        let mut texture = TextureChannel::default();
        let viewer = Vec3::new(0.0, 64.0, 0.0);

        assert_eq!(texture.encode(&registry, viewer), 1);
        for _ in 0..20 {
            registry.tick();
        }
        assert_eq!(texture.encode(&registry, viewer), 0);
        assert!(texture.is_zeroed());
    }

    #[test]
    fn overflow_keeps_freshest_emitters() {
        let mut registry = EmitterRegistry::default();
        for x in 0..4 {
            registry.add(CellPos::new(x, 0, 0), Rgb::GREEN, 12, 10 + x as u32);
        }
        let mut texture = TextureChannel::new(2, 256.0);

        assert_eq!(texture.encode(&registry, Vec3::ZERO), 2);

        // Slot 0 holds x = 3 (longest lifetime), slot 1 holds x = 2.
        let x_of = |slot| (texture.texel(slot, 0).unwrap() >> 16) & 0xFF;
        assert!(x_of(0) > x_of(1));
    }

    #[test]
    fn clear_zeroes_and_marks_dirty() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 20);
        let mut texture = TextureChannel::default();
        texture.encode(&registry, Vec3::ZERO);
        assert!(texture.take_dirty());
        assert!(!texture.take_dirty());

        texture.clear();

        assert!(texture.is_zeroed());
        assert!(texture.take_dirty());

        texture.clear();
        assert!(!texture.take_dirty());
    }

    #[test]
    fn identical_reencode_stays_clean() {
        let registry = EmitterRegistry::default();
        let mut texture = TextureChannel::default();

        texture.encode(&registry, Vec3::ZERO);
        assert!(texture.take_dirty());
        texture.encode(&registry, Vec3::ZERO);
        assert!(!texture.take_dirty());
    }

    #[test]
    fn decay_or_viewer_motion_marks_dirty() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(4, 0, 0), Rgb::GREEN, 15, 20);
        let mut texture = TextureChannel::default();

        texture.encode(&registry, Vec3::ZERO);
        assert!(texture.take_dirty());
        texture.encode(&registry, Vec3::ZERO);
        assert!(!texture.take_dirty());

        registry.tick();
        texture.encode(&registry, Vec3::ZERO);
        assert!(texture.take_dirty());

        texture.encode(&registry, Vec3::new(-8.0, 0.0, 0.0));
        assert!(texture.take_dirty());
    }

    #[test]
    fn byte_view_matches_texel_count() {
        let texture = TextureChannel::new(8, 16.0);
        assert_eq!(texture.as_bytes().len(), 8 * 2 * 4);
        assert_eq!(texture.width(), 8);
        assert_eq!(texture.height(), 2);
        assert_eq!(texture.texel(8, 0), None);
    }

    #[test]
    #[should_panic(expected = "Texture slot count must be positive")]
    fn zero_slots_panics() {
        TextureChannel::new(0, 1.0);
    }
}
