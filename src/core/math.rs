//=========================================================================
// Spatial Primitives
//=========================================================================
//
// Small value types shared by every lighting component.
//
//   Vec3    - continuous world position (f64, matches simulation space)
//   CellPos - discrete spatial cell an emitter is keyed by
//   Rgb     - normalized light color (0.0..=1.0 per channel)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::ops::{Add, Mul, Sub};

//=== Vec3 ================================================================

/// World-space position or direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(self, other: Vec3) -> f64 {
        (self - other).length_squared()
    }

    /// Linear interpolation: `self` at `t == 0`, `other` at `t == 1`.
    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }

    /// Unit vector in the same direction, or [`Vec3::ZERO`] when the
    /// length is too small to carry a direction.
    pub fn normalize_or_zero(self) -> Vec3 {
        const MIN_LENGTH: f64 = 1.0e-6;

        let len = self.length();
        if len < MIN_LENGTH {
            Vec3::ZERO
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

//=== CellPos =============================================================

/// Integer cell coordinate. One emitter may occupy a cell at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the cell containing a world position (floor on every axis).
    pub fn containing(pos: Vec3) -> Self {
        Self::new(pos.x.floor() as i32, pos.y.floor() as i32, pos.z.floor() as i32)
    }

    /// World-space center of the cell.
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Squared euclidean distance between two cells.
    pub fn distance_squared(self, other: CellPos) -> f64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        (dx * dx + dy * dy + dz * dz) as f64
    }
}

//=== Rgb =================================================================

/// Normalized light color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const GREEN: Rgb = Rgb::new(0.0, 1.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from 8-bit channels.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        )
    }

    /// Packs the color into `0x00RRGGBB`, each channel clamped to [0, 1].
    pub fn to_rgb24(self) -> u32 {
        (u32::from(channel_to_u8(self.r)) << 16)
            | (u32::from(channel_to_u8(self.g)) << 8)
            | u32::from(channel_to_u8(self.b))
    }
}

/// Maps a normalized channel to a byte, truncating like the shader side expects.
pub(crate) fn channel_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coordinates() {
        let cell = CellPos::containing(Vec3::new(-0.5, 64.9, 10.0));
        assert_eq!(cell, CellPos::new(-1, 64, 10));
    }

    #[test]
    fn center_is_offset_by_half() {
        assert_eq!(CellPos::new(1, 2, 3).center(), Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, -4.0, 2.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec3::new(5.0, -2.0, 1.0));
    }

    #[test]
    fn normalize_zero_length_is_zero() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalize_or_zero();
        assert!((n.length() - 1.0).abs() < 1.0e-9);
    }

    #[test]
    fn rgb24_packing() {
        assert_eq!(Rgb::GREEN.to_rgb24(), 0x00_00FF_00);
        assert_eq!(Rgb::new(2.0, -1.0, 1.0).to_rgb24(), 0x00FF_00FF);
    }

    #[test]
    fn cell_distance() {
        let a = CellPos::new(0, 0, 0);
        let b = CellPos::new(3, 4, 0);
        assert_eq!(a.distance_squared(b), 25.0);
    }
}
