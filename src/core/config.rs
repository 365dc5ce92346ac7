//=========================================================================
// Lighting Configuration
//=========================================================================
//
// Plain value container for every tunable of the lighting subsystem.
//
// Values are set through `LightingBuilder` (see `crate::lighting`); this
// module only owns the data and its defaults. Loading configuration from
// disk is the host's concern.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== Internal Dependencies ===============================================

use super::math::Rgb;

//=== Constants ===========================================================

/// Highest brightness level an emitter may be configured with.
pub const MAX_LIGHT_LEVEL: u8 = 15;

/// Lowest brightness level an emitter may be configured with.
pub const MIN_LIGHT_LEVEL: u8 = 1;

//=== LightingConfig ======================================================

/// Runtime configuration for the lighting subsystem.
///
/// # Default Values
///
/// - **max_emitters**: 300
/// - **eviction_batch**: 50
/// - **light_level**: 12
/// - **light_duration_ticks**: 20
/// - **trail_color**: green
/// - **entity_ttl**: 1 s
/// - **refresh_throttle**: 200 ms
/// - **texture_slots**: 64, **texture_range**: 256.0
#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    /// Master switch. When false, emitter adds are ignored.
    pub enabled: bool,

    //--- Emitter Registry -------------------------------------------------
    pub max_emitters: usize,
    pub eviction_batch: usize,
    pub light_level: u8,
    pub light_duration_ticks: u32,
    pub trail_color: Rgb,

    //--- Adapter Bridge ---------------------------------------------------
    pub entity_ttl: Duration,
    pub refresh_throttle: Duration,
    pub chain_enabled: bool,
    pub chain_count: usize,
    pub chain_spacing: f64,

    //--- Texture Channel --------------------------------------------------
    pub texture_slots: usize,
    pub texture_range: f32,

    //--- Command Queue ----------------------------------------------------
    pub command_capacity: usize,
    pub max_commands_per_step: usize,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_emitters: 300,
            eviction_batch: 50,
            light_level: 12,
            light_duration_ticks: 20,
            trail_color: Rgb::GREEN,
            entity_ttl: Duration::from_secs(1),
            refresh_throttle: Duration::from_millis(200),
            chain_enabled: false,
            chain_count: 4,
            chain_spacing: 0.75,
            texture_slots: 64,
            texture_range: 256.0,
            command_capacity: 1024,
            max_commands_per_step: 512,
        }
    }
}

/// Clamps a requested brightness into the valid emitter range.
pub fn clamp_light_level(level: u8) -> u8 {
    level.clamp(MIN_LIGHT_LEVEL, MAX_LIGHT_LEVEL)
}
