//=========================================================================
// Core Lighting Systems
//=========================================================================
//
// Building blocks of the trail lighting subsystem.
//
// Components:
// - `emitters`: decaying per-cell light emitters (source of truth)
// - `bridge`: optional mirroring into a dynamic-lighting backend
// - `texture`: image and uniform exports for shader pipelines
// - `command`: cross-thread request queue
// - `config` / `math`: shared settings and value types
//
// Notes:
// Everything except `command::LightingHandle` lives on the simulation
// step thread.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod bridge;
pub mod command;
pub mod config;
pub mod emitters;
pub mod math;
pub mod texture;

//=== Public API ==========================================================

pub use bridge::{AdapterBridge, BridgeState};
pub use command::{LightCommand, LightingHandle};
pub use config::LightingConfig;
pub use emitters::{Emitter, EmitterRegistry, SharedRegistry};
pub use texture::TextureChannel;
