//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use trail_lighting::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Subsystem
pub use crate::lighting::{LightingBuilder, LightingSubsystem};

// Configuration and geometry
pub use crate::core::config::LightingConfig;
pub use crate::core::math::{CellPos, Rgb, Vec3};

// Emitters
pub use crate::core::emitters::{Emitter, EmitterRegistry};

// Backend integration
pub use crate::core::bridge::{
    AdapterCapability, BackendError, BackendOp, BackendProvider, BridgeState, LightSource,
    LightingBackend, MovingSource, OwnerId, SharedLight,
};

// Commands
pub use crate::core::command::{LightCommand, LightingHandle};

// Texture fallback
pub use crate::core::texture::{ShaderLight, TextureChannel};
