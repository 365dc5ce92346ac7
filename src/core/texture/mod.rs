//=========================================================================
// Texture Fallback Channel
//=========================================================================
//
// Image-based export of the emitter registry for shader pipelines.
//
// Both exports read the registry independently of the adapter bridge;
// neither depends on a backend being present.
//
//=========================================================================

//=== Module Declarations =================================================

mod channel;
mod shader_lights;

//=== Public API ==========================================================

pub use channel::{TextureChannel, TEXTURE_ROWS};
pub use shader_lights::{nearest_lights, ShaderLight};
