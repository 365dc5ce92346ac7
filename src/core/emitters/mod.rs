//=========================================================================
// Emitter System
//=========================================================================
//
// Position-keyed transient light emitters.
//
// Components:
// - `emitter`: single decaying light (pure data)
// - `registry`: bounded, cell-keyed collection with decay and eviction
//
//=========================================================================

//=== Module Declarations =================================================

mod emitter;
mod registry;

//=== Public API ==========================================================

pub use emitter::Emitter;
pub use registry::{EmitterRegistry, SharedRegistry};
