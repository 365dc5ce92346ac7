//=========================================================================
// Trail Lighting — Library Root
//
// This crate defines the public API surface of the trail lighting
// subsystem.
//
// Responsibilities:
// - Expose the subsystem facade (`LightingSubsystem`) and its builder
// - Expose the building blocks (registry, bridge, texture channel) for
//   hosts that drive them directly
//
// Typical usage:
// ```no_run
// use trail_lighting::LightingBuilder;
// use trail_lighting::core::math::Vec3;
//
// let mut lighting = LightingBuilder::new().build();
// let handle = lighting.handle();
//
// handle.add(Vec3::new(0.0, 64.0, 0.0));
// lighting.step();
// lighting.render_frame(Vec3::new(0.0, 65.0, 2.0), 0.5);
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the registry, the backend bridge, the texture channel
// and the command queue. Hosts with their own step loop can use these
// directly instead of the facade.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `lighting` wires the core pieces into one per-step coordinator.
//
mod lighting;

//--- Public Exports ------------------------------------------------------

pub use lighting::{LightingBuilder, LightingSubsystem};
