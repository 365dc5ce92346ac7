//=========================================================================
// Command Queue
//=========================================================================
//
// Cross-thread submission of lighting requests.
//
// Components:
// - `interface`: command type and the caller-facing handle
// - `collector`: step-side bounded draining
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod collector;
pub(crate) mod interface;

//=== Public API ==========================================================

pub(crate) use collector::CommandCollector;
pub use interface::{LightCommand, LightingHandle};
