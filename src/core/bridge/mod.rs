//=========================================================================
// Lighting Bridge
//=========================================================================
//
// Bridges the emitter registry with an optional external lighting
// backend that is only known at runtime.
//
// This module defines the contract a backend must satisfy and the bridge
// that drives it, so backends can be plugged in by the host without the
// core ever depending on them (Dependency Inversion Principle).
//
// Components:
// - `interface`: backend trait, light-source shape, capability, errors
// - `discovery`: provider probing and capability negotiation
// - `proxy`: synthetic light sources handed to the backend
// - `tracker`: entity-bound light chains and liveness
// - `adapter`: the per-step bridge state machine
//
//=========================================================================

//=== Module Declarations =================================================

mod adapter;
mod discovery;
mod interface;
mod proxy;
mod tracker;

//=== Public API ==========================================================

pub use adapter::{AdapterBridge, BridgeSettings};
pub use discovery::{BackendProvider, BridgeState, DiscoveryError};
pub use interface::{
    AdapterCapability, BackendError, BackendOp, LightId, LightSource, LightingBackend,
    NullBackend, RendererHandle, SharedLight, WorldHandle,
};
pub use proxy::{CellProxy, EntityProxy, FrameClock};
pub use tracker::{
    chain_slots, ChainSlot, EntityTrackedLight, MovingSource, OwnerId, SourceRef, MAX_CHAIN_LENGTH,
    SINGLE_SLOT,
};
