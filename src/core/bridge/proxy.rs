//=========================================================================
// Light Proxies
//=========================================================================
//
// Synthetic `LightSource` implementations handed to the backend.
//
//   CellProxy   - mirrors one registry cell, reads the registry live
//   EntityProxy - follows a moving source, interpolated at render time
//
// Proxies never own what they describe. A cell proxy whose emitter died
// reports luminance 0; an entity proxy whose source vanished keeps
// reporting its last known position until the bridge removes it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::tracker::{ChainSlot, SourceRef};
use super::{LightId, LightSource, WorldHandle};
use crate::core::emitters::SharedRegistry;
use crate::core::math::{CellPos, Rgb, Vec3};

//=== FrameClock ==========================================================

/// Fraction of the current simulation step elapsed at render time.
///
/// Written once per render frame by the subsystem, read by every entity
/// proxy when a backend asks for its position.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    partial_tick: Rc<Cell<f32>>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step fraction, clamped to [0, 1].
    pub fn set_partial_tick(&self, partial_tick: f32) {
        self.partial_tick.set(partial_tick.clamp(0.0, 1.0));
    }

    pub fn partial_tick(&self) -> f32 {
        self.partial_tick.get()
    }
}

//=== CellProxy ===========================================================

/// Backend view of a registry emitter.
pub struct CellProxy {
    id: LightId,
    cell: CellPos,
    world: WorldHandle,
    registry: SharedRegistry,
    enabled: Cell<bool>,
}

impl CellProxy {
    pub fn new(id: LightId, cell: CellPos, world: WorldHandle, registry: SharedRegistry) -> Self {
        Self {
            id,
            cell,
            world,
            registry,
            enabled: Cell::new(true),
        }
    }

    pub fn cell(&self) -> CellPos {
        self.cell
    }
}

impl LightSource for CellProxy {
    fn id(&self) -> LightId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.cell.center()
    }

    fn world(&self) -> WorldHandle {
        self.world
    }

    fn luminance(&self) -> u8 {
        if !self.enabled.get() {
            return 0;
        }
        // A backend may query us while the registry is being written to.
        // Report dark for that read rather than panic.
        self.registry
            .try_borrow()
            .ok()
            .and_then(|registry| registry.current_brightness(self.cell))
            .unwrap_or(0)
    }

    fn color(&self) -> Rgb {
        self.registry
            .try_borrow()
            .ok()
            .and_then(|registry| registry.color_at(self.cell))
            .unwrap_or_default()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

//=== EntityProxy =========================================================

/// Backend view of one slot of an entity-bound light chain.
pub struct EntityProxy {
    id: LightId,
    slot: ChainSlot,
    luminance: u8,
    world: WorldHandle,
    source: SourceRef,
    clock: FrameClock,
    last_position: Cell<Vec3>,
    enabled: Cell<bool>,
}

impl EntityProxy {
    pub fn new(
        id: LightId,
        slot: ChainSlot,
        luminance: u8,
        world: WorldHandle,
        source: SourceRef,
        clock: FrameClock,
    ) -> Self {
        let proxy = Self {
            id,
            slot,
            luminance,
            world,
            source,
            clock,
            last_position: Cell::new(Vec3::ZERO),
            enabled: Cell::new(true),
        };
        // Seed the fallback position while the source is known to exist.
        proxy.position();
        proxy
    }

    pub fn slot(&self) -> ChainSlot {
        self.slot
    }

    /// Interpolated position of the slot, or `None` if the source is gone.
    ///
    /// The head sits at `lerp(previous, current, partial_tick)`; trailing
    /// slots are pushed back along `current - previous`.
    fn resolve_position(&self) -> Option<Vec3> {
        let source = self.source.upgrade()?;
        let previous = source.previous_position();
        let current = source.current_position();

        let base = previous.lerp(current, f64::from(self.clock.partial_tick()));
        let trailing = self.slot.trailing_distance();
        if trailing == 0.0 {
            return Some(base);
        }

        let direction = (current - previous).normalize_or_zero();
        Some(base - direction * trailing)
    }
}

impl LightSource for EntityProxy {
    fn id(&self) -> LightId {
        self.id
    }

    fn position(&self) -> Vec3 {
        match self.resolve_position() {
            Some(pos) => {
                self.last_position.set(pos);
                pos
            }
            None => self.last_position.get(),
        }
    }

    fn world(&self) -> WorldHandle {
        self.world
    }

    fn luminance(&self) -> u8 {
        if self.enabled.get() {
            self.luminance
        } else {
            0
        }
    }

    fn color(&self) -> Rgb {
        self.slot.color
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
