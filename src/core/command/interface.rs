//=========================================================================
// Lighting Commands
//=========================================================================
//
// Fire-and-forget requests from the visual-effect layer to the lighting
// step thread.
//
// Architecture:
//   effect layer (any thread) ──LightingHandle──> bounded channel
//                                                      ↓
//   step thread ──CommandCollector::collect_step()──> LightingSubsystem
//
// A full channel drops the request: the feature is cosmetic and callers
// must never block on it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::bridge::{MovingSource, OwnerId, SourceRef};
use crate::core::math::{Rgb, Vec3};

//=== LightCommand ========================================================

/// Requests queued for the next lighting step.
#[derive(Debug, Clone)]
pub enum LightCommand {
    /// Adds an emitter; each `None` falls back to the configured trail
    /// color, light level or light duration.
    AddEmitter {
        position: Vec3,
        color: Option<Rgb>,
        brightness: Option<u8>,
        lifetime: Option<u32>,
    },

    /// Adds `count` evenly spaced emitters between two points.
    AddSegment {
        from: Vec3,
        to: Vec3,
        count: u32,
        color: Option<Rgb>,
    },

    /// Tracks a moving owner with a single light.
    TrackSingle {
        owner: OwnerId,
        source: SourceRef,
        color: Rgb,
    },

    /// Tracks a moving owner with a trailing chain of lights.
    TrackChain {
        owner: OwnerId,
        source: SourceRef,
        count: usize,
        spacing: f64,
        color: Rgb,
    },

    /// Tracks a moving owner using the configured chain settings and color.
    TrackConfigured { owner: OwnerId, source: SourceRef },

    Ping(OwnerId),

    Untrack(OwnerId),

    ClearAll,

    ForceRefresh,
}

//=== LightingHandle ======================================================

/// Cloneable, thread-safe entry point for upstream callers.
///
/// Every method returns immediately and never fails from the caller's
/// point of view.
#[derive(Debug, Clone)]
pub struct LightingHandle {
    sender: Sender<LightCommand>,
}

impl LightingHandle {
    pub(crate) fn new(sender: Sender<LightCommand>) -> Self {
        Self { sender }
    }

    //--- Registry ---------------------------------------------------------

    /// Adds an emitter with the configured trail color.
    pub fn add(&self, position: Vec3) {
        self.send(LightCommand::AddEmitter {
            position,
            color: None,
            brightness: None,
            lifetime: None,
        });
    }

    pub fn add_with_color(&self, position: Vec3, color: Rgb) {
        self.send(LightCommand::AddEmitter {
            position,
            color: Some(color),
            brightness: None,
            lifetime: None,
        });
    }

    /// Adds an emitter with its own peak brightness and lifetime in steps,
    /// e.g. a short, bright flash where a projectile hits.
    pub fn add_impact(&self, position: Vec3, color: Rgb, brightness: u8, lifetime_steps: u32) {
        self.send(LightCommand::AddEmitter {
            position,
            color: Some(color),
            brightness: Some(brightness),
            lifetime: Some(lifetime_steps),
        });
    }

    pub fn add_segment(&self, from: Vec3, to: Vec3, count: u32, color: Option<Rgb>) {
        self.send(LightCommand::AddSegment {
            from,
            to,
            count,
            color,
        });
    }

    //--- Entity Tracking --------------------------------------------------

    pub fn track(&self, owner: OwnerId, source: &Arc<dyn MovingSource>) {
        self.send(LightCommand::TrackConfigured {
            owner,
            source: Arc::downgrade(source),
        });
    }

    pub fn track_single(&self, owner: OwnerId, source: &Arc<dyn MovingSource>, color: Rgb) {
        self.send(LightCommand::TrackSingle {
            owner,
            source: Arc::downgrade(source),
            color,
        });
    }

    pub fn track_chain(
        &self,
        owner: OwnerId,
        source: &Arc<dyn MovingSource>,
        count: usize,
        spacing: f64,
        color: Rgb,
    ) {
        self.send(LightCommand::TrackChain {
            owner,
            source: Arc::downgrade(source),
            count,
            spacing,
            color,
        });
    }

    /// Liveness signal; call every step the owner is still observed.
    pub fn ping(&self, owner: OwnerId) {
        self.send(LightCommand::Ping(owner));
    }

    pub fn untrack(&self, owner: OwnerId) {
        self.send(LightCommand::Untrack(owner));
    }

    //--- Bulk -------------------------------------------------------------

    pub fn clear_all(&self) {
        self.send(LightCommand::ClearAll);
    }

    pub fn force_refresh(&self) {
        self.send(LightCommand::ForceRefresh);
    }

    fn send(&self, command: LightCommand) {
        match self.sender.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!("Lighting command queue full, dropping {:?}", dropped);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Lighting subsystem gone, command ignored");
            }
        }
    }
}
