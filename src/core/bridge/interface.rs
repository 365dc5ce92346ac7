//=========================================================================
// Lighting Backend Interface
//=========================================================================
//
// Contract between the adapter bridge and an external lighting backend.
//
// A backend only ever sees `LightSource` trait objects; it never learns
// whether a light mirrors a registry cell or follows a moving entity.
// Every operation except `add` is optional and advertised through
// `AdapterCapability`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::math::{Rgb, Vec3};

//=== Handles =============================================================

/// Stable identity of a bridged light, unique for the bridge lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

/// Opaque handle to the world/scene a light belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorldHandle(pub u64);

/// Opaque handle to the renderer passed to `refresh_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RendererHandle(pub u64);

//=== LightSource =========================================================

/// Value shape a backend accepts in `add`.
///
/// Accessors are evaluated lazily: a backend reading a light twice may see
/// two different values because the underlying emitter decayed or the
/// owning entity moved in between.
pub trait LightSource {
    fn id(&self) -> LightId;

    /// Current world-space position.
    fn position(&self) -> Vec3;

    fn x(&self) -> f64 {
        self.position().x
    }

    fn y(&self) -> f64 {
        self.position().y
    }

    fn z(&self) -> f64 {
        self.position().z
    }

    fn world(&self) -> WorldHandle;

    /// Current light level in 0..=15. Zero means the light contributes nothing.
    fn luminance(&self) -> u8;

    fn color(&self) -> Rgb;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// Reference-counted light handed to a backend.
pub type SharedLight = Rc<dyn LightSource>;

//=== BackendOp ===========================================================

/// Operations of the backend surface, used for capability checks and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Add,
    Remove,
    RefreshOne,
    ClearAll,
    RefreshAll,
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::RefreshOne => "refresh_one",
            Self::ClearAll => "clear_all",
            Self::RefreshAll => "refresh_all",
        };
        f.write_str(name)
    }
}

//=== AdapterCapability ===================================================

/// Resolved backend surface. Immutable once discovery has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterCapability {
    pub add: bool,
    pub remove: bool,
    pub refresh_one: bool,
    pub clear_all: bool,
    pub refresh_all: bool,
}

impl AdapterCapability {
    /// Nothing callable. Reported by the null backend.
    pub const NONE: Self = Self {
        add: false,
        remove: false,
        refresh_one: false,
        clear_all: false,
        refresh_all: false,
    };

    /// Only the mandatory `add`.
    pub const ADD_ONLY: Self = Self {
        add: true,
        ..Self::NONE
    };

    pub const FULL: Self = Self {
        add: true,
        remove: true,
        refresh_one: true,
        clear_all: true,
        refresh_all: true,
    };

    pub fn supports(&self, op: BackendOp) -> bool {
        match op {
            BackendOp::Add => self.add,
            BackendOp::Remove => self.remove,
            BackendOp::RefreshOne => self.refresh_one,
            BackendOp::ClearAll => self.clear_all,
            BackendOp::RefreshAll => self.refresh_all,
        }
    }
}

impl fmt::Display for AdapterCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops = [
            BackendOp::Add,
            BackendOp::Remove,
            BackendOp::RefreshOne,
            BackendOp::ClearAll,
            BackendOp::RefreshAll,
        ];
        let mut first = true;
        f.write_str("[")?;
        for op in ops.into_iter().filter(|op| self.supports(*op)) {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}", op)?;
            first = false;
        }
        f.write_str("]")
    }
}

//=== BackendError ========================================================

/// Failure of a single backend invocation.
///
/// Always contained by the bridge: logged and treated as a skipped update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("operation `{0}` is not supported by this backend")]
    Unsupported(BackendOp),

    #[error("backend rejected `{operation}`: {reason}")]
    Rejected { operation: BackendOp, reason: String },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

//=== LightingBackend =====================================================

/// External lighting backend.
///
/// Implementations are supplied by the host through a
/// [`BackendProvider`](super::BackendProvider). Calls are synchronous and
/// expected to return quickly.
pub trait LightingBackend {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Operations this backend actually implements.
    fn capability(&self) -> AdapterCapability;

    /// Starts tracking a light. Re-adding a known light is an update.
    fn add(&mut self, light: SharedLight) -> Result<(), BackendError>;

    fn remove(&mut self, _light: &SharedLight) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(BackendOp::Remove))
    }

    /// Lightweight per-light update hook.
    fn refresh_one(&mut self, _light: &SharedLight) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(BackendOp::RefreshOne))
    }

    fn clear_all(&mut self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(BackendOp::ClearAll))
    }

    /// Full re-scan of every tracked light. Assumed expensive.
    fn refresh_all(&mut self, _renderer: RendererHandle) -> Result<(), BackendError> {
        Err(BackendError::Unsupported(BackendOp::RefreshAll))
    }
}

//=== NullBackend =========================================================

/// Backend used while no real backend is bridged. Accepts nothing.
#[derive(Debug, Default)]
pub struct NullBackend;

impl LightingBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn capability(&self) -> AdapterCapability {
        AdapterCapability::NONE
    }

    fn add(&mut self, _light: SharedLight) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("no lighting backend bridged".to_string()))
    }
}
