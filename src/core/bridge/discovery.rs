//=========================================================================
// Backend Discovery
//=========================================================================
//
// One-shot capability negotiation with the first available backend.
//
// Flow:
//   providers (priority order) ──locate()──> backend ──capability()──>
//       add supported?  ──yes──> Bridged
//                       ──no───> Unavailable
//
// Providers are registered by the host at startup; nothing here is
// looked up implicitly.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info, warn};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use super::{AdapterCapability, BackendError, LightingBackend};

//=== BridgeState =========================================================

/// Availability of the external backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Nothing attempted yet.
    Unprobed,
    /// Looking for a provider that can hand out a backend.
    Probing,
    /// A backend was located; resolving its surface.
    Discovering,
    /// Steady state, lights are mirrored into the backend.
    Bridged,
    /// Terminal. No backend for the rest of the process lifetime.
    Unavailable,
}

//=== BackendProvider =====================================================

/// Locates one known backend implementation in the host.
///
/// Equivalent of "is this lighting mod loaded, and if so give me its
/// singleton". `Ok(None)` means the backend is simply absent.
pub trait BackendProvider {
    fn name(&self) -> &str;

    fn locate(&self) -> Result<Option<Box<dyn LightingBackend>>, BackendError>;
}

//=== DiscoveryError ======================================================

/// Why discovery ended in [`BridgeState::Unavailable`]. Logged, never surfaced.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no compatible lighting backend found")]
    NoProvider,

    #[error("backend `{0}` does not implement `add`")]
    MissingAdd(String),
}

//=== Discovered ==========================================================

/// Result of a successful discovery.
pub(crate) struct Discovered {
    pub backend: Box<dyn LightingBackend>,
    pub capability: AdapterCapability,
}

//=== discover() ==========================================================

/// Probes providers in order and resolves the first backend found.
///
/// A provider that errors while locating is skipped like an absent one.
/// The first backend located is final: if its surface lacks `add`,
/// discovery fails rather than falling through to lower priorities.
pub(crate) fn discover(
    providers: &[Box<dyn BackendProvider>],
) -> Result<Discovered, DiscoveryError> {
    //--- Probing ----------------------------------------------------------
    let mut located = None;
    for provider in providers {
        match provider.locate() {
            Ok(Some(backend)) => {
                debug!("Lighting provider `{}` located a backend", provider.name());
                located = Some(backend);
                break;
            }
            Ok(None) => debug!("Lighting provider `{}` not present", provider.name()),
            Err(e) => warn!("Lighting provider `{}` failed to locate: {}", provider.name(), e),
        }
    }

    let backend = located.ok_or(DiscoveryError::NoProvider)?;

    //--- Discovering ------------------------------------------------------
    let capability = backend.capability();
    if !capability.add {
        return Err(DiscoveryError::MissingAdd(backend.name().to_string()));
    }

    info!(
        "Lighting backend `{}` bridged with capabilities {}",
        backend.name(),
        capability
    );

    Ok(Discovered { backend, capability })
}

//=========================================================================
// Unit Tests
//=========================================================================
