//=========================================================================
// Adapter Bridge
//=========================================================================
//
// Mirrors registry emitters and entity-bound lights into an external
// lighting backend.
//
// Architecture:
// ```text
//   Unprobed ──first use──> Probing ──> Discovering ──> Bridged
//                              │              │
//                              └──────────────┴──────> Unavailable
//
//   Bridged, every step:
//     sync_cells()    registry cells  <-diff->  cell_proxies
//                       new   -> add
//                       gone  -> remove
//                       kept  -> refresh_one (or add)
//     sweep_entities() trackers: gone or not pinged within TTL -> remove
// ```
//
// Every backend call is contained: a failure is logged and treated as a
// skipped update for that one light. Nothing here ever leaves Bridged once
// entered, and nothing ever re-runs discovery.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use super::discovery::{discover, BackendProvider, BridgeState};
use super::proxy::{CellProxy, EntityProxy, FrameClock};
use super::tracker::{chain_slots, ChainSlot, EntityTrackedLight, MovingSource, OwnerId, SourceRef};
use super::{
    AdapterCapability, BackendError, BackendOp, LightId, LightingBackend, NullBackend,
    RendererHandle, SharedLight, WorldHandle,
};
use crate::core::emitters::SharedRegistry;
use crate::core::math::{CellPos, Rgb};

//=== BridgeSettings ======================================================

/// Tunables of the bridge, extracted from [`crate::core::config::LightingConfig`].
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub world: WorldHandle,
    pub renderer: RendererHandle,
    pub entity_ttl: Duration,
    pub refresh_throttle: Duration,
    /// Luminance reported by entity-bound proxies.
    pub entity_light_level: u8,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            world: WorldHandle::default(),
            renderer: RendererHandle::default(),
            entity_ttl: Duration::from_secs(1),
            refresh_throttle: Duration::from_millis(200),
            entity_light_level: 12,
        }
    }
}

//=== AdapterBridge =======================================================

/// Bridge between the emitter registry and an optional lighting backend.
pub struct AdapterBridge {
    state: BridgeState,
    providers: Vec<Box<dyn BackendProvider>>,
    backend: Box<dyn LightingBackend>,
    capability: AdapterCapability,

    registry: SharedRegistry,
    clock: FrameClock,
    settings: BridgeSettings,

    cell_proxies: HashMap<CellPos, SharedLight>,
    trackers: HashMap<OwnerId, EntityTrackedLight>,
    next_light_id: u64,
    last_forced_refresh: Option<Instant>,
}

impl AdapterBridge {
    //--- Construction -----------------------------------------------------

    /// Creates an unprobed bridge.
    ///
    /// `providers` are tried in order on first use. An empty list is valid
    /// and simply ends in [`BridgeState::Unavailable`].
    pub fn new(
        registry: SharedRegistry,
        clock: FrameClock,
        providers: Vec<Box<dyn BackendProvider>>,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            state: BridgeState::Unprobed,
            providers,
            backend: Box::new(NullBackend),
            capability: AdapterCapability::NONE,
            registry,
            clock,
            settings,
            cell_proxies: HashMap::new(),
            trackers: HashMap::new(),
            next_light_id: 1,
            last_forced_refresh: None,
        }
    }

    //--- Discovery --------------------------------------------------------

    /// Runs discovery if it has not run yet. Idempotent.
    pub fn probe(&mut self) {
        if self.state != BridgeState::Unprobed {
            return;
        }

        self.state = BridgeState::Probing;
        match discover(&self.providers) {
            Ok(discovered) => {
                self.state = BridgeState::Discovering;
                self.backend = discovered.backend;
                self.capability = discovered.capability;
                self.state = BridgeState::Bridged;
            }
            Err(e) => {
                info!("{}; lights fall back to emissive rendering only", e);
                self.state = BridgeState::Unavailable;
            }
        }

        // Providers are never consulted again.
        self.providers.clear();
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn is_bridged(&self) -> bool {
        self.state == BridgeState::Bridged
    }

    pub fn capability(&self) -> AdapterCapability {
        self.capability
    }

    //--- Step Synchronization ---------------------------------------------

    /// Per-step synchronization: registry diff, then entity sweep.
    pub fn sync(&mut self, now: Instant) {
        self.probe();
        if !self.is_bridged() {
            return;
        }

        self.sync_cells();
        self.sweep_entities(now);
    }

    /// Diffs live registry cells against the bridged proxies.
    fn sync_cells(&mut self) {
        // Snapshot first so no registry borrow is held across backend calls.
        let live: HashSet<CellPos> = match self.registry.try_borrow() {
            Ok(registry) => registry.cells().collect(),
            Err(_) => {
                warn!("Emitter registry busy during bridge sync; skipping cell diff this step");
                return;
            }
        };

        //--- Removed cells ---------------------------------------------------
        let gone: Vec<CellPos> = self
            .cell_proxies
            .keys()
            .filter(|cell| !live.contains(*cell))
            .copied()
            .collect();

        for cell in gone {
            if let Some(light) = self.cell_proxies.remove(&cell) {
                self.retire(&light);
            }
        }

        //--- New and surviving cells -----------------------------------------
        for cell in live {
            match self.cell_proxies.get(&cell).cloned() {
                Some(light) => self.refresh(&light),
                None => {
                    let light = self.make_cell_proxy(cell);
                    if self.invoke_add(&light) {
                        self.cell_proxies.insert(cell, light);
                    }
                }
            }
        }
    }

    /// Drops trackers whose owner vanished or went unpinged past the TTL.
    fn sweep_entities(&mut self, now: Instant) {
        let ttl = self.settings.entity_ttl;
        let stale: Vec<OwnerId> = self
            .trackers
            .values()
            .filter(|tracker| tracker.is_stale(now, ttl))
            .map(EntityTrackedLight::owner)
            .collect();

        for owner in stale {
            debug!("Entity light {} stale, untracking", owner);
            self.untrack(owner);
        }
    }

    //--- Entity Tracking --------------------------------------------------

    /// Tracks a single light at the owner's interpolated position.
    ///
    /// No-op (besides refreshing liveness) when `owner` is already tracked.
    pub fn track_single(
        &mut self,
        owner: OwnerId,
        source: &Arc<dyn MovingSource>,
        color: Rgb,
        now: Instant,
    ) {
        self.track_slots(owner, Arc::downgrade(source), vec![ChainSlot::single(color)], now);
    }

    /// Tracks `count` lights trailing the owner at `spacing` intervals.
    ///
    /// No-op (besides refreshing liveness) when `owner` is already tracked.
    pub fn track_chain(
        &mut self,
        owner: OwnerId,
        source: &Arc<dyn MovingSource>,
        count: usize,
        spacing: f64,
        color: Rgb,
        now: Instant,
    ) {
        let slots = chain_slots(count, spacing, color);
        self.track_slots(owner, Arc::downgrade(source), slots, now);
    }

    /// Registers one proxy per slot, unless `owner` is already tracked.
    pub(crate) fn track_slots(
        &mut self,
        owner: OwnerId,
        source: SourceRef,
        slots: Vec<ChainSlot>,
        now: Instant,
    ) {
        self.probe();
        if !self.is_bridged() {
            return;
        }

        if let Some(tracker) = self.trackers.get_mut(&owner) {
            tracker.ping(now);
            return;
        }

        if Weak::strong_count(&source) == 0 {
            debug!("Entity {} vanished before tracking", owner);
            return;
        }

        let mut chain = Vec::with_capacity(slots.len());
        for slot in slots {
            let light = self.make_entity_proxy(slot, source.clone());
            if self.invoke_add(&light) {
                chain.push((slot, light));
            }
        }

        if chain.is_empty() {
            debug!("No light of entity {} was accepted; not tracking", owner);
            return;
        }

        debug!("Tracking entity {} with {} light(s)", owner, chain.len());
        self.trackers
            .insert(owner, EntityTrackedLight::new(owner, source, chain, now));
    }

    /// Refreshes the liveness timestamp of a tracked owner.
    pub fn ping(&mut self, owner: OwnerId, now: Instant) {
        if let Some(tracker) = self.trackers.get_mut(&owner) {
            tracker.ping(now);
        }
    }

    /// Removes every light of `owner`.
    pub fn untrack(&mut self, owner: OwnerId) {
        if let Some(tracker) = self.trackers.remove(&owner) {
            for light in tracker.into_proxies() {
                self.retire(&light);
            }
        }
    }

    pub fn is_tracked(&self, owner: OwnerId) -> bool {
        self.trackers.contains_key(&owner)
    }

    pub fn tracker(&self, owner: OwnerId) -> Option<&EntityTrackedLight> {
        self.trackers.get(&owner)
    }

    //--- Bulk Operations --------------------------------------------------

    /// Removes every bridged light, cell and entity alike.
    ///
    /// Keeps the discovered backend; discovery is never re-run.
    pub fn clear_all(&mut self) {
        let cells: Vec<SharedLight> = self.cell_proxies.drain().map(|(_, l)| l).collect();
        let entities: Vec<SharedLight> = self
            .trackers
            .drain()
            .flat_map(|(_, tracker)| tracker.into_proxies())
            .collect();

        if !self.is_bridged() {
            return;
        }

        for light in cells.iter().chain(entities.iter()) {
            light.set_enabled(false);
        }

        if self.capability.clear_all {
            let result = self.backend.clear_all();
            self.contain(BackendOp::ClearAll, None, result);
        } else {
            for light in cells.iter().chain(entities.iter()) {
                self.invoke_remove(light);
            }
        }

        self.last_forced_refresh = None;
        debug!(
            "Cleared {} cell and {} entity lights from backend",
            cells.len(),
            entities.len()
        );
    }

    /// Asks the backend to re-scan everything, at most once per throttle window.
    ///
    /// Calls inside the window are dropped silently.
    pub fn force_refresh_all(&mut self, now: Instant) {
        if !self.is_bridged() || !self.capability.refresh_all {
            return;
        }

        if let Some(last) = self.last_forced_refresh {
            if now.saturating_duration_since(last) < self.settings.refresh_throttle {
                debug!("Forced backend refresh throttled");
                return;
            }
        }

        self.last_forced_refresh = Some(now);
        let result = self.backend.refresh_all(self.settings.renderer);
        self.contain(BackendOp::RefreshAll, None, result);
    }

    //--- Diagnostics ------------------------------------------------------

    /// Number of registry cells currently mirrored into the backend.
    pub fn bridged_count(&self) -> usize {
        self.cell_proxies.len()
    }

    /// Number of tracked moving owners.
    pub fn tracked_count(&self) -> usize {
        self.trackers.len()
    }

    /// Total proxies alive in the backend (cells + entity chains).
    pub fn proxy_count(&self) -> usize {
        self.cell_proxies.len()
            + self
                .trackers
                .values()
                .map(EntityTrackedLight::proxy_count)
                .sum::<usize>()
    }

    //--- Proxy Construction -----------------------------------------------

    fn next_id(&mut self) -> LightId {
        let id = LightId(self.next_light_id);
        self.next_light_id += 1;
        id
    }

    fn make_cell_proxy(&mut self, cell: CellPos) -> SharedLight {
        let id = self.next_id();
        Rc::new(CellProxy::new(id, cell, self.settings.world, self.registry.clone()))
    }

    fn make_entity_proxy(&mut self, slot: ChainSlot, source: SourceRef) -> SharedLight {
        let id = self.next_id();
        Rc::new(EntityProxy::new(
            id,
            slot,
            self.settings.entity_light_level,
            self.settings.world,
            source,
            self.clock.clone(),
        ))
    }

    //--- Contained Backend Calls ------------------------------------------

    fn invoke_add(&mut self, light: &SharedLight) -> bool {
        let result = self.backend.add(light.clone());
        self.contain(BackendOp::Add, Some(light), result)
    }

    fn invoke_remove(&mut self, light: &SharedLight) {
        if !self.capability.remove {
            return;
        }
        let result = self.backend.remove(light);
        self.contain(BackendOp::Remove, Some(light), result);
    }

    /// Re-announces a surviving light: `refresh_one` when offered, else `add`.
    fn refresh(&mut self, light: &SharedLight) {
        if self.capability.refresh_one {
            let result = self.backend.refresh_one(light);
            self.contain(BackendOp::RefreshOne, Some(light), result);
        } else {
            self.invoke_add(light);
        }
    }

    /// Disables a light and removes it from the backend.
    ///
    /// Without a `remove` operation the disabled proxy simply goes dark.
    fn retire(&mut self, light: &SharedLight) {
        light.set_enabled(false);
        self.invoke_remove(light);
    }

    /// Logs a failed invocation. Returns whether the call succeeded.
    fn contain(
        &self,
        op: BackendOp,
        light: Option<&SharedLight>,
        result: Result<(), BackendError>,
    ) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                match light {
                    Some(light) => warn!(
                        "Backend `{}` failed `{}` for light {:?}: {}",
                        self.backend.name(),
                        op,
                        light.id(),
                        e
                    ),
                    None => warn!("Backend `{}` failed `{}`: {}", self.backend.name(), op, e),
                }
                false
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::emitters::EmitterRegistry;
    use crate::core::math::Vec3;
    use std::cell::RefCell;
    use std::sync::Mutex;

    //=====================================================================
    // Test Backend
    //=====================================================================

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Add(LightId),
        Remove(LightId),
        RefreshOne(LightId),
        ClearAll,
        RefreshAll(RendererHandle),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        live: HashMap<LightId, SharedLight>,
        fail_adds_for: HashSet<LightId>,
        fail_removes_for: HashSet<LightId>,
        fail_refreshes_for: HashSet<LightId>,
    }

    type SharedRecorder = Rc<RefCell<Recorder>>;

    impl Recorder {
        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(*c)).count()
        }
    }

    struct ScriptedBackend {
        capability: AdapterCapability,
        recorder: SharedRecorder,
    }

    impl LightingBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capability(&self) -> AdapterCapability {
            self.capability
        }

        fn add(&mut self, light: SharedLight) -> Result<(), BackendError> {
            let mut rec = self.recorder.borrow_mut();
            rec.calls.push(Call::Add(light.id()));
            if rec.fail_adds_for.contains(&light.id()) {
                return Err(BackendError::Rejected {
                    operation: BackendOp::Add,
                    reason: "scripted failure".into(),
                });
            }
            rec.live.insert(light.id(), light);
            Ok(())
        }

        fn remove(&mut self, light: &SharedLight) -> Result<(), BackendError> {
            let mut rec = self.recorder.borrow_mut();
            rec.calls.push(Call::Remove(light.id()));
            if rec.fail_removes_for.contains(&light.id()) {
                return Err(BackendError::Rejected {
                    operation: BackendOp::Remove,
                    reason: "scripted failure".into(),
                });
            }
            rec.live.remove(&light.id());
            Ok(())
        }

        fn refresh_one(&mut self, light: &SharedLight) -> Result<(), BackendError> {
            if !self.capability.refresh_one {
                return Err(BackendError::Unsupported(BackendOp::RefreshOne));
            }
            let mut rec = self.recorder.borrow_mut();
            rec.calls.push(Call::RefreshOne(light.id()));
            if rec.fail_refreshes_for.contains(&light.id()) {
                return Err(BackendError::Rejected {
                    operation: BackendOp::RefreshOne,
                    reason: "scripted failure".into(),
                });
            }
            Ok(())
        }

        fn clear_all(&mut self) -> Result<(), BackendError> {
            let mut rec = self.recorder.borrow_mut();
            rec.calls.push(Call::ClearAll);
            rec.live.clear();
            Ok(())
        }

        fn refresh_all(&mut self, renderer: RendererHandle) -> Result<(), BackendError> {
            self.recorder.borrow_mut().calls.push(Call::RefreshAll(renderer));
            Ok(())
        }
    }

    struct ScriptedProvider {
        capability: AdapterCapability,
        recorder: SharedRecorder,
    }

    impl BackendProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn locate(&self) -> Result<Option<Box<dyn LightingBackend>>, BackendError> {
            Ok(Some(Box::new(ScriptedBackend {
                capability: self.capability,
                recorder: self.recorder.clone(),
            })))
        }
    }

    struct Projectile {
        positions: Mutex<(Vec3, Vec3)>,
        removed: Mutex<bool>,
    }

    impl MovingSource for Projectile {
        fn previous_position(&self) -> Vec3 {
            self.positions.lock().unwrap().0
        }

        fn current_position(&self) -> Vec3 {
            self.positions.lock().unwrap().1
        }

        fn is_removed(&self) -> bool {
            *self.removed.lock().unwrap()
        }
    }

    fn projectile() -> Arc<dyn MovingSource> {
        Arc::new(Projectile {
            positions: Mutex::new((Vec3::new(0.0, 64.0, 0.0), Vec3::new(4.0, 64.0, 0.0))),
            removed: Mutex::new(false),
        })
    }

    struct Fixture {
        registry: SharedRegistry,
        bridge: AdapterBridge,
        recorder: SharedRecorder,
        t0: Instant,
    }

    fn fixture(capability: AdapterCapability) -> Fixture {
        let registry = EmitterRegistry::default().into_shared();
        let recorder = SharedRecorder::default();
        let provider = ScriptedProvider {
            capability,
            recorder: recorder.clone(),
        };
        let settings = BridgeSettings {
            renderer: RendererHandle(42),
            ..BridgeSettings::default()
        };
        let bridge = AdapterBridge::new(
            registry.clone(),
            FrameClock::new(),
            vec![Box::new(provider)],
            settings,
        );
        Fixture {
            registry,
            bridge,
            recorder,
            t0: Instant::now(),
        }
    }

    fn unavailable() -> (SharedRegistry, AdapterBridge) {
        let registry = EmitterRegistry::default().into_shared();
        let bridge = AdapterBridge::new(
            registry.clone(),
            FrameClock::new(),
            Vec::new(),
            BridgeSettings::default(),
        );
        (registry, bridge)
    }

    //=====================================================================
    // Discovery
    //=====================================================================

    #[test]
    fn probes_lazily_and_once() {
        let mut f = fixture(AdapterCapability::FULL);
        assert_eq!(f.bridge.state(), BridgeState::Unprobed);

        f.bridge.sync(f.t0);
        assert_eq!(f.bridge.state(), BridgeState::Bridged);
        assert_eq!(f.bridge.capability(), AdapterCapability::FULL);

        f.bridge.probe();
        assert_eq!(f.bridge.state(), BridgeState::Bridged);
    }

    #[test]
    fn missing_backend_makes_everything_a_noop() {
        let (registry, mut bridge) = unavailable();
        let now = Instant::now();
        registry.borrow_mut().add(CellPos::new(1, 2, 3), Rgb::GREEN, 12, 20);

        bridge.sync(now);
        let source = projectile();
        bridge.track_single(7, &source, Rgb::GREEN, now);
        bridge.force_refresh_all(now);
        bridge.clear_all();

        assert_eq!(bridge.state(), BridgeState::Unavailable);
        assert_eq!(bridge.proxy_count(), 0);
        assert!(!bridge.is_tracked(7));
        // Registry untouched by the bridge.
        assert_eq!(registry.borrow().len(), 1);
    }

    //=====================================================================
    // Registry Diff
    //=====================================================================

    #[test]
    fn new_cells_are_added_and_dead_cells_removed() {
        let mut f = fixture(AdapterCapability::FULL);
        f.registry.borrow_mut().add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 1);
        f.registry.borrow_mut().add(CellPos::new(5, 0, 0), Rgb::GREEN, 12, 10);

        f.bridge.sync(f.t0);
        assert_eq!(f.bridge.bridged_count(), 2);
        assert_eq!(f.recorder.borrow().live.len(), 2);

        f.registry.borrow_mut().tick();
        f.bridge.sync(f.t0);

        assert_eq!(f.bridge.bridged_count(), 1);
        let rec = f.recorder.borrow();
        assert_eq!(rec.live.len(), 1);
        assert_eq!(rec.count(|c| matches!(c, Call::Remove(_))), 1);
    }

    #[test]
    fn surviving_cells_use_refresh_one_when_available() {
        let mut f = fixture(AdapterCapability::FULL);
        f.registry.borrow_mut().add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 10);

        f.bridge.sync(f.t0);
        f.bridge.sync(f.t0);
        f.bridge.sync(f.t0);

        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::Add(_))), 1);
        assert_eq!(rec.count(|c| matches!(c, Call::RefreshOne(_))), 2);
    }

    #[test]
    fn surviving_cells_fall_back_to_add() {
        let mut f = fixture(AdapterCapability::ADD_ONLY);
        f.registry.borrow_mut().add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 10);

        f.bridge.sync(f.t0);
        f.bridge.sync(f.t0);

        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::Add(_))), 2);
        assert_eq!(rec.count(|c| matches!(c, Call::RefreshOne(_))), 0);
    }

    #[test]
    fn without_remove_dead_proxies_go_dark() {
        let mut f = fixture(AdapterCapability::ADD_ONLY);
        f.registry.borrow_mut().add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 1);
        f.bridge.sync(f.t0);

        let light = f.recorder.borrow().live.values().next().cloned().unwrap();
        assert_eq!(light.luminance(), 12);

        f.registry.borrow_mut().tick();
        f.bridge.sync(f.t0);

        assert_eq!(f.bridge.bridged_count(), 0);
        assert!(!light.is_enabled());
        assert_eq!(light.luminance(), 0);
        assert_eq!(f.recorder.borrow().count(|c| matches!(c, Call::Remove(_))), 0);
    }

    #[test]
    fn failed_add_does_not_abort_the_step() {
        let mut f = fixture(AdapterCapability::FULL);
        // Light ids are handed out from 1; make the first add fail.
        f.recorder.borrow_mut().fail_adds_for.insert(LightId(1));
        for x in 0..3 {
            f.registry.borrow_mut().add(CellPos::new(x, 0, 0), Rgb::GREEN, 12, 10);
        }

        f.bridge.sync(f.t0);

        assert_eq!(f.bridge.state(), BridgeState::Bridged);
        assert_eq!(f.bridge.bridged_count(), 2);

        // The failed cell is retried with a fresh proxy next step.
        f.bridge.sync(f.t0);
        assert_eq!(f.bridge.bridged_count(), 3);
    }

    #[test]
    fn failed_remove_does_not_abort_the_step() {
        let mut f = fixture(AdapterCapability::FULL);
        f.recorder.borrow_mut().fail_removes_for.insert(LightId(1));
        for x in 0..3 {
            f.registry.borrow_mut().add(CellPos::new(x, 0, 0), Rgb::GREEN, 12, 1);
        }
        f.bridge.sync(f.t0);

        f.registry.borrow_mut().tick();
        f.bridge.sync(f.t0);

        assert_eq!(f.bridge.state(), BridgeState::Bridged);
        assert_eq!(f.bridge.bridged_count(), 0);
        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::Remove(_))), 3);
        // The backend kept the rejected light, but it no longer shines.
        assert_eq!(rec.live.len(), 1);
        let stuck = rec.live.get(&LightId(1)).cloned().unwrap();
        assert!(!stuck.is_enabled());
        assert_eq!(stuck.luminance(), 0);
    }

    #[test]
    fn failed_refresh_does_not_abort_the_step() {
        let mut f = fixture(AdapterCapability::FULL);
        f.recorder.borrow_mut().fail_refreshes_for.insert(LightId(2));
        for x in 0..3 {
            f.registry.borrow_mut().add(CellPos::new(x, 0, 0), Rgb::GREEN, 12, 10);
        }
        f.bridge.sync(f.t0);

        f.registry.borrow_mut().add(CellPos::new(9, 0, 0), Rgb::GREEN, 12, 10);
        f.bridge.sync(f.t0);

        assert_eq!(f.bridge.state(), BridgeState::Bridged);
        assert_eq!(f.bridge.bridged_count(), 4);
        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::RefreshOne(_))), 3);
        assert_eq!(rec.count(|c| matches!(c, Call::Add(_))), 4);
        assert!(rec.live.contains_key(&LightId(2)));
    }

    //=====================================================================
    // Entity Tracking
    //=====================================================================

    #[test]
    fn track_chain_twice_keeps_original_proxy_count() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();

        f.bridge.track_chain(1, &source, 4, 0.75, Rgb::GREEN, f.t0);
        f.bridge.track_chain(1, &source, 9, 0.75, Rgb::GREEN, f.t0);
        f.bridge.track_single(1, &source, Rgb::WHITE, f.t0);

        assert_eq!(f.bridge.tracker(1).unwrap().proxy_count(), 4);
        assert_eq!(f.bridge.proxy_count(), 4);
        assert_eq!(f.recorder.borrow().count(|c| matches!(c, Call::Add(_))), 4);
    }

    #[test]
    fn owner_with_no_accepted_light_is_not_tracked() {
        let mut f = fixture(AdapterCapability::FULL);
        f.recorder.borrow_mut().fail_adds_for.insert(LightId(1));
        let source = projectile();

        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);
        assert!(!f.bridge.is_tracked(1));

        // A later request gets a fresh proxy instead of a bare ping.
        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);
        assert!(f.bridge.is_tracked(1));
        assert_eq!(f.bridge.proxy_count(), 1);
        assert_eq!(f.recorder.borrow().count(|c| matches!(c, Call::Add(_))), 2);
    }

    #[test]
    fn retracking_refreshes_last_seen() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        let later = f.t0 + Duration::from_millis(500);

        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);
        f.bridge.track_single(1, &source, Rgb::GREEN, later);

        assert_eq!(f.bridge.tracker(1).unwrap().last_seen_at(), later);
    }

    #[test]
    fn unpinged_owner_is_swept_even_if_alive() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        f.bridge.track_chain(1, &source, 3, 0.5, Rgb::GREEN, f.t0);

        f.bridge.sync(f.t0 + Duration::from_millis(900));
        assert!(f.bridge.is_tracked(1));

        f.bridge.sync(f.t0 + Duration::from_millis(1100));
        assert!(!f.bridge.is_tracked(1));
        assert_eq!(f.recorder.borrow().count(|c| matches!(c, Call::Remove(_))), 3);
        drop(source);
    }

    #[test]
    fn pinged_owner_survives_past_ttl() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);

        for step in 1..=30u64 {
            let now = f.t0 + Duration::from_millis(step * 100);
            f.bridge.ping(1, now);
            f.bridge.sync(now);
        }

        assert!(f.bridge.is_tracked(1));
    }

    #[test]
    fn dropped_owner_is_swept_immediately() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);

        drop(source);
        f.bridge.sync(f.t0);

        assert!(!f.bridge.is_tracked(1));
        assert!(f.recorder.borrow().live.is_empty());
    }

    #[test]
    fn removed_owner_is_swept() {
        let mut f = fixture(AdapterCapability::FULL);
        let projectile = Arc::new(Projectile {
            positions: Mutex::new((Vec3::ZERO, Vec3::ZERO)),
            removed: Mutex::new(false),
        });
        let source: Arc<dyn MovingSource> = projectile.clone();
        f.bridge.track_single(1, &source, Rgb::GREEN, f.t0);

        *projectile.removed.lock().unwrap() = true;
        f.bridge.sync(f.t0);

        assert!(!f.bridge.is_tracked(1));
    }

    #[test]
    fn untrack_removes_whole_chain() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        f.bridge.track_chain(3, &source, 5, 1.0, Rgb::GREEN, f.t0);

        f.bridge.untrack(3);

        assert!(!f.bridge.is_tracked(3));
        assert_eq!(f.recorder.borrow().count(|c| matches!(c, Call::Remove(_))), 5);
        assert!(f.recorder.borrow().live.is_empty());
    }

    //=====================================================================
    // Bulk Operations
    //=====================================================================

    #[test]
    fn clear_all_clears_both_paths_without_rediscovery() {
        let mut f = fixture(AdapterCapability::FULL);
        let source = projectile();
        f.registry.borrow_mut().add(CellPos::new(0, 0, 0), Rgb::GREEN, 12, 10);
        f.bridge.sync(f.t0);
        f.bridge.track_chain(1, &source, 2, 1.0, Rgb::GREEN, f.t0);

        f.bridge.clear_all();

        assert_eq!(f.bridge.proxy_count(), 0);
        assert_eq!(f.bridge.state(), BridgeState::Bridged);
        assert_eq!(f.recorder.borrow().count(|c| *c == Call::ClearAll), 1);

        // Cell still in the registry: bridged again on the next sync.
        f.bridge.sync(f.t0);
        assert_eq!(f.bridge.bridged_count(), 1);
    }

    #[test]
    fn clear_all_without_capability_removes_individually() {
        let capability = AdapterCapability {
            clear_all: false,
            ..AdapterCapability::FULL
        };
        let mut f = fixture(capability);
        for x in 0..3 {
            f.registry.borrow_mut().add(CellPos::new(x, 0, 0), Rgb::GREEN, 12, 10);
        }
        f.bridge.sync(f.t0);

        f.bridge.clear_all();

        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::Remove(_))), 3);
        assert_eq!(rec.count(|c| *c == Call::ClearAll), 0);
    }

    #[test]
    fn force_refresh_is_throttled() {
        let mut f = fixture(AdapterCapability::FULL);
        f.bridge.probe();

        f.bridge.force_refresh_all(f.t0);
        f.bridge.force_refresh_all(f.t0 + Duration::from_millis(50));
        f.bridge.force_refresh_all(f.t0 + Duration::from_millis(199));
        f.bridge.force_refresh_all(f.t0 + Duration::from_millis(200));

        let rec = f.recorder.borrow();
        assert_eq!(rec.count(|c| matches!(c, Call::RefreshAll(_))), 2);
        assert_eq!(rec.calls[0], Call::RefreshAll(RendererHandle(42)));
    }

    #[test]
    fn force_refresh_without_capability_is_noop() {
        let mut f = fixture(AdapterCapability::ADD_ONLY);
        f.bridge.probe();
        f.bridge.force_refresh_all(f.t0);
        assert!(f.recorder.borrow().calls.is_empty());
    }
}
