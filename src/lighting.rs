//=========================================================================
// Trail Lighting Subsystem
//
// Entry point and per-step coordinator for transient trail lights.
//
// Architecture:
// ```text
//     LightingBuilder ──build()──> LightingSubsystem
//         │                          │
//         ├─ with_capacity()         ├─ step()          tick → commands → bridge sync
//         ├─ with_chain()            ├─ render_frame()  partial tick → texture encode
//         └─ with_provider()         └─ handle()        cross-thread command submission
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Ref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use log::{debug, info};

//=== Internal Dependencies ===============================================

use crate::core::bridge::{
    chain_slots, AdapterBridge, BackendProvider, BridgeSettings, ChainSlot, FrameClock,
    MovingSource, OwnerId, RendererHandle, SourceRef, WorldHandle, MAX_CHAIN_LENGTH,
};
use crate::core::command::{CommandCollector, LightCommand, LightingHandle};
use crate::core::config::{clamp_light_level, LightingConfig};
use crate::core::emitters::{EmitterRegistry, SharedRegistry};
use crate::core::math::{Rgb, Vec3};
use crate::core::texture::{nearest_lights, ShaderLight, TextureChannel};

//=== LightingBuilder =====================================================

/// Builder for configuring and constructing a [`LightingSubsystem`].
///
/// # Default Values
///
/// See [`LightingConfig`]. No backend providers are registered by default,
/// so the bridge ends up unavailable and only the texture channel lights
/// the trails.
///
/// # Examples
///
/// ```
/// use trail_lighting::LightingBuilder;
/// use trail_lighting::core::math::Vec3;
///
/// let mut lighting = LightingBuilder::new()
///     .with_capacity(500, 50)
///     .with_light_duration(40)
///     .build();
///
/// lighting.add_default(Vec3::new(10.2, 64.9, -3.1));
/// lighting.step();
/// assert_eq!(lighting.active_count(), 1);
/// ```
pub struct LightingBuilder {
    config: LightingConfig,
    providers: Vec<Box<dyn BackendProvider>>,
    world: WorldHandle,
    renderer: RendererHandle,
}

impl LightingBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LightingConfig::default(),
            providers: Vec::new(),
            world: WorldHandle::default(),
            renderer: RendererHandle::default(),
        }
    }

    /// Replaces the whole configuration.
    ///
    /// The light level is clamped to the valid range at build time.
    pub fn with_config(mut self, config: LightingConfig) -> Self {
        self.config = config;
        self
    }

    /// Master switch for emitter adds. Default: `true`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Sets the registry capacity and how many emitters one eviction drops.
    ///
    /// Default: 300 / 50
    ///
    /// # Panics
    ///
    /// Panics if either value is zero.
    pub fn with_capacity(mut self, max_emitters: usize, eviction_batch: usize) -> Self {
        assert!(max_emitters > 0, "Emitter capacity must be positive");
        assert!(eviction_batch > 0, "Eviction batch must be positive");
        self.config.max_emitters = max_emitters;
        self.config.eviction_batch = eviction_batch;
        self
    }

    /// Peak brightness of new emitters, clamped to 1..=15. Default: 12
    pub fn with_light_level(mut self, level: u8) -> Self {
        self.config.light_level = clamp_light_level(level);
        self
    }

    /// Lifetime of new emitters in simulation steps.
    ///
    /// Default: 20
    ///
    /// # Panics
    ///
    /// Panics if `ticks == 0`.
    pub fn with_light_duration(mut self, ticks: u32) -> Self {
        assert!(ticks > 0, "Light duration must be positive");
        self.config.light_duration_ticks = ticks;
        self
    }

    /// Color used by default-colored adds and configured tracking.
    pub fn with_trail_color(mut self, color: Rgb) -> Self {
        self.config.trail_color = color;
        self
    }

    /// How long a tracked entity survives without a ping.
    ///
    /// Default: 1 s
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero.
    pub fn with_entity_ttl(mut self, ttl: Duration) -> Self {
        assert!(!ttl.is_zero(), "Entity TTL must be positive");
        self.config.entity_ttl = ttl;
        self
    }

    /// Minimum interval between forced backend refreshes. Default: 200 ms
    pub fn with_refresh_throttle(mut self, throttle: Duration) -> Self {
        self.config.refresh_throttle = throttle;
        self
    }

    /// Enables chained entity lights for configured tracking.
    ///
    /// # Panics
    ///
    /// Panics if `count` is outside `1..=MAX_CHAIN_LENGTH` or `spacing` is
    /// negative or not finite.
    pub fn with_chain(mut self, count: usize, spacing: f64) -> Self {
        assert!(count > 0, "Chain count must be positive");
        assert!(
            count <= MAX_CHAIN_LENGTH,
            "Chain count must be at most {}, got {}",
            MAX_CHAIN_LENGTH,
            count
        );
        assert!(
            spacing.is_finite() && spacing >= 0.0,
            "Chain spacing must be non-negative, got {}",
            spacing
        );
        self.config.chain_enabled = true;
        self.config.chain_count = count;
        self.config.chain_spacing = spacing;
        self
    }

    /// Sets the texture slot count and the maximum encodable distance.
    ///
    /// Default: 64 / 256.0
    ///
    /// # Panics
    ///
    /// Panics if `slots == 0` or `range <= 0.0`.
    pub fn with_texture(mut self, slots: usize, range: f32) -> Self {
        assert!(slots > 0, "Texture slot count must be positive");
        assert!(range > 0.0, "Texture range must be positive, got {}", range);
        self.config.texture_slots = slots;
        self.config.texture_range = range;
        self
    }

    /// Capacity of the cross-thread command queue.
    ///
    /// Default: 1024
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Command capacity must be positive");
        self.config.command_capacity = capacity;
        self
    }

    /// Maximum number of queued commands applied per step.
    ///
    /// Default: 512
    ///
    /// # Panics
    ///
    /// Panics if `max == 0`.
    pub fn with_max_commands_per_step(mut self, max: usize) -> Self {
        assert!(max > 0, "Commands per step must be positive");
        self.config.max_commands_per_step = max;
        self
    }

    /// Registers a backend provider. Providers are probed in registration
    /// order on the first step.
    pub fn with_provider(mut self, provider: Box<dyn BackendProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// World handle reported by every proxy light.
    pub fn with_world(mut self, world: WorldHandle) -> Self {
        self.world = world;
        self
    }

    /// Renderer handle passed to forced backend refreshes.
    pub fn with_renderer(mut self, renderer: RendererHandle) -> Self {
        self.renderer = renderer;
        self
    }

    /// Builds the subsystem. Backend discovery is deferred to first use.
    pub fn build(self) -> LightingSubsystem {
        let mut config = self.config;
        config.light_level = clamp_light_level(config.light_level);

        info!(
            "Building lighting subsystem (emitters: {}, texture slots: {}, providers: {})",
            config.max_emitters,
            config.texture_slots,
            self.providers.len()
        );

        let registry = EmitterRegistry::new(config.max_emitters, config.eviction_batch).into_shared();
        let clock = FrameClock::new();

        let settings = BridgeSettings {
            world: self.world,
            renderer: self.renderer,
            entity_ttl: config.entity_ttl,
            refresh_throttle: config.refresh_throttle,
            entity_light_level: config.light_level,
        };
        let bridge = AdapterBridge::new(registry.clone(), clock.clone(), self.providers, settings);
        let texture = TextureChannel::new(config.texture_slots, config.texture_range);

        let (sender, receiver) = bounded(config.command_capacity);
        let collector = CommandCollector::new(receiver, config.max_commands_per_step);

        LightingSubsystem {
            config,
            registry,
            bridge,
            texture,
            clock,
            collector,
            sender,
        }
    }
}

impl Default for LightingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== LightingSubsystem ===================================================

/// Transient trail lighting for one world.
///
/// Owned by the simulation step thread. Other threads submit work through
/// a [`LightingHandle`].
///
/// # Architecture
///
/// ```text
/// LightingSubsystem (step thread)
///   ├─► EmitterRegistry   decaying per-cell emitters
///   ├─► AdapterBridge     mirrors emitters and entity lights into a backend
///   └─► TextureChannel    shader fallback, encoded per render frame
///
/// Communication: bounded channel (LightCommand), drained every step
/// ```
pub struct LightingSubsystem {
    config: LightingConfig,
    registry: SharedRegistry,
    bridge: AdapterBridge,
    texture: TextureChannel,
    clock: FrameClock,
    collector: CommandCollector,
    sender: Sender<LightCommand>,
}

impl LightingSubsystem {
    //--- Handles ----------------------------------------------------------

    /// Returns a cloneable handle for submitting commands from any thread.
    pub fn handle(&self) -> LightingHandle {
        LightingHandle::new(self.sender.clone())
    }

    //--- Step -------------------------------------------------------------

    /// Runs one simulation step at the current time.
    pub fn step(&mut self) {
        self.step_at(Instant::now());
    }

    /// Runs one simulation step.
    ///
    /// # Order
    ///
    /// 1. Decay every emitter by one step, dropping the dead ones
    /// 2. Apply queued commands (bounded)
    /// 3. Synchronize the backend with the registry and sweep stale entities
    pub fn step_at(&mut self, now: Instant) {
        self.registry.borrow_mut().tick();

        let collected = self.collector.collect_step();
        if collected > 0 {
            debug!("Applying {} lighting commands", collected);
            for command in self.collector.take_pending() {
                self.apply(command, now);
            }
        }

        self.bridge.sync(now);
    }

    /// Prepares one render frame and returns how many texture slots are lit.
    ///
    /// `partial_tick` is the elapsed fraction of the current step; entity
    /// lights interpolate their positions with it.
    pub fn render_frame(&mut self, viewer: Vec3, partial_tick: f32) -> usize {
        self.clock.set_partial_tick(partial_tick);
        let registry = self.registry.borrow();
        self.texture.encode(&registry, viewer)
    }

    //--- Emitters ---------------------------------------------------------

    /// Adds an emitter with the configured level and duration.
    ///
    /// Ignored while the subsystem is disabled.
    pub fn add(&mut self, position: Vec3, color: Rgb) {
        self.add_with(
            position,
            color,
            self.config.light_level,
            self.config.light_duration_ticks,
        );
    }

    /// Adds an emitter with an explicit peak brightness and lifetime.
    ///
    /// Brightness is clamped to 1..=15 and a zero lifetime counts as one
    /// step. Ignored while the subsystem is disabled.
    pub fn add_with(&mut self, position: Vec3, color: Rgb, brightness: u8, lifetime_steps: u32) {
        if !self.config.enabled {
            return;
        }
        self.registry
            .borrow_mut()
            .add_at(position, color, brightness, lifetime_steps);
    }

    /// Adds an emitter in the configured trail color.
    pub fn add_default(&mut self, position: Vec3) {
        self.add(position, self.config.trail_color);
    }

    /// Adds `count` evenly spaced emitters from `from` towards `to`.
    ///
    /// `None` uses the configured trail color.
    pub fn add_segment(&mut self, from: Vec3, to: Vec3, count: u32, color: Option<Rgb>) {
        if !self.config.enabled {
            return;
        }
        self.registry.borrow_mut().add_segment(
            from,
            to,
            count,
            color.unwrap_or(self.config.trail_color),
            self.config.light_level,
            self.config.light_duration_ticks,
        );
    }

    //--- Entity Tracking --------------------------------------------------

    /// Tracks `owner` with the configured light shape and trail color.
    ///
    /// A chain when chained lights are enabled, a single light otherwise.
    pub fn track_configured(&mut self, owner: OwnerId, source: &Arc<dyn MovingSource>, now: Instant) {
        self.track_with_config(owner, Arc::downgrade(source), now);
    }

    fn track_with_config(&mut self, owner: OwnerId, source: SourceRef, now: Instant) {
        let color = self.config.trail_color;
        let slots = if self.config.chain_enabled {
            chain_slots(self.config.chain_count, self.config.chain_spacing, color)
        } else {
            vec![ChainSlot::single(color)]
        };
        self.bridge.track_slots(owner, source, slots, now);
    }

    //--- Bulk -------------------------------------------------------------

    /// Drops every emitter, bridged light and texture slot.
    pub fn clear_all(&mut self) {
        self.registry.borrow_mut().clear_all();
        self.bridge.clear_all();
        self.texture.clear();
        info!("Cleared all trail lights");
    }

    //--- Accessors --------------------------------------------------------

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Borrows the registry. Do not hold across [`step_at`](Self::step_at).
    pub fn registry(&self) -> Ref<'_, EmitterRegistry> {
        self.registry.borrow()
    }

    pub fn bridge(&self) -> &AdapterBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut AdapterBridge {
        &mut self.bridge
    }

    pub fn texture(&self) -> &TextureChannel {
        &self.texture
    }

    pub fn texture_mut(&mut self) -> &mut TextureChannel {
        &mut self.texture
    }

    /// Up to `max_lights` emitters near `viewer`, closest first.
    pub fn nearest_lights(&self, viewer: Vec3, max_lights: usize, max_distance: f64) -> Vec<ShaderLight> {
        nearest_lights(&self.registry.borrow(), viewer, max_lights, max_distance)
    }

    /// Number of live emitters.
    pub fn active_count(&self) -> usize {
        self.registry.borrow().len()
    }

    //--- Commands ---------------------------------------------------------

    fn apply(&mut self, command: LightCommand, now: Instant) {
        match command {
            LightCommand::AddEmitter {
                position,
                color,
                brightness,
                lifetime,
            } => self.add_with(
                position,
                color.unwrap_or(self.config.trail_color),
                brightness.unwrap_or(self.config.light_level),
                lifetime.unwrap_or(self.config.light_duration_ticks),
            ),
            LightCommand::AddSegment {
                from,
                to,
                count,
                color,
            } => self.add_segment(from, to, count, color),
            LightCommand::TrackSingle {
                owner,
                source,
                color,
            } => self
                .bridge
                .track_slots(owner, source, vec![ChainSlot::single(color)], now),
            LightCommand::TrackChain {
                owner,
                source,
                count,
                spacing,
                color,
            } => self
                .bridge
                .track_slots(owner, source, chain_slots(count, spacing, color), now),
            LightCommand::TrackConfigured { owner, source } => {
                self.track_with_config(owner, source, now)
            }
            LightCommand::Ping(owner) => self.bridge.ping(owner, now),
            LightCommand::Untrack(owner) => self.bridge.untrack(owner),
            LightCommand::ClearAll => self.clear_all(),
            LightCommand::ForceRefresh => self.bridge.force_refresh_all(now),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
