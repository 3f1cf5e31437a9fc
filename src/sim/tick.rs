//! Per-frame tick scheduler
//!
//! Drives the whole core once per display frame, in a fixed order:
//!
//! ```text
//!  1. delta time + tick counter
//!  2. camera easing
//!  3. resource regen hook
//!  4. cascade hook
//!  5. install progress + wire flow, all depths
//!  6. dependency spawn hook, once per newly ready top-level package
//!  7. physics, top level
//!  8. physics, focused nested level (if scoped)
//!  9. derived stats hook, every 30th tick
//! 10. automation hook
//! 11. registered frame callbacks
//! 12. request the next frame
//! ```
//!
//! A failing hook aborts the frame and no further frame is requested.

use std::fmt;

use thiserror::Error;

use super::callbacks::{TickCallbacks, Unregister};
use super::camera::CameraController;
use super::physics;
use super::state::{GameStore, PackageId};
use super::walker;
use crate::config::SimConfig;
use crate::platform::{FrameHandle, FrameScheduler};

/// Error raised by an external hook
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type HookResult = Result<(), HookError>;

/// Pipeline step that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    Regenerate,
    Cascade,
    SpawnDependencies,
    RecomputeStats,
    Automation,
}

impl TickStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickStage::Regenerate => "regenerate",
            TickStage::Cascade => "cascade",
            TickStage::SpawnDependencies => "spawn dependencies",
            TickStage::RecomputeStats => "recompute stats",
            TickStage::Automation => "automation",
        }
    }
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TickError {
    #[error("{stage} hook failed on tick {tick}: {source}")]
    Hook {
        stage: TickStage,
        tick: u64,
        #[source]
        source: HookError,
    },
}

/// Externally supplied game logic, invoked synchronously each tick
///
/// Every method defaults to a no-op so collaborators only implement what
/// they need.
pub trait TickHooks {
    /// Regenerate shared resources
    fn regenerate(&mut self, _store: &mut GameStore, _dt: f32) -> HookResult {
        Ok(())
    }

    /// Advance staggered spawn cascades
    fn advance_cascade(&mut self, _store: &mut GameStore) -> HookResult {
        Ok(())
    }

    /// Called once for each top-level package that just finished installing
    fn spawn_dependencies(&mut self, _store: &mut GameStore, _id: PackageId) -> HookResult {
        Ok(())
    }

    /// Recompute derived stats (throttled)
    fn recompute_stats(&mut self, _store: &mut GameStore) -> HookResult {
        Ok(())
    }

    /// Run automation with the frame timestamp (ms)
    fn automate(&mut self, _store: &mut GameStore, _now: f64, _dt: f32) -> HookResult {
        Ok(())
    }

    /// Current install speed multiplier (upgrades etc.)
    fn install_speed_multiplier(&self, _store: &GameStore) -> f32 {
        1.0
    }
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl TickHooks for NoHooks {}

/// The scheduler: owns the shared store and everything that mutates it
pub struct GameLoop<H: TickHooks, F: FrameScheduler> {
    config: SimConfig,
    store: GameStore,
    camera: CameraController,
    hooks: H,
    frames: F,
    callbacks: TickCallbacks,
    running: bool,
    pending_frame: Option<FrameHandle>,
}

impl<H: TickHooks, F: FrameScheduler> GameLoop<H, F> {
    pub fn new(store: GameStore, hooks: H, frames: F, config: SimConfig) -> Self {
        let camera = CameraController::new(config.camera);
        let mut game = Self {
            config,
            store,
            camera,
            hooks,
            frames,
            callbacks: TickCallbacks::new(),
            running: false,
            pending_frame: None,
        };
        game.store.camera = game.camera.view();
        game
    }

    /// Begin scheduling frames; a no-op while already running
    pub fn start(&mut self, now: f64) {
        if self.running {
            return;
        }
        self.store.last_tick = now;
        self.store.tick_count = 0;
        self.running = true;
        if self.schedule_next() {
            log::info!("Game loop started");
        }
    }

    /// Cancel the pending frame; safe to call repeatedly
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.frames.cancel_frame(handle);
        }
        if self.running {
            self.running = false;
            log::info!("Game loop stopped after {} ticks", self.store.tick_count);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Register a per-frame callback, first invoked on the next frame
    pub fn on_tick<C>(&self, callback: C) -> Unregister
    where
        C: FnMut(f32) + 'static,
    {
        self.callbacks.register(callback)
    }

    /// Shared handle for registering callbacks from inside other callbacks
    pub fn callbacks(&self) -> TickCallbacks {
        self.callbacks.clone()
    }

    pub fn set_camera_target(&mut self, x: f32, y: f32, zoom: Option<f32>) {
        self.camera.set_target(x, y, zoom);
    }

    pub fn set_camera_instant(&mut self, x: f32, y: f32) {
        self.camera.set_instant(x, y);
        self.store.camera = self.camera.view();
    }

    pub fn is_camera_transitioning(&self) -> bool {
        self.camera.is_transitioning()
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Mutable store access for collaborators, between ticks only
    pub fn store_mut(&mut self) -> &mut GameStore {
        &mut self.store
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Entry point for the host when a requested frame fires
    ///
    /// Stale frames (after `stop`, or with nothing pending) are ignored. On
    /// hook failure no further frame is requested and the loop stops.
    pub fn on_frame(&mut self, now: f64) -> Result<(), TickError> {
        if !self.running || self.pending_frame.take().is_none() {
            log::trace!("ignoring stale frame at {now}");
            return Ok(());
        }

        if let Err(err) = self.tick(now) {
            log::error!("Tick aborted: {err}");
            self.running = false;
            return Err(err);
        }

        self.schedule_next();
        Ok(())
    }

    /// Run steps 1-11 of the pipeline for one frame
    fn tick(&mut self, now: f64) -> Result<(), TickError> {
        let mut dt = ((now - self.store.last_tick) / 1000.0) as f32;
        if let Some(max) = self.config.max_frame_delta {
            dt = dt.min(max);
        }
        self.store.last_tick = now;
        self.store.tick_count += 1;
        let tick = self.store.tick_count;
        let fail =
            |stage: TickStage| move |source: HookError| TickError::Hook { stage, tick, source };

        self.camera.advance(dt);
        self.store.camera = self.camera.view();

        self.hooks
            .regenerate(&mut self.store, dt)
            .map_err(fail(TickStage::Regenerate))?;
        self.hooks
            .advance_cascade(&mut self.store)
            .map_err(fail(TickStage::Cascade))?;

        let multiplier = self.hooks.install_speed_multiplier(&self.store);
        let completed = walker::advance_install(&mut self.store.packages, dt, multiplier);
        walker::advance_wires(&mut self.store.packages, &mut self.store.wires, dt);

        for id in completed {
            log::debug!("package {id} ready, spawning dependencies");
            self.hooks
                .spawn_dependencies(&mut self.store, id)
                .map_err(fail(TickStage::SpawnDependencies))?;
        }

        physics::step(&mut self.store.packages, dt, &self.config.physics);
        if let Some(level) = self.store.scoped_level_mut() {
            physics::step(level, dt, &self.config.physics);
        }

        if tick.is_multiple_of(self.config.stat_recompute_interval) {
            self.hooks
                .recompute_stats(&mut self.store)
                .map_err(fail(TickStage::RecomputeStats))?;
        }

        self.hooks
            .automate(&mut self.store, now, dt)
            .map_err(fail(TickStage::Automation))?;

        self.callbacks.dispatch(dt);
        Ok(())
    }

    /// Request the next frame; a refusal stops the loop
    fn schedule_next(&mut self) -> bool {
        self.pending_frame = self.frames.request_frame();
        if self.pending_frame.is_none() {
            log::warn!("Host refused to schedule a frame; loop stopped");
            self.running = false;
        }
        self.running
    }

    /// Alias of [`GameLoop::start`]
    pub fn start_game_loop(&mut self, now: f64) {
        self.start(now);
    }

    /// Alias of [`GameLoop::stop`]
    pub fn stop_game_loop(&mut self) {
        self.stop();
    }

    /// Alias of [`GameLoop::is_running`]
    pub fn is_game_running(&self) -> bool {
        self.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessFrames;
    use crate::sim::state::{Package, PackageState, Wire};
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Hooks that record every call in order
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_on: Option<TickStage>,
        spawn_children: bool,
        next_id: PackageId,
    }

    impl Recorder {
        fn check(&mut self, stage: TickStage, entry: String) -> HookResult {
            self.calls.push(entry);
            if self.fail_on == Some(stage) {
                return Err(HookError::msg("boom"));
            }
            Ok(())
        }
    }

    impl TickHooks for Recorder {
        fn regenerate(&mut self, store: &mut GameStore, dt: f32) -> HookResult {
            store.resources.regenerate(10.0, dt);
            self.check(TickStage::Regenerate, "regenerate".into())
        }

        fn advance_cascade(&mut self, _store: &mut GameStore) -> HookResult {
            self.check(TickStage::Cascade, "cascade".into())
        }

        fn spawn_dependencies(&mut self, store: &mut GameStore, id: PackageId) -> HookResult {
            if self.spawn_children {
                self.next_id += 1;
                let child = Package::installing(100 + self.next_id, id, 1)
                    .with_position(Vec2::new(3.0, 0.0));
                store.packages.push(child);
            }
            self.check(TickStage::SpawnDependencies, format!("spawn {id}"))
        }

        fn recompute_stats(&mut self, store: &mut GameStore) -> HookResult {
            let entry = format!("stats {}", store.tick_count);
            self.check(TickStage::RecomputeStats, entry)
        }

        fn automate(&mut self, _store: &mut GameStore, now: f64, _dt: f32) -> HookResult {
            self.check(TickStage::Automation, format!("automate {now}"))
        }
    }

    fn game(store: GameStore, hooks: Recorder) -> GameLoop<Recorder, HeadlessFrames> {
        GameLoop::new(store, hooks, HeadlessFrames::new(), SimConfig::default())
    }

    fn sample_store() -> GameStore {
        GameStore {
            packages: vec![
                Package::root(0),
                Package::installing(1, 0, 1).with_position(Vec2::new(40.0, 0.0)),
                Package::installing(2, 0, 1).with_position(Vec2::new(0.0, 40.0)),
            ],
            wires: vec![Wire::new(0, 1), Wire::new(0, 2)],
            ..GameStore::default()
        }
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let mut game = game(GameStore::new(), Recorder::default());
        assert!(!game.is_running());

        game.start(0.0);
        assert!(game.is_running());
        assert_eq!(game.frames().requested(), 1);

        // Already running: no second frame
        game.start(5.0);
        assert_eq!(game.frames().requested(), 1);

        game.stop();
        game.stop();
        assert!(!game.is_running());
        assert_eq!(game.frames().cancelled(), 1);

        game.start(100.0);
        assert!(game.is_running());
        assert_eq!(game.store().last_tick, 100.0);
    }

    /// Host that never grants a frame
    struct NoFrames;

    impl FrameScheduler for NoFrames {
        fn request_frame(&mut self) -> Option<FrameHandle> {
            None
        }

        fn cancel_frame(&mut self, _handle: FrameHandle) {}
    }

    #[test]
    fn test_refused_first_frame_leaves_loop_stopped() {
        let mut game = GameLoop::new(
            sample_store(),
            Recorder::default(),
            NoFrames,
            SimConfig::default(),
        );
        game.start(0.0);
        assert!(!game.is_running());

        game.on_frame(16.0).expect("no frame pending");
        assert_eq!(game.store().tick_count, 0);
        assert!(game.hooks().calls.is_empty());
    }

    #[test]
    fn test_default_boot_runs_empty_graph() {
        let config = SimConfig::default();
        config.validate().expect("default config");
        let mut game = GameLoop::new(GameStore::new(), NoHooks, HeadlessFrames::new(), config);
        game.start(0.0);
        for frame in 1..=60 {
            assert!(game.frames_mut().take_pending().is_some());
            game.on_frame(frame as f64 * 16.0).expect("tick");
        }
        assert!(game.is_running());
        assert_eq!(game.store().tick_count, 60);
    }

    #[test]
    fn test_stale_frame_after_stop_is_ignored() {
        let mut game = game(sample_store(), Recorder::default());
        game.start(0.0);
        game.stop();
        game.on_frame(16.0).expect("stale frame");
        assert_eq!(game.store().tick_count, 0);
        assert!(game.hooks().calls.is_empty());
    }

    #[test]
    fn test_delta_and_tick_count() {
        let mut game = game(sample_store(), Recorder::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _handle = {
            let seen = seen.clone();
            game.on_tick(move |dt| seen.borrow_mut().push(dt))
        };

        game.start(1000.0);
        game.on_frame(1250.0).expect("tick");
        game.on_frame(1500.0).expect("tick");

        assert_eq!(game.store().tick_count, 2);
        assert_eq!(game.store().last_tick, 1500.0);
        assert_eq!(*seen.borrow(), vec![0.25, 0.25]);
        assert_eq!(game.frames().requested(), 3);
    }

    #[test]
    fn test_pipeline_order() {
        let mut store = sample_store();
        store.packages[1].install_progress = 0.99;
        let mut game = game(store, Recorder::default());

        game.start(0.0);
        game.on_frame(100.0).expect("tick");

        assert_eq!(
            game.hooks().calls,
            vec!["regenerate", "cascade", "spawn 1", "automate 100"]
        );
        assert_eq!(game.store().packages[1].state, PackageState::Ready);
        assert!(game.store().resources.bandwidth == 0.0);
    }

    #[test]
    fn test_spawn_hook_fires_once_in_walk_order() {
        let mut store = sample_store();
        store.packages[1].install_progress = 0.9;
        store.packages[2].install_progress = 0.9;
        let mut game = game(store, Recorder::default());
        game.start(0.0);
        for i in 1..=5 {
            game.on_frame(f64::from(i) * 500.0).expect("tick");
        }
        let spawns: Vec<_> = game
            .hooks()
            .calls
            .iter()
            .filter(|c| c.starts_with("spawn"))
            .cloned()
            .collect();
        assert_eq!(spawns, vec!["spawn 1", "spawn 2"]);
    }

    #[test]
    fn test_physics_sees_packages_spawned_this_frame() {
        let mut store = sample_store();
        store.packages[1].install_progress = 0.99;
        let hooks = Recorder {
            spawn_children: true,
            ..Recorder::default()
        };
        let mut game = game(store, hooks);
        game.start(0.0);
        game.on_frame(16.0).expect("tick");

        let spawned = game.store().packages.last().expect("spawned child");
        assert_eq!(spawned.parent_id, Some(1));
        assert_ne!(spawned.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_stats_recompute_every_30_ticks() {
        let mut game = game(GameStore::new(), Recorder::default());
        game.start(0.0);
        for i in 1..=90 {
            game.on_frame(f64::from(i) * 16.0).expect("tick");
        }
        let stats: Vec<_> = game
            .hooks()
            .calls
            .iter()
            .filter(|c| c.starts_with("stats"))
            .cloned()
            .collect();
        assert_eq!(stats, vec!["stats 30", "stats 60", "stats 90"]);
    }

    #[test]
    fn test_hook_failure_halts_scheduling() {
        let hooks = Recorder {
            fail_on: Some(TickStage::Cascade),
            ..Recorder::default()
        };
        let mut game = game(sample_store(), hooks);
        let fired = Rc::new(RefCell::new(0));
        let _handle = {
            let fired = fired.clone();
            game.on_tick(move |_| *fired.borrow_mut() += 1)
        };

        game.start(0.0);
        let err = game.on_frame(16.0).expect_err("cascade fails");
        assert!(matches!(
            err,
            TickError::Hook {
                stage: TickStage::Cascade,
                tick: 1,
                ..
            }
        ));
        assert_eq!(game.hooks().calls, vec!["regenerate", "cascade"]);
        assert_eq!(*fired.borrow(), 0);
        assert!(!game.is_running());
        // Only the frame from start() was ever requested
        assert_eq!(game.frames().requested(), 1);
        assert_eq!(game.store().packages[1].install_progress, 0.0);

        // Resumes cleanly
        game.hooks_mut().fail_on = None;
        game.start(32.0);
        game.on_frame(48.0).expect("tick");
        assert_eq!(game.store().tick_count, 1);
    }

    #[test]
    fn test_scoped_level_gets_its_own_pass() {
        let inner = vec![
            Package::installing(11, 99, 2).with_position(Vec2::new(0.0, 0.0)),
            Package::installing(12, 99, 2).with_position(Vec2::new(5.0, 0.0)),
        ];
        let far_sibling = Package::installing(12, 99, 1).with_position(Vec2::new(500.0, 0.0));
        let store = GameStore {
            packages: vec![
                Package::root(1).with_internal(inner, Vec::new()),
                far_sibling,
            ],
            scope_stack: vec![1],
            ..GameStore::default()
        };
        let mut game = game(store, Recorder::default());
        game.start(0.0);
        game.on_frame(16.0).expect("tick");

        let level = game.store().packages[0]
            .internal_packages
            .as_ref()
            .expect("inner level");
        assert!(level[0].velocity.x < 0.0);
        assert!(level[1].velocity.x > 0.0);
        // Top-level node with no neighbours in range stays put
        assert_eq!(game.store().packages[1].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_unscoped_level_is_left_alone() {
        let inner = vec![
            Package::installing(11, 99, 2),
            Package::installing(12, 99, 2).with_position(Vec2::new(5.0, 0.0)),
        ];
        let store = GameStore {
            packages: vec![Package::root(1).with_internal(inner, Vec::new())],
            ..GameStore::default()
        };
        let mut game = game(store, Recorder::default());
        game.start(0.0);
        game.on_frame(16.0).expect("tick");
        let level = game.store().packages[0].internal_packages.as_ref().expect("inner");
        assert_eq!(level[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_camera_mirrored_into_store() {
        let mut game = game(GameStore::new(), Recorder::default());
        game.set_camera_target(100.0, 50.0, Some(2.0));
        game.start(0.0);
        let mut now = 0.0;
        while game.is_camera_transitioning() {
            now += 100.0;
            game.on_frame(now).expect("tick");
            assert!(now < 100_000.0, "camera never settled");
        }
        let cam = game.store().camera;
        assert_eq!((cam.x, cam.y, cam.zoom), (100.0, 50.0, 2.0));

        game.set_camera_instant(-5.0, 5.0);
        assert_eq!((game.store().camera.x, game.store().camera.y), (-5.0, 5.0));
    }

    #[test]
    fn test_callback_added_in_callback_waits_for_next_frame() {
        let mut game = game(GameStore::new(), Recorder::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let late = Rc::new(RefCell::new(None));
        let _outer = {
            let callbacks = game.callbacks();
            let log = log.clone();
            let late = late.clone();
            game.on_tick(move |_| {
                log.borrow_mut().push("outer");
                if late.borrow().is_none() {
                    let log = log.clone();
                    let handle = callbacks.register(move |_| log.borrow_mut().push("late"));
                    *late.borrow_mut() = Some(handle);
                }
            })
        };

        game.start(0.0);
        game.on_frame(16.0).expect("tick");
        assert_eq!(*log.borrow(), vec!["outer"]);
        game.on_frame(32.0).expect("tick");
        assert_eq!(*log.borrow(), vec!["outer", "outer", "late"]);
    }

    #[test]
    fn test_max_frame_delta_clamps_when_configured() {
        let config = SimConfig {
            max_frame_delta: Some(0.1),
            ..SimConfig::default()
        };
        let mut game = GameLoop::new(sample_store(), NoHooks, HeadlessFrames::new(), config);
        let seen = Rc::new(RefCell::new(0.0f32));
        let _handle = {
            let seen = seen.clone();
            game.on_tick(move |dt| *seen.borrow_mut() = dt)
        };
        game.start(0.0);
        game.on_frame(5000.0).expect("tick");
        assert_eq!(*seen.borrow(), 0.1);
    }
}
