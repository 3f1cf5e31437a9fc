//! Cascade Core entry point
//!
//! Native: runs a headless demo of the tick pipeline on a seeded random graph.
//! Web: the library's `wasm_main` boots a default loop; hosts with their own
//! hooks call `platform::web::start_in_browser`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use cascade_core::SimConfig;
    use cascade_core::platform::HeadlessFrames;
    use cascade_core::sim::{
        GameLoop, GameStore, HookResult, Package, PackageId, PackageState, Resources, TickHooks,
        Wire, kinetic_energy,
    };

    /// Simulated display rate
    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Spawning stops once the top level holds this many packages
    const MAX_PACKAGES: usize = 60;
    /// Id of the package whose internal graph the demo drills into
    const NESTED_ID: PackageId = 1;

    /// Demo economy: bandwidth regen and random dependency spawning
    struct DemoHooks {
        rng: Pcg32,
        next_id: PackageId,
        regen_rate: f64,
        spawned: usize,
    }

    impl TickHooks for DemoHooks {
        fn regenerate(&mut self, store: &mut GameStore, dt: f32) -> HookResult {
            store.resources.regenerate(self.regen_rate, dt);
            Ok(())
        }

        fn spawn_dependencies(&mut self, store: &mut GameStore, id: PackageId) -> HookResult {
            let Some(parent) = store.find_package(id) else {
                return Ok(());
            };
            let (origin, depth) = (parent.position, parent.depth + 1);
            let count = self.rng.random_range(1..=3);
            for _ in 0..count {
                if store.packages.len() >= MAX_PACKAGES {
                    break;
                }
                let child_id = self.next_id;
                self.next_id += 1;
                let offset = Vec2::from_angle(self.rng.random_range(0.0..std::f32::consts::TAU))
                    * self.rng.random_range(5.0..30.0);
                let child = Package::installing(child_id, id, depth).with_position(origin + offset);
                store.packages.push(child);
                store.wires.push(Wire::new(id, child_id));
                self.spawned += 1;
            }
            Ok(())
        }

        fn recompute_stats(&mut self, store: &mut GameStore) -> HookResult {
            let ready = store
                .packages
                .iter()
                .filter(|p| p.state == PackageState::Ready)
                .count();
            // More installed packages, faster regen
            self.regen_rate = 1.0 + ready as f64 * 0.25;
            log::debug!(
                "tick {}: {ready}/{} ready, bandwidth {:.1}",
                store.tick_count,
                store.packages.len(),
                store.resources.bandwidth
            );
            Ok(())
        }

        fn install_speed_multiplier(&self, store: &GameStore) -> f32 {
            if store.resources.bandwidth > 50.0 { 2.0 } else { 1.0 }
        }
    }

    /// Anchor, a few seed packages, and one package with its own sub-graph
    fn build_store(rng: &mut Pcg32) -> (GameStore, PackageId) {
        let mut packages = vec![Package::root(0)];
        let mut wires = Vec::new();
        let mut next_id = 2;

        let mut inner = vec![Package::root(100)];
        for i in 0..6 {
            let offset = Vec2::new(rng.random_range(-20.0..20.0), rng.random_range(-20.0..20.0));
            inner.push(Package::installing(101 + i, 100, 1).with_position(offset));
        }
        let inner_wires = (101..107).map(|id| Wire::new(100, id)).collect();
        packages.push(
            Package::installing(NESTED_ID, 0, 1)
                .with_position(Vec2::new(60.0, 0.0))
                .with_internal(inner, inner_wires),
        );
        wires.push(Wire::new(0, NESTED_ID));

        for _ in 0..3 {
            let pos = Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU)) * 40.0;
            packages.push(Package::installing(next_id, 0, 1).with_position(pos));
            wires.push(Wire::new(0, next_id));
            next_id += 1;
        }

        let store = GameStore {
            packages,
            wires,
            resources: Resources {
                bandwidth: 0.0,
                max_bandwidth: 100.0,
            },
            ..GameStore::default()
        };
        (store, next_id.max(200))
    }

    pub fn run(frames: u32, seed: u64) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let (store, next_id) = build_store(&mut rng);
        let hooks = DemoHooks {
            rng,
            next_id,
            regen_rate: 1.0,
            spawned: 0,
        };
        let mut game = GameLoop::new(store, hooks, HeadlessFrames::new(), SimConfig::default());

        let mut now = 0.0;
        game.start(now);
        for frame in 1..=frames {
            if game.frames_mut().take_pending().is_none() {
                break;
            }
            now += FRAME_MS;
            if let Err(err) = game.on_frame(now) {
                log::error!("Demo halted: {err}");
                return;
            }

            if frame == frames / 2 {
                log::info!("Drilling into package {NESTED_ID}");
                game.store_mut().scope_stack = vec![NESTED_ID];
                game.set_camera_target(60.0, 0.0, Some(2.5));
            }
        }
        game.stop();

        let store = game.store();
        let nested_energy = store
            .packages
            .iter()
            .find(|p| p.id == NESTED_ID)
            .and_then(|p| p.internal_packages.as_deref())
            .map(kinetic_energy)
            .unwrap_or(0.0);
        log::info!(
            "{} ticks, {} packages ({} spawned), top-level energy {:.4}, nested energy {:.4}",
            store.tick_count,
            store.packages.len(),
            game.hooks().spawned,
            kinetic_energy(&store.packages),
            nested_energy
        );
        log::info!(
            "camera at ({:.1}, {:.1}) zoom {:.2}",
            store.camera.x,
            store.camera.y,
            store.camera.zoom
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Cascade Core (native) starting...");

    let mut args = std::env::args().skip(1);
    let frames = args.next().and_then(|a| a.parse().ok()).unwrap_or(600);
    let seed = args.next().and_then(|a| a.parse().ok()).unwrap_or(12345);
    demo::run(frames, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library's `wasm_main` is the browser entry point
}
