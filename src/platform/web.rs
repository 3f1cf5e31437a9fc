//! Browser frame host over `requestAnimationFrame`

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::{FrameHandle, FrameScheduler};
use crate::config::SimConfig;
use crate::sim::{GameLoop, GameStore, NoHooks, TickHooks};

type FrameClosure = Closure<dyn FnMut(f64)>;

thread_local! {
    /// Loop started by `wasm_main`, kept alive for the page lifetime
    static DEFAULT_GAME: RefCell<Option<Rc<RefCell<GameLoop<NoHooks, RafFrames>>>>> =
        const { RefCell::new(None) };
}

/// Schedules a shared closure with `window.requestAnimationFrame`
pub struct RafFrames {
    window: web_sys::Window,
    callback: Rc<RefCell<Option<FrameClosure>>>,
}

impl FrameScheduler for RafFrames {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        let slot = self.callback.borrow();
        let closure = slot.as_ref()?;
        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref::<js_sys::Function>())
        {
            Ok(id) => Some(FrameHandle(id)),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0) {
            log::warn!("cancelAnimationFrame failed: {:?}", e);
        }
    }
}

/// Browser logging + panic messages in the console
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::warn!("Logger already initialized");
    }
}

/// Build a game loop driven by `requestAnimationFrame` and start it
///
/// The frame closure only holds a weak reference, so dropping the returned
/// handle ends the loop on the next frame.
pub fn start_in_browser<H>(
    store: GameStore,
    hooks: H,
    config: SimConfig,
) -> Result<Rc<RefCell<GameLoop<H, RafFrames>>>, JsValue>
where
    H: TickHooks + 'static,
{
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let performance = window
        .performance()
        .ok_or_else(|| JsValue::from_str("no performance timer"))?;

    let slot: Rc<RefCell<Option<FrameClosure>>> = Rc::new(RefCell::new(None));
    let frames = RafFrames {
        window,
        callback: slot.clone(),
    };
    let game = Rc::new(RefCell::new(GameLoop::new(store, hooks, frames, config)));

    let weak = Rc::downgrade(&game);
    *slot.borrow_mut() = Some(Closure::new(move |time: f64| {
        let Some(game) = weak.upgrade() else {
            return;
        };
        if let Err(err) = game.borrow_mut().on_frame(time) {
            log::error!("Game loop halted: {err}");
        }
    }));

    game.borrow_mut().start(performance.now());
    log::info!("Game loop running in browser");
    Ok(game)
}

/// Module entry point: an empty graph with no external hooks
///
/// Hosts with their own game logic call `start_in_browser` instead.
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    init_logging();
    log::info!("Cascade Core (web) starting...");

    let config = SimConfig::default();
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let game = start_in_browser(GameStore::new(), NoHooks, config)?;
    DEFAULT_GAME.with(|slot| *slot.borrow_mut() = Some(game));
    Ok(())
}
