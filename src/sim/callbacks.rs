//! Per-frame callback registry
//!
//! Callbacks fire in registration order. Registering or unregistering from
//! inside a callback is allowed: new callbacks wait for the next frame and
//! removals never shift the siblings still to be called.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

type TickCallback = Box<dyn FnMut(f32)>;

struct Slot {
    id: u64,
    /// Taken out while the callback runs
    callback: Option<TickCallback>,
    live: bool,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    index: HashMap<u64, usize>,
    next_id: u64,
    dead: usize,
    dispatching: bool,
}

impl Registry {
    fn remove(&mut self, id: u64) -> Option<TickCallback> {
        let idx = self.index.remove(&id)?;
        let slot = &mut self.slots[idx];
        slot.live = false;
        let callback = slot.callback.take();
        self.dead += 1;
        if !self.dispatching && self.dead * 2 > self.slots.len() {
            self.compact();
        }
        callback
    }

    /// Drop dead slots and rebuild the id index
    fn compact(&mut self) {
        if self.dead == 0 {
            return;
        }
        self.slots.retain(|s| s.live);
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
        self.dead = 0;
    }
}

/// Shared handle to a callback registry
#[derive(Clone, Default)]
pub struct TickCallbacks {
    inner: Rc<RefCell<Registry>>,
}

impl TickCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, invoked with the frame delta in seconds
    pub fn register<F>(&self, callback: F) -> Unregister
    where
        F: FnMut(f32) + 'static,
    {
        let mut reg = self.inner.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        let idx = reg.slots.len();
        reg.slots.push(Slot {
            id,
            callback: Some(Box::new(callback)),
            live: true,
        });
        reg.index.insert(id, idx);
        Unregister {
            registry: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.inner.borrow().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every callback registered before this call
    ///
    /// A dispatch started from inside a callback is ignored.
    pub fn dispatch(&self, dt: f32) {
        let count = {
            let mut reg = self.inner.borrow_mut();
            if reg.dispatching {
                log::warn!("nested callback dispatch ignored");
                return;
            }
            reg.compact();
            reg.dispatching = true;
            reg.slots.len()
        };
        let _guard = DispatchGuard(&self.inner);

        for i in 0..count {
            let taken = {
                let mut reg = self.inner.borrow_mut();
                let slot = &mut reg.slots[i];
                if slot.live {
                    slot.callback.take().map(|cb| (slot.id, cb))
                } else {
                    None
                }
            };
            let Some((id, mut callback)) = taken else {
                continue;
            };

            callback(dt);

            let mut reg = self.inner.borrow_mut();
            let slot = &mut reg.slots[i];
            if slot.live && slot.id == id {
                slot.callback = Some(callback);
            } else {
                // Unregistered itself; drop outside the borrow
                drop(reg);
                drop(callback);
            }
        }

        let mut reg = self.inner.borrow_mut();
        if reg.dead * 2 > reg.slots.len() {
            reg.compact();
        }
    }
}

/// Clears the dispatching flag on exit, including when a callback panics
struct DispatchGuard<'a>(&'a RefCell<Registry>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut reg) = self.0.try_borrow_mut() {
            reg.dispatching = false;
        }
    }
}

/// Removes its callback from the registry when consumed
#[must_use = "dropping the handle keeps the callback registered forever"]
pub struct Unregister {
    registry: Weak<RefCell<Registry>>,
    id: u64,
}

impl Unregister {
    /// Remove the callback; a no-op if the registry is gone or it was already removed
    pub fn unregister(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = registry.borrow_mut().remove(self.id);
        drop(removed);
    }
}
