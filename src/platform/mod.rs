//! Platform abstraction layer
//!
//! The host owns the frame-scheduling primitive. The core only asks for
//! "call me on the next frame" and may cancel that request.
//! - `HeadlessFrames`: manual frames for native loops and tests
//! - `web::RafFrames`: `requestAnimationFrame` in the browser

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Opaque id of a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Host frame-scheduling primitive
pub trait FrameScheduler {
    /// Request one callback on the next display frame; `None` if the host refused
    fn request_frame(&mut self) -> Option<FrameHandle>;
    /// Cancel a previously requested frame
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Frame host without a display: the driver fires frames itself
#[derive(Debug, Default)]
pub struct HeadlessFrames {
    next: i32,
    pending: Option<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

impl HeadlessFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frame currently waiting to fire
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Consume the pending frame, as a driver does when it fires it
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    /// Total frames requested so far
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Total frames cancelled so far
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for HeadlessFrames {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        self.next = self.next.wrapping_add(1);
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        self.requested += 1;
        Some(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}
