//! Camera transition controller
//!
//! Eases position and zoom toward a target with exponential decay, snapping
//! once within tolerance so transitions actually finish.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::CameraView;
use crate::consts::{CAMERA_POSITION_EPSILON, CAMERA_ZOOM_EPSILON};
use crate::ease_factor;

/// Easing rates (decay units per second)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position_speed: 5.0,
            zoom_speed: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    position: Vec2,
    zoom: f32,
    target_position: Vec2,
    /// `None` once an instant move has taken zoom out of the transition
    target_zoom: Option<f32>,
    transitioning: bool,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let view = CameraView::default();
        Self {
            config,
            position: Vec2::new(view.x, view.y),
            zoom: view.zoom,
            target_position: Vec2::new(view.x, view.y),
            target_zoom: None,
            transitioning: false,
        }
    }

    /// Start an animated move; `zoom: None` keeps the current zoom target
    pub fn set_target(&mut self, x: f32, y: f32, zoom: Option<f32>) {
        self.target_position = Vec2::new(x, y);
        if zoom.is_some() {
            self.target_zoom = zoom;
        }
        self.transitioning = true;
    }

    /// Jump to a position without animating; any zoom target is dropped
    pub fn set_instant(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
        self.target_position = self.position;
        self.target_zoom = None;
        self.transitioning = false;
    }

    /// Apply one frame of easing
    pub fn advance(&mut self, dt: f32) {
        if !self.transitioning {
            return;
        }

        let position_done = if self.position.distance(self.target_position) < CAMERA_POSITION_EPSILON
        {
            self.position = self.target_position;
            true
        } else {
            let t = ease_factor(dt, self.config.position_speed);
            self.position += (self.target_position - self.position) * t;
            false
        };

        let zoom_done = match self.target_zoom {
            None => true,
            Some(target) if (target - self.zoom).abs() < CAMERA_ZOOM_EPSILON => {
                self.zoom = target;
                true
            }
            Some(target) => {
                let t = ease_factor(dt, self.config.zoom_speed);
                self.zoom += (target - self.zoom) * t;
                false
            }
        };

        if position_done && zoom_done {
            self.transitioning = false;
            log::trace!("camera settled at {:?} zoom {}", self.position, self.zoom);
        }
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            x: self.position.x,
            y: self.position.y,
            zoom: self.zoom,
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
