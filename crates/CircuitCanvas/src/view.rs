//! # Viewport System
//!
//! Tracks the full canvas size and the region of it the host currently shows.
//! The canvas lives in unzoomed pixel space; it grows to fit its content rather
//! than panning.

use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::math::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Size of the whole canvas in pixels.
    pub size: UVec2,
    /// The part of the canvas visible in the host's scroll pane.
    pub visible: Rect,
}

impl Default for Viewport {
    fn default() -> Self {
        let size = UVec2::new(800, 600); // user should update
        Self {
            size,
            visible: Rect::from_size(size.as_vec2()),
        }
    }
}

impl Viewport {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            visible: Rect::from_size(size.as_vec2()),
        }
    }

    /// True when `p` is on the canvas and at least `margin` pixels away from
    /// its right and bottom edges.
    pub fn in_bounds(&self, p: Vec2, margin: f32) -> bool {
        let limit = self.size.as_vec2() - Vec2::splat(margin);
        p.x >= 0.0 && p.y >= 0.0 && p.x <= limit.x && p.y <= limit.y
    }

    /// Canvas size needed so that `p` lies `margin` pixels inside the border.
    ///
    /// Never shrinks the canvas.
    pub fn grown_to_include(&self, p: Vec2, margin: f32) -> UVec2 {
        let needed = (p + Vec2::splat(margin)).ceil().max(Vec2::ZERO).as_uvec2();
        self.size.max(needed)
    }
}
