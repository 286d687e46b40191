use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(size: Vec2) -> Self {
        Self::new(Vec2::ZERO, size)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_of_offset_rect() {
        let r = Rect::new(Vec2::new(5.0, 20.0), Vec2::new(30.0, 5.0));
        assert_eq!(r.max, Vec2::new(35.0, 25.0));
        assert_eq!(r.size(), Vec2::new(30.0, 5.0));
    }

    #[test]
    fn contains_is_inclusive() {
        let r = Rect::new(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0));
        assert!(r.contains(Vec2::new(10.0, 20.0)));
        assert!(!r.contains(Vec2::new(20.5, 15.0)));
    }
}
