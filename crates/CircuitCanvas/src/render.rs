//! # Rendering System
//!
//! The canvas never rasterises. It paints a display list of `DrawCommand`s into
//! an off-screen `Frame`, and the host interprets those commands when it is asked
//! to repaint. The frame is shared between the stepping thread (writer) and the
//! host display (reader) through `FrameBuffer`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use glam::{UVec2, Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// A single drawing primitive.
///
/// Coordinates are in canvas pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// A filled rectangle with an optional stroke.
    Rect {
        /// Top-left position.
        pos: Vec2,
        size: Vec2,
        /// Fill color (RGBA, 0.0 - 1.0).
        color: Vec4,
        /// Width of the border stroke in pixels.
        stroke_width: f32,
        /// Color of the border stroke.
        stroke_color: Option<Vec4>,
    },
    /// A straight line segment.
    Line {
        start: Vec2,
        end: Vec2,
        color: Vec4,
        /// Line thickness in pixels.
        width: f32,
    },
    /// Connected line segments through `points`, used for wire routes.
    Polyline {
        points: Vec<Vec2>,
        color: Vec4,
        width: f32,
    },
    /// Text to be rendered.
    Text {
        /// Top-left position.
        pos: Vec2,
        /// The styling and layout of text is handled by the consumer.
        text: String,
        color: Vec4,
        /// Font size in pixels (approximate).
        size: f32,
    },
}

/// A list of draw commands representing the current frame.
pub type RenderList = Vec<DrawCommand>;

/// The off-screen image: a display list sized to the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub size: UVec2,
    pub commands: RenderList,
}

impl Frame {
    fn allocate(size: UVec2) -> Self {
        Self {
            size,
            commands: Vec::new(),
        }
    }

    /// Clears the frame to a single background rectangle.
    fn clear(&mut self, background: Vec4) {
        self.commands.clear();
        self.commands.push(DrawCommand::Rect {
            pos: Vec2::ZERO,
            size: self.size.as_vec2(),
            color: background,
            stroke_width: 0.0,
            stroke_color: None,
        });
    }
}

/// Mutually exclusive access to the off-screen frame.
///
/// Writers paint a complete frame while holding the lock, so readers never
/// observe a partially drawn frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    slot: Mutex<Option<Frame>>,
    generation: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Paints a new frame of `size`, allocating it on first use or when the size changed.
    ///
    /// Returns the generation of the painted frame, or `None` when `size` is empty
    /// and nothing could be allocated.
    pub fn draw(
        &self,
        size: UVec2,
        background: Vec4,
        paint: impl FnOnce(&mut RenderList),
    ) -> Option<u64> {
        if size.x == 0 || size.y == 0 {
            return None;
        }

        let mut slot = self.lock();
        if slot.as_ref().map(|frame| frame.size) != Some(size) {
            *slot = Some(Frame::allocate(size));
        }
        let frame = slot.get_or_insert_with(|| Frame::allocate(size));
        frame.clear(background);
        paint(&mut frame.commands);

        Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Drops the current frame; the next `draw` reallocates it.
    pub fn release(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_allocated(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs `read` against the current frame while holding the lock.
    pub fn read<R>(&self, read: impl FnOnce(Option<&Frame>) -> R) -> R {
        let slot = self.lock();
        read(slot.as_ref())
    }

    pub fn snapshot(&self) -> Option<Frame> {
        self.read(|frame| frame.cloned())
    }

    /// Number of frames painted so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_size_allocates_nothing() {
        let buffer = FrameBuffer::new();
        assert_eq!(buffer.draw(UVec2::new(0, 10), Vec4::ONE, |_| {}), None);
        assert!(!buffer.is_allocated());
        assert_eq!(buffer.generation(), 0);
    }

    #[test]
    fn draw_clears_previous_contents() {
        let buffer = FrameBuffer::new();
        let size = UVec2::new(10, 10);
        let line = DrawCommand::Line {
            start: Vec2::ZERO,
            end: Vec2::ONE,
            color: Vec4::ONE,
            width: 1.0,
        };
        buffer.draw(size, Vec4::ONE, |out| out.push(line.clone()));
        buffer.draw(size, Vec4::ONE, |out| out.push(line.clone()));

        let frame = buffer.snapshot().expect("frame allocated");
        assert_eq!(frame.commands.len(), 2);
        assert_eq!(buffer.generation(), 2);
    }

    #[test]
    fn resize_reallocates() {
        let buffer = FrameBuffer::new();
        buffer.draw(UVec2::new(10, 10), Vec4::ONE, |_| {});
        buffer.draw(UVec2::new(20, 10), Vec4::ONE, |_| {});
        assert_eq!(buffer.snapshot().map(|f| f.size), Some(UVec2::new(20, 10)));
        assert!(buffer.release());
        assert!(!buffer.is_allocated());
    }
}
