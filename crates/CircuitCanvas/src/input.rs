//! # Input Protocol
//!
//! Pointer events the host forwards to the canvas, plus double-click detection.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// State of keyboard modifiers (Shift, Ctrl, Alt, Meta).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiersState {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// A pointer event in canvas pixels. `time_ms` is the host's event timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Pressed {
        position: Vec2,
        button: PointerButton,
    },
    Released {
        position: Vec2,
        button: PointerButton,
    },
    Clicked {
        position: Vec2,
        button: PointerButton,
        modifiers: ModifiersState,
        time_ms: u64,
    },
    Moved {
        position: Vec2,
    },
    Dragged {
        position: Vec2,
    },
    Entered {
        position: Vec2,
    },
    Exited {
        position: Vec2,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Vec2 {
        match *self {
            PointerEvent::Pressed { position, .. }
            | PointerEvent::Released { position, .. }
            | PointerEvent::Clicked { position, .. }
            | PointerEvent::Moved { position }
            | PointerEvent::Dragged { position }
            | PointerEvent::Entered { position }
            | PointerEvent::Exited { position } => position,
        }
    }
}

/// Detects double clicks: a second click on the same pixel within the threshold.
///
/// A detected double click does not become the reference for the next click.
#[derive(Clone, Debug)]
pub struct ClickTracker {
    threshold_ms: u64,
    last: Option<(IVec2, u64)>,
}

impl ClickTracker {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            last: None,
        }
    }

    /// Registers a click and reports whether it completes a double click.
    pub fn register(&mut self, position: Vec2, time_ms: u64) -> bool {
        let pixel = position.floor().as_ivec2();
        if let Some((last_pixel, last_time)) = self.last {
            if last_pixel == pixel && time_ms.saturating_sub(last_time) < self.threshold_ms {
                return true;
            }
        }
        self.last = Some((pixel, time_ms));
        false
    }
}
