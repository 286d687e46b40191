//! # Collaborator Seams
//!
//! The canvas coordinates modules, wires and the simulation without knowing how
//! any of them look or compute. Everything domain specific is reached through
//! the traits below. All of them are `Send` because the stepping thread steps
//! the scene it shares with the host.

use glam::Vec2;

use crate::math::Rect;
use crate::model::{Mode, ModuleId, Port, VisualFlags, Wire, WireId};
use crate::render::RenderList;

/// Execution side of a placed module.
pub trait Module: Send {
    fn name(&self) -> &str;

    /// Called once when the module is committed to the scene.
    fn set_sequence_number(&mut self, sequence: u32);

    /// A port was created on this module at `index` of its port list.
    fn attach_port(&mut self, _port: &Port, _index: usize) {}
}

/// Visual side of a placed module: shape, hit-testing and animation.
pub trait ModuleVisual: Send {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn contains(&self, point: Vec2) -> bool;
    fn render(&self, flags: VisualFlags, out: &mut RenderList);

    /// Advances animation by one frame.
    fn step(&mut self, _mode: Mode) {}

    /// Builds the property window for this module. Called once on commit.
    fn create_inspector(&self, module: &dyn Module) -> Box<dyn Inspector>;
}

/// Visual side of a wire. `route` holds the positions of the wire's handles, in order.
pub trait WireVisual: Send {
    fn contains(&self, route: &[Vec2], point: Vec2) -> bool;
    fn render(&self, route: &[Vec2], out: &mut RenderList);

    /// Draws the wire-in-progress from its route to the pointer.
    fn render_preview(&self, route: &[Vec2], cursor: Vec2, out: &mut RenderList);

    /// Advances animation by one frame. Wires step on every sub-step.
    fn step(&mut self, _mode: Mode) {}

    /// Recomputes state derived from the connected ports before a run starts.
    fn refresh(&mut self) {}

    fn create_inspector(&self, wire: &Wire) -> Box<dyn Inspector>;
}

/// A property window attached to a module or wire.
pub trait Inspector: Send {
    fn make_visible(&mut self);

    /// The editor mode changed; editable properties may lock or unlock.
    fn update_property_page_state(&mut self, mode: Mode);
}

/// Discrete simulation time.
pub trait LogicalClock: Send {
    /// Advances the clock. Returns true when a full logical tick happened.
    ///
    /// `sub_step` is set on iterations between full-resolution steps.
    fn tick(&mut self, sub_step: bool) -> bool;
    fn current_time(&self) -> u64;
    fn reset(&mut self);
}

/// The simulation engine that owns module semantics.
pub trait SimulationGraph: Send {
    fn add_module(&mut self, id: ModuleId, module: &dyn Module);
    fn add_wire(&mut self, id: WireId, wire: &Wire);
    fn init_simulation(&mut self);
    fn end_simulation(&mut self);
    /// Computes one logical step at `time`.
    fn step_simulation(&mut self, time: u64);
}

/// The host shell that displays the canvas.
///
/// Every method defaults to a no-op. Calls may come from the stepping thread,
/// but never while the canvas holds its scene lock.
pub trait DisplaySink: Send + Sync {
    /// The region of the frame that should be repainted.
    fn request_repaint(&self, _region: Rect) {}
    fn show_elapsed_time(&self, _time: u64) {}
    /// Scroll so that `rect` becomes visible.
    fn scroll_to_visible(&self, _rect: Rect) {}
    fn canvas_resized(&self, _size: glam::UVec2) {}
}

impl DisplaySink for () {}

/// The palette: produces fresh module instances of the selected kind.
pub trait ModuleFactory: Send {
    fn name(&self) -> &str;
    fn instantiate(&self) -> anyhow::Result<(Box<dyn Module>, Box<dyn ModuleVisual>)>;
}

pub trait WireFactory: Send {
    fn create_wire_visual(&self) -> Box<dyn WireVisual>;
}
