//! # CircuitCanvas
//!
//! `circuit_canvas` is the headless interactive canvas of a circuit editor.
//! It keeps the graph of placed modules and wires, interprets pointer gestures
//! in four editor modes, drives a discrete-time simulation at a fixed frame rate,
//! and paints the scene into an off-screen frame the host displays.
//!
//! ## Core Architecture
//! - **Scene (`src/scene.rs`)**: committed modules, ports and wires in flat arenas (SlotMap).
//! - **Handles (`src/handles.rs`)**: wire anchors and routes.
//! - **Interaction (`src/interaction.rs`)**: the mode state machine and the pointer protocol.
//! - **Stepper (`src/stepper.rs`)**: the paced background loop.
//! - **Render (`src/render.rs`)**: `DrawCommand` display lists inside a shared `FrameBuffer`.
//!
//! Module and wire behaviour is supplied by the host through the traits in `src/traits.rs`.

pub mod clock;
pub mod config;
pub mod error;
pub mod handles;
pub mod input;
pub mod interaction;
pub mod math;
pub mod model;
pub mod painter;
pub mod render;
pub mod scene;
pub mod state;
pub mod stepper;
pub mod traits;
pub mod view;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use glam::UVec2;

use clock::FixedStepClock;
use math::Rect;
use render::{Frame, FrameBuffer};
use state::{CanvasState, StepReport};
use stepper::{Cadence, FramePacer, Stepper};
use traits::{DisplaySink, LogicalClock, ModuleFactory, SimulationGraph, WireFactory};

// Re-exports for convenience
pub use config::{CanvasConfig, StepDrive};
pub use error::{CanvasError, SceneError};
pub use input::{ModifiersState, PointerButton, PointerEvent};
pub use interaction::{Effects, Interaction};
pub use model::Mode;

/// What a successful `Canvas::change_mode` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Already in the requested mode.
    Unchanged,
    /// A fresh run: clock reset and graph initialised.
    Started,
    /// A paused run continues with its clock time intact.
    Resumed,
    Paused,
    /// The run ended and the canvas is back in Edit.
    Stopped,
    /// The wire-in-progress was dropped on the way back to Edit.
    DraftAbandoned,
}

/// State shared between the host-facing `Canvas` and its stepping thread.
///
/// Lock order is always `state` then the frame lock inside `frame`. Display
/// callbacks run with neither held.
struct Shared {
    state: Mutex<CanvasState>,
    frame: FrameBuffer,
    continuous: AtomicBool,
    display: Arc<dyn DisplaySink>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CanvasState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovering canvas state from a poisoned lock");
            poisoned.into_inner()
        })
    }

    fn is_continuous(&self) -> bool {
        self.continuous.load(Ordering::Acquire)
    }

    /// Paints the scene into the frame buffer. Returns the frame generation.
    fn paint_to_buffer(&self, state: &CanvasState) -> Option<u64> {
        let background = state.config.style.background_color;
        self.frame
            .draw(state.viewport.size, background, |out| state.paint(out))
    }

    /// Paints the frame. Returns the region the display should repaint.
    fn paint_locked(&self, state: &CanvasState) -> Option<Rect> {
        self.paint_to_buffer(state)?;
        Some(state.viewport.visible)
    }

    fn render(&self) -> bool {
        let region = {
            let state = self.lock();
            self.paint_locked(&state)
        };
        match region {
            Some(region) => {
                self.display.request_repaint(region);
                true
            }
            None => false,
        }
    }

    /// One iteration of the stepping loop: step, then paint if anything changed.
    fn iterate(&self, cadence: &mut Cadence) -> StepReport {
        let continuous = self.is_continuous();
        let (report, region) = {
            let mut state = self.lock();
            let report = state.step_simulation(cadence.is_full_step());
            let region = if report.stepped || continuous {
                self.paint_locked(&state)
            } else {
                None
            };
            (report, region)
        };

        if report.stepped {
            cadence.advance();
        }
        if let Some(time) = report.elapsed {
            self.display.show_elapsed_time(time);
        }
        if let Some(region) = region {
            self.display.request_repaint(region);
        }
        report
    }
}

/// Builds a `Canvas` from its collaborators.
pub struct CanvasBuilder {
    name: String,
    config: CanvasConfig,
    size: Option<UVec2>,
    graph: Option<Box<dyn SimulationGraph>>,
    clock: Option<Box<dyn LogicalClock>>,
    wire_factory: Option<Box<dyn WireFactory>>,
    display: Option<Arc<dyn DisplaySink>>,
}

impl CanvasBuilder {
    /// Starts a builder for a canvas called `name`. The name also labels the stepping thread.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: CanvasConfig::default(),
            size: None,
            graph: None,
            clock: None,
            wire_factory: None,
            display: None,
        }
    }

    /// Default: `CanvasConfig::default()`.
    pub fn with_config(mut self, config: CanvasConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial canvas size. Default: 800x600.
    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = Some(size);
        self
    }

    /// The simulation engine. Required.
    pub fn with_graph(mut self, graph: impl SimulationGraph + 'static) -> Self {
        self.graph = Some(Box::new(graph));
        self
    }

    /// Default: `FixedStepClock::default()`.
    pub fn with_clock(mut self, clock: impl LogicalClock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Supplies the visual of every new wire. Required.
    pub fn with_wire_factory(mut self, factory: impl WireFactory + 'static) -> Self {
        self.wire_factory = Some(Box::new(factory));
        self
    }

    /// Default: `()`, which ignores every display request.
    pub fn with_display(mut self, display: Arc<dyn DisplaySink>) -> Self {
        self.display = Some(display);
        self
    }

    /// Validates the config and assembles the canvas. No thread is started yet.
    pub fn build(self) -> Result<Canvas, CanvasError> {
        self.config.validate()?;
        let graph = self
            .graph
            .ok_or(CanvasError::MissingCollaborator("simulation graph"))?;
        let wire_factory = self
            .wire_factory
            .ok_or(CanvasError::MissingCollaborator("wire factory"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(FixedStepClock::default()) as Box<dyn LogicalClock>);
        let display = self
            .display
            .unwrap_or_else(|| Arc::new(()) as Arc<dyn DisplaySink>);

        let mut state = CanvasState::new(
            self.name.clone(),
            self.config.clone(),
            graph,
            clock,
            wire_factory,
        );
        if let Some(size) = self.size {
            state.viewport = view::Viewport::new(size);
        }

        tracing::info!(canvas = %self.name, fps = self.config.fps, step_ratio = self.config.step_ratio, "Canvas created");
        Ok(Canvas {
            stepper: Stepper::new(self.name.clone()),
            cadence: Cadence::new(self.config.step_ratio),
            name: self.name,
            config: self.config,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                frame: FrameBuffer::new(),
                continuous: AtomicBool::new(false),
                display,
            }),
        })
    }
}

/// The main entry point for the library.
///
/// Mode changes and loop control take `&mut self`; gestures and rendering only
/// need `&self`. Dropping the canvas stops its stepping thread.
pub struct Canvas {
    name: String,
    config: CanvasConfig,
    shared: Arc<Shared>,
    stepper: Stepper,
    /// Sub-step counter for `StepDrive::Host`. The background loop owns its own.
    cadence: Cadence,
}

impl Canvas {
    /// Shorthand for `CanvasBuilder::new`.
    pub fn builder(name: impl Into<String>) -> CanvasBuilder {
        CanvasBuilder::new(name)
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validated configuration the canvas was built with.
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// The current editor mode.
    pub fn mode(&self) -> Mode {
        self.shared.lock().mode()
    }

    /// Runs `f` against the canvas state under the scene lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&CanvasState) -> R) -> R {
        let state = self.shared.lock();
        f(&state)
    }

    /// Runs `f` against the current frame under the frame lock.
    pub fn with_frame<R>(&self, f: impl FnOnce(Option<&Frame>) -> R) -> R {
        self.shared.frame.read(f)
    }

    pub fn frame_snapshot(&self) -> Option<Frame> {
        self.shared.frame.snapshot()
    }

    /// Number of frames painted so far.
    pub fn frame_generation(&self) -> u64 {
        self.shared.frame.generation()
    }

    /// True while a background stepping thread is alive.
    pub fn is_stepping(&self) -> bool {
        self.stepper.is_running()
    }

    pub fn is_continuous_render(&self) -> bool {
        self.shared.is_continuous()
    }

    /// Requests a mode change.
    ///
    /// WireCreation can only be entered by a gesture, and Paused only from Simulation.
    pub fn change_mode(&mut self, to: Mode) -> Result<Transition, CanvasError> {
        let from = self.mode();
        if from == to {
            return Ok(Transition::Unchanged);
        }

        match (from, to) {
            (Mode::Edit | Mode::WireCreation, Mode::Simulation) => {
                self.shared.lock().enter_simulation(false);
                self.launch_loop(from)?;
                Ok(Transition::Started)
            }
            (Mode::Paused, Mode::Simulation) => {
                self.shared.lock().enter_simulation(true);
                self.launch_loop(from)?;
                Ok(Transition::Resumed)
            }
            (Mode::Simulation, Mode::Paused) => {
                self.halt_loop();
                self.shared.lock().leave_simulation(Mode::Paused);
                self.render_unless_continuous();
                Ok(Transition::Paused)
            }
            (Mode::Simulation | Mode::Paused, Mode::Edit) => {
                self.halt_loop();
                self.shared.lock().leave_simulation(Mode::Edit);
                self.render_unless_continuous();
                Ok(Transition::Stopped)
            }
            (Mode::WireCreation, Mode::Edit) => {
                self.shared.lock().abandon_draft();
                self.render_unless_continuous();
                Ok(Transition::DraftAbandoned)
            }
            _ => Err(CanvasError::InvalidTransition { from, to }),
        }
    }

    pub fn start_simulation(&mut self) -> Result<Transition, CanvasError> {
        self.change_mode(Mode::Simulation)
    }

    pub fn pause_simulation(&mut self) -> Result<Transition, CanvasError> {
        self.change_mode(Mode::Paused)
    }

    /// Resumes a paused simulation. Unlike a start, the clock keeps its time.
    pub fn resume_simulation(&mut self) -> Result<Transition, CanvasError> {
        if self.mode() != Mode::Paused {
            return Err(CanvasError::InvalidTransition {
                from: self.mode(),
                to: Mode::Simulation,
            });
        }
        self.change_mode(Mode::Simulation)
    }

    pub fn stop_simulation(&mut self) -> Result<Transition, CanvasError> {
        self.change_mode(Mode::Edit)
    }

    /// Restarts the simulation graph and the clock without leaving the current mode.
    pub fn reset(&self) {
        self.shared.lock().reset();
        self.shared.display.show_elapsed_time(0);
    }

    /// Starts the loop for a run entered from `from`, rolling the mode back on failure.
    fn launch_loop(&mut self, from: Mode) -> Result<(), CanvasError> {
        self.cadence.reset();
        if self.shared.is_continuous() || self.config.drive == StepDrive::Host {
            return Ok(());
        }
        if let Err(error) = self.start_loop() {
            tracing::error!(canvas = %self.name, %error, "Failed to start stepping loop");
            let back = if from == Mode::Paused {
                Mode::Paused
            } else {
                Mode::Edit
            };
            self.shared.lock().leave_simulation(back);
            return Err(error.into());
        }
        Ok(())
    }

    fn start_loop(&mut self) -> std::io::Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut cadence = Cadence::new(self.config.step_ratio);
        let pacer = FramePacer::new(self.config.frame_period(), self.config.delay_skip_threshold);
        self.stepper.start(pacer, move || {
            shared.iterate(&mut cadence);
        })
    }

    /// Stops the loop unless continuous rendering keeps it alive.
    fn halt_loop(&mut self) {
        if !self.shared.is_continuous() {
            self.stepper.stop();
        }
    }

    fn render_unless_continuous(&self) {
        if !self.shared.is_continuous() {
            self.shared.render();
        }
    }

    /// Renders every frame at the loop's rate regardless of mode, or stops doing so.
    ///
    /// Turning it off during a simulation hands the run back to a plain stepping loop.
    pub fn set_continuous_render(&mut self, on: bool) -> Result<(), CanvasError> {
        let was = self.shared.continuous.swap(on, Ordering::AcqRel);
        if was == on {
            return Ok(());
        }
        tracing::info!(canvas = %self.name, continuous = on, "Continuous render toggled");
        if self.config.drive == StepDrive::Host {
            return Ok(());
        }

        let restart = on || self.mode() == Mode::Simulation;
        self.stepper.stop();
        if restart {
            if let Err(error) = self.start_loop() {
                self.shared.continuous.store(was, Ordering::Release);
                return Err(error.into());
            }
        }
        Ok(())
    }

    /// Advances one frame when the host drives the loop (`StepDrive::Host`).
    ///
    /// Does nothing outside Simulation unless continuous rendering is on.
    pub fn tick(&mut self) -> StepReport {
        if self.mode() != Mode::Simulation && !self.shared.is_continuous() {
            return StepReport::default();
        }
        self.shared.iterate(&mut self.cadence)
    }

    /// Selects the palette entry placed by the next shift-click or pointer entry.
    pub fn select_module(&self, factory: impl ModuleFactory + 'static) -> Result<(), CanvasError> {
        self.shared.lock().select_palette(Some(Box::new(factory)))
    }

    pub fn clear_selection(&self) -> Result<(), CanvasError> {
        self.shared.lock().select_palette(None)
    }

    /// Applies a pointer event and performs the resulting display requests.
    pub fn handle_pointer(&self, event: PointerEvent) -> Effects {
        let continuous = self.shared.is_continuous();
        let (effects, region) = {
            let mut state = self.shared.lock();
            let effects = state.handle_pointer(&event);
            let region = if effects.render && !continuous {
                self.shared.paint_locked(&state)
            } else {
                None
            };
            (effects, region)
        };

        let display = &self.shared.display;
        if let Some(size) = effects.resized {
            tracing::debug!(canvas = %self.name, ?size, "Canvas grown by drag");
            display.canvas_resized(size);
        }
        if let Some(rect) = effects.scroll_to {
            display.scroll_to_visible(rect);
        }
        if let Some(region) = region {
            display.request_repaint(region);
        }
        effects
    }

    /// Paints the frame and asks the display to repaint the visible region.
    ///
    /// Returns false when the canvas has no area to paint.
    pub fn render(&self) -> bool {
        self.shared.render()
    }

    /// Paints the frame without notifying the display. Returns the frame generation.
    pub fn render_to_buffer(&self) -> Option<u64> {
        let state = self.shared.lock();
        self.shared.paint_to_buffer(&state)
    }

    /// Changes the canvas size. An existing frame is reallocated at the new size.
    pub fn resize(&self, size: UVec2) {
        self.shared.lock().viewport.size = size;
        let had_frame = self.shared.frame.release();
        tracing::debug!(canvas = %self.name, ?size, "Canvas resized");
        self.shared.display.canvas_resized(size);
        if had_frame {
            self.render_unless_continuous();
        }
    }

    /// Updates the region of the canvas the host currently shows.
    pub fn set_visible_region(&self, visible: Rect) {
        self.shared.lock().viewport.visible = visible;
    }

    /// Shrinks or grows the canvas to the scene's extent, but never below the visible region.
    pub fn fit_to_content(&self) -> UVec2 {
        let size = {
            let mut state = self.shared.lock();
            let extent = state.recompute_extent();
            extent
                .size()
                .max(state.viewport.visible.size())
                .ceil()
                .as_uvec2()
        };
        self.resize(size);
        size
    }

    /// The padded extent of everything placed on the canvas.
    pub fn bounding_extent(&self) -> Rect {
        let mut state = self.shared.lock();
        match state.scene.bounding_extent() {
            Some(extent) => extent,
            None => state.recompute_extent(),
        }
    }
}
