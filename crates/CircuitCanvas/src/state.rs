//! Everything guarded by the canvas scene lock: the scene store, handles, the
//! current interaction and the simulation collaborators.

use crate::config::CanvasConfig;
use crate::handles::HandleManager;
use crate::input::ClickTracker;
use crate::interaction::{DragState, Interaction, WireDraft};
use crate::math::Rect;
use crate::model::{HandleOwner, Mode, WireRef};
use crate::painter::Painter;
use crate::render::RenderList;
use crate::scene::Scene;
use crate::traits::{LogicalClock, ModuleFactory, SimulationGraph, WireFactory};
use crate::view::Viewport;

/// Outcome of one stepping-loop iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Something advanced; the sub-step counter moves on and a frame is due.
    pub stepped: bool,
    /// New simulation time, set when the graph took a full logical step.
    pub elapsed: Option<u64>,
}

pub struct CanvasState {
    pub(crate) name: String,
    pub(crate) config: CanvasConfig,
    pub(crate) scene: Scene,
    pub(crate) handles: HandleManager,
    pub(crate) interaction: Interaction,
    pub(crate) viewport: Viewport,
    pub(crate) graph: Box<dyn SimulationGraph>,
    pub(crate) clock: Box<dyn LogicalClock>,
    pub(crate) wire_factory: Box<dyn WireFactory>,
    pub(crate) palette: Option<Box<dyn ModuleFactory>>,
    pub(crate) drag: DragState,
    pub(crate) clicks: ClickTracker,
}

impl CanvasState {
    pub(crate) fn new(
        name: String,
        config: CanvasConfig,
        graph: Box<dyn SimulationGraph>,
        clock: Box<dyn LogicalClock>,
        wire_factory: Box<dyn WireFactory>,
    ) -> Self {
        Self {
            name,
            handles: HandleManager::new(config.handle_radius),
            clicks: ClickTracker::new(config.double_click_ms),
            config,
            scene: Scene::new(),
            interaction: Interaction::default(),
            viewport: Viewport::default(),
            graph,
            clock,
            wire_factory,
            palette: None,
            drag: DragState::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn handles(&self) -> &HandleManager {
        &self.handles
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn elapsed_time(&self) -> u64 {
        self.clock.current_time()
    }

    pub fn has_palette_selection(&self) -> bool {
        self.palette.is_some()
    }

    /// Replaces the interaction. A mode change is broadcast to every module inspector.
    pub(crate) fn set_interaction(&mut self, next: Interaction) {
        let from = self.mode();
        self.interaction = next;
        self.announce_mode_change(from);
    }

    pub(crate) fn announce_mode_change(&mut self, from: Mode) {
        let to = self.mode();
        if from != to {
            self.scene.update_inspectors(to);
            tracing::info!(canvas = %self.name, ?from, ?to, "Mode changed");
        }
    }

    /// Takes the wire-in-progress out of the interaction, leaving Edit behind.
    pub(crate) fn take_draft(&mut self) -> Option<WireDraft> {
        match std::mem::take(&mut self.interaction) {
            Interaction::WireCreation(draft) => {
                self.announce_mode_change(Mode::WireCreation);
                Some(draft)
            }
            other => {
                self.interaction = other;
                None
            }
        }
    }

    /// Drops every handle that belongs to the wire-in-progress.
    pub(crate) fn discard_draft_handles(&mut self) {
        let removed = self.handles.remove_all_owned_by(HandleOwner::Wire(WireRef::Draft))
            + self.handles.remove_all_on_wire(WireRef::Draft);
        if removed > 0 {
            tracing::debug!(canvas = %self.name, removed, "Discarded draft wire handles");
        }
        self.scene.invalidate_extent();
    }

    /// Cancels the wire-in-progress and returns to Edit. No-op outside WireCreation.
    pub(crate) fn abandon_draft(&mut self) -> bool {
        if !matches!(self.interaction, Interaction::WireCreation(_)) {
            return false;
        }
        self.discard_draft_handles();
        self.scene.clear_flags();
        self.set_interaction(Interaction::Edit { placement: None });
        true
    }

    pub(crate) fn clear_flags(&mut self) {
        self.scene.clear_flags();
        self.handles.clear_flags();
    }

    /// Enters Simulation from Edit, WireCreation or (with `resume`) Paused.
    ///
    /// Pending placements and drafts are discarded. A fresh start resets the
    /// clock and initialises the graph; a resume keeps both.
    pub(crate) fn enter_simulation(&mut self, resume: bool) {
        if matches!(self.interaction, Interaction::WireCreation(_)) {
            self.discard_draft_handles();
        }
        for record in self.scene.wires_mut() {
            record.visual.refresh();
        }
        if !resume {
            self.clock.reset();
            self.graph.init_simulation();
        }
        self.clear_flags();
        self.drag = DragState::default();
        self.set_interaction(Interaction::Simulation);
    }

    /// Leaves Simulation or Paused for `to`. Ending in Edit also ends the simulation.
    pub(crate) fn leave_simulation(&mut self, to: Mode) {
        match to {
            Mode::Paused => self.set_interaction(Interaction::Paused),
            _ => {
                self.graph.end_simulation();
                self.set_interaction(Interaction::Edit { placement: None });
            }
        }
    }

    /// Restarts the simulation graph from its initial state.
    pub(crate) fn reset(&mut self) {
        self.graph.end_simulation();
        self.graph.init_simulation();
        self.clock.reset();
        tracing::info!(canvas = %self.name, "Simulation reset");
    }

    /// One iteration of the stepping loop.
    ///
    /// In Simulation the clock is asked for a tick, flagged as a sub-step unless
    /// this is a full-resolution iteration. A full-resolution tick steps the graph.
    /// Visuals step when the clock ticked or when no simulation runs: modules only
    /// at full resolution, wires on every sub-step. Modules always step before wires.
    pub(crate) fn step_simulation(&mut self, full_step: bool) -> StepReport {
        let mode = self.mode();
        let simulating = mode == Mode::Simulation;

        let ticked = simulating && self.clock.tick(!full_step);
        let mut elapsed = None;
        if ticked && full_step {
            let time = self.clock.current_time();
            self.graph.step_simulation(time);
            elapsed = Some(time);
        }

        let stepped = !simulating || ticked;
        if stepped {
            if full_step || !simulating {
                for record in self.scene.modules_mut() {
                    record.visual.step(mode);
                }
            }
            for record in self.scene.wires_mut() {
                record.visual.step(mode);
            }
        }

        StepReport { stepped, elapsed }
    }

    pub(crate) fn recompute_extent(&mut self) -> Rect {
        self.scene
            .recompute_bounding_extent(&self.handles, self.config.extent_margin)
    }

    /// Paints the scene in draw order.
    pub(crate) fn paint(&self, out: &mut RenderList) {
        Painter::draw_scene(self, out);
    }
}
