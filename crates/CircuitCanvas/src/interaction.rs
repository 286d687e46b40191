//! # Interaction State Machine
//!
//! The current mode together with whatever is pending in it, and the pointer
//! protocol that builds the scene. Placements and wire drafts are payloads of
//! the authoring modes, so nothing can be pending while a simulation runs.

use glam::{UVec2, Vec2};

use crate::error::CanvasError;
use crate::input::{ModifiersState, PointerButton, PointerEvent};
use crate::math::Rect;
use crate::model::{
    HandleId, HandleKind, HandleOwner, Mode, ModuleId, VisualFlags, Wire, WireId, WireRef,
};
use crate::state::CanvasState;
use crate::traits::{Module, ModuleFactory, ModuleVisual, WireVisual};

/// Name given to ports created when a wire is committed.
pub const DEFAULT_PORT_NAME: &str = "Ethernet";

/// A module instantiated from the palette that follows the pointer until placed.
pub struct Placement {
    pub module: Box<dyn Module>,
    pub visual: Box<dyn ModuleVisual>,
}

/// The wire-in-progress. Its route lives in the handle manager under `WireRef::Draft`.
pub struct WireDraft {
    pub origin: ModuleId,
    pub visual: Box<dyn WireVisual>,
    /// Last pointer position; the preview is drawn up to here.
    pub cursor: Vec2,
}

pub enum Interaction {
    Edit { placement: Option<Placement> },
    WireCreation(WireDraft),
    Simulation,
    Paused,
}

impl Default for Interaction {
    fn default() -> Self {
        Interaction::Edit { placement: None }
    }
}

impl Interaction {
    pub fn mode(&self) -> Mode {
        match self {
            Interaction::Edit { .. } => Mode::Edit,
            Interaction::WireCreation(_) => Mode::WireCreation,
            Interaction::Simulation => Mode::Simulation,
            Interaction::Paused => Mode::Paused,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Interaction::Edit { placement } => placement.as_ref(),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&WireDraft> {
        match self {
            Interaction::WireCreation(draft) => Some(draft),
            _ => None,
        }
    }

    /// True while a placement or a wire draft is pending.
    pub fn has_pending(&self) -> bool {
        self.placement().is_some() || self.draft().is_some()
    }
}

/// Drag bookkeeping shared by every component. Only one component claims a drag.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct DragState {
    pub claimed: bool,
    /// Naked handle under the pointer when the drag was claimed.
    pub handle: Option<HandleId>,
}

/// What the canvas has to do after an event was applied to the state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Effects {
    pub render: bool,
    /// The canvas grew to this size.
    pub resized: Option<UVec2>,
    /// The host should scroll this rectangle into view.
    pub scroll_to: Option<Rect>,
}

impl Effects {
    fn render() -> Self {
        Self {
            render: true,
            ..Self::default()
        }
    }
}

impl CanvasState {
    pub(crate) fn handle_pointer(&mut self, event: &PointerEvent) -> Effects {
        match *event {
            PointerEvent::Pressed { position, button } => self.on_pressed(position, button),
            PointerEvent::Released { .. } => self.on_released(),
            PointerEvent::Clicked {
                position,
                button,
                modifiers,
                time_ms,
            } => self.on_clicked(position, button, modifiers, time_ms),
            PointerEvent::Moved { position } => self.on_moved(position),
            PointerEvent::Dragged { position } => self.on_dragged(position),
            PointerEvent::Entered { position } => self.on_entered(position),
            PointerEvent::Exited { .. } => {
                self.palette = None;
                Effects::default()
            }
        }
    }

    /// Selects the palette entry new modules are instantiated from.
    pub(crate) fn select_palette(
        &mut self,
        factory: Option<Box<dyn ModuleFactory>>,
    ) -> Result<(), CanvasError> {
        let mode = self.mode();
        if mode.is_simulating() {
            return Err(CanvasError::PaletteUnavailable(mode));
        }
        self.abandon_draft();
        if let Interaction::Edit { placement } = &mut self.interaction {
            *placement = None;
        }
        self.palette = factory;
        Ok(())
    }

    fn on_pressed(&mut self, position: Vec2, button: PointerButton) -> Effects {
        if button != PointerButton::Primary || self.mode() != Mode::Edit {
            return Effects::default();
        }
        if let Some(handle) = self.handles.hit_test(position) {
            self.handles.set_flags(handle, VisualFlags::SELECTED);
        }
        if let Some(record) = self
            .scene
            .module_at(position)
            .and_then(|id| self.scene.module_mut(id))
        {
            record.flags = VisualFlags::SELECTED;
        }
        Effects::render()
    }

    fn on_released(&mut self) -> Effects {
        self.drag.claimed = false;
        if let Some(handle) = self.drag.handle.take() {
            self.handles.try_merge(handle);
        }
        self.clear_flags();
        self.scene.invalidate_extent();
        Effects::render()
    }

    fn on_clicked(
        &mut self,
        position: Vec2,
        button: PointerButton,
        modifiers: ModifiersState,
        time_ms: u64,
    ) -> Effects {
        self.drag.claimed = false;
        match button {
            PointerButton::Secondary => self.on_cancel_click(),
            PointerButton::Middle => self.on_pick_up_click(position),
            PointerButton::Primary => {
                if self.clicks.register(position, time_ms) {
                    self.on_double_click(position)
                } else {
                    self.on_single_click(position, modifiers)
                }
            }
        }
    }

    fn on_cancel_click(&mut self) -> Effects {
        match self.mode() {
            Mode::WireCreation => {
                self.abandon_draft();
                Effects::render()
            }
            Mode::Edit => {
                if let Interaction::Edit { placement } = &mut self.interaction {
                    if placement.take().is_some() {
                        tracing::debug!(canvas = %self.name, "Placement cancelled");
                    }
                }
                self.palette = None;
                Effects::render()
            }
            Mode::Simulation | Mode::Paused => Effects::default(),
        }
    }

    /// Middle click picks a module up so it follows drags without a press on it.
    fn on_pick_up_click(&mut self, position: Vec2) -> Effects {
        let hit = self.scene.module_at(position);
        match self.mode() {
            Mode::Edit => {
                for record in self.scene.modules_mut() {
                    record.flags = if Some(record.id) != hit {
                        VisualFlags::empty()
                    } else if record.flags.contains(VisualFlags::MOVING) {
                        VisualFlags::empty()
                    } else {
                        VisualFlags::MOVING
                    };
                }
                Effects::render()
            }
            Mode::WireCreation => {
                if let Some(id) = hit {
                    self.abandon_draft();
                    if let Some(record) = self.scene.module_mut(id) {
                        record.flags = VisualFlags::MOVING;
                    }
                }
                Effects::render()
            }
            Mode::Simulation | Mode::Paused => Effects::default(),
        }
    }

    fn on_double_click(&mut self, position: Vec2) -> Effects {
        if self.mode() == Mode::WireCreation {
            self.abandon_draft();
            if let Some(id) = self.scene.module_at(position) {
                self.scene.show_module_inspector(id);
            }
            return Effects::render();
        }

        self.scene.clear_flags();
        if let Some(id) = self.scene.module_at(position) {
            self.scene.show_module_inspector(id);
        } else if let Some(id) = self.scene.wire_at(position, &self.handles) {
            self.scene.show_wire_inspector(id);
        }
        Effects::render()
    }

    fn on_single_click(&mut self, position: Vec2, modifiers: ModifiersState) -> Effects {
        match self.mode() {
            Mode::WireCreation => self.click_while_routing(position),
            Mode::Edit => self.click_while_editing(position, modifiers),
            Mode::Simulation | Mode::Paused => Effects::default(),
        }
    }

    fn click_while_routing(&mut self, position: Vec2) -> Effects {
        let Some(origin) = self.interaction.draft().map(|draft| draft.origin) else {
            return Effects::default();
        };

        match self.scene.module_at(position) {
            Some(target) if target != origin => {
                if let Err(error) = self.commit_wire(target) {
                    tracing::warn!(canvas = %self.name, %error, "Wire commit failed");
                    self.discard_draft_handles();
                    self.scene.clear_flags();
                }
            }
            Some(_) => {
                self.abandon_draft();
            }
            None => {
                let owner = HandleOwner::Wire(WireRef::Draft);
                self.handles
                    .create(owner, position, HandleKind::Naked, Some(WireRef::Draft));
                self.scene.invalidate_extent();
            }
        }
        Effects::render()
    }

    /// Connects the draft's origin to `target` and commits the wire.
    fn commit_wire(&mut self, target: ModuleId) -> Result<WireId, CanvasError> {
        let Some(draft) = self.take_draft() else {
            return Err(CanvasError::InvalidTransition {
                from: self.mode(),
                to: Mode::Edit,
            });
        };

        let origin_port = self.scene.add_port(draft.origin, DEFAULT_PORT_NAME, 0)?;
        let target_port = self.scene.add_port(target, DEFAULT_PORT_NAME, 0)?;
        let anchor = self.scene.lookup_visual_for(target)?.position();

        let id = self
            .scene
            .add_wire(Wire::new(vec![origin_port, target_port]), draft.visual)?;
        self.handles.create(
            HandleOwner::Module(target),
            anchor,
            HandleKind::Port,
            Some(WireRef::Draft),
        );
        self.handles
            .rebind_wire(WireRef::Draft, WireRef::Committed(id));

        if let Some(record) = self.scene.wire_mut(id) {
            record.attach_inspector();
            self.graph.add_wire(id, &record.wire);
        }
        self.scene.clear_flags();
        tracing::debug!(canvas = %self.name, wire = ?id, from = ?draft.origin, to = ?target, "Wire committed");
        Ok(id)
    }

    fn click_while_editing(&mut self, position: Vec2, modifiers: ModifiersState) -> Effects {
        if modifiers.shift {
            if self.interaction.placement().is_none() {
                self.instantiate_placement(position);
            }
        } else {
            self.palette = None;
        }

        let pending = match &mut self.interaction {
            Interaction::Edit { placement } => placement.take(),
            _ => None,
        };
        if let Some(placement) = pending {
            self.commit_placement(placement);
        } else if let Some(hit) = self.scene.module_at(position) {
            self.begin_wire(hit, position);
        } else {
            self.scene.clear_flags();
        }
        Effects::render()
    }

    fn commit_placement(&mut self, placement: Placement) {
        let sequence = u32::try_from(self.scene.module_count()).unwrap_or(u32::MAX - 1) + 1;
        let id = self
            .scene
            .add_module(sequence, placement.module, placement.visual);
        if let Some(record) = self.scene.module_mut(id) {
            record.attach_inspector();
            self.graph.add_module(id, record.module.as_ref());
            tracing::debug!(canvas = %self.name, module = %record.module.name(), sequence, "Module placed");
        }
        self.scene.clear_flags();
    }

    fn begin_wire(&mut self, origin: ModuleId, cursor: Vec2) {
        let Ok(anchor) = self.scene.lookup_visual_for(origin).map(|v| v.position()) else {
            return;
        };
        self.scene.clear_flags();
        if let Some(record) = self.scene.module_mut(origin) {
            record.flags = VisualFlags::SELECTED;
        }

        self.handles.create(
            HandleOwner::Module(origin),
            anchor,
            HandleKind::Port,
            Some(WireRef::Draft),
        );
        let visual = self.wire_factory.create_wire_visual();
        self.set_interaction(Interaction::WireCreation(WireDraft {
            origin,
            visual,
            cursor,
        }));
    }

    /// Instantiates the palette selection as the pending placement. Edit mode only.
    fn instantiate_placement(&mut self, position: Vec2) -> bool {
        let Interaction::Edit { placement } = &mut self.interaction else {
            return false;
        };
        let Some(factory) = self.palette.as_ref() else {
            return false;
        };
        match factory.instantiate() {
            Ok((module, mut visual)) => {
                visual.set_position(position);
                *placement = Some(Placement { module, visual });
                true
            }
            Err(error) => {
                tracing::error!(canvas = %self.name, palette = %factory.name(), error = %error, "Failed to instantiate module");
                false
            }
        }
    }

    fn on_moved(&mut self, position: Vec2) -> Effects {
        match &mut self.interaction {
            Interaction::WireCreation(draft) => {
                draft.cursor = position;
                for record in self.scene.modules_mut() {
                    record.flags = if record.visual.contains(position) {
                        VisualFlags::SELECTED
                    } else {
                        VisualFlags::empty()
                    };
                }
                Effects::render()
            }
            Interaction::Edit {
                placement: Some(placement),
            } => {
                placement.visual.set_position(position);
                Effects::render()
            }
            _ => Effects::default(),
        }
    }

    fn on_entered(&mut self, position: Vec2) -> Effects {
        if self.interaction.placement().is_some() {
            return Effects::default();
        }
        Effects {
            render: self.instantiate_placement(position),
            ..Effects::default()
        }
    }

    fn on_dragged(&mut self, position: Vec2) -> Effects {
        let mode = self.mode();
        let margin = self.config.growth_margin;
        let mut effects = Effects::default();

        if !self.viewport.in_bounds(position, margin) {
            let growable = mode == Mode::Edit
                && position.x > 0.0
                && position.y > 0.0
                && self.drag_source_at(position);
            if !growable {
                return effects;
            }
            let size = self.viewport.grown_to_include(position, margin);
            if size != self.viewport.size {
                self.viewport.size = size;
                effects.resized = Some(size);
            }
        }

        if mode.is_authoring() {
            effects.scroll_to = Some(Rect::new(position, Vec2::splat(margin)));
        }

        if let Interaction::WireCreation(draft) = &mut self.interaction {
            draft.cursor = position;
            effects.render = true;
        } else if mode == Mode::Edit {
            self.drag_in_edit(position);
            effects.render = true;
        }
        effects
    }

    /// True if something under or attached to the pointer can be dragged.
    fn drag_source_at(&self, position: Vec2) -> bool {
        let radius = self.handles.radius();
        self.scene.modules().any(|record| {
            record.visual.contains(position) || record.flags.contains(VisualFlags::MOVING)
        }) || self.handles.iter().any(|handle| {
            handle.position.distance(position) <= radius
                || handle.flags.contains(VisualFlags::MOVING)
        })
    }

    /// Moves the dragged naked handle or module. Naked handles get first claim.
    fn drag_in_edit(&mut self, position: Vec2) {
        let radius = self.handles.radius();
        let naked: Vec<HandleId> = self
            .handles
            .iter()
            .filter(|handle| handle.is_naked())
            .map(|handle| handle.id)
            .collect();
        for id in naked {
            let Some(handle) = self.handles.get(id) else {
                continue;
            };
            let mut flags = handle.flags;
            if !self.drag.claimed && handle.position.distance(position) <= radius {
                if flags.contains(VisualFlags::SELECTED) {
                    flags = VisualFlags::MOVING;
                    self.handles.set_flags(id, flags);
                }
                self.drag.handle = Some(id);
                self.drag.claimed = true;
            }
            if flags.contains(VisualFlags::MOVING) {
                self.handles.move_handle(id, position);
            }
        }

        let modules: Vec<ModuleId> = self.scene.modules().map(|record| record.id).collect();
        for id in modules {
            let Some(record) = self.scene.module_mut(id) else {
                continue;
            };
            if !self.drag.claimed && record.visual.contains(position) {
                if record.flags.contains(VisualFlags::SELECTED) {
                    record.flags = VisualFlags::MOVING;
                }
                self.drag.claimed = true;
            }
            if record.flags.contains(VisualFlags::MOVING) {
                record.visual.set_position(position);
                let anchor = record.visual.position();
                self.handles.reposition(HandleOwner::Module(id), anchor);
            }
        }

        self.recompute_extent();
    }
}
