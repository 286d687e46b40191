use glam::Vec2;

use crate::config::CanvasStyle;
use crate::handles::Handle;
use crate::interaction::{Interaction, WireDraft};
use crate::model::{HandleKind, VisualFlags, WireRef};
use crate::render::{DrawCommand, RenderList};
use crate::state::CanvasState;

/// Converts the canvas state into draw commands.
///
/// Draw order is fixed, back to front:
/// 1. the pending placement (Edit) or the wire-in-progress (WireCreation)
/// 2. committed wires
/// 3. committed modules
/// 4. handles, only while authoring
pub struct Painter;

impl Painter {
    pub fn draw_scene(state: &CanvasState, out: &mut RenderList) {
        match &state.interaction {
            Interaction::Edit {
                placement: Some(placement),
            } => placement.visual.render(VisualFlags::empty(), out),
            Interaction::WireCreation(draft) => Self::draw_draft(state, draft, out),
            _ => {}
        }

        for record in state.scene.wires() {
            let route = state.handles.route_positions(WireRef::Committed(record.id));
            record.visual.render(&route, out);
        }

        for record in state.scene.modules() {
            record.visual.render(record.flags, out);
        }

        if state.mode().is_authoring() {
            let radius = state.handles.radius();
            for handle in state.handles.iter() {
                Self::draw_handle(&state.config.style, handle, radius, out);
            }
        }
    }

    fn draw_draft(state: &CanvasState, draft: &WireDraft, out: &mut RenderList) {
        if state.scene.lookup_visual_for(draft.origin).is_err() {
            tracing::warn!(canvas = %state.name, origin = ?draft.origin, "Skipping preview of wire without origin");
            return;
        }
        let route = state.handles.route_positions(WireRef::Draft);
        draft.visual.render_preview(&route, draft.cursor, out);
        draft.visual.render(&route, out);
    }

    fn draw_handle(style: &CanvasStyle, handle: &Handle, radius: f32, out: &mut RenderList) {
        let color = if handle.flags.is_empty() {
            match handle.kind {
                HandleKind::Port => style.port_handle_color,
                HandleKind::Naked => style.naked_handle_color,
            }
        } else {
            style.active_handle_color
        };
        out.push(DrawCommand::Rect {
            pos: handle.position - Vec2::splat(radius),
            size: Vec2::splat(radius * 2.0),
            color,
            stroke_width: 0.0,
            stroke_color: None,
        });
    }
}
