//! # Handle Manager
//!
//! Handles are the draggable anchors of a wire: port handles sit on a module
//! port, naked handles are free routing points. Each wire's route is the ordered
//! list of its handles; the wire visual is drawn through their positions.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::model::{HandleId, HandleKind, HandleOwner, VisualFlags, WireRef};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Handle {
    /// Self-reference ID.
    pub id: HandleId,
    pub owner: HandleOwner,
    /// The wire whose route this handle belongs to, if any.
    pub wire: Option<WireRef>,
    pub kind: HandleKind,
    pub position: Vec2,
    pub flags: VisualFlags,
}

impl Handle {
    pub fn is_naked(&self) -> bool {
        self.kind == HandleKind::Naked
    }
}

#[derive(Debug)]
pub struct HandleManager {
    handles: SlotMap<HandleId, Handle>,
    /// Creation order, used for hit-testing and drawing.
    order: Vec<HandleId>,
    routes: HashMap<WireRef, Vec<HandleId>>,
    radius: f32,
}

impl Default for HandleManager {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl HandleManager {
    pub fn new(radius: f32) -> Self {
        Self {
            handles: SlotMap::with_key(),
            order: Vec::new(),
            routes: HashMap::new(),
            radius,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Allocates a handle. A handle on a wire is appended to that wire's route.
    pub fn create(
        &mut self,
        owner: HandleOwner,
        position: Vec2,
        kind: HandleKind,
        wire: Option<WireRef>,
    ) -> HandleId {
        let id = self.handles.insert_with_key(|id| Handle {
            id,
            owner,
            wire,
            kind,
            position,
            flags: VisualFlags::empty(),
        });
        self.order.push(id);
        if let Some(wire) = wire {
            self.routes.entry(wire).or_default().push(id);
        }
        id
    }

    pub fn get(&self, id: HandleId) -> Option<&Handle> {
        self.handles.get(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Handle> {
        self.order.iter().filter_map(|id| self.handles.get(*id))
    }

    pub fn remove(&mut self, id: HandleId) -> Option<Handle> {
        let handle = self.handles.remove(id)?;
        self.order.retain(|h| *h != id);
        if let Some(wire) = handle.wire {
            if let Some(route) = self.routes.get_mut(&wire) {
                route.retain(|h| *h != id);
                if route.is_empty() {
                    self.routes.remove(&wire);
                }
            }
        }
        Some(handle)
    }

    fn remove_where(&mut self, pred: impl Fn(&Handle) -> bool) -> usize {
        let doomed: Vec<HandleId> = self.iter().filter(|h| pred(h)).map(|h| h.id).collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Removes every handle owned by `owner`. Returns how many were removed.
    pub fn remove_all_owned_by(&mut self, owner: HandleOwner) -> usize {
        self.remove_where(|h| h.owner == owner)
    }

    /// Removes every handle routed on `wire`, whoever owns it.
    pub fn remove_all_on_wire(&mut self, wire: WireRef) -> usize {
        self.remove_where(|h| h.wire == Some(wire))
    }

    /// Moves every handle owned by `owner` to `location`.
    pub fn reposition(&mut self, owner: HandleOwner, location: Vec2) -> usize {
        let mut moved = 0;
        for handle in self.handles.values_mut().filter(|h| h.owner == owner) {
            handle.position = location;
            moved += 1;
        }
        moved
    }

    pub fn move_handle(&mut self, id: HandleId, position: Vec2) {
        if let Some(handle) = self.handles.get_mut(id) {
            handle.position = position;
        }
    }

    /// First handle, in creation order, whose pick circle contains `point`.
    pub fn hit_test(&self, point: Vec2) -> Option<HandleId> {
        self.iter()
            .find(|h| h.position.distance(point) <= self.radius)
            .map(|h| h.id)
    }

    pub fn route(&self, wire: WireRef) -> &[HandleId] {
        self.routes.get(&wire).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn route_positions(&self, wire: WireRef) -> Vec<Vec2> {
        self.route(wire)
            .iter()
            .filter_map(|id| self.handles.get(*id))
            .map(|h| h.position)
            .collect()
    }

    /// True when `a` and `b` are neighbours in `wire`'s route.
    pub fn are_adjacent(&self, wire: WireRef, a: HandleId, b: HandleId) -> bool {
        self.route(wire)
            .windows(2)
            .any(|pair| (pair[0] == a && pair[1] == b) || (pair[0] == b && pair[1] == a))
    }

    /// Moves every handle and route entry of `from` over to `to`.
    pub fn rebind_wire(&mut self, from: WireRef, to: WireRef) {
        for handle in self.handles.values_mut() {
            if handle.wire == Some(from) {
                handle.wire = Some(to);
            }
            if handle.owner == HandleOwner::Wire(from) {
                handle.owner = HandleOwner::Wire(to);
            }
        }
        if let Some(route) = self.routes.remove(&from) {
            self.routes.entry(to).or_default().extend(route);
        }
    }

    /// True if any handle still belongs to `wire`.
    pub fn references(&self, wire: WireRef) -> bool {
        self.handles
            .values()
            .any(|h| h.wire == Some(wire) || h.owner == HandleOwner::Wire(wire))
    }

    pub fn set_flags(&mut self, id: HandleId, flags: VisualFlags) {
        if let Some(handle) = self.handles.get_mut(id) {
            handle.flags = flags;
        }
    }

    pub fn clear_flags(&mut self) {
        for handle in self.handles.values_mut() {
            handle.flags = VisualFlags::empty();
        }
    }

    /// Component-wise maximum over all handle positions.
    pub fn max_position(&self) -> Option<Vec2> {
        self.handles.values().map(|h| h.position).reduce(Vec2::max)
    }

    /// Merges a dropped naked handle into a coincident neighbour on the same wire.
    ///
    /// The dropped handle and its route point are removed. At most one merge
    /// happens per call; a port handle or a handle with no candidate is left alone.
    pub fn try_merge(&mut self, id: HandleId) -> bool {
        let Some(handle) = self.handles.get(id) else {
            return false;
        };
        let Some(wire) = handle.wire.filter(|_| handle.is_naked()) else {
            return false;
        };
        let position = handle.position;

        let target = self.iter().find(|other| {
            other.id != id
                && other.wire == Some(wire)
                && other.position.distance(position) <= self.radius
                && self.are_adjacent(wire, id, other.id)
        });
        let Some(target) = target.map(|h| h.id) else {
            return false;
        };

        self.remove(id);
        tracing::debug!(merged = ?id, into = ?target, wire = ?wire, "Merged handle");
        true
    }
}
