//! # Scene Store
//!
//! Owns the committed modules, their ports and the committed wires. Each
//! module is stored as one record pairing its execution side with its visual,
//! so a module can never be separated from the visual that draws it.
//!
//! Modules and wires are never removed individually, so arena iteration order is
//! insertion order and doubles as the draw order.

use std::collections::HashMap;

use glam::Vec2;
use slotmap::SlotMap;

use crate::error::SceneError;
use crate::handles::HandleManager;
use crate::math::Rect;
use crate::model::{Mode, ModuleId, Port, PortId, Uuid, VisualFlags, Wire, WireId, WireRef};
use crate::traits::{Inspector, Module, ModuleVisual, WireVisual};

/// A committed module: its execution side and its visual, stored together.
pub struct ModuleRecord {
    /// Self-reference ID.
    pub id: ModuleId,
    /// Stable identity, independent of arena keys.
    pub uuid: Uuid,
    /// 1-based order of commitment.
    pub sequence: u32,
    pub module: Box<dyn Module>,
    pub visual: Box<dyn ModuleVisual>,
    /// Property window, attached on commit.
    pub inspector: Option<Box<dyn Inspector>>,
    /// Ordered port list.
    pub ports: Vec<PortId>,
    /// Selection and movement state drawn by the visual.
    pub flags: VisualFlags,
}

impl ModuleRecord {
    pub fn attach_inspector(&mut self) {
        self.inspector = Some(self.visual.create_inspector(self.module.as_ref()));
    }
}

/// A committed wire. Its route lives in the handle manager under `WireRef::Committed(id)`.
pub struct WireRecord {
    /// Self-reference ID.
    pub id: WireId,
    /// Member ports, origin first.
    pub wire: Wire,
    pub visual: Box<dyn WireVisual>,
    /// Property window, attached on commit.
    pub inspector: Option<Box<dyn Inspector>>,
}

impl WireRecord {
    pub fn attach_inspector(&mut self) {
        self.inspector = Some(self.visual.create_inspector(&self.wire));
    }
}

#[derive(Default)]
pub struct Scene {
    modules: SlotMap<ModuleId, ModuleRecord>,
    ports: SlotMap<PortId, Port>,
    wires: SlotMap<WireId, WireRecord>,
    uuid_index: HashMap<Uuid, ModuleId>,
    /// Cached bounding extent; `None` once a mutation invalidated it.
    extent: Option<Rect>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits a module under `sequence` and returns its key.
    pub fn add_module(
        &mut self,
        sequence: u32,
        mut module: Box<dyn Module>,
        visual: Box<dyn ModuleVisual>,
    ) -> ModuleId {
        module.set_sequence_number(sequence);
        let uuid = Uuid::new_v4();
        let id = self.modules.insert_with_key(|id| ModuleRecord {
            id,
            uuid,
            sequence,
            module,
            visual,
            inspector: None,
            ports: Vec::new(),
            flags: VisualFlags::empty(),
        });
        self.uuid_index.insert(uuid, id);
        self.invalidate_extent();
        id
    }

    /// Creates a port on `module` at `index` of its port list (clamped to the list length).
    pub fn add_port(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        index: usize,
    ) -> Result<PortId, SceneError> {
        let record = self
            .modules
            .get_mut(module)
            .ok_or(SceneError::ModuleNotFound(module))?;
        let name = name.into();
        let id = self.ports.insert_with_key(|id| Port { id, module, name });
        let index = index.min(record.ports.len());
        record.ports.insert(index, id);
        record.module.attach_port(&self.ports[id], index);
        Ok(id)
    }

    pub fn add_wire(&mut self, wire: Wire, visual: Box<dyn WireVisual>) -> Result<WireId, SceneError> {
        if wire.ports.len() < 2 {
            return Err(SceneError::WireTooShort(wire.ports.len()));
        }
        if let Some(missing) = wire.ports.iter().find(|p| !self.ports.contains_key(**p)) {
            return Err(SceneError::PortNotFound(*missing));
        }
        let id = self.wires.insert_with_key(|id| WireRecord {
            id,
            wire,
            visual,
            inspector: None,
        });
        self.invalidate_extent();
        Ok(id)
    }

    pub fn lookup_visual_for(&self, module: ModuleId) -> Result<&dyn ModuleVisual, SceneError> {
        self.modules
            .get(module)
            .map(|record| record.visual.as_ref())
            .ok_or(SceneError::ModuleNotFound(module))
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.modules.get(id)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut ModuleRecord> {
        self.modules.get_mut(id)
    }

    pub fn module_by_uuid(&self, uuid: Uuid) -> Option<&ModuleRecord> {
        self.uuid_index.get(&uuid).and_then(|id| self.modules.get(*id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut ModuleRecord> {
        self.modules.values_mut()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    pub fn wire(&self, id: WireId) -> Option<&WireRecord> {
        self.wires.get(id)
    }

    pub fn wire_mut(&mut self, id: WireId) -> Option<&mut WireRecord> {
        self.wires.get_mut(id)
    }

    pub fn wires(&self) -> impl Iterator<Item = &WireRecord> {
        self.wires.values()
    }

    pub fn wires_mut(&mut self) -> impl Iterator<Item = &mut WireRecord> {
        self.wires.values_mut()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// First module whose visual contains `point`.
    pub fn module_at(&self, point: Vec2) -> Option<ModuleId> {
        self.modules
            .values()
            .find(|record| record.visual.contains(point))
            .map(|record| record.id)
    }

    /// First committed wire whose route passes through `point`.
    pub fn wire_at(&self, point: Vec2, handles: &HandleManager) -> Option<WireId> {
        self.wires
            .values()
            .find(|record| {
                let route = handles.route_positions(WireRef::Committed(record.id));
                record.visual.contains(&route, point)
            })
            .map(|record| record.id)
    }

    pub fn clear_flags(&mut self) {
        for record in self.modules.values_mut() {
            record.flags = VisualFlags::empty();
        }
    }

    /// Broadcasts `mode` to every attached inspector.
    pub fn update_inspectors(&mut self, mode: Mode) {
        for record in self.modules.values_mut() {
            match record.inspector.as_mut() {
                Some(inspector) => inspector.update_property_page_state(mode),
                None => missing_inspector("module", record.id),
            }
        }
    }

    pub fn show_module_inspector(&mut self, id: ModuleId) -> bool {
        let Some(record) = self.modules.get_mut(id) else {
            return false;
        };
        match record.inspector.as_mut() {
            Some(inspector) => inspector.make_visible(),
            None => missing_inspector("module", id),
        }
        true
    }

    pub fn show_wire_inspector(&mut self, id: WireId) -> bool {
        let Some(record) = self.wires.get_mut(id) else {
            return false;
        };
        match record.inspector.as_mut() {
            Some(inspector) => inspector.make_visible(),
            None => missing_inspector("wire", id),
        }
        true
    }

    /// Recomputes the extent from the origin to the furthest module or handle,
    /// padded by `margin`.
    pub fn recompute_bounding_extent(&mut self, handles: &HandleManager, margin: f32) -> Rect {
        let furthest = self
            .modules
            .values()
            .map(|record| record.visual.position())
            .chain(handles.max_position())
            .fold(Vec2::ZERO, Vec2::max);
        let extent = Rect::from_size(furthest + Vec2::splat(margin));
        self.extent = Some(extent);
        extent
    }

    /// The cached extent, if no mutation happened since it was computed.
    pub fn bounding_extent(&self) -> Option<Rect> {
        self.extent
    }

    pub fn invalidate_extent(&mut self) {
        self.extent = None;
    }
}

/// Every committed record gets an inspector on commit.
fn missing_inspector(kind: &str, id: impl std::fmt::Debug) {
    tracing::error!(kind, id = ?id, "Committed record has no inspector");
    debug_assert!(false, "committed {kind} without inspector");
}
