//! # Core Data Models
//!
//! Identifiers, the editor mode, and the plain records shared by the scene
//! store and the handle manager. Entities live in flat arenas (`SlotMap`) and
//! refer to each other by key, never by pointer.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

pub use uuid::Uuid;

new_key_type! {
    /// Unique identifier for a placed Module.
    pub struct ModuleId;
    /// Unique identifier for a Port.
    pub struct PortId;
    /// Unique identifier for a committed Wire.
    pub struct WireId;
    /// Unique identifier for a Handle.
    pub struct HandleId;
}

/// The editor mode. Exactly one is active at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Placing, selecting and moving modules.
    #[default]
    Edit,
    /// A wire is being routed from an origin module.
    WireCreation,
    /// The stepping loop is advancing simulation time.
    Simulation,
    /// Simulation time is retained but not advancing.
    Paused,
}

impl Mode {
    /// Modes in which handles are drawn and can be picked.
    pub fn is_authoring(self) -> bool {
        matches!(self, Mode::Edit | Mode::WireCreation)
    }

    pub fn is_simulating(self) -> bool {
        matches!(self, Mode::Simulation | Mode::Paused)
    }
}

bitflags! {
    /// Transient visual states of a module or handle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VisualFlags: u8 {
        /// Picked by the pointer.
        const SELECTED = 1 << 0;
        /// Following the pointer during a drag.
        const MOVING = 1 << 1;
    }
}

impl Serialize for VisualFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for VisualFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// A named attachment point on exactly one module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Self-reference ID.
    pub id: PortId,
    /// ID of the Module this port belongs to.
    pub module: ModuleId,
    pub name: String,
}

/// An ordered connection between two or more ports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// Member ports, origin first.
    pub ports: Vec<PortId>,
}

impl Wire {
    pub fn new(ports: Vec<PortId>) -> Self {
        Self { ports }
    }
}

/// The wire a handle is routed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireRef {
    /// The wire-in-progress of WireCreation mode.
    Draft,
    Committed(WireId),
}

/// The visual a handle belongs to. Handles owned by a module follow it when it moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleOwner {
    Module(ModuleId),
    Wire(WireRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Bound to a module port.
    Port,
    /// A free routing point.
    Naked,
}
