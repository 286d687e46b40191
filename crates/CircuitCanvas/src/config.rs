//! # Configuration
//!
//! This module defines the configuration struct for the Canvas.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CanvasError;

/// Who advances the simulation between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepDrive {
    /// A dedicated stepping thread paces frames on its own.
    #[default]
    Background,
    /// No thread is spawned; the host calls `Canvas::tick` once per frame.
    Host,
}

/// Configuration parameters for the Canvas.
///
/// These settings allow the host application to tune the stepping cadence and
/// the feel of the canvas interactions. Every field has a default, so a partial
/// JSON document is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Target frames per second of the stepping loop. Default: 80.
    pub fps: u32,
    /// Loop iterations per logical clock tick. Default: 3.
    pub step_ratio: u32,
    /// Consecutive skipped sleeps before the loop yields the processor. Default: 6.
    pub delay_skip_threshold: u32,
    /// Max time in ms between two clicks at the same pixel to register a double-click. Default: 300ms.
    pub double_click_ms: u64,
    /// Margin used when growing the canvas during a drag. Default: 30.0.
    pub growth_margin: f32,
    /// Padding added around the bounding extent of the scene. Default: 60.0.
    pub extent_margin: f32,
    /// Pick radius of a handle in pixels. Default: 5.0.
    pub handle_radius: f32,
    /// Whether the canvas owns its stepping thread.
    pub drive: StepDrive,
    /// Visual styling configuration.
    pub style: CanvasStyle,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            fps: 80,
            step_ratio: 3,
            delay_skip_threshold: 6,
            double_click_ms: 300,
            growth_margin: 30.0,
            extent_margin: 60.0,
            handle_radius: 5.0,
            drive: StepDrive::Background,
            style: CanvasStyle::default(),
        }
    }
}

impl CanvasConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self, CanvasError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.fps == 0 {
            return Err(CanvasError::Config("fps must be positive".into()));
        }
        if self.step_ratio == 0 {
            return Err(CanvasError::Config("stepRatio must be positive".into()));
        }
        Ok(())
    }

    /// Time budget of a single loop iteration (`1000 / fps` ms, integer division).
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

/// Visual styling configuration for the Canvas.
///
/// It uses `glam::Vec4` for RGBA colors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasStyle {
    /// Color used to clear the frame.
    pub background_color: glam::Vec4,
    /// Fill color of a port handle.
    pub port_handle_color: glam::Vec4,
    /// Fill color of a naked (routing) handle.
    pub naked_handle_color: glam::Vec4,
    /// Fill color of a selected or moving handle.
    pub active_handle_color: glam::Vec4,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background_color: glam::Vec4::new(1.0, 1.0, 1.0, 1.0),
            port_handle_color: glam::Vec4::new(0.2, 0.2, 0.8, 1.0),
            naked_handle_color: glam::Vec4::new(0.1, 0.1, 0.1, 1.0),
            active_handle_color: glam::Vec4::new(0.9, 0.2, 0.2, 1.0),
        }
    }
}
