#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use circuit_canvas::clock::FixedStepClock;
use circuit_canvas::math::Rect;
use circuit_canvas::model::{Mode, ModuleId, Wire, WireId};
use circuit_canvas::render::{DrawCommand, RenderList};
use circuit_canvas::traits::{
    DisplaySink, Inspector, LogicalClock, Module, ModuleFactory, ModuleVisual, SimulationGraph, WireFactory,
    WireVisual,
};
use circuit_canvas::{Canvas, CanvasConfig, ModifiersState, PointerButton, PointerEvent, StepDrive};
use glam::{UVec2, Vec2, Vec4};

pub const MODULE_SIZE: f32 = 40.0;

/// Everything the stub collaborators observe.
#[derive(Default)]
pub struct Counters {
    pub graph_steps: AtomicUsize,
    pub inits: AtomicUsize,
    pub ends: AtomicUsize,
    pub module_steps: AtomicUsize,
    pub wire_steps: AtomicUsize,
    pub wire_refreshes: AtomicUsize,
    pub inspectors_shown: AtomicUsize,
    pub graph_modules: Mutex<Vec<ModuleId>>,
    pub graph_wires: Mutex<Vec<WireId>>,
    pub inspector_modes: Mutex<Vec<Mode>>,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct BoxModule {
    pub name: String,
    pub sequence: u32,
}

impl Module for BoxModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_sequence_number(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

/// A square module whose top-left corner is its position.
pub struct BoxVisual {
    pub name: String,
    pub position: Vec2,
    pub counters: Arc<Counters>,
}

impl ModuleVisual for BoxVisual {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn contains(&self, point: Vec2) -> bool {
        Rect::new(self.position, Vec2::splat(MODULE_SIZE)).contains(point)
    }

    fn render(&self, _flags: circuit_canvas::model::VisualFlags, out: &mut RenderList) {
        out.push(DrawCommand::Text {
            pos: self.position,
            text: self.name.clone(),
            color: Vec4::ONE,
            size: 12.0,
        });
    }

    fn step(&mut self, _mode: Mode) {
        self.counters.module_steps.fetch_add(1, Ordering::SeqCst);
    }

    fn create_inspector(&self, _module: &dyn Module) -> Box<dyn Inspector> {
        Box::new(CountingInspector {
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct CountingInspector {
    pub counters: Arc<Counters>,
}

impl Inspector for CountingInspector {
    fn make_visible(&mut self) {
        self.counters.inspectors_shown.fetch_add(1, Ordering::SeqCst);
    }

    fn update_property_page_state(&mut self, mode: Mode) {
        self.counters.inspector_modes.lock().unwrap().push(mode);
    }
}

pub struct LineWire {
    pub counters: Arc<Counters>,
}

impl WireVisual for LineWire {
    fn contains(&self, route: &[Vec2], point: Vec2) -> bool {
        route.windows(2).any(|seg| {
            let (a, b) = (seg[0], seg[1]);
            let ab = b - a;
            let t = ((point - a).dot(ab) / ab.length_squared().max(f32::EPSILON)).clamp(0.0, 1.0);
            (a + ab * t).distance(point) <= 3.0
        })
    }

    fn render(&self, route: &[Vec2], out: &mut RenderList) {
        out.push(DrawCommand::Polyline {
            points: route.to_vec(),
            color: Vec4::ONE,
            width: 1.0,
        });
    }

    fn render_preview(&self, route: &[Vec2], cursor: Vec2, out: &mut RenderList) {
        out.push(DrawCommand::Line {
            start: route.last().copied().unwrap_or(cursor),
            end: cursor,
            color: Vec4::ONE,
            width: 1.0,
        });
    }

    fn step(&mut self, _mode: Mode) {
        self.counters.wire_steps.fetch_add(1, Ordering::SeqCst);
    }

    fn refresh(&mut self) {
        self.counters.wire_refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn create_inspector(&self, _wire: &Wire) -> Box<dyn Inspector> {
        Box::new(CountingInspector {
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct LineWireFactory {
    pub counters: Arc<Counters>,
}

impl WireFactory for LineWireFactory {
    fn create_wire_visual(&self) -> Box<dyn WireVisual> {
        Box::new(LineWire {
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct RecordingGraph {
    pub counters: Arc<Counters>,
}

impl SimulationGraph for RecordingGraph {
    fn add_module(&mut self, id: ModuleId, _module: &dyn Module) {
        self.counters.graph_modules.lock().unwrap().push(id);
    }

    fn add_wire(&mut self, id: WireId, _wire: &Wire) {
        self.counters.graph_wires.lock().unwrap().push(id);
    }

    fn init_simulation(&mut self) {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn end_simulation(&mut self) {
        self.counters.ends.fetch_add(1, Ordering::SeqCst);
    }

    fn step_simulation(&mut self, _time: u64) {
        self.counters.graph_steps.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct BoxPalette {
    pub counters: Arc<Counters>,
    pub created: AtomicUsize,
}

impl BoxPalette {
    pub fn new(counters: &Arc<Counters>) -> Self {
        Self {
            counters: Arc::clone(counters),
            created: AtomicUsize::new(0),
        }
    }
}

impl ModuleFactory for BoxPalette {
    fn name(&self) -> &str {
        "box"
    }

    fn instantiate(&self) -> anyhow::Result<(Box<dyn Module>, Box<dyn ModuleVisual>)> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let name = format!("box-{n}");
        Ok((
            Box::new(BoxModule {
                name: name.clone(),
                sequence: 0,
            }),
            Box::new(BoxVisual {
                name,
                position: Vec2::ZERO,
                counters: Arc::clone(&self.counters),
            }),
        ))
    }
}

/// Records every display request together with the calling thread.
#[derive(Default)]
pub struct RecordingDisplay {
    pub repaints: Mutex<Vec<(ThreadId, Rect)>>,
    pub times: Mutex<Vec<u64>>,
    pub resizes: Mutex<Vec<UVec2>>,
    pub scrolls: Mutex<Vec<Rect>>,
}

impl RecordingDisplay {
    pub fn repaints_from_current_thread(&self) -> usize {
        let me = thread::current().id();
        self.repaints
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == me)
            .count()
    }
}

impl DisplaySink for RecordingDisplay {
    fn request_repaint(&self, region: Rect) {
        self.repaints
            .lock()
            .unwrap()
            .push((thread::current().id(), region));
    }

    fn show_elapsed_time(&self, time: u64) {
        self.times.lock().unwrap().push(time);
    }

    fn scroll_to_visible(&self, rect: Rect) {
        self.scrolls.lock().unwrap().push(rect);
    }

    fn canvas_resized(&self, size: UVec2) {
        self.resizes.lock().unwrap().push(size);
    }
}

pub struct Fixture {
    pub canvas: Canvas,
    pub counters: Arc<Counters>,
    pub display: Arc<RecordingDisplay>,
    /// Pointer clock; every click helper advances it well past the double-click window.
    pub now: u64,
}

pub fn fixture(drive: StepDrive) -> Fixture {
    fixture_with_clock(drive, FixedStepClock::default())
}

pub fn fixture_with_clock(drive: StepDrive, clock: impl LogicalClock + 'static) -> Fixture {
    let counters = Arc::new(Counters::default());
    let display = Arc::new(RecordingDisplay::default());
    let config = CanvasConfig {
        drive,
        ..CanvasConfig::default()
    };
    let canvas = Canvas::builder("test-canvas")
        .with_config(config)
        .with_size(UVec2::new(800, 600))
        .with_graph(RecordingGraph {
            counters: Arc::clone(&counters),
        })
        .with_wire_factory(LineWireFactory {
            counters: Arc::clone(&counters),
        })
        .with_clock(clock)
        .with_display(display.clone())
        .build()
        .expect("valid canvas");
    Fixture {
        canvas,
        counters,
        display,
        now: 0,
    }
}

pub fn clicked(position: Vec2, button: PointerButton, shift: bool, time_ms: u64) -> PointerEvent {
    PointerEvent::Clicked {
        position,
        button,
        modifiers: ModifiersState {
            shift,
            ..ModifiersState::default()
        },
        time_ms,
    }
}

impl Fixture {
    pub fn click(&mut self, position: Vec2) {
        self.now += 1_000;
        self.canvas
            .handle_pointer(clicked(position, PointerButton::Primary, false, self.now));
    }

    pub fn click_at_time(&mut self, position: Vec2, time_ms: u64) {
        self.canvas
            .handle_pointer(clicked(position, PointerButton::Primary, false, time_ms));
    }

    /// Places a module with its top-left corner at `position` using a shift-click.
    pub fn place(&mut self, position: Vec2) -> ModuleId {
        self.canvas
            .select_module(BoxPalette::new(&self.counters))
            .expect("palette available");
        self.now += 1_000;
        self.canvas
            .handle_pointer(clicked(position, PointerButton::Primary, true, self.now));
        self.canvas.with_state(|state| {
            state
                .scene()
                .module_at(position)
                .expect("module placed under the pointer")
        })
    }

    /// Connects two placed modules with a direct wire.
    pub fn connect(&mut self, from: Vec2, to: Vec2) {
        let inside = Vec2::splat(MODULE_SIZE / 2.0);
        self.click(from + inside);
        self.click(to + inside);
    }
}
