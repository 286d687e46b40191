use std::sync::Arc;

use circuit_canvas::math::Rect;
use circuit_canvas::model::{Mode, ModuleId, VisualFlags, Wire, WireId};
use circuit_canvas::render::{DrawCommand, RenderList};
use circuit_canvas::traits::{
    DisplaySink, Inspector, Module, ModuleFactory, ModuleVisual, SimulationGraph, WireFactory,
    WireVisual,
};
use circuit_canvas::{Canvas, CanvasConfig, ModifiersState, PointerButton, PointerEvent, StepDrive};
use glam::{UVec2, Vec2, Vec4};

struct Router {
    name: String,
}

impl Module for Router {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_sequence_number(&mut self, sequence: u32) {
        self.name = format!("router-{sequence}");
    }
}

struct RouterVisual {
    position: Vec2,
}

impl ModuleVisual for RouterVisual {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn contains(&self, point: Vec2) -> bool {
        Rect::new(self.position, Vec2::splat(48.0)).contains(point)
    }

    fn render(&self, flags: VisualFlags, out: &mut RenderList) {
        let color = if flags.is_empty() {
            Vec4::new(0.3, 0.3, 0.3, 1.0)
        } else {
            Vec4::new(0.9, 0.6, 0.1, 1.0)
        };
        out.push(DrawCommand::Rect {
            pos: self.position,
            size: Vec2::splat(48.0),
            color,
            stroke_width: 1.0,
            stroke_color: Some(Vec4::ONE),
        });
    }

    fn create_inspector(&self, module: &dyn Module) -> Box<dyn Inspector> {
        Box::new(PrintInspector(module.name().to_owned()))
    }
}

struct PrintInspector(String);

impl Inspector for PrintInspector {
    fn make_visible(&mut self) {
        println!("  [inspector] {} opened", self.0);
    }

    fn update_property_page_state(&mut self, mode: Mode) {
        println!("  [inspector] {} now in {:?}", self.0, mode);
    }
}

struct Cable;

impl WireVisual for Cable {
    fn contains(&self, route: &[Vec2], point: Vec2) -> bool {
        route.iter().any(|p| p.distance(point) < 4.0)
    }

    fn render(&self, route: &[Vec2], out: &mut RenderList) {
        out.push(DrawCommand::Polyline {
            points: route.to_vec(),
            color: Vec4::new(0.1, 0.4, 0.9, 1.0),
            width: 2.0,
        });
    }

    fn render_preview(&self, route: &[Vec2], cursor: Vec2, out: &mut RenderList) {
        if let Some(last) = route.last() {
            out.push(DrawCommand::Line {
                start: *last,
                end: cursor,
                color: Vec4::new(0.1, 0.4, 0.9, 0.5),
                width: 1.0,
            });
        }
    }

    fn create_inspector(&self, _wire: &Wire) -> Box<dyn Inspector> {
        Box::new(PrintInspector("cable".into()))
    }
}

struct Cables;

impl WireFactory for Cables {
    fn create_wire_visual(&self) -> Box<dyn WireVisual> {
        Box::new(Cable)
    }
}

struct Routers;

impl ModuleFactory for Routers {
    fn name(&self) -> &str {
        "router"
    }

    fn instantiate(&self) -> anyhow::Result<(Box<dyn Module>, Box<dyn ModuleVisual>)> {
        Ok((
            Box::new(Router {
                name: "router".into(),
            }),
            Box::new(RouterVisual {
                position: Vec2::ZERO,
            }),
        ))
    }
}

#[derive(Default)]
struct Network {
    modules: usize,
    wires: usize,
}

impl SimulationGraph for Network {
    fn add_module(&mut self, _id: ModuleId, module: &dyn Module) {
        self.modules += 1;
        println!("  [graph] added {}", module.name());
    }

    fn add_wire(&mut self, _id: WireId, wire: &Wire) {
        self.wires += 1;
        println!("  [graph] wired {} ports", wire.ports.len());
    }

    fn init_simulation(&mut self) {
        println!(
            "  [graph] init with {} modules and {} wires",
            self.modules, self.wires
        );
    }

    fn end_simulation(&mut self) {
        println!("  [graph] end");
    }

    fn step_simulation(&mut self, time: u64) {
        println!("  [graph] step t={time}");
    }
}

struct Console;

impl DisplaySink for Console {
    fn show_elapsed_time(&self, time: u64) {
        println!("  [display] elapsed {time}");
    }

    fn canvas_resized(&self, size: UVec2) {
        println!("  [display] resized to {size}");
    }
}

fn click(position: Vec2, shift: bool, time_ms: u64) -> PointerEvent {
    PointerEvent::Clicked {
        position,
        button: PointerButton::Primary,
        modifiers: ModifiersState {
            shift,
            ..Default::default()
        },
        time_ms,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== CircuitCanvas Headless Demo ===");

    let config = CanvasConfig {
        drive: StepDrive::Host,
        ..CanvasConfig::default()
    };
    let mut canvas = Canvas::builder("demo")
        .with_config(config)
        .with_size(UVec2::new(1280, 720))
        .with_graph(Network::default())
        .with_wire_factory(Cables)
        .with_display(Arc::new(Console))
        .build()?;

    println!("\n>> Placing two routers...");
    canvas.select_module(Routers)?;
    canvas.handle_pointer(click(Vec2::new(100.0, 100.0), true, 0));
    canvas.handle_pointer(click(Vec2::new(400.0, 200.0), true, 1_000));

    println!("\n>> Wiring them through a bend...");
    canvas.handle_pointer(click(Vec2::new(110.0, 110.0), false, 2_000));
    canvas.handle_pointer(click(Vec2::new(250.0, 110.0), false, 3_000));
    canvas.handle_pointer(click(Vec2::new(410.0, 210.0), false, 4_000));

    canvas.render();
    if let Some(frame) = canvas.frame_snapshot() {
        println!("  Frame {} with {} commands", frame.size, frame.commands.len());
    }

    println!("\n>> Simulating...");
    canvas.start_simulation()?;
    for _ in 0..6 {
        canvas.tick();
    }
    canvas.pause_simulation()?;
    canvas.resume_simulation()?;
    canvas.tick();
    canvas.stop_simulation()?;

    println!("\nDemo Complete.");
    Ok(())
}
