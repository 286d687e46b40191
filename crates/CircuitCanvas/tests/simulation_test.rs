mod common;

use std::thread;
use std::time::Duration;

use circuit_canvas::clock::FixedStepClock;
use circuit_canvas::model::{Mode, WireRef};
use circuit_canvas::{CanvasError, PointerEvent, StepDrive, Transition};
use common::{BoxPalette, Counters, fixture, fixture_with_clock};
use glam::Vec2;

#[test]
fn test_nothing_pending_while_simulating() {
    let mut fx = fixture(StepDrive::Host);
    fx.canvas
        .select_module(BoxPalette::new(&fx.counters))
        .unwrap();
    fx.canvas.handle_pointer(PointerEvent::Entered {
        position: Vec2::new(50.0, 50.0),
    });
    fx.canvas
        .with_state(|state| assert!(state.interaction().has_pending()));

    assert_eq!(fx.canvas.start_simulation().unwrap(), Transition::Started);
    fx.canvas
        .with_state(|state| assert!(!state.interaction().has_pending()));

    assert_eq!(fx.canvas.pause_simulation().unwrap(), Transition::Paused);
    fx.canvas
        .with_state(|state| assert!(!state.interaction().has_pending()));
    assert!(matches!(
        fx.canvas.select_module(BoxPalette::new(&fx.counters)),
        Err(CanvasError::PaletteUnavailable(Mode::Paused))
    ));
}

#[test]
fn test_starting_during_wire_creation_drops_draft() {
    let mut fx = fixture(StepDrive::Host);
    fx.place(Vec2::new(100.0, 100.0));
    fx.click(Vec2::new(120.0, 120.0));
    fx.click(Vec2::new(400.0, 300.0));
    fx.canvas
        .with_state(|state| assert_eq!(state.handles().route(WireRef::Draft).len(), 2));

    assert_eq!(fx.canvas.start_simulation().unwrap(), Transition::Started);
    assert_eq!(fx.canvas.mode(), Mode::Simulation);
    fx.canvas.with_state(|state| {
        assert!(!state.handles().references(WireRef::Draft));
        assert!(state.handles().is_empty());
        assert!(state.interaction().draft().is_none());
    });
}

#[test]
fn test_rejected_transitions() {
    let mut fx = fixture(StepDrive::Host);

    assert!(matches!(
        fx.canvas.change_mode(Mode::WireCreation),
        Err(CanvasError::InvalidTransition {
            from: Mode::Edit,
            to: Mode::WireCreation
        })
    ));
    assert!(matches!(
        fx.canvas.change_mode(Mode::Paused),
        Err(CanvasError::InvalidTransition { .. })
    ));
    assert!(fx.canvas.resume_simulation().is_err());
    assert_eq!(fx.canvas.change_mode(Mode::Edit).unwrap(), Transition::Unchanged);
    assert_eq!(fx.canvas.mode(), Mode::Edit);
}

#[test]
fn test_mode_changes_reach_inspectors() {
    let mut fx = fixture(StepDrive::Host);
    fx.place(Vec2::new(100.0, 100.0));

    fx.canvas.start_simulation().unwrap();
    fx.canvas.pause_simulation().unwrap();
    assert_eq!(fx.canvas.stop_simulation().unwrap(), Transition::Stopped);

    assert_eq!(
        *fx.counters.inspector_modes.lock().unwrap(),
        vec![Mode::Simulation, Mode::Paused, Mode::Edit]
    );
    assert_eq!(Counters::get(&fx.counters.inits), 1);
    assert_eq!(Counters::get(&fx.counters.ends), 1);
}

#[test]
fn test_resume_keeps_simulation_time() {
    let mut fx = fixture(StepDrive::Host);
    fx.canvas.start_simulation().unwrap();
    for _ in 0..6 {
        fx.canvas.tick();
    }
    fx.canvas.pause_simulation().unwrap();
    assert_eq!(fx.canvas.with_state(|state| state.elapsed_time()), 2);

    let idle = fx.canvas.tick();
    assert!(!idle.stepped);

    assert_eq!(fx.canvas.resume_simulation().unwrap(), Transition::Resumed);
    assert_eq!(Counters::get(&fx.counters.inits), 1);
    fx.canvas.tick();
    assert_eq!(fx.canvas.with_state(|state| state.elapsed_time()), 3);

    fx.canvas.stop_simulation().unwrap();
    fx.canvas.start_simulation().unwrap();
    assert_eq!(fx.canvas.with_state(|state| state.elapsed_time()), 0);
    assert_eq!(Counters::get(&fx.counters.inits), 2);
}

#[test]
fn test_sub_step_cadence() {
    let mut fx = fixture(StepDrive::Host);
    let (a, b) = (Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0));
    fx.place(a);
    fx.place(b);
    fx.connect(a, b);
    let before_modules = Counters::get(&fx.counters.module_steps);
    let before_wires = Counters::get(&fx.counters.wire_steps);

    fx.canvas.start_simulation().unwrap();
    assert_eq!(Counters::get(&fx.counters.wire_refreshes), 1);
    let reports: Vec<_> = (0..9).map(|_| fx.canvas.tick()).collect();

    assert!(reports.iter().all(|r| r.stepped));
    let elapsed: Vec<u64> = reports.iter().filter_map(|r| r.elapsed).collect();
    assert_eq!(elapsed, vec![1, 2, 3]);
    assert_eq!(Counters::get(&fx.counters.graph_steps), 3);
    assert_eq!(*fx.display.times.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(Counters::get(&fx.counters.module_steps) - before_modules, 6);
    assert_eq!(Counters::get(&fx.counters.wire_steps) - before_wires, 9);
}

#[test]
fn test_divided_clock_holds_cadence() {
    let mut fx = fixture_with_clock(StepDrive::Host, FixedStepClock::new(1, 2));
    fx.place(Vec2::new(100.0, 100.0));
    let before_modules = Counters::get(&fx.counters.module_steps);

    fx.canvas.start_simulation().unwrap();
    let generation = fx.canvas.frame_generation();
    let reports: Vec<_> = (0..12).map(|_| fx.canvas.tick()).collect();

    let stepped: Vec<bool> = reports.iter().map(|r| r.stepped).collect();
    assert_eq!(stepped, [false, true].repeat(6));
    let elapsed: Vec<u64> = reports.iter().filter_map(|r| r.elapsed).collect();
    assert_eq!(elapsed, vec![1, 2]);
    assert_eq!(Counters::get(&fx.counters.graph_steps), 2);
    assert_eq!(Counters::get(&fx.counters.module_steps) - before_modules, 2);
    assert_eq!(fx.canvas.frame_generation() - generation, 6);
}

#[test]
fn test_edit_during_wire_creation_abandons_draft() {
    let mut fx = fixture(StepDrive::Host);
    fx.place(Vec2::new(100.0, 100.0));
    fx.click(Vec2::new(120.0, 120.0));
    fx.click(Vec2::new(400.0, 300.0));
    assert_eq!(fx.canvas.mode(), Mode::WireCreation);

    assert_eq!(
        fx.canvas.change_mode(Mode::Edit).unwrap(),
        Transition::DraftAbandoned
    );
    assert_eq!(fx.canvas.mode(), Mode::Edit);
    fx.canvas.with_state(|state| {
        assert!(state.handles().is_empty());
        assert!(state.interaction().draft().is_none());
        assert_eq!(state.scene().wire_count(), 0);
    });
}

#[test]
fn test_reset_rewinds_clock() {
    let mut fx = fixture(StepDrive::Host);
    fx.canvas.start_simulation().unwrap();
    for _ in 0..4 {
        fx.canvas.tick();
    }
    fx.canvas.reset();

    assert_eq!(fx.canvas.mode(), Mode::Simulation);
    assert_eq!(fx.canvas.with_state(|state| state.elapsed_time()), 0);
    assert_eq!(Counters::get(&fx.counters.ends), 1);
    assert_eq!(Counters::get(&fx.counters.inits), 2);
    assert_eq!(fx.display.times.lock().unwrap().last(), Some(&0));
}

#[test]
fn test_stop_renders_once_on_caller_thread() {
    let mut fx = fixture(StepDrive::Background);
    fx.place(Vec2::new(100.0, 100.0));

    fx.canvas.start_simulation().unwrap();
    assert!(fx.canvas.is_stepping());
    thread::sleep(Duration::from_millis(200));
    assert!(Counters::get(&fx.counters.graph_steps) > 0);

    fx.display.repaints.lock().unwrap().clear();
    assert_eq!(fx.canvas.stop_simulation().unwrap(), Transition::Stopped);
    assert!(!fx.canvas.is_stepping());

    let me = thread::current().id();
    let repaints = fx.display.repaints.lock().unwrap().clone();
    assert_eq!(fx.display.repaints_from_current_thread(), 1);
    assert_eq!(repaints.last().map(|(id, _)| *id), Some(me));
    assert_eq!(Counters::get(&fx.counters.ends), 1);

    let generation = fx.canvas.frame_generation();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(fx.canvas.frame_generation(), generation);
}

#[test]
fn test_pause_stops_the_loop() {
    let mut fx = fixture(StepDrive::Background);
    fx.canvas.start_simulation().unwrap();
    thread::sleep(Duration::from_millis(50));
    fx.canvas.pause_simulation().unwrap();
    assert!(!fx.canvas.is_stepping());

    let steps = Counters::get(&fx.counters.graph_steps);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(Counters::get(&fx.counters.graph_steps), steps);

    fx.canvas.resume_simulation().unwrap();
    assert!(fx.canvas.is_stepping());
    fx.canvas.stop_simulation().unwrap();
    assert!(!fx.canvas.is_stepping());
}

#[test]
fn test_continuous_render_outlives_simulation() {
    let mut fx = fixture(StepDrive::Background);
    fx.place(Vec2::new(100.0, 100.0));

    fx.canvas.set_continuous_render(true).unwrap();
    assert!(fx.canvas.is_stepping());
    let generation = fx.canvas.frame_generation();
    thread::sleep(Duration::from_millis(100));
    assert!(fx.canvas.frame_generation() > generation);
    assert_eq!(Counters::get(&fx.counters.graph_steps), 0);

    fx.canvas.start_simulation().unwrap();
    fx.canvas.stop_simulation().unwrap();
    assert!(fx.canvas.is_stepping(), "continuous render keeps the loop alive");

    fx.canvas.set_continuous_render(false).unwrap();
    assert!(!fx.canvas.is_stepping());
}

#[test]
fn test_continuous_off_keeps_simulation_stepping() {
    let mut fx = fixture(StepDrive::Background);
    fx.place(Vec2::new(100.0, 100.0));
    fx.canvas.start_simulation().unwrap();

    fx.canvas.set_continuous_render(true).unwrap();
    fx.canvas.set_continuous_render(false).unwrap();
    assert!(fx.canvas.is_stepping(), "simulation relaunches a plain loop");

    let steps = Counters::get(&fx.counters.graph_steps);
    thread::sleep(Duration::from_millis(200));
    assert!(Counters::get(&fx.counters.graph_steps) > steps);

    fx.canvas.stop_simulation().unwrap();
    assert!(!fx.canvas.is_stepping());
}

#[test]
fn test_dropping_canvas_joins_loop() {
    let mut fx = fixture(StepDrive::Background);
    fx.canvas.start_simulation().unwrap();
    thread::sleep(Duration::from_millis(30));
    let counters = fx.counters.clone();
    drop(fx);

    let steps = Counters::get(&counters.graph_steps);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(Counters::get(&counters.graph_steps), steps);
}
