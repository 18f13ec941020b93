use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use canvas_map::galileo_types::cartesian::Size;
use canvas_map::headless::{
    DrawCommand, HeadlessCanvas, PixelBuffer, PixelContext, RecordingContext,
};
use canvas_map::overlay::{CENTER_PROP, RANGE_PROP};
use canvas_map::{
    ComposerConfig, FrameLayer, FrameScheduler, GeoCenter, MapComposer, MapComposerBuilder,
    MapSurface, MapSurfaceRequest, MarkerPainter, OverlayElement, OverlayNode, Palette,
    SimVarSource, SimVarStore,
};

#[derive(Debug, Clone, PartialEq)]
struct RenderedMap {
    config_folder: String,
    map_id: String,
    center: GeoCenter,
    range: f64,
}

#[derive(Default)]
struct FakeMap {
    renders: Vec<RenderedMap>,
}

impl MapSurface for FakeMap {
    fn render(&mut self, request: &MapSurfaceRequest<'_>) {
        self.renders.push(RenderedMap {
            config_folder: request.config_folder.to_owned(),
            map_id: request.map_id.to_owned(),
            center: request.center,
            range: request.range,
        });
    }
}

fn scenario_composer(scheduler: &FrameScheduler) -> MapComposer {
    MapComposer::builder("nd-map", "/cfg/bing", GeoCenter::new(47.0, 8.0))
        .with_painter(MarkerPainter::seeded(11))
        .build(scheduler)
}

#[test]
fn example_scenario() {
    let _ = env_logger::builder().is_test(true).try_init();

    let scheduler = FrameScheduler::new();
    let mut composer = scenario_composer(&scheduler);
    let (context, log) = RecordingContext::new();
    composer
        .surface_controller()
        .mount(HeadlessCanvas::new(300.0, 400.0), context);
    composer.measure(Size::new(300.0, 400.0));

    assert_eq!(composer.square_extent(), Some(500.0));
    assert_eq!(composer.rotation().degrees(), 0.0);

    scheduler.tick(0.016);

    assert_relative_eq!(composer.rotation().degrees(), 16.0, epsilon = 1e-9);
    let commands = log.commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(
        commands[0],
        DrawCommand::ClearRect {
            x: 0.0,
            y: 0.0,
            width: 300.0,
            height: 400.0
        }
    );
    assert!(matches!(
        commands[1],
        DrawCommand::SetFillColor(color) if Palette::default().colors().contains(&color)
    ));
    assert_eq!(
        commands[2],
        DrawCommand::FillRect {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0
        }
    );

    let mut map = FakeMap::default();
    let frame = composer.render(&mut map);
    assert_eq!(frame.extent(), Some(500.0));
    assert!(frame
        .transform
        .css_transform()
        .starts_with("rotateZ(16"));
    assert_eq!(
        map.renders,
        vec![RenderedMap {
            config_folder: "/cfg/bing".into(),
            map_id: "nd-map".into(),
            center: GeoCenter::new(47.0, 8.0),
            range: 80.0,
        }]
    );
}

#[test]
fn rotated_frame_always_covers_container() {
    let scheduler = FrameScheduler::new();
    let mut composer = scenario_composer(&scheduler);
    let container = Size::new(1280.0, 720.0);
    composer.measure(container);

    for _ in 0..200 {
        scheduler.tick(0.0137);
        let rotation = composer.rotation().degrees();
        assert!((0.0..360.0).contains(&rotation));
        assert!(composer.frame_transform().covers(container));
    }
}

#[test]
fn paint_before_mount_is_silent() {
    let scheduler = FrameScheduler::new();
    let mut composer = scenario_composer(&scheduler);

    scheduler.tick(0.016);
    assert!(!composer.surface_controller().use_surface(|_, _| unreachable!()));
    assert_eq!(composer.paint_count(), 0);
    assert_eq!(composer.frame_count(), 1);
}

#[test]
fn destroyed_composer_is_not_ticked() {
    let scheduler = FrameScheduler::new();
    let mut composer = scenario_composer(&scheduler);
    let buffer = PixelBuffer::new(64, 64);
    composer
        .surface_controller()
        .mount(HeadlessCanvas::new(64.0, 64.0), PixelContext::new(buffer.clone()));

    scheduler.tick(0.0);
    assert_ne!(buffer.pixel(20, 20), Some([0, 0, 0, 0]));

    drop(composer);
    buffer.resize(64, 64);
    assert_eq!(scheduler.tick(0.016), 0);
    assert!(buffer.pixels().iter().all(|&byte| byte == 0));
}

#[test]
fn overlays_receive_position_and_sim_vars() {
    let scheduler = FrameScheduler::new();
    let sim_vars = SimVarStore::new();
    sim_vars.set("PLANE HEADING DEGREES MAGNETIC", "degrees", 123.0);

    let config = ComposerConfig::from_json_str(
        r#"{ "mapId": "nd", "configFolder": "/cfg", "centerLla": { "lat": 46.5, "long": 7.25 }, "range": 20 }"#,
    )
    .expect("valid config");
    let composer = MapComposerBuilder::from_config(config)
        .with_sim_vars(Rc::new(sim_vars.clone()))
        .with_overlay(OverlayElement::new("Airplane").with_prop("size", 32))
        .with_overlay(OverlayElement::new("RangeRing").with_prop(RANGE_PROP, 5))
        .with_overlay("NAV")
        .build(&scheduler);

    let frame = composer.render(&mut FakeMap::default());
    let scope = frame.overlays().expect("overlay layer");
    let elements: Vec<&OverlayElement> = scope
        .children()
        .iter()
        .filter_map(OverlayNode::as_element)
        .collect();

    assert_eq!(elements.len(), 2);
    for element in &elements {
        assert_eq!(element.center(), Some(GeoCenter::new(46.5, 7.25)));
        assert_eq!(element.range(), Some(20.0));
        assert!(element.prop(CENTER_PROP).is_some());
    }
    assert_eq!(elements[0].prop("size"), Some(&serde_json::json!(32)));
    assert_eq!(scope.children()[2], OverlayNode::Text("NAV".into()));
    assert_eq!(
        scope.sim_vars().get("PLANE HEADING DEGREES MAGNETIC", "degrees"),
        Some(123.0)
    );
}

#[test]
fn overlay_can_follow_sim_var_updates() {
    let scheduler = FrameScheduler::new();
    let sim_vars = SimVarStore::new();
    let composer = MapComposer::builder("nd", "/cfg", GeoCenter::new(0.0, 0.0))
        .with_sim_vars(Rc::new(sim_vars.clone()))
        .build(&scheduler);

    let frame = composer.render(&mut FakeMap::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = frame.overlays().expect("overlay layer").sim_vars().subscribe(
        "GPS GROUND SPEED",
        "knots",
        Box::new(move |value| sink.borrow_mut().push(value)),
    );

    sim_vars.set("GPS GROUND SPEED", "knots", 250.0);
    assert_eq!(*seen.borrow(), vec![250.0]);
}

#[test]
fn position_update_reaches_next_render() {
    let scheduler = FrameScheduler::new();
    let mut composer = scenario_composer(&scheduler);
    let mut map = FakeMap::default();

    composer.render(&mut map);
    composer.set_position(GeoCenter::new(40.0, -3.5), 160.0);
    let frame = composer.render(&mut map);

    assert_eq!(map.renders[1].center, GeoCenter::new(40.0, -3.5));
    assert!(matches!(
        frame.layers[1],
        FrameLayer::Map { range, .. } if range == 160.0
    ));
}

#[test]
fn heading_in_config_leaves_frame_orientation_alone() {
    let scheduler = FrameScheduler::new();
    let config = ComposerConfig::from_json_str(
        r#"{
            "mapId": "nd",
            "configFolder": "/cfg",
            "centerLla": { "lat": 47.0, "long": 8.0 },
            "heading": 90,
            "rotation": 15
        }"#,
    )
    .expect("valid config");
    let composer = MapComposerBuilder::from_config(config).build(&scheduler);

    assert_eq!(composer.rotation().degrees(), 15.0);
    scheduler.tick(0.0);
    assert_eq!(composer.rotation().degrees(), 15.0);
}
