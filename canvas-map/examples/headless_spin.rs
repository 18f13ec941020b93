//! Spins the map frame for one second without a window and prints the resulting state.
//! Run with: RUST_LOG=debug cargo run --example headless_spin

use std::time::Duration;

use canvas_map::galileo_types::cartesian::Size;
use canvas_map::headless::{HeadlessCanvas, PixelBuffer, PixelContext};
use canvas_map::{
    FrameLoop, FrameLoopConfig, FrameScheduler, GeoCenter, MapComposer, MapSurface,
    MapSurfaceRequest, OverlayElement,
};

struct LoggingMap;

impl MapSurface for LoggingMap {
    fn render(&mut self, request: &MapSurfaceRequest<'_>) {
        log::info!(
            "Rendering map {} from {} at ({}, {}), range {}",
            request.map_id,
            request.config_folder,
            request.center.lat,
            request.center.long,
            request.range
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let scheduler = FrameScheduler::new();
            let center = GeoCenter::new(47.0, 8.0);
            let mut composer = MapComposer::builder("nd-map", "./bing-config", center)
                .with_rotation_speed(90.0)
                .with_overlay(OverlayElement::new("Airplane"))
                .build(&scheduler);

            let (width, height) = (300u32, 400u32);
            let pixels = PixelBuffer::new(width, height);
            composer.surface_controller().mount(
                HeadlessCanvas::new(width as f64, height as f64),
                PixelContext::new(pixels.clone()),
            );
            composer.measure(Size::new(width as f64, height as f64));

            let frame_loop = FrameLoop::spawn_local(scheduler, FrameLoopConfig { fps: 30 });
            if let Err(err) = frame_loop.start() {
                log::error!("Failed to start frame loop: {err}");
                return;
            }

            tokio::time::sleep(Duration::from_secs(1)).await;

            let frame = composer.render(&mut LoggingMap);
            let stats = frame_loop.stats();
            println!(
                "rotation: {:.1} deg, extent: {:?}, transform: {}",
                composer.rotation().degrees(),
                frame.extent(),
                frame.transform.css_transform()
            );
            println!(
                "frames: {}, painted: {}, fps: {:.1}, marker pixel: {:?}",
                stats.frame_count,
                composer.paint_count(),
                stats.actual_fps,
                pixels.pixel(20, 20)
            );
        })
        .await;
}
