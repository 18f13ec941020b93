//! Rotating map composer for cockpit instrument displays.
//!
//! A [`MapComposer`] keeps a square map frame centered over its container and spins it by a
//! configurable angular speed on every frame. The frame side is the container diagonal, so
//! the rotated square always covers the visible area. Inside the frame the composer stacks a
//! drawing canvas (repainted once per frame through a [`DrawingSurfaceHandle`]), the map
//! imagery supplied by a [`MapSurface`] implementation and a set of overlay elements that
//! receive the map center and range and can read simulation variables.
//!
//! ```ignore
//! let scheduler = FrameScheduler::new();
//! let mut composer = MapComposer::builder("nd-map", "/cfg/bing", GeoCenter::new(47.0, 8.0))
//!     .build(&scheduler);
//!
//! composer.surface_controller().mount(HeadlessCanvas::new(300.0, 400.0), context);
//! composer.measure(Size::new(300.0, 400.0));
//! scheduler.tick(0.016);
//! let frame = composer.render(&mut map_surface);
//! ```

pub mod composer;
pub mod config;
pub mod frame_clock;
pub mod frame_loop;
pub mod geometry;
pub mod headless;
pub mod map_surface;
pub mod overlay;
pub mod paint;
pub mod simvar;
pub mod subscription;
pub mod surface;

pub use composer::{ComposedFrame, FrameLayer, MapComposer, MapComposerBuilder};
pub use config::{ComposerConfig, ConfigError};
pub use frame_clock::{FrameClock, FrameScheduler};
pub use frame_loop::{FrameLoop, FrameLoopConfig, FrameLoopError};
pub use galileo_types;
pub use geometry::{square_extent, FrameTransform, GeoCenter, Rotation, DEFAULT_RANGE};
pub use map_surface::{MapSurface, MapSurfaceRequest};
pub use overlay::{OverlayDistributor, OverlayElement, OverlayNode, OverlayScope};
pub use paint::{Color, MarkerPainter, Palette, PaintRoutine};
pub use simvar::{SimVarSource, SimVarStore};
pub use subscription::Subscription;
pub use surface::{Canvas, DrawingContext, DrawingSurfaceController, DrawingSurfaceHandle};
