//! Rotating map composition.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use galileo_types::cartesian::Size;

use crate::config::ComposerConfig;
use crate::frame_clock::FrameClock;
use crate::geometry::{square_extent, FrameTransform, GeoCenter, Rotation};
use crate::map_surface::{MapSurface, MapSurfaceRequest};
use crate::overlay::{OverlayDistributor, OverlayNode, OverlayScope};
use crate::paint::{MarkerPainter, PaintRoutine};
use crate::simvar::{SimVarSource, SimVarStore};
use crate::subscription::Subscription;
use crate::surface::{DrawingSurfaceController, DrawingSurfaceHandle};

/// State written by the frame callback.
struct FrameState {
    rotation: Rotation,
    rotation_speed: f64,
    surface: Option<DrawingSurfaceHandle>,
    painter: Box<dyn PaintRoutine>,
    frame_count: u64,
    paint_count: u64,
}

impl FrameState {
    fn on_frame(&mut self, delta_time: f64) {
        if !self.rotation.advance(self.rotation_speed, delta_time) {
            log::warn!("Skipping frame with invalid delta time {delta_time}");
            return;
        }
        self.frame_count += 1;

        let rotation = self.rotation;
        let Self {
            surface, painter, ..
        } = self;
        let painted = surface.as_ref().is_some_and(|surface| {
            surface.use_surface(|canvas, context| painter.paint(canvas, context, rotation))
        });

        if painted {
            self.paint_count += 1;
        } else {
            log::trace!("No drawing surface, paint skipped");
        }
    }
}

/// Composes the rotating map frame.
///
/// The composer owns the frame rotation and advances it on every tick of the [`FrameClock`]
/// it was built with, painting the drawing canvas right after. [`MapComposer::render`]
/// lays out one pass of the frame: the drawing canvas, the map imagery and the overlays, all
/// inside a square that is rotated about the container center and large enough to cover the
/// container at any angle.
///
/// Dropping the composer unregisters its frame callback.
pub struct MapComposer {
    map_id: String,
    config_folder: String,
    center: GeoCenter,
    range: f64,
    state: Rc<RefCell<FrameState>>,
    surface_controller: DrawingSurfaceController,
    distributor: OverlayDistributor,
    children: Vec<OverlayNode>,
    container: Option<Size<f64>>,
    frame_subscription: Option<Subscription>,
}

impl MapComposer {
    /// Starts building a composer for the given map, centered on `center`.
    pub fn builder(
        map_id: impl Into<String>,
        config_folder: impl Into<String>,
        center: GeoCenter,
    ) -> MapComposerBuilder {
        MapComposerBuilder::from_config(ComposerConfig::new(map_id, config_folder, center))
    }

    /// Current frame rotation.
    pub fn rotation(&self) -> Rotation {
        self.state.borrow().rotation
    }

    /// Angular speed, degrees per second.
    pub fn rotation_speed(&self) -> f64 {
        self.state.borrow().rotation_speed
    }

    /// Changes the angular speed. Non-finite values are ignored.
    pub fn set_rotation_speed(&mut self, degrees_per_second: f64) {
        if degrees_per_second.is_finite() {
            self.state.borrow_mut().rotation_speed = degrees_per_second;
        } else {
            log::warn!("Ignoring invalid rotation speed {degrees_per_second}");
        }
    }

    /// Map center.
    pub fn center(&self) -> GeoCenter {
        self.center
    }

    /// Visible range.
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Replaces center and range for subsequent render passes.
    pub fn set_position(&mut self, center: GeoCenter, range: f64) {
        self.center = center;
        self.range = range;
    }

    /// Replaces the overlay content.
    pub fn set_overlays(&mut self, children: Vec<OverlayNode>) {
        self.children = children;
    }

    /// Controller of the drawing canvas. The host mounts its canvas here.
    pub fn surface_controller(&mut self) -> &mut DrawingSurfaceController {
        &mut self.surface_controller
    }

    /// Records the rendered size of the container.
    pub fn measure(&mut self, container: Size<f64>) {
        if self.container != Some(container) {
            log::debug!(
                "Map container measured at {}x{}",
                container.width(),
                container.height()
            );
        }
        self.container = Some(container);
    }

    /// Last measured container size.
    pub fn container_size(&self) -> Option<Size<f64>> {
        self.container
    }

    /// Side of the rotated frame, `None` before the container is measured.
    pub fn square_extent(&self) -> Option<f64> {
        square_extent(self.container)
    }

    /// Placement of the rotated frame for the current rotation and container size.
    pub fn frame_transform(&self) -> FrameTransform {
        FrameTransform::new(self.rotation(), self.container)
    }

    /// Performs one render pass.
    ///
    /// The map imagery is rendered through `map` with the configured center and range.
    pub fn render(&self, map: &mut impl MapSurface) -> ComposedFrame {
        let transform = self.frame_transform();

        map.render(&MapSurfaceRequest {
            config_folder: &self.config_folder,
            map_id: &self.map_id,
            center: self.center,
            range: self.range,
        });

        let overlays = self
            .distributor
            .distribute(&self.children, self.center, self.range);

        log::trace!(
            "Composed map frame: rotation {:.2}, extent {:?}, {} overlay(s)",
            transform.rotation().degrees(),
            transform.extent(),
            overlays.children().len()
        );

        ComposedFrame {
            transform,
            layers: vec![
                FrameLayer::DrawingSurface(self.surface_controller.handle().cloned()),
                FrameLayer::Map {
                    map_id: self.map_id.clone(),
                    config_folder: self.config_folder.clone(),
                    center: self.center,
                    range: self.range,
                },
                FrameLayer::Overlays(overlays),
            ],
        }
    }

    /// Unregisters the frame callback. Rotation and painting stop.
    ///
    /// Returns false if it was already detached.
    pub fn detach_clock(&mut self) -> bool {
        match self.frame_subscription.take() {
            Some(subscription) => {
                drop(subscription);
                log::debug!("Map composer {} detached from frame clock", self.map_id);
                true
            }
            None => false,
        }
    }

    /// Returns true while the frame callback is registered.
    pub fn is_attached(&self) -> bool {
        self.frame_subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Number of frames processed.
    pub fn frame_count(&self) -> u64 {
        self.state.borrow().frame_count
    }

    /// Number of frames in which the canvas was painted.
    pub fn paint_count(&self) -> u64 {
        self.state.borrow().paint_count
    }
}

impl Drop for MapComposer {
    fn drop(&mut self) {
        self.detach_clock();
        log::debug!("Map composer {} destroyed", self.map_id);
    }
}

impl fmt::Debug for MapComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapComposer")
            .field("map_id", &self.map_id)
            .field("center", &self.center)
            .field("range", &self.range)
            .field("rotation", &self.rotation())
            .field("container", &self.container)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Builder of a [`MapComposer`].
pub struct MapComposerBuilder {
    config: ComposerConfig,
    children: Vec<OverlayNode>,
    sim_vars: Option<Rc<dyn SimVarSource>>,
    painter: Option<Box<dyn PaintRoutine>>,
}

impl MapComposerBuilder {
    /// Starts from a loaded configuration.
    pub fn from_config(config: ComposerConfig) -> Self {
        Self {
            config,
            children: Vec::new(),
            sim_vars: None,
            painter: None,
        }
    }

    /// Sets the map center.
    pub fn with_center(mut self, center: GeoCenter) -> Self {
        self.config.center = center;
        self
    }

    /// Sets the map center from latitude and longitude.
    pub fn with_latlon(self, lat: f64, long: f64) -> Self {
        self.with_center(GeoCenter::new(lat, long))
    }

    /// Sets the visible range.
    pub fn with_range(mut self, range: f64) -> Self {
        self.config.range = range;
        self
    }

    /// Sets the initial rotation, degrees.
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.config.initial_rotation = degrees;
        self
    }

    /// Sets the angular speed, degrees per second.
    pub fn with_rotation_speed(mut self, degrees_per_second: f64) -> Self {
        self.config.rotation_speed = degrees_per_second;
        self
    }

    /// Adds an overlay node.
    pub fn with_overlay(mut self, child: impl Into<OverlayNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Sets the simulation variables available to overlays. An empty store is used otherwise.
    pub fn with_sim_vars(mut self, sim_vars: Rc<dyn SimVarSource>) -> Self {
        self.sim_vars = Some(sim_vars);
        self
    }

    /// Sets the per-frame paint routine. [`MarkerPainter`] is used otherwise.
    pub fn with_painter(mut self, painter: impl PaintRoutine + 'static) -> Self {
        self.painter = Some(Box::new(painter));
        self
    }

    /// Creates the composer and registers its frame callback with `clock`.
    pub fn build(self, clock: &dyn FrameClock) -> MapComposer {
        let ComposerConfig {
            map_id,
            config_folder,
            center,
            range,
            initial_rotation,
            heading: _,
            rotation_speed,
        } = self.config;

        let state = Rc::new(RefCell::new(FrameState {
            rotation: Rotation::new(initial_rotation),
            rotation_speed,
            surface: None,
            painter: self
                .painter
                .unwrap_or_else(|| Box::new(MarkerPainter::new())),
            frame_count: 0,
            paint_count: 0,
        }));

        let surface_state = Rc::downgrade(&state);
        let surface_controller = DrawingSurfaceController::new(move |handle| {
            if let Some(state) = surface_state.upgrade() {
                state.borrow_mut().surface = handle;
            }
        });

        let frame_state = Rc::downgrade(&state);
        let frame_subscription = clock.on_frame(Box::new(move |delta_time: f64| {
            let Some(cell) = frame_state.upgrade() else {
                return;
            };
            let Ok(mut state) = cell.try_borrow_mut() else {
                log::warn!("Frame state is busy, frame skipped");
                return;
            };
            state.on_frame(delta_time);
        }));

        let sim_vars = self
            .sim_vars
            .unwrap_or_else(|| Rc::new(SimVarStore::new()));

        log::info!(
            "Created map composer {map_id} at ({}, {}), range {range}",
            center.lat,
            center.long
        );

        MapComposer {
            map_id,
            config_folder,
            center,
            range,
            state,
            surface_controller,
            distributor: OverlayDistributor::new(sim_vars),
            children: self.children,
            container: None,
            frame_subscription: Some(frame_subscription),
        }
    }
}

/// Result of one render pass.
#[derive(Debug)]
pub struct ComposedFrame {
    /// Placement of the rotated frame.
    pub transform: FrameTransform,
    /// Content of the frame, bottom to top.
    pub layers: Vec<FrameLayer>,
}

impl ComposedFrame {
    /// Side of the frame square, `None` while the container is not measured.
    pub fn extent(&self) -> Option<f64> {
        self.transform.extent()
    }

    /// Overlays of the frame.
    pub fn overlays(&self) -> Option<&OverlayScope> {
        self.layers.iter().find_map(|layer| match layer {
            FrameLayer::Overlays(scope) => Some(scope),
            _ => None,
        })
    }
}

/// Layer of the rotated frame.
#[derive(Debug)]
pub enum FrameLayer {
    /// Drawing canvas, if one is mounted.
    DrawingSurface(Option<DrawingSurfaceHandle>),
    /// Map imagery.
    Map {
        /// Map provider identifier.
        map_id: String,
        /// Provider configuration location.
        config_folder: String,
        /// Center of the map.
        center: GeoCenter,
        /// Visible range.
        range: f64,
    },
    /// Overlays in a full-size container centering its content.
    Overlays(OverlayScope),
}
