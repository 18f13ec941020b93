//! Rotation, sizing and placement of the rotated map frame.

use galileo_types::cartesian::Size;
use galileo_types::geo::impls::GeoPoint2d;
use galileo_types::geo::{GeoPoint, NewGeoPoint};
use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// Visible range used when none is configured.
pub const DEFAULT_RANGE: f64 = 80.0;

/// Default angular speed of the map frame, degrees per second.
pub const DEFAULT_ROTATION_SPEED: f64 = 1000.0;

const FULL_TURN: f64 = 360.0;

/// Geographic center of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCenter {
    /// Latitude, degrees.
    pub lat: f64,
    /// Longitude, degrees.
    pub long: f64,
}

impl GeoCenter {
    /// Creates a new center.
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.long.is_finite()
    }
}

impl From<GeoCenter> for GeoPoint2d {
    fn from(center: GeoCenter) -> Self {
        GeoPoint2d::latlon(center.lat, center.long)
    }
}

impl From<&GeoPoint2d> for GeoCenter {
    fn from(point: &GeoPoint2d) -> Self {
        Self::new(point.lat(), point.lon())
    }
}

/// Orientation of the map frame in degrees, always in `[0, 360)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Rotation(f64);

impl Rotation {
    /// Creates a rotation, wrapping `degrees` into `[0, 360)`.
    ///
    /// Non-finite values give a zero rotation.
    pub fn new(degrees: f64) -> Self {
        if degrees.is_finite() {
            Self(wrap_degrees(degrees))
        } else {
            Self(0.0)
        }
    }

    /// Angle in degrees.
    pub fn degrees(&self) -> f64 {
        self.0
    }

    /// Angle in radians.
    pub fn radians(&self) -> f64 {
        self.0.to_radians()
    }

    /// Advances the rotation by `speed * delta_time` degrees.
    ///
    /// Returns false and leaves the rotation untouched if the step is not finite.
    pub fn advance(&mut self, speed: f64, delta_time: f64) -> bool {
        let step = speed * delta_time;
        if !step.is_finite() {
            return false;
        }

        self.0 = wrap_degrees(self.0 + step);
        true
    }
}

fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(FULL_TURN);
    // `rem_euclid` rounds tiny negative inputs up to exactly 360.
    if wrapped >= FULL_TURN {
        0.0
    } else {
        wrapped
    }
}

/// Side of the square that covers a container of the given size under any rotation.
///
/// Returns `None` if the container has not been measured yet.
pub fn square_extent(container: Option<Size<f64>>) -> Option<f64> {
    container.map(|size| size.width().hypot(size.height()))
}

/// Placement of the rotated frame inside its container.
///
/// The frame's top-left corner is anchored at the container center, the frame is rotated
/// about that corner and then shifted back by half of its own size. The net effect is a
/// square centered on the container and rotated about its own center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    rotation: Rotation,
    anchor: Point2<f64>,
    extent: Option<f64>,
}

impl FrameTransform {
    /// Creates the transform for a container of the given size.
    ///
    /// If the container is not measured, the frame has no extent and the anchor is the origin.
    pub fn new(rotation: Rotation, container: Option<Size<f64>>) -> Self {
        let anchor = container
            .map(|size| Point2::new(size.width() / 2.0, size.height() / 2.0))
            .unwrap_or_else(Point2::origin);

        Self {
            rotation,
            anchor,
            extent: square_extent(container),
        }
    }

    /// Frame rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Side of the frame square, if the container was measured.
    pub fn extent(&self) -> Option<f64> {
        self.extent
    }

    /// Point of the container where the frame's top-left corner is attached.
    pub fn anchor(&self) -> Point2<f64> {
        self.anchor
    }

    /// CSS `transform` value of the frame. Used together with `transform-origin: 0 0`.
    pub fn css_transform(&self) -> String {
        format!(
            "rotateZ({}deg) translateX(-50%) translateY(-50%)",
            self.rotation.degrees()
        )
    }

    /// Maps a point in frame coordinates (origin at the frame's top-left corner) into
    /// container coordinates.
    pub fn frame_to_container(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        let half = self.extent? / 2.0;
        let shifted = point - Vector2::new(half, half);
        Some(self.anchor + Rotation2::new(self.rotation.radians()) * shifted.coords)
    }

    /// Maps a point in container coordinates into frame coordinates.
    pub fn container_to_frame(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        let half = self.extent? / 2.0;
        let local = Rotation2::new(-self.rotation.radians()) * (point - self.anchor);
        Some(Point2::new(local.x + half, local.y + half))
    }

    /// Corners of the frame in container coordinates, clockwise from the top-left.
    pub fn corners(&self) -> Option<[Point2<f64>; 4]> {
        let extent = self.extent?;
        Some([
            self.frame_to_container(Point2::new(0.0, 0.0))?,
            self.frame_to_container(Point2::new(extent, 0.0))?,
            self.frame_to_container(Point2::new(extent, extent))?,
            self.frame_to_container(Point2::new(0.0, extent))?,
        ])
    }

    /// Returns true if every corner of the container lies inside the rotated frame.
    pub fn covers(&self, container: Size<f64>) -> bool {
        let Some(extent) = self.extent else {
            return false;
        };
        let tolerance = extent * 1e-9;

        [
            Point2::new(0.0, 0.0),
            Point2::new(container.width(), 0.0),
            Point2::new(container.width(), container.height()),
            Point2::new(0.0, container.height()),
        ]
        .into_iter()
        .filter_map(|corner| self.container_to_frame(corner))
        .all(|local| {
            (-tolerance..=extent + tolerance).contains(&local.x)
                && (-tolerance..=extent + tolerance).contains(&local.y)
        })
    }
}
