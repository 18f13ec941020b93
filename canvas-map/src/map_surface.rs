//! Map imagery provider interface.

use crate::geometry::GeoCenter;

/// Parameters of a map imagery render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSurfaceRequest<'a> {
    /// Provider configuration location. Not interpreted by the composer.
    pub config_folder: &'a str,
    /// Map provider identifier.
    pub map_id: &'a str,
    /// Center of the map.
    pub center: GeoCenter,
    /// Visible range.
    pub range: f64,
}

/// Renders map imagery for a center and range. Knows nothing about the frame rotation.
pub trait MapSurface {
    /// Renders the map. The composer does not inspect the result.
    fn render(&mut self, request: &MapSurfaceRequest<'_>);
}

impl<T: MapSurface + ?Sized> MapSurface for &mut T {
    fn render(&mut self, request: &MapSurfaceRequest<'_>) {
        (**self).render(request)
    }
}

impl<T: MapSurface + ?Sized> MapSurface for Box<T> {
    fn render(&mut self, request: &MapSurfaceRequest<'_>) {
        (**self).render(request)
    }
}
