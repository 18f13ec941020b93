//! Drawing canvas ownership.
//!
//! A [`DrawingSurfaceController`] owns one canvas and its 2D drawing context. Other
//! components never get a direct reference to either of them; they paint through a
//! [`DrawingSurfaceHandle`] which hands the pair to a closure for the duration of one call.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use galileo_types::cartesian::Size;

use crate::paint::Color;

/// Canvas element whose live geometry can be queried while painting.
pub trait Canvas {
    /// Current rendered size of the canvas (its bounding box).
    fn bounding_size(&self) -> Size<f64>;
}

/// Immediate-mode 2D drawing context of a canvas.
pub trait DrawingContext {
    /// Clears the given rectangle to transparent.
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Sets the color used by subsequent fills.
    fn set_fill_color(&mut self, color: Color);

    /// Fills the given rectangle with the current fill color.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
}

struct MountedSurface {
    canvas: Box<dyn Canvas>,
    context: Box<dyn DrawingContext>,
}

type SurfaceSlot = Rc<RefCell<Option<MountedSurface>>>;

/// Binding to a mounted canvas and its drawing context.
///
/// A handle is created every time a canvas is mounted. After the canvas is unmounted the
/// handle stays valid, but painting through it does nothing.
#[derive(Clone)]
pub struct DrawingSurfaceHandle {
    slot: SurfaceSlot,
}

impl DrawingSurfaceHandle {
    /// Runs `paint` against the canvas and its context.
    ///
    /// Returns false without calling `paint` if the canvas is not mounted. Calling this from
    /// inside `paint` of the same surface is also skipped.
    pub fn use_surface<F>(&self, paint: F) -> bool
    where
        F: FnOnce(&dyn Canvas, &mut dyn DrawingContext),
    {
        let Ok(mut slot) = self.slot.try_borrow_mut() else {
            log::warn!("Drawing surface is already in use, nested paint is skipped");
            return false;
        };

        match slot.as_mut() {
            Some(surface) => {
                paint(surface.canvas.as_ref(), surface.context.as_mut());
                true
            }
            None => false,
        }
    }

    /// Returns true if the canvas behind this handle is still mounted.
    pub fn is_mounted(&self) -> bool {
        // A borrowed slot is being painted, so it is mounted.
        self.slot
            .try_borrow()
            .map_or(true, |surface| surface.is_some())
    }

    /// Returns true if both handles point to the same mount of the canvas.
    pub fn same_surface(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for DrawingSurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSurfaceHandle")
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

type SurfaceListener = Box<dyn FnMut(Option<DrawingSurfaceHandle>)>;

/// Owner of the drawing canvas lifecycle.
pub struct DrawingSurfaceController {
    current: Option<DrawingSurfaceHandle>,
    on_updated: SurfaceListener,
}

impl DrawingSurfaceController {
    /// Creates a controller without a canvas.
    ///
    /// `on_updated` is called with the new handle every time a canvas is mounted and with
    /// `None` when it is unmounted.
    pub fn new(on_updated: impl FnMut(Option<DrawingSurfaceHandle>) + 'static) -> Self {
        Self {
            current: None,
            on_updated: Box::new(on_updated),
        }
    }

    /// Takes ownership of a canvas and its context.
    ///
    /// A previously mounted canvas is released and its handles stop painting.
    pub fn mount(
        &mut self,
        canvas: impl Canvas + 'static,
        context: impl DrawingContext + 'static,
    ) -> DrawingSurfaceHandle {
        if let Some(previous) = self.current.take() {
            log::debug!("Replacing mounted drawing surface");
            previous.slot.borrow_mut().take();
        }

        let size = canvas.bounding_size();
        log::debug!(
            "Drawing surface mounted with size {}x{}",
            size.width(),
            size.height()
        );

        let handle = DrawingSurfaceHandle {
            slot: Rc::new(RefCell::new(Some(MountedSurface {
                canvas: Box::new(canvas),
                context: Box::new(context),
            }))),
        };
        self.current = Some(handle.clone());
        (self.on_updated)(Some(handle.clone()));

        handle
    }

    /// Releases the canvas. Returns false if nothing was mounted.
    pub fn unmount(&mut self) -> bool {
        let Some(handle) = self.current.take() else {
            return false;
        };

        handle.slot.borrow_mut().take();
        log::debug!("Drawing surface unmounted");
        (self.on_updated)(None);
        true
    }

    /// Handle of the mounted canvas.
    pub fn handle(&self) -> Option<&DrawingSurfaceHandle> {
        self.current.as_ref()
    }

    /// Paints through the current handle. Does nothing if no canvas is mounted.
    pub fn use_surface<F>(&self, paint: F) -> bool
    where
        F: FnOnce(&dyn Canvas, &mut dyn DrawingContext),
    {
        self.current
            .as_ref()
            .is_some_and(|handle| handle.use_surface(paint))
    }
}

impl fmt::Debug for DrawingSurfaceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSurfaceController")
            .field("current", &self.current)
            .finish()
    }
}
