//! Off-screen canvas and drawing contexts.
//!
//! Used when the map is rendered without a browser: in tests, in headless demos, or when
//! frames are copied into a pixel texture of another UI toolkit.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use galileo_types::cartesian::Size;
use parking_lot::Mutex;

use crate::paint::Color;
use crate::surface::{Canvas, DrawingContext};

/// Canvas without a window. Clones share the same size.
#[derive(Debug, Clone)]
pub struct HeadlessCanvas {
    size: Rc<Cell<(f64, f64)>>,
}

impl HeadlessCanvas {
    /// Creates a canvas of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
        }
    }

    /// Changes the size seen by all clones of the canvas.
    pub fn resize(&self, width: f64, height: f64) {
        self.size.set((width, height));
    }
}

impl Canvas for HeadlessCanvas {
    fn bounding_size(&self) -> Size<f64> {
        let (width, height) = self.size.get();
        Size::new(width, height)
    }
}

/// Draw call recorded by [`RecordingContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// `clear_rect` call.
    ClearRect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// `set_fill_color` call.
    SetFillColor(Color),
    /// `fill_rect` call.
    FillRect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

/// Read side of the commands recorded by a [`RecordingContext`].
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    commands: Rc<RefCell<Vec<DrawCommand>>>,
}

impl DrawLog {
    /// Copy of all recorded commands.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.commands.borrow().clone()
    }

    /// Number of `fill_rect` calls so far.
    pub fn fill_count(&self) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|command| matches!(command, DrawCommand::FillRect { .. }))
            .count()
    }

    /// Forgets recorded commands.
    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }
}

/// Drawing context that only records the calls made to it.
#[derive(Debug)]
pub struct RecordingContext {
    log: DrawLog,
}

impl RecordingContext {
    /// Creates a context and the log it writes to.
    pub fn new() -> (Self, DrawLog) {
        let log = DrawLog::default();
        (Self { log: log.clone() }, log)
    }

    fn record(&mut self, command: DrawCommand) {
        self.log.commands.borrow_mut().push(command);
    }
}

impl DrawingContext for RecordingContext {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.record(DrawCommand::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn set_fill_color(&mut self, color: Color) {
        self.record(DrawCommand::SetFillColor(color));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.record(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
        });
    }
}

/// RGBA8 pixel storage shared between a [`PixelContext`] and its consumer, e.g. the thread
/// that uploads the frame into a texture.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    inner: Arc<Mutex<PixelData>>,
}

#[derive(Debug)]
struct PixelData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PixelData {
                width,
                height,
                pixels: vec![0u8; pixel_len(width, height)],
            })),
        }
    }

    /// Buffer size in pixels.
    pub fn size(&self) -> Size<u32> {
        let data = self.inner.lock();
        Size::new(data.width, data.height)
    }

    /// Copy of the pixel data, row-major RGBA.
    pub fn pixels(&self) -> Vec<u8> {
        self.inner.lock().pixels.clone()
    }

    /// Color of a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let data = self.inner.lock();
        if x >= data.width || y >= data.height {
            return None;
        }

        let offset = (y as usize * data.width as usize + x as usize) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&data.pixels[offset..offset + 4]);
        Some(rgba)
    }

    /// Changes the buffer size. The content is cleared.
    pub fn resize(&self, width: u32, height: u32) {
        let mut data = self.inner.lock();
        data.width = width;
        data.height = height;
        data.pixels.clear();
        data.pixels.resize(pixel_len(width, height), 0);
    }

    fn fill(&self, x: f64, y: f64, width: f64, height: f64, rgba: [u8; 4]) {
        let mut data = self.inner.lock();
        let (x0, x1) = clamp_span(x, width, data.width);
        let (y0, y1) = clamp_span(y, height, data.height);
        let row_len = data.width as usize;

        for row in y0..y1 {
            for col in x0..x1 {
                let offset = (row * row_len + col) * 4;
                data.pixels[offset..offset + 4].copy_from_slice(&rgba);
            }
        }
    }
}

fn pixel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

fn clamp_span(start: f64, len: f64, limit: u32) -> (usize, usize) {
    let (from, to) = if len < 0.0 {
        (start + len, start)
    } else {
        (start, start + len)
    };
    let limit = limit as f64;
    let from = from.round().clamp(0.0, limit) as usize;
    let to = to.round().clamp(0.0, limit) as usize;
    (from, to.max(from))
}

/// Drawing context rasterizing into a [`PixelBuffer`].
#[derive(Debug)]
pub struct PixelContext {
    buffer: PixelBuffer,
    fill: [u8; 4],
}

impl PixelContext {
    /// Creates a context drawing into `buffer`. The initial fill color is opaque black.
    pub fn new(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            fill: [0, 0, 0, 255],
        }
    }
}

impl DrawingContext for PixelContext {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.buffer.fill(x, y, width, height, [0, 0, 0, 0]);
    }

    fn set_fill_color(&mut self, color: Color) {
        self.fill = color.rgba();
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.buffer.fill(x, y, width, height, self.fill);
    }
}
