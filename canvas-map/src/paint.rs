//! Per-frame paint routines for the drawing canvas.

use std::fmt;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::Rotation;
use crate::surface::{Canvas, DrawingContext};

/// RGBA color with a CSS name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    name: &'static str,
    rgba: [u8; 4],
}

impl Color {
    /// CSS `blue`.
    pub const BLUE: Self = Self::named("blue", [0, 0, 255, 255]);
    /// CSS `red`.
    pub const RED: Self = Self::named("red", [255, 0, 0, 255]);
    /// CSS `green`.
    pub const GREEN: Self = Self::named("green", [0, 128, 0, 255]);
    /// CSS `yellow`.
    pub const YELLOW: Self = Self::named("yellow", [255, 255, 0, 255]);
    /// CSS `purple`.
    pub const PURPLE: Self = Self::named("purple", [128, 0, 128, 255]);

    const fn named(name: &'static str, rgba: [u8; 4]) -> Self {
        Self { name, rgba }
    }

    /// CSS color name.
    pub fn css_name(&self) -> &'static str {
        self.name
    }

    /// Color components.
    pub fn rgba(&self) -> [u8; 4] {
        self.rgba
    }
}

/// Fixed list of marker colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::BLUE,
                Color::RED,
                Color::GREEN,
                Color::YELLOW,
                Color::PURPLE,
            ],
        }
    }
}

impl Palette {
    /// Creates a palette from the given colors. Returns `None` if `colors` is empty.
    pub fn new(colors: Vec<Color>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    /// Colors of the palette.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Picks a color uniformly at random.
    pub fn pick(&self, rng: &mut impl Rng) -> Color {
        self.colors[rng.gen_range(0..self.colors.len())]
    }
}

/// Routine run against the canvas once per frame.
pub trait PaintRoutine {
    /// Paints one frame. `rotation` is the frame rotation as of the current tick.
    fn paint(&mut self, canvas: &dyn Canvas, context: &mut dyn DrawingContext, rotation: Rotation);
}

impl<F> PaintRoutine for F
where
    F: FnMut(&dyn Canvas, &mut dyn DrawingContext, Rotation),
{
    fn paint(&mut self, canvas: &dyn Canvas, context: &mut dyn DrawingContext, rotation: Rotation) {
        self(canvas, context, rotation)
    }
}

/// Default paint routine: clears the canvas and draws a single square marker in a random
/// palette color.
pub struct MarkerPainter {
    palette: Palette,
    marker: [f64; 4],
    rng: Box<dyn RngCore>,
}

impl MarkerPainter {
    /// Position and size of the marker: `x, y, width, height`.
    pub const DEFAULT_MARKER: [f64; 4] = [10.0, 10.0, 50.0, 50.0];

    /// Creates a painter with the default palette and an entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Creates a painter with a deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Creates a painter with the given generator.
    pub fn with_rng(rng: impl RngCore + 'static) -> Self {
        Self {
            palette: Palette::default(),
            marker: Self::DEFAULT_MARKER,
            rng: Box::new(rng),
        }
    }

    /// Replaces the palette.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Replaces the marker rectangle.
    pub fn with_marker(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.marker = [x, y, width, height];
        self
    }

    /// Palette the marker color is picked from.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

impl Default for MarkerPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintRoutine for MarkerPainter {
    fn paint(
        &mut self,
        canvas: &dyn Canvas,
        context: &mut dyn DrawingContext,
        _rotation: Rotation,
    ) {
        let size = canvas.bounding_size();
        context.clear_rect(0.0, 0.0, size.width(), size.height());

        let color = self.palette.pick(&mut self.rng);
        let [x, y, width, height] = self.marker;
        context.set_fill_color(color);
        context.fill_rect(x, y, width, height);
    }
}

impl fmt::Debug for MarkerPainter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerPainter")
            .field("palette", &self.palette)
            .field("marker", &self.marker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{DrawCommand, HeadlessCanvas, RecordingContext};

    #[test]
    fn pick_covers_whole_palette_and_stays_in_bounds() {
        let palette = Palette::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            let color = palette.pick(&mut rng);
            assert!(palette.colors().contains(&color));
            seen.insert(color);
        }

        assert_eq!(seen.len(), palette.colors().len());
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert!(Palette::new(vec![]).is_none());
        assert!(Palette::new(vec![Color::RED]).is_some());
    }

    #[test]
    fn marker_painter_clears_then_fills() {
        let canvas = HeadlessCanvas::new(300.0, 400.0);
        let (mut context, log) = RecordingContext::new();
        let mut painter = MarkerPainter::seeded(1);

        painter.paint(&canvas, &mut context, Rotation::default());

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
        let DrawCommand::SetFillColor(color) = commands[1] else {
            panic!("expected fill color, got {:?}", commands[1]);
        };
        assert!(Palette::default().colors().contains(&color));
        assert_eq!(
            commands[2],
            DrawCommand::FillRect {
                x: 10.0,
                y: 10.0,
                width: 50.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn single_color_palette_is_deterministic() {
        let canvas = HeadlessCanvas::new(20.0, 20.0);
        let (mut context, log) = RecordingContext::new();
        let mut painter = MarkerPainter::new()
            .with_palette(Palette::new(vec![Color::PURPLE]).expect("non-empty"))
            .with_marker(1.0, 2.0, 3.0, 4.0);

        painter.paint(&canvas, &mut context, Rotation::new(90.0));

        assert!(log
            .commands()
            .contains(&DrawCommand::SetFillColor(Color::PURPLE)));
    }

    #[test]
    fn closures_are_paint_routines() {
        let canvas = HeadlessCanvas::new(5.0, 5.0);
        let (mut context, log) = RecordingContext::new();
        let mut routine = |_: &dyn Canvas, ctx: &mut dyn DrawingContext, rotation: Rotation| {
            ctx.fill_rect(rotation.degrees(), 0.0, 1.0, 1.0)
        };

        PaintRoutine::paint(&mut routine, &canvas, &mut context, Rotation::new(12.0));

        assert_eq!(
            log.commands(),
            vec![DrawCommand::FillRect {
                x: 12.0,
                y: 0.0,
                width: 1.0,
                height: 1.0
            }]
        );
    }
}
