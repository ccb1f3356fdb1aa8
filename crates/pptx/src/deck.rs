//! In-memory deck model.

use crate::grid::Grid;
use crate::seed::StyleSeed;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Convert inches to EMU.
pub fn inches(value: f64) -> i64 {
    (value * EMU_PER_INCH as f64).round() as i64
}

/// Default slide width (16:9, 13.333in).
pub const DEFAULT_SLIDE_WIDTH: i64 = 12_192_000;

/// Default slide height (7.5in).
pub const DEFAULT_SLIDE_HEIGHT: i64 = 6_858_000;

/// A visual element on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A styled table.
    Table(Grid),
}

/// A single slide: an ordered list of shapes drawn on the blank layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    shapes: Vec<Shape>,
}

impl Slide {
    /// Create an empty slide.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shape and return its index.
    pub fn add_shape(&mut self, shape: Shape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    /// Shapes in drawing order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Mutable access to a shape.
    pub fn shape_mut(&mut self, index: usize) -> Option<&mut Shape> {
        self.shapes.get_mut(index)
    }

    /// Tables on this slide.
    pub fn tables(&self) -> impl Iterator<Item = &Grid> {
        self.shapes.iter().map(|shape| match shape {
            Shape::Table(grid) => grid,
        })
    }
}

/// An ordered sequence of slides plus the optional style seed that
/// supplies masters, layouts and themes when written.
#[derive(Debug, Default)]
pub struct Deck {
    slides: Vec<Slide>,
    seed: Option<StyleSeed>,
}

impl Deck {
    /// Create an empty deck using the built-in master and theme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty deck styled by a seed template.
    ///
    /// The seed never contributes slides; its baseline content was already
    /// dropped when it was loaded.
    pub fn from_seed(seed: StyleSeed) -> Self {
        Self {
            slides: Vec::new(),
            seed: Some(seed),
        }
    }

    /// Append a blank slide and return it.
    pub fn add_slide(&mut self) -> &mut Slide {
        self.slides.push(Slide::new());
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }

    /// Append a new slide holding copies of another slide's shapes.
    ///
    /// Only the visual elements are copied; layout resources stay with the
    /// target deck.
    pub fn append_copy_of(&mut self, source: &Slide) -> &mut Slide {
        let slide = self.add_slide();
        for shape in source.shapes() {
            slide.add_shape(shape.clone());
        }
        slide
    }

    /// Slides in order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// The style seed, if any.
    pub fn seed(&self) -> Option<&StyleSeed> {
        self.seed.as_ref()
    }

    /// Slide width in EMU.
    pub fn slide_width(&self) -> i64 {
        self.seed
            .as_ref()
            .map(|s| s.slide_size().0)
            .unwrap_or(DEFAULT_SLIDE_WIDTH)
    }

    /// Slide height in EMU.
    pub fn slide_height(&self) -> i64 {
        self.seed
            .as_ref()
            .map(|s| s.slide_size().1)
            .unwrap_or(DEFAULT_SLIDE_HEIGHT)
    }
}
