//! Pre-styled table grids.
//!
//! A grid is a fixed row/column table placed on one slide. Renderers draw
//! banners, headers and label cells with [`Grid::set_cell`] and
//! [`Grid::merge_cells`], then pour generated content into the remaining
//! columns with [`Grid::fill_rows_with_rows`].

use crate::deck::{inches, Shape, Slide};
use tcfd_core::{ContentRow, Error, Result};

/// Table offset from the slide's left edge, in inches.
pub const GRID_LEFT_IN: f64 = 0.5;
/// Table offset from the slide's top edge, in inches.
pub const GRID_TOP_IN: f64 = 1.0;
/// Table height, in inches.
pub const GRID_HEIGHT_IN: f64 = 4.5;

/// Font used for every run.
pub const FONT_FACE: &str = "Arial";

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Banner and plain row background.
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    /// Column header background.
    pub const HEADER: Rgb = Rgb(0xEF, 0xEF, 0xEF);
    /// Alternate row background.
    pub const STRIPE: Rgb = Rgb(0xF7, 0xF7, 0xF7);
    /// Body text.
    pub const TEXT: Rgb = Rgb(0x33, 0x33, 0x33);
    /// Banner text.
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

    /// Upper-case hex form, e.g. `333333`.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Flush with the left cell margin.
    Left,
    /// Centered between the margins.
    Center,
    /// Flush with the right cell margin.
    Right,
}

/// Vertical text anchor inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Text starts at the top of the cell.
    Top,
    /// Text is centered vertically.
    Middle,
    /// Text sits on the bottom of the cell.
    Bottom,
}

/// Run formatting for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    /// Font size in points.
    pub size: u32,
    /// Bold run weight.
    pub bold: bool,
    /// Text color.
    pub color: Rgb,
    /// Horizontal alignment of the paragraph.
    pub align: Align,
}

impl TextStyle {
    /// Centered, regular, black text of the given size.
    pub const fn new(size: u32) -> Self {
        Self {
            size,
            bold: false,
            color: Rgb::BLACK,
            align: Align::Center,
        }
    }

    pub const fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub const fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub const fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Merge state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Merge {
    /// A standalone cell.
    #[default]
    None,
    /// Top-left cell of a merged region.
    Origin { row_span: usize, col_span: usize },
    /// A cell swallowed by a merged region.
    Covered { horizontal: bool, vertical: bool },
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    text: String,
    style: TextStyle,
    fill: Option<Rgb>,
    anchor: Anchor,
    borders: bool,
    merge: Merge,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            text: String::new(),
            style: TextStyle::default(),
            fill: None,
            anchor: Anchor::Top,
            borders: true,
            merge: Merge::None,
        }
    }
}

impl Cell {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn fill(&self) -> Option<Rgb> {
        self.fill
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Whether the default table borders are still drawn.
    pub fn has_borders(&self) -> bool {
        self.borders
    }

    pub fn merge(&self) -> Merge {
        self.merge
    }
}

/// How generated rows are poured into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillSpec {
    /// First column that receives generated content.
    pub first_column: usize,
    /// Style for generated text before shrinking.
    pub style: TextStyle,
    /// Anchor for generated cells.
    pub anchor: Anchor,
    /// Character count above which the font shrinks.
    pub shrink_threshold: usize,
    /// Points removed from the font size for long content.
    pub shrink_step: u32,
    /// Smallest size shrinking may reach.
    pub min_size: u32,
}

impl Default for FillSpec {
    fn default() -> Self {
        Self {
            first_column: 3,
            style: TextStyle::new(9).color(Rgb::TEXT).align(Align::Left),
            anchor: Anchor::Top,
            shrink_threshold: 120,
            shrink_step: 1,
            min_size: 7,
        }
    }
}

impl FillSpec {
    /// Font size for a piece of content.
    pub fn size_for(&self, text: &str) -> u32 {
        if text.chars().count() > self.shrink_threshold {
            self.style
                .size
                .saturating_sub(self.shrink_step)
                .max(self.min_size)
        } else {
            self.style.size
        }
    }
}

/// A fixed grid of cells placed on a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    x: i64,
    y: i64,
    col_widths: Vec<i64>,
    row_heights: Vec<i64>,
    cells: Vec<Vec<Cell>>,
}

/// Add a `rows` x `cols` grid to a slide with column widths in inches.
///
/// Every border is stripped so the table relies on fills alone.
pub fn init_grid<'a>(
    slide: &'a mut Slide,
    rows: usize,
    cols: usize,
    widths: &[f64],
) -> Result<&'a mut Grid> {
    let mut grid = Grid::new(rows, cols, widths)?;
    grid.strip_all_borders();

    let index = slide.add_shape(Shape::Table(grid));
    match slide.shape_mut(index) {
        Some(Shape::Table(grid)) => Ok(grid),
        None => Err(Error::Template("grid vanished from slide".to_string())),
    }
}

impl Grid {
    /// Create a detached grid at the standard position.
    pub fn new(rows: usize, cols: usize, widths: &[f64]) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::Template(format!(
                "grid needs at least one row and column, got {rows}x{cols}"
            )));
        }
        if widths.len() != cols {
            return Err(Error::Template(format!(
                "{} column widths given for {cols} columns",
                widths.len()
            )));
        }

        let row_height = inches(GRID_HEIGHT_IN) / rows as i64;
        Ok(Self {
            x: inches(GRID_LEFT_IN),
            y: inches(GRID_TOP_IN),
            col_widths: widths.iter().map(|w| inches(*w)).collect(),
            row_heights: vec![row_height; rows],
            cells: vec![vec![Cell::default(); cols]; rows],
        })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.col_widths.len()
    }

    /// Offset from the slide origin in EMU.
    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Column widths in EMU.
    pub fn col_widths(&self) -> &[i64] {
        &self.col_widths
    }

    /// Row heights in EMU.
    pub fn row_heights(&self) -> &[i64] {
        &self.row_heights
    }

    /// Total size in EMU.
    pub fn extent(&self) -> (i64, i64) {
        (
            self.col_widths.iter().sum(),
            self.row_heights.iter().sum(),
        )
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Cells of one row.
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell> {
        let (rows, cols) = (self.rows(), self.cols());
        self.cells
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or_else(|| {
                Error::Template(format!("cell ({row}, {col}) outside {rows}x{cols} grid"))
            })
    }

    /// Write text with explicit formatting; the cell is vertically centered.
    pub fn set_cell(&mut self, row: usize, col: usize, text: &str, style: TextStyle) -> Result<()> {
        let cell = self.cell_mut(row, col)?;
        cell.text = text.to_string();
        cell.style = style;
        cell.anchor = Anchor::Middle;
        Ok(())
    }

    /// Replace a cell's text, keeping its formatting.
    pub fn set_text(&mut self, row: usize, col: usize, text: &str) -> Result<()> {
        self.cell_mut(row, col)?.text = text.to_string();
        Ok(())
    }

    pub fn set_fill(&mut self, row: usize, col: usize, color: Rgb) -> Result<()> {
        self.cell_mut(row, col)?.fill = Some(color);
        Ok(())
    }

    /// Fill every cell of a row.
    pub fn fill_row(&mut self, row: usize, color: Rgb) -> Result<()> {
        for col in 0..self.cols() {
            self.set_fill(row, col, color)?;
        }
        Ok(())
    }

    pub fn set_anchor(&mut self, row: usize, col: usize, anchor: Anchor) -> Result<()> {
        self.cell_mut(row, col)?.anchor = anchor;
        Ok(())
    }

    /// Remove the default borders of one cell.
    pub fn strip_borders(&mut self, row: usize, col: usize) -> Result<()> {
        self.cell_mut(row, col)?.borders = false;
        Ok(())
    }

    pub fn strip_all_borders(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.borders = false;
        }
    }

    /// Merge the rectangle spanning `(r1, c1)` to `(r2, c2)` inclusive.
    ///
    /// The top-left cell keeps its content and formatting. Regions may not
    /// overlap an existing merge.
    pub fn merge_cells(&mut self, r1: usize, c1: usize, r2: usize, c2: usize) -> Result<()> {
        if r2 < r1 || c2 < c1 {
            return Err(Error::Template(format!(
                "merge corners ({r1}, {c1}) -> ({r2}, {c2}) are reversed"
            )));
        }
        self.cell_mut(r2, c2)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                if self.cells[r][c].merge != Merge::None {
                    return Err(Error::Template(format!(
                        "cell ({r}, {c}) is already part of a merged region"
                    )));
                }
            }
        }

        for r in r1..=r2 {
            for c in c1..=c2 {
                self.cells[r][c].merge = if r == r1 && c == c1 {
                    Merge::Origin {
                        row_span: r2 - r1 + 1,
                        col_span: c2 - c1 + 1,
                    }
                } else {
                    Merge::Covered {
                        horizontal: c > c1,
                        vertical: r > r1,
                    }
                };
            }
        }
        Ok(())
    }

    /// Pour generated rows into the declared data rows.
    ///
    /// The i-th content row lands in the i-th data row. The description's
    /// optional `label;` prefix is dropped, then description, impact and
    /// action go into successive columns from `spec.first_column`. Data rows
    /// without content are written blank; surplus content rows are ignored.
    /// Returns the number of content rows written.
    pub fn fill_rows_with_rows(
        &mut self,
        data_rows: &[usize],
        rows: &[ContentRow],
        spec: &FillSpec,
    ) -> Result<usize> {
        let cols = self.cols();
        let mut written = 0;

        for (i, &grid_row) in data_rows.iter().enumerate() {
            let values: Vec<&str> = match rows.get(i) {
                Some(content) => {
                    written += 1;
                    std::iter::once(content.description_body())
                        .chain(content.fields()[1..].iter().map(String::as_str))
                        .collect()
                }
                None => Vec::new(),
            };

            for col in spec.first_column..cols {
                let text = values.get(col - spec.first_column).copied().unwrap_or("");
                let style = TextStyle {
                    size: spec.size_for(text),
                    ..spec.style
                };
                self.set_cell(grid_row, col, text, style)?;
                self.set_anchor(grid_row, col, spec.anchor)?;
            }
        }

        if rows.len() > data_rows.len() {
            log::debug!(
                "Ignoring {} surplus content row(s)",
                rows.len() - data_rows.len()
            );
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Slide;

    const WIDTHS: [f64; 6] = [0.9, 1.3, 0.9, 2.7, 2.7, 2.1];

    fn grid() -> Grid {
        let mut slide = Slide::new();
        init_grid(&mut slide, 4, 6, &WIDTHS).unwrap().clone()
    }

    #[test]
    fn test_init_grid_geometry() {
        let g = grid();
        assert_eq!(g.rows(), 4);
        assert_eq!(g.cols(), 6);
        assert_eq!(g.position(), (457_200, 914_400));
        assert_eq!(g.col_widths()[0], inches(0.9));
        assert!(g.row(0).unwrap().iter().all(|c| !c.has_borders()));
    }

    #[test]
    fn test_init_grid_rejects_width_mismatch() {
        let mut slide = Slide::new();
        assert!(init_grid(&mut slide, 4, 6, &[1.0, 2.0]).is_err());
        assert!(slide.shapes().is_empty());
    }

    #[test]
    fn test_set_cell_out_of_range() {
        let mut g = grid();
        let err = g.set_cell(4, 0, "x", TextStyle::new(9)).unwrap_err();
        assert!(err.to_string().contains("(4, 0)"));
    }

    #[test]
    fn test_merge_marks_region() {
        let mut g = grid();
        g.merge_cells(0, 0, 0, 2).unwrap();
        g.merge_cells(2, 0, 3, 0).unwrap();

        assert_eq!(
            g.cell(0, 0).unwrap().merge(),
            Merge::Origin { row_span: 1, col_span: 3 }
        );
        assert_eq!(
            g.cell(0, 2).unwrap().merge(),
            Merge::Covered { horizontal: true, vertical: false }
        );
        assert_eq!(
            g.cell(3, 0).unwrap().merge(),
            Merge::Covered { horizontal: false, vertical: true }
        );
        assert!(g.merge_cells(0, 1, 1, 1).is_err());
    }

    #[test]
    fn test_fill_drops_label_and_writes_columns() {
        let mut g = grid();
        let rows = vec![ContentRow::new(
            "Policy Risk;Carbon tax exposure",
            "$1M",
            "Offsets; Budget: $200K",
        )];
        let written = g.fill_rows_with_rows(&[2, 3], &rows, &FillSpec::default()).unwrap();
        assert_eq!(written, 1);
        assert_eq!(g.cell(2, 3).unwrap().text(), "Carbon tax exposure");
        assert_eq!(g.cell(2, 4).unwrap().text(), "$1M");
        assert_eq!(g.cell(2, 5).unwrap().text(), "Offsets; Budget: $200K");
        assert_eq!(g.cell(2, 3).unwrap().anchor(), Anchor::Top);
        assert_eq!(g.cell(2, 3).unwrap().style().align, Align::Left);
        // Missing second row stays blank.
        assert_eq!(g.cell(3, 3).unwrap().text(), "");
        assert_eq!(g.cell(3, 5).unwrap().text(), "");
    }

    #[test]
    fn test_fill_ignores_surplus_rows() {
        let mut g = grid();
        let rows: Vec<_> = (0..5).map(|i| ContentRow::new(format!("d{i}"), "i", "a")).collect();
        let written = g.fill_rows_with_rows(&[2, 3], &rows, &FillSpec::default()).unwrap();
        assert_eq!(written, 2);
        assert_eq!(g.cell(3, 3).unwrap().text(), "d1");
    }

    #[test]
    fn test_fill_shrinks_long_content() {
        let mut g = grid();
        let long = "x".repeat(121);
        let rows = vec![ContentRow::new(long, "short", "y".repeat(120))];
        g.fill_rows_with_rows(&[2], &rows, &FillSpec::default()).unwrap();
        assert_eq!(g.cell(2, 3).unwrap().style().size, 8);
        assert_eq!(g.cell(2, 4).unwrap().style().size, 9);
        assert_eq!(g.cell(2, 5).unwrap().style().size, 9);
    }

    #[test]
    fn test_fill_rejects_bad_data_row() {
        let mut g = grid();
        let rows = vec![ContentRow::new("a", "b", "c")];
        assert!(g.fill_rows_with_rows(&[7], &rows, &FillSpec::default()).is_err());
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::TEXT.hex(), "333333");
        assert_eq!(Rgb::STRIPE.hex(), "F7F7F7");
    }
}
