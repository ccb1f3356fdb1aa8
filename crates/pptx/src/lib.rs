//! PPTX (Office Open XML) deck model and writer for TCFD report tables.
//!
//! Decks are built in memory from slides holding styled grids, optionally
//! styled by a seed template, and serialised as ZIP archives of XML parts.

pub mod deck;
mod defaults;
pub mod grid;
pub mod seed;
pub mod writer;

pub use deck::{inches, Deck, Shape, Slide, EMU_PER_INCH};
pub use grid::{init_grid, Align, Anchor, Cell, FillSpec, Grid, Merge, Rgb, TextStyle};
pub use seed::StyleSeed;
pub use writer::PptxWriter;
