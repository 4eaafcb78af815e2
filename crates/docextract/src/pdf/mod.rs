//! PDF helpers shared by the PDF extractors.

pub mod rendering;
pub mod text;

pub use rendering::{PageRasterizer, PdftoppmRasterizer, RasterizedPage};
