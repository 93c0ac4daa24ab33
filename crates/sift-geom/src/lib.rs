//! Geometry primitives for sift broad-phase.
//!
//! - [`Rect`]: axis-aligned bounding rectangle in world space.
//! - [`CellCoord`] / [`CellRange`]: integer addressing for uniform grids.
//! - [`cell_index`]: the per-axis truncate-and-clamp mapping from world to cell.

pub mod cell;
pub mod rect;

pub use cell::{CellCoord, CellRange, cell_index};
pub use rect::Rect;
