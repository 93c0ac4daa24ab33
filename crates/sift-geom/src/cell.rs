//! Integer cell coordinates and inclusive cell ranges.

/// Grid coordinates of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// Inclusive rectangle of cells, `min` to `max` on both axes.
///
/// A range always covers at least one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRange {
    /// Create a range from its corner cells.
    ///
    /// A `max` below `min` on either axis is raised to `min`.
    #[must_use]
    pub fn new(min: CellCoord, max: CellCoord) -> Self {
        Self {
            min,
            max: CellCoord::new(max.col.max(min.col), max.row.max(min.row)),
        }
    }

    /// Range covering exactly one cell.
    #[must_use]
    pub const fn single(coord: CellCoord) -> Self {
        Self {
            min: coord,
            max: coord,
        }
    }

    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.max.col - self.min.col + 1
    }

    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.max.row - self.min.row + 1
    }

    /// Number of cells in the range.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    #[must_use]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.col >= self.min.col
            && coord.col <= self.max.col
            && coord.row >= self.min.row
            && coord.row <= self.max.row
    }

    /// Every cell in the range, column by column.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let (min, max) = (self.min, self.max);
        (min.col..=max.col)
            .flat_map(move |col| (min.row..=max.row).map(move |row| CellCoord::new(col, row)))
    }
}

/// Map an integer world coordinate to a cell index along one axis.
///
/// Truncating division, then clamped to `[0, count - 1]`, so the result is
/// always a valid index however far outside the world `coord` lies.
#[must_use]
pub fn cell_index(coord: i64, cell_size: u32, count: u32) -> u32 {
    debug_assert!(cell_size > 0, "cell size must be positive");
    debug_assert!(count > 0, "axis must have at least one cell");
    let index = coord / i64::from(cell_size);
    index.clamp(0, i64::from(count) - 1) as u32
}
