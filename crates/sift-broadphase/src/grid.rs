//! Uniform grid broad-phase.
//!
//! The world `[0, map_width) x [0, map_height)` is split into `cols x rows`
//! fixed-size cells. An entity is registered in every cell its bounds cover,
//! and a query collects the contents of every cell the query rectangle covers.
//!
//! Cell ranges are computed per axis as
//!
//! ```text
//! near = clamp(floor(origin) / cell_size, 0, count - 1)
//! far  = clamp((ceil(origin + extent) - 1) / cell_size, 0, count - 1)
//! ```
//!
//! using truncating integer division. The `- 1` keeps an edge that lands
//! exactly on a cell boundary from claiming the next cell. Anything outside
//! the world clamps onto the boundary cells instead of being rejected, so
//! off-world entities share candidates with whatever sits on the edge.

use std::fmt;
use std::hash::Hash;

use sift_geom::{CellCoord, CellRange, Rect, cell_index};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::GridConfig;
use crate::entity::Bounded;
use crate::error::ConfigResult;
use crate::resolver::BroadPhase;

/// Handles registered in one cell. Duplicates are allowed.
type Cell<H> = SmallVec<[H; 4]>;

/// Snapshot of how full a grid is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridOccupancy {
    /// Total (entity, cell) entries.
    pub registrations: usize,
    /// Cells holding at least one entry.
    pub occupied_cells: usize,
    /// Insertions since the last clear whose bounds lay wholly outside the world.
    pub clamped_inserts: usize,
}

/// Fixed-size uniform grid resolver.
pub struct UniformGrid<H> {
    config: GridConfig,
    cols: u32,
    rows: u32,
    /// Row-major: index `row * cols + col`.
    cells: Vec<Cell<H>>,
    registrations: usize,
    clamped_inserts: usize,
}

impl<H: fmt::Debug> fmt::Debug for UniformGrid<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformGrid")
            .field("config", &self.config)
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}

impl<H: Copy + Eq + Hash + fmt::Debug> UniformGrid<H> {
    /// Create an empty grid covering the configured world.
    pub fn new(config: GridConfig) -> ConfigResult<Self> {
        config.validate()?;
        let (cols, rows) = (config.cols(), config.rows());
        debug!(
            map_width = config.map_width,
            map_height = config.map_height,
            cell_width = config.cell_width,
            cell_height = config.cell_height,
            cols,
            rows,
            "built uniform grid"
        );

        Ok(Self {
            config,
            cols,
            rows,
            cells: Self::empty_cells(cols, rows),
            registrations: 0,
            clamped_inserts: 0,
        })
    }

    fn empty_cells(cols: u32, rows: u32) -> Vec<Cell<H>> {
        let count = cols as usize * rows as usize;
        let mut cells = Vec::with_capacity(count);
        cells.resize_with(count, SmallVec::new);
        cells
    }

    /// Replace the world dimensions. The grid is emptied.
    ///
    /// On error the grid is left untouched.
    pub fn rebuild(&mut self, config: GridConfig) -> ConfigResult<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    #[must_use]
    pub const fn config(&self) -> GridConfig {
        self.config
    }

    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub const fn cell_width(&self) -> u32 {
        self.config.cell_width
    }

    #[must_use]
    pub const fn cell_height(&self) -> u32 {
        self.config.cell_height
    }

    /// The nominal world rectangle.
    #[must_use]
    pub fn world(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.config.map_width as f32,
            self.config.map_height as f32,
        )
    }

    /// World-space region of one cell.
    #[must_use]
    pub fn cell_bounds(&self, coord: CellCoord) -> Rect {
        let (w, h) = (self.config.cell_width, self.config.cell_height);
        Rect::new(
            (coord.col * w) as f32,
            (coord.row * h) as f32,
            w as f32,
            h as f32,
        )
    }

    /// Inclusive range of cells covered by `rect`.
    ///
    /// Pure in `rect` and the grid dimensions. A zero-area rectangle maps to
    /// the single cell at its clamped position.
    #[must_use]
    pub fn cell_range(&self, rect: Rect) -> CellRange {
        let (cw, ch) = (self.config.cell_width, self.config.cell_height);
        let min = CellCoord::new(
            cell_index(near_edge(rect.x), cw, self.cols),
            cell_index(near_edge(rect.y), ch, self.rows),
        );
        let max = CellCoord::new(
            cell_index(far_edge(rect.x, rect.width), cw, self.cols),
            cell_index(far_edge(rect.y, rect.height), ch, self.rows),
        );
        CellRange::new(min, max)
    }

    /// Handles registered in one cell, or `None` outside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&[H]> {
        self.slot(coord).map(|slot| self.cells[slot].as_slice())
    }

    #[must_use]
    pub fn occupancy(&self) -> GridOccupancy {
        GridOccupancy {
            registrations: self.registrations,
            occupied_cells: self.cells.iter().filter(|c| !c.is_empty()).count(),
            clamped_inserts: self.clamped_inserts,
        }
    }

    fn slot(&self, coord: CellCoord) -> Option<usize> {
        (coord.col < self.cols && coord.row < self.rows)
            .then(|| coord.row as usize * self.cols as usize + coord.col as usize)
    }

    /// Slot of a coordinate produced by [`Self::cell_range`], which is always
    /// in bounds.
    fn slot_unchecked(&self, coord: CellCoord) -> usize {
        coord.row as usize * self.cols as usize + coord.col as usize
    }

    /// Whether `bounds` reaches into the half-open world. A zero-area rect
    /// counts when its point lies inside.
    fn in_world(&self, bounds: Rect) -> bool {
        let axis = |origin: f32, extent: f32, limit: u32| {
            origin < limit as f32 && (origin + extent > 0.0 || (extent <= 0.0 && origin >= 0.0))
        };
        axis(bounds.x, bounds.width, self.config.map_width)
            && axis(bounds.y, bounds.height, self.config.map_height)
    }

    fn insert_bounds(&mut self, handle: H, bounds: Rect) {
        if !self.in_world(bounds) {
            self.clamped_inserts += 1;
            trace!(?handle, ?bounds, "entity outside world, clamping to boundary cells");
        }

        let range = self.cell_range(bounds);
        for coord in range.iter() {
            let slot = self.slot_unchecked(coord);
            self.cells[slot].push(handle);
        }
        self.registrations += range.cell_count();
    }

    fn remove_bounds(&mut self, handle: H, bounds: Rect) {
        for coord in self.cell_range(bounds).iter() {
            let slot = self.slot_unchecked(coord);
            let cell = &mut self.cells[slot];
            if let Some(pos) = cell.iter().position(|&h| h == handle) {
                cell.swap_remove(pos);
                self.registrations -= 1;
            }
        }
    }
}

impl<H: Copy + Eq + Hash + fmt::Debug> BroadPhase<H> for UniformGrid<H> {
    fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.registrations = 0;
        self.clamped_inserts = 0;
        trace!("uniform grid cleared");
    }

    fn insert<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        self.insert_bounds(entity.handle(), entity.bounds());
    }

    /// Remove the entity from every cell its **current** bounds cover.
    ///
    /// The range is recomputed from `entity.bounds()`, not from the bounds it
    /// was inserted with. If the entity moved in between, cells it was stored
    /// in may be missed (leaving stale entries) and cells it never touched are
    /// visited as no-ops. Use [`BroadPhase::relocate`] or remove before moving.
    fn remove<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E) {
        self.remove_bounds(entity.handle(), entity.bounds());
    }

    fn relocate<E: Bounded<Handle = H> + ?Sized>(&mut self, entity: &E, previous: Rect) {
        let handle = entity.handle();
        self.remove_bounds(handle, previous);
        self.insert_bounds(handle, entity.bounds());
    }

    /// Contents of every covered cell, concatenated. An entity spanning
    /// several covered cells appears once per cell.
    fn retrieve_into(&self, query: Rect, out: &mut Vec<H>) {
        out.clear();
        for coord in self.cell_range(query).iter() {
            out.extend_from_slice(&self.cells[self.slot_unchecked(coord)]);
        }
    }

    /// Number of (entity, cell) entries.
    fn len(&self) -> usize {
        self.registrations
    }
}

fn near_edge(origin: f32) -> i64 {
    origin.floor() as i64
}

/// Last integer coordinate strictly inside `origin + extent`.
///
/// Equal to `floor(origin + extent - 1)` when the far edge is integral; for a
/// fractional far edge it still reaches the cell the edge pokes into.
fn far_edge(origin: f32, extent: f32) -> i64 {
    ((origin + extent).ceil() as i64).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Proxy;

    fn grid() -> UniformGrid<u32> {
        UniformGrid::new(GridConfig::square(480, 480, 48)).unwrap()
    }

    fn entity(id: u32, x: f32, y: f32, w: f32, h: f32) -> Proxy<u32> {
        Proxy::new(id, Rect::new(x, y, w, h))
    }

    #[test]
    fn test_dimensions() {
        let grid = grid();
        assert_eq!((grid.cols(), grid.rows()), (10, 10));
        assert_eq!(grid.world(), Rect::new(0.0, 0.0, 480.0, 480.0));

        let uneven = UniformGrid::<u32>::new(GridConfig::new(100, 50, 48, 48)).unwrap();
        assert_eq!((uneven.cols(), uneven.rows()), (3, 2));
    }

    #[test]
    fn test_single_cell_entity() {
        let mut grid = grid();
        grid.insert(&entity(1, 0.0, 0.0, 48.0, 48.0));

        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
        assert_eq!(grid.cell_range(Rect::new(0.0, 0.0, 48.0, 48.0)).cell_count(), 1);
        assert!(grid.retrieve(Rect::new(48.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_entity_spanning_four_cells() {
        let mut grid = grid();
        grid.insert(&entity(1, 40.0, 40.0, 48.0, 48.0));

        for coord in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(grid.cell(CellCoord::new(coord.0, coord.1)), Some(&[1][..]));
        }
        assert_eq!(grid.cell(CellCoord::new(2, 1)), Some(&[][..]));
        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
        assert_eq!(grid.retrieve(Rect::new(95.0, 95.0, 1.0, 1.0)), vec![1]);
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn test_query_spanning_cells_repeats_entity() {
        let mut grid = grid();
        grid.insert(&entity(1, 40.0, 40.0, 48.0, 48.0));

        let hits = grid.retrieve(Rect::new(0.0, 0.0, 96.0, 96.0));
        assert_eq!(hits, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_out_of_world_clamps_to_corner() {
        let mut grid = grid();
        grid.insert(&entity(7, 500.0, 500.0, 48.0, 48.0));

        assert_eq!(grid.cell(CellCoord::new(9, 9)), Some(&[7][..]));
        assert_eq!(grid.retrieve(Rect::new(470.0, 470.0, 10.0, 10.0)), vec![7]);
        assert_eq!(grid.occupancy().clamped_inserts, 1);
    }

    #[test]
    fn test_edge_touching_entities_count_as_clamped() {
        let mut grid = grid();
        grid.insert(&entity(1, 480.0, 0.0, 10.0, 10.0));
        grid.insert(&entity(2, -10.0, 100.0, 10.0, 10.0));

        assert_eq!(grid.cell(CellCoord::new(9, 0)), Some(&[1][..]));
        assert_eq!(grid.cell(CellCoord::new(0, 2)), Some(&[2][..]));
        assert_eq!(grid.occupancy().clamped_inserts, 2);

        // Inside, or poking in from outside: not clamped.
        grid.insert(&entity(3, 0.0, 0.0, 0.0, 0.0));
        grid.insert(&entity(4, 479.5, 479.5, 0.5, 0.5));
        grid.insert(&entity(5, -10.0, -10.0, 10.5, 10.5));
        assert_eq!(grid.occupancy().clamped_inserts, 2);
    }

    #[test]
    fn test_negative_coordinates_clamp_to_origin() {
        let mut grid = grid();
        grid.insert(&entity(3, -100.0, -100.0, 20.0, 20.0));

        assert_eq!(grid.cell(CellCoord::new(0, 0)), Some(&[3][..]));
        assert_eq!(grid.retrieve(Rect::new(-5000.0, 10.0, 1.0, 1.0)), vec![3]);
    }

    #[test]
    fn test_remove_with_unchanged_bounds() {
        let mut grid = grid();
        let e = entity(1, 0.0, 0.0, 10.0, 10.0);
        grid.insert(&e);
        grid.remove(&e);

        assert!(grid.retrieve(Rect::new(0.0, 0.0, 48.0, 48.0)).is_empty());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut grid = grid();
        grid.insert(&entity(1, 0.0, 0.0, 10.0, 10.0));
        grid.remove(&entity(2, 0.0, 0.0, 10.0, 10.0));

        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
    }

    #[test]
    fn test_double_insert_needs_double_remove() {
        let mut grid = grid();
        let e = entity(1, 0.0, 0.0, 10.0, 10.0);
        grid.insert(&e);
        grid.insert(&e);
        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1, 1]);

        grid.remove(&e);
        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
        grid.remove(&e);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_remove_after_move_uses_current_bounds() {
        let mut grid = grid();
        let mut e = entity(1, 0.0, 0.0, 10.0, 10.0);
        grid.insert(&e);

        // Moved without telling the grid: removal looks in the wrong cell.
        e.bounds = Rect::new(200.0, 200.0, 10.0, 10.0);
        grid.remove(&e);
        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
        assert!(grid.retrieve(Rect::new(200.0, 200.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_relocate_moves_between_cells() {
        let mut grid = grid();
        let mut e = entity(1, 0.0, 0.0, 10.0, 10.0);
        grid.insert(&e);

        let previous = e.bounds;
        e.bounds = Rect::new(200.0, 200.0, 10.0, 10.0);
        grid.relocate(&e, previous);

        assert!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)).is_empty());
        assert_eq!(grid.retrieve(Rect::new(200.0, 200.0, 1.0, 1.0)), vec![1]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut grid = grid();
        let (a, b) = (entity(1, 0.0, 0.0, 10.0, 10.0), entity(2, 300.0, 20.0, 100.0, 100.0));
        grid.insert_all([&a, &b]);
        grid.clear();

        assert!(grid.retrieve(grid.world()).is_empty());
        assert_eq!(grid.occupancy(), GridOccupancy::default());
    }

    #[test]
    fn test_degenerate_query_hits_single_cell() {
        let mut grid = grid();
        grid.insert(&entity(1, 0.0, 0.0, 48.0, 48.0));
        grid.insert(&entity(2, 48.0, 0.0, 48.0, 48.0));

        // A point on the boundary between cell 0 and cell 1 lands in cell 1.
        let point = Rect::new(48.0, 10.0, 0.0, 0.0);
        assert_eq!(grid.cell_range(point).cell_count(), 1);
        assert_eq!(grid.retrieve(point), vec![2]);
        assert_eq!(grid.retrieve(Rect::new(20.0, 20.0, 0.0, 0.0)), vec![1]);
    }

    #[test]
    fn test_fractional_far_edge_reaches_next_cell() {
        let mut grid = grid();
        grid.insert(&entity(1, 47.5, 0.0, 1.0, 1.0));

        assert_eq!(grid.retrieve(Rect::new(48.0, 0.0, 1.0, 1.0)), vec![1]);
        assert_eq!(grid.retrieve(Rect::new(0.0, 0.0, 1.0, 1.0)), vec![1]);
    }

    #[test]
    fn test_retrieve_into_overwrites() {
        let mut grid = grid();
        grid.insert(&entity(1, 0.0, 0.0, 10.0, 10.0));
        grid.insert(&entity(2, 300.0, 300.0, 10.0, 10.0));

        let mut out = vec![99, 98, 97];
        grid.retrieve_into(Rect::new(0.0, 0.0, 1.0, 1.0), &mut out);
        assert_eq!(out, vec![1]);
        grid.retrieve_into(Rect::new(300.0, 300.0, 1.0, 1.0), &mut out);
        assert_eq!(out, vec![2]);
    }

    #[test]
    fn test_rebuild_changes_dimensions() {
        let mut grid = grid();
        grid.insert(&entity(1, 0.0, 0.0, 10.0, 10.0));

        grid.rebuild(GridConfig::square(960, 480, 96)).unwrap();
        assert_eq!((grid.cols(), grid.rows()), (10, 5));
        assert!(grid.is_empty());

        assert!(grid.rebuild(GridConfig::square(960, 480, 0)).is_err());
        assert_eq!((grid.cols(), grid.rows()), (10, 5));
    }

    #[test]
    fn test_occupancy_counts() {
        let mut grid = grid();
        grid.insert(&entity(1, 40.0, 40.0, 48.0, 48.0));
        grid.insert(&entity(2, 0.0, 0.0, 10.0, 10.0));

        let occupancy = grid.occupancy();
        assert_eq!(occupancy.registrations, 5);
        assert_eq!(occupancy.occupied_cells, 4);
        assert_eq!(occupancy.clamped_inserts, 0);
    }

    #[test]
    fn test_cell_outside_grid_is_none() {
        let grid = grid();
        assert!(grid.cell(CellCoord::new(10, 0)).is_none());
        assert_eq!(grid.cell_bounds(CellCoord::new(2, 3)), Rect::new(96.0, 144.0, 48.0, 48.0));
    }
}
