//! Cell regions: the set of map cells a bulldoze gesture affects.

pub mod diagonal;

pub use diagonal::{Corner, Thickness, build_diagonal, line_cells, resolve_start_corner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CellPoint {
    pub x: i32,
    pub z: i32,
}

impl CellPoint {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Axis-aligned rectangle of cells, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl CellRect {
    /// Build from already ordered bounds.
    pub const fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    /// Build from any two opposite corners.
    pub fn from_corners(a: CellPoint, b: CellPoint) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_z: a.z.min(b.z),
            max_x: a.x.max(b.x),
            max_z: a.z.max(b.z),
        }
    }

    pub fn width(&self) -> usize {
        (self.max_x - self.min_x + 1).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.max_z - self.min_z + 1).max(0) as usize
    }

    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, point: CellPoint) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_z..=self.max_z).contains(&point.z)
    }

    /// Row-major index of `point`, `None` when outside.
    pub fn index_of(&self, point: CellPoint) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let column = (point.x - self.min_x) as usize;
        let row = (point.z - self.min_z) as usize;
        Some(row * self.width() + column)
    }

    pub fn point_at(&self, index: usize) -> CellPoint {
        let width = self.width().max(1);
        CellPoint::new(
            self.min_x + (index % width) as i32,
            self.min_z + (index / width) as i32,
        )
    }

    pub fn corner(&self, corner: Corner) -> CellPoint {
        match corner {
            Corner::TopLeft => CellPoint::new(self.min_x, self.min_z),
            Corner::TopRight => CellPoint::new(self.max_x, self.min_z),
            Corner::BottomLeft => CellPoint::new(self.min_x, self.max_z),
            Corner::BottomRight => CellPoint::new(self.max_x, self.max_z),
        }
    }
}

/// A selection whose cell values can be rewritten in place.
///
/// Implemented by [`CellRegion`] and by the plugin's view over the host's
/// region object; the backing buffer is never reallocated.
pub trait CellSelection {
    fn bounds(&self) -> CellRect;

    /// Row-major cell values covering [`bounds`](Self::bounds)
    fn cells(&self) -> &[bool];

    fn cells_mut(&mut self) -> &mut [bool];
}

/// Bounding rectangle plus a selected flag per cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRegion {
    bounds: CellRect,
    cells: Vec<bool>,
}

impl CellRegion {
    /// Region with no cell selected
    pub fn empty(bounds: CellRect) -> Self {
        Self {
            bounds,
            cells: vec![false; bounds.cell_count()],
        }
    }

    /// Region with every cell of `bounds` selected
    pub fn rectangle(bounds: CellRect) -> Self {
        Self {
            bounds,
            cells: vec![true; bounds.cell_count()],
        }
    }

    pub fn is_selected(&self, point: CellPoint) -> bool {
        self.bounds
            .index_of(point)
            .is_some_and(|index| self.cells[index])
    }

    /// Set one cell; points outside the bounds are ignored.
    pub fn set(&mut self, point: CellPoint, selected: bool) -> bool {
        match self.bounds.index_of(point) {
            Some(index) => {
                self.cells[index] = selected;
                true
            }
            None => false,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.cells.iter().filter(|&&selected| selected).count()
    }

    pub fn selected_cells(&self) -> impl Iterator<Item = CellPoint> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, selected)| **selected)
            .map(|(index, _)| self.bounds.point_at(index))
    }
}

impl CellSelection for CellRegion {
    fn bounds(&self) -> CellRect {
        self.bounds
    }

    fn cells(&self) -> &[bool] {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.cells
    }
}

/// Copy `source` into the existing cells of `target`.
///
/// Cells of `target` that `source` does not cover are cleared. The target
/// keeps its bounds and its buffer.
pub fn overwrite_selection<S: CellSelection + ?Sized>(target: &mut S, source: &CellRegion) {
    let bounds = target.bounds();
    for (index, cell) in target.cells_mut().iter_mut().enumerate() {
        *cell = source.is_selected(bounds.point_at(index));
    }
}
