//! Diagonal selection: a thick line across the drag rectangle.
//!
//! The line runs from the corner the drag started at to the opposite corner
//! and is rasterized with Bresenham's algorithm. Each line cell is widened
//! into a band of `|thickness|` cells perpendicular to the dominant axis:
//!
//! ```text
//! width >= height, thickness = 2     height > width, thickness = -2
//!
//!   x . . . . .                        x . .
//!   x x x . . .                        x x .
//!   . x x x x .                        x x .
//!   . . . x x x                        . x x
//!                                      . x x
//! ```

use std::fmt;

use super::{CellPoint, CellRect, CellRegion};

/// Signed line thickness in `[-5, -1] ∪ [1, 5]`.
///
/// Positive values extend the band towards increasing coordinates,
/// negative values towards decreasing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Thickness(i8);

impl Thickness {
    pub const MIN: i8 = -5;
    pub const MAX: i8 = 5;

    /// Steps that always reach either end from anywhere
    const STEPS_ACROSS: i32 = 10;

    pub const fn new(value: i8) -> Option<Self> {
        if value == 0 || value < Self::MIN || value > Self::MAX {
            None
        } else {
            Some(Self(value))
        }
    }

    pub const fn get(self) -> i8 {
        self.0
    }

    /// Band width in cells
    pub const fn width(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// One step up, `-1` goes straight to `1`, stays at [`MAX`](Self::MAX).
    pub const fn increase(self) -> Self {
        match self.0 {
            -1 => Self(1),
            Self::MAX => self,
            value => Self(value + 1),
        }
    }

    /// One step down, `1` goes straight to `-1`, stays at [`MIN`](Self::MIN).
    pub const fn decrease(self) -> Self {
        match self.0 {
            1 => Self(-1),
            Self::MIN => self,
            value => Self(value - 1),
        }
    }

    /// Apply `notches` single steps, positive increases.
    pub fn step(self, notches: i32) -> Self {
        let notches = notches.clamp(-Self::STEPS_ACROSS, Self::STEPS_ACROSS);
        let mut value = self;
        for _ in 0..notches.unsigned_abs() {
            value = if notches > 0 {
                value.increase()
            } else {
                value.decrease()
            };
        }
        value
    }

    /// Offsets of the band cells relative to the line cell
    fn offsets(self) -> impl Iterator<Item = i32> {
        let sign = i32::from(self.0.signum());
        (0..self.width() as i32).map(move |i| i * sign)
    }
}

impl Default for Thickness {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for Thickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Corner of a [`CellRect`]; "top" is the minimum z side, "left" the minimum x side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    fn from_sides(left: bool, top: bool) -> Self {
        match (left, top) {
            (true, true) => Corner::TopLeft,
            (false, true) => Corner::TopRight,
            (true, false) => Corner::BottomLeft,
            (false, false) => Corner::BottomRight,
        }
    }
}

/// Whether `value` belongs to the low side of `[min, max]`.
///
/// Outside the range the side is pinned, inside it is split at the midpoint.
fn is_low_side(value: i32, min: i32, max: i32) -> bool {
    if value < min {
        true
    } else if value > max {
        false
    } else {
        2 * i64::from(value) <= i64::from(min) + i64::from(max)
    }
}

/// Corner the diagonal starts from.
pub fn resolve_start_corner(bounds: &CellRect, origin: Option<CellPoint>) -> Corner {
    let Some(origin) = origin else {
        return Corner::TopLeft;
    };

    if let Some(corner) = Corner::ALL
        .into_iter()
        .find(|&corner| bounds.corner(corner) == origin)
    {
        return corner;
    }

    Corner::from_sides(
        is_low_side(origin.x, bounds.min_x, bounds.max_x),
        is_low_side(origin.z, bounds.min_z, bounds.max_z),
    )
}

/// Cells of the Bresenham line from `start` to `end`, both included.
pub fn line_cells(start: CellPoint, end: CellPoint) -> Vec<CellPoint> {
    let dx = (end.x - start.x).abs();
    let dz = -(end.z - start.z).abs();
    let step_x = if start.x < end.x { 1 } else { -1 };
    let step_z = if start.z < end.z { 1 } else { -1 };

    let mut cells = Vec::with_capacity(dx.max(-dz) as usize + 1);
    let mut err = dx + dz;
    let (mut x, mut z) = (start.x, start.z);

    loop {
        cells.push(CellPoint::new(x, z));
        if x == end.x && z == end.z {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dz {
            err += dz;
            x += step_x;
        }
        if e2 <= dx {
            err += dx;
            z += step_z;
        }
    }

    cells
}

/// Build the diagonal selection for `bounds`.
pub fn build_diagonal(
    bounds: CellRect,
    origin: Option<CellPoint>,
    thickness: Thickness,
) -> CellRegion {
    let mut region = CellRegion::empty(bounds);
    if bounds.cell_count() == 0 {
        return region;
    }

    let start = resolve_start_corner(&bounds, origin);
    let line = line_cells(bounds.corner(start), bounds.corner(start.opposite()));
    let vertical_band = bounds.width() >= bounds.height();

    for cell in line {
        for offset in thickness.offsets() {
            let point = if vertical_band {
                CellPoint::new(cell.x, cell.z + offset)
            } else {
                CellPoint::new(cell.x + offset, cell.z)
            };
            region.set(point, true);
        }
    }

    region
}
