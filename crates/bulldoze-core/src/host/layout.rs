//! Memory layout of the host objects the hooks read and write.
//!
//! The host never exposes these objects through a public interface, so their
//! layout is pinned to the one supported executable and checked at compile
//! time. Host pointers are stored as `u32` so the shadow structures have the
//! same size and offsets on every build target.
//!
//! # cSC4ViewInputControlDemolish
//!
//! ```text
//! Offset   Field                         Size
//! ─────────────────────────────────────────────
//! 0x00     vtable                        4
//! 0x04     initialized                   1
//! 0x08     ref_count                     4
//! 0x0C     id                            4
//! 0x10     cursor_id                     4
//! 0x14     cursor .. win_mgr             16
//! 0x24     unknown1                      4
//! 0x28     budget_sim                    4
//! 0x2C     city                          4
//! 0x30     demolition                    4
//! 0x34     lot_developer                 4
//! 0x38     lot_manager                   4
//! 0x3C     demolishable_occupant_filter  4
//! 0x40     occupant_manager              4
//! 0x44     cell_picked                   1
//! 0x45     unknown2                      27
//! 0x60     cell_point_x / cell_point_z   8     drag origin
//! 0x68     cell_region                   4     SC4CellRegion<int32_t>*
//! 0x6C     valid_demolition_target       1
//! 0x70     selected_occupant             4
//! 0x74     unknown3                      28
//! 0x90     marked_cell_view              4
//! 0x94     sign_post_occupant            1
//! 0x98     destroy_ok                    16    RGBA f32
//! 0xA8     destroy_not_ok                16
//! 0xB8     demolish_ok                   16
//! 0xC8     demolish_not_ok               16
//! 0xD8     (end)
//! ```

use std::mem::{offset_of, size_of};

use crate::colors::Color;
use crate::region::{CellPoint, CellRect};

/// Pointer in the host's 32-bit address space
pub type HostPtr = u32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DemolishControlLayout {
    pub vtable: HostPtr,
    pub initialized: u8,
    pub ref_count: u32,
    pub id: u32,
    pub cursor_id: u32,
    pub cursor: HostPtr,
    pub window: HostPtr,
    pub view3d_win: HostPtr,
    pub win_mgr: HostPtr,
    pub unknown1: u32,
    pub budget_sim: HostPtr,
    pub city: HostPtr,
    pub demolition: HostPtr,
    pub lot_developer: HostPtr,
    pub lot_manager: HostPtr,
    pub demolishable_occupant_filter: HostPtr,
    pub occupant_manager: HostPtr,
    pub cell_picked: u8,
    pub unknown2: [u8; 27],
    pub cell_point_x: i32,
    pub cell_point_z: i32,
    pub cell_region: HostPtr,
    pub valid_demolition_target: u8,
    pub selected_occupant: HostPtr,
    pub unknown3: [u8; 28],
    pub marked_cell_view: HostPtr,
    pub sign_post_occupant: u8,
    pub destroy_ok: Color,
    pub destroy_not_ok: Color,
    pub demolish_ok: Color,
    pub demolish_not_ok: Color,
}

pub const DEMOLISH_CONTROL_SIZE: usize = 0xD8;

const _: () = {
    assert!(size_of::<DemolishControlLayout>() == DEMOLISH_CONTROL_SIZE);
    assert!(offset_of!(DemolishControlLayout, id) == 0x0C);
    assert!(offset_of!(DemolishControlLayout, cursor_id) == 0x10);
    assert!(offset_of!(DemolishControlLayout, budget_sim) == 0x28);
    assert!(offset_of!(DemolishControlLayout, demolition) == 0x30);
    assert!(offset_of!(DemolishControlLayout, occupant_manager) == 0x40);
    assert!(offset_of!(DemolishControlLayout, cell_picked) == 0x44);
    assert!(offset_of!(DemolishControlLayout, cell_point_x) == 0x60);
    assert!(offset_of!(DemolishControlLayout, cell_point_z) == 0x64);
    assert!(offset_of!(DemolishControlLayout, cell_region) == 0x68);
    assert!(offset_of!(DemolishControlLayout, marked_cell_view) == 0x90);
    assert!(offset_of!(DemolishControlLayout, destroy_ok) == 0x98);
    assert!(offset_of!(DemolishControlLayout, demolish_ok) == 0xB8);
};

/// Rectangle of a host cell region, inclusive on both ends
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostRect {
    pub top_left_x: i32,
    pub top_left_z: i32,
    pub bottom_right_x: i32,
    pub bottom_right_z: i32,
}

impl From<HostRect> for CellRect {
    fn from(rect: HostRect) -> Self {
        CellRect::from_corners(
            CellPoint::new(rect.top_left_x, rect.top_left_z),
            CellPoint::new(rect.bottom_right_x, rect.bottom_right_z),
        )
    }
}

/// Backing store of a host cell region: `width * height` bools, row-major by z
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCellMap {
    pub width: u32,
    pub height: u32,
    pub data: HostPtr,
}

/// `SC4CellRegion<int32_t>`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CellRegionLayout {
    pub bounds: HostRect,
    pub cell_map: HostCellMap,
}

impl CellRegionLayout {
    /// Bounds and cell count, or `None` when the cell map does not cover
    /// the bounds exactly.
    pub fn checked_cells(&self) -> Option<(CellRect, usize)> {
        let bounds = CellRect::from(self.bounds);
        let width = self.cell_map.width as usize;
        let len = width.checked_mul(self.cell_map.height as usize)?;

        (self.cell_map.data != 0 && width == bounds.width() && len == bounds.cell_count())
            .then_some((bounds, len))
    }
}

const _: () = {
    assert!(size_of::<HostRect>() == 0x10);
    assert!(offset_of!(CellRegionLayout, cell_map) == 0x10);
    assert!(offset_of!(HostCellMap, data) == 0x08);
    assert!(size_of::<CellRegionLayout>() == 0x1C);
};

/// Read/write view over a host-owned demolish control.
///
/// The host allocates and frees the object; the view only touches fields.
pub struct ControlView<'a> {
    raw: &'a mut DemolishControlLayout,
}

impl<'a> ControlView<'a> {
    pub fn new(raw: &'a mut DemolishControlLayout) -> Self {
        Self { raw }
    }

    /// # Safety
    ///
    /// `ptr` must be null or point to a live `cSC4ViewInputControlDemolish`
    /// of the supported host version that is not accessed elsewhere for `'a`.
    pub unsafe fn from_ptr(ptr: *mut DemolishControlLayout) -> Option<Self> {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr.as_mut() }.map(Self::new)
    }

    pub fn id(&self) -> u32 {
        self.raw.id
    }

    pub fn cursor_id(&self) -> u32 {
        self.raw.cursor_id
    }

    pub fn is_cell_picked(&self) -> bool {
        self.raw.cell_picked != 0
    }

    /// Cell where the current drag started
    pub fn drag_origin(&self) -> CellPoint {
        CellPoint::new(self.raw.cell_point_x, self.raw.cell_point_z)
    }

    pub fn demolition(&self) -> HostPtr {
        self.raw.demolition
    }

    pub fn cell_region(&self) -> HostPtr {
        self.raw.cell_region
    }

    pub fn demolish_ok_color(&self) -> Color {
        self.raw.demolish_ok
    }

    pub fn set_demolish_ok_color(&mut self, color: Color) {
        self.raw.demolish_ok = color;
    }
}
