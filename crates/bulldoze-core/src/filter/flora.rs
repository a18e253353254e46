use super::OccupantFilter;

/// Occupant type id of trees and other flora
pub const FLORA_OCCUPANT_TYPE: u32 = 0x7475_8926;

/// Includes flora only.
///
/// Decided on the type alone; the host never asks about an occupant whose
/// type was rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloraFilter;

impl OccupantFilter for FloraFilter {
    fn is_occupant_type_included(&self, occupant_type: u32) -> bool {
        occupant_type == FLORA_OCCUPANT_TYPE
    }
}
