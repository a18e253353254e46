//! Host-side identifiers and the interfaces the tool logic consumes.
//!
//! The hook logic never talks to the host directly: the plugin implements
//! [`DemolishControl`] and [`Demolition`] over the live host objects, tests
//! implement them with plain structs.

pub mod com;
pub mod layout;
pub mod version;

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::colors::Color;
use crate::filter::{OccupantFilter, OccupantFilterKind};
use crate::region::{CellPoint, CellSelection};

pub use com::ComObject;
pub use layout::{CellRegionLayout, ControlView, DemolishControlLayout, HostPtr};
pub use version::{SUPPORTED_GAME_VERSION, check_game_version};

/// Id the host assigns to the bulldoze view input control
pub const BULLDOZE_CONTROL_ID: u32 = 0x46DD_B5F1;

/// Host function entry points (game version 641)
pub mod functions {
    /// `cSC4ViewInputControlDemolish::cSC4ViewInputControlDemolish()`
    pub const DEMOLISH_CONTROL_CTOR: u32 = 0x004B_9070;
    /// `cSC4ViewInputControl::IsOnTop()`
    pub const IS_ON_TOP: u32 = 0x005F_B190;
    /// `cSC4ViewInputControlDemolish::EndInput()`
    pub const END_INPUT: u32 = 0x004B_9040;
    /// `cSC4ViewInputControlDemolish::UpdateSelectedRegion()`
    pub const UPDATE_SELECTED_REGION: u32 = 0x004B_93B0;
}

/// Message ids the plugin's COM director subscribes to
pub mod messages {
    pub const DIRECTOR_ID: u32 = 0x5B7D_9E30;

    pub const POST_CITY_INIT: u32 = 0x26D3_1EC1;
    pub const PRE_CITY_SHUTDOWN: u32 = 0x26D3_1EC2;
    pub const CITY_ESTABLISHED: u32 = 0x26D3_1EC4;

    pub const FLORA_SHORTCUT: u32 = 0x755C_6E40;
    pub const NETWORK_SHORTCUT: u32 = 0x5ECE_D6AE;
}

/// Windows virtual key code of Escape
pub const VK_ESCAPE: i32 = 0x1B;

/// Wheel delta of one notch
pub const WHEEL_DELTA: i32 = 120;

bitflags! {
    /// Modifier key flags passed with host input events
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModifierKeys: u32 {
        const SHIFT = 0x1;
        const CONTROL = 0x2;
        const ALT = 0x4;
    }
}

/// Cursor resource ids, one per tool mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u32)]
pub enum BulldozeCursor {
    Default = 0xE185_5ADC,
    Flora = 0xED0E_06AD,
    Network = 0x24AD_E8F2,
    DefaultDiagonal = 0xE185_5ADD,
    FloraDiagonal = 0xED0E_06AE,
    NetworkDiagonal = 0x24AD_E8F3,
}

impl BulldozeCursor {
    pub fn for_mode(filter: OccupantFilterKind, diagonal: bool) -> Self {
        match (filter, diagonal) {
            (OccupantFilterKind::None, false) => Self::Default,
            (OccupantFilterKind::Flora, false) => Self::Flora,
            (OccupantFilterKind::Network, false) => Self::Network,
            (OccupantFilterKind::None, true) => Self::DefaultDiagonal,
            (OccupantFilterKind::Flora, true) => Self::FloraDiagonal,
            (OccupantFilterKind::Network, true) => Self::NetworkDiagonal,
        }
    }

    pub fn filter_kind(self) -> OccupantFilterKind {
        match self {
            Self::Default | Self::DefaultDiagonal => OccupantFilterKind::None,
            Self::Flora | Self::FloraDiagonal => OccupantFilterKind::Flora,
            Self::Network | Self::NetworkDiagonal => OccupantFilterKind::Network,
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::DefaultDiagonal | Self::FloraDiagonal | Self::NetworkDiagonal
        )
    }

    pub fn id(self) -> u32 {
        self as u32
    }
}

/// The host's demolish input control, as seen by the hook logic.
pub trait DemolishControl {
    /// Whether the control is the topmost control of the view
    fn is_on_top(&self) -> bool;

    fn cursor_id(&self) -> u32;

    fn is_cell_picked(&self) -> bool;

    /// Cell where the current drag started
    fn drag_origin(&self) -> CellPoint;

    /// Cancel the gesture in progress
    fn end_input(&mut self);

    fn set_cursor(&mut self, cursor: BulldozeCursor);

    /// Recompute and redraw the current selection
    fn update_selected_region(&mut self);

    /// Highlight color used by the selection preview
    fn set_demolish_ok_color(&mut self, color: Color);
}

/// The host's demolition service.
pub trait Demolition {
    type Region: CellSelection + ?Sized;

    /// Preview (`demolish == false`) or execute demolition of `region`.
    ///
    /// `filter == None` keeps the host's default occupant filter. The host
    /// may hold on to the filter, so it is handed over by value.
    fn demolish_region(
        &mut self,
        demolish: bool,
        region: &Self::Region,
        filter: Option<Box<dyn OccupantFilter>>,
    ) -> bool;

    /// Pass the hooked call on with the host's own region and filter.
    fn forward(&mut self, demolish: bool) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trips_through_mode() {
        for cursor in [
            BulldozeCursor::Default,
            BulldozeCursor::Flora,
            BulldozeCursor::Network,
            BulldozeCursor::DefaultDiagonal,
            BulldozeCursor::FloraDiagonal,
            BulldozeCursor::NetworkDiagonal,
        ] {
            assert_eq!(
                BulldozeCursor::for_mode(cursor.filter_kind(), cursor.is_diagonal()),
                cursor
            );
            assert_eq!(BulldozeCursor::from_repr(cursor.id()), Some(cursor));
        }
    }

    #[test]
    fn test_unknown_cursor_id() {
        assert_eq!(BulldozeCursor::from_repr(0x12345678), None);
    }

    #[test]
    fn test_modifier_flags_truncate_unknown_bits() {
        let mods = ModifierKeys::from_bits_truncate(0x1 | 0x4 | 0x100);
        assert_eq!(mods, ModifierKeys::SHIFT | ModifierKeys::ALT);
    }
}
