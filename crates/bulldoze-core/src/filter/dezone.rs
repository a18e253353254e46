use std::ops::RangeInclusive;

use strum::{Display, FromRepr};

use super::network::is_network_occupant;
use super::{NetworkTypeFlags, Occupant, OccupantFilter};

/// Zone type of a lot, as the host's zone manager numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u32)]
pub enum ZoneType {
    None = 0,
    ResidentialLowDensity = 1,
    ResidentialMediumDensity = 2,
    ResidentialHighDensity = 3,
    CommercialLowDensity = 4,
    CommercialMediumDensity = 5,
    CommercialHighDensity = 6,
    IndustrialLowDensity = 7,
    IndustrialMediumDensity = 8,
    IndustrialHighDensity = 9,
    Military = 10,
    Airport = 11,
    Seaport = 12,
    Spaceport = 13,
    Landfill = 14,
    Plopped = 15,
}

impl ZoneType {
    const RCI: RangeInclusive<u32> =
        ZoneType::ResidentialLowDensity as u32..=ZoneType::IndustrialHighDensity as u32;

    /// Residential, commercial or industrial zone of any density
    pub fn is_rci(self) -> bool {
        Self::RCI.contains(&(self as u32))
    }
}

/// Host lot manager seam.
pub trait LotManager {
    /// Raw zone type of the lot `occupant` stands on, `None` without a lot
    fn occupant_zone_type(&self, occupant: &dyn Occupant) -> Option<u32>;
}

/// Dezones RCI lots while leaving transportation networks in place.
///
/// Narrower than the host's dezone tool: plopped and landfill lots are never
/// included.
pub struct DezoneKeepNetworksFilter<L: LotManager> {
    lot_manager: Option<L>,
}

impl<L: LotManager> DezoneKeepNetworksFilter<L> {
    pub fn new(lot_manager: Option<L>) -> Self {
        Self { lot_manager }
    }
}

impl<L: LotManager> OccupantFilter for DezoneKeepNetworksFilter<L> {
    fn is_occupant_included(&self, occupant: &dyn Occupant) -> bool {
        if is_network_occupant(occupant, NetworkTypeFlags::ALL_TRANSPORTATION) {
            return false;
        }

        self.lot_manager
            .as_ref()
            .and_then(|lots| lots.occupant_zone_type(occupant))
            .and_then(ZoneType::from_repr)
            .is_some_and(ZoneType::is_rci)
    }
}
