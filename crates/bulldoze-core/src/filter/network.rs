use bitflags::bitflags;

use super::{Occupant, OccupantFilter};

bitflags! {
    /// Network types of a network occupant, as the host encodes them
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NetworkTypeFlags: u32 {
        const ROAD = 1 << 0;
        const RAIL = 1 << 1;
        const HIGHWAY = 1 << 2;
        const STREET = 1 << 3;
        const WATER_PIPE = 1 << 4;
        const POWER_POLE = 1 << 5;
        const AVENUE = 1 << 6;
        const SUBWAY = 1 << 7;
        const LIGHT_RAIL = 1 << 8;
        const MONORAIL = 1 << 9;
        const ONE_WAY_ROAD = 1 << 10;
        const DIRT_ROAD = 1 << 11;
        const GROUND_HIGHWAY = 1 << 12;

        // Rail is part of the road set in the host's own grouping
        const ALL_ROAD = Self::ROAD.bits()
            | Self::RAIL.bits()
            | Self::HIGHWAY.bits()
            | Self::STREET.bits()
            | Self::AVENUE.bits()
            | Self::ONE_WAY_ROAD.bits()
            | Self::DIRT_ROAD.bits()
            | Self::GROUND_HIGHWAY.bits();
        const ALL_RAIL = Self::RAIL.bits()
            | Self::SUBWAY.bits()
            | Self::LIGHT_RAIL.bits()
            | Self::MONORAIL.bits();
        const ALL_TRANSPORTATION = Self::ALL_ROAD.bits() | Self::ALL_RAIL.bits();
    }
}

/// Whether `occupant` is a network occupant carrying any of `flags`.
pub fn is_network_occupant(occupant: &dyn Occupant, flags: NetworkTypeFlags) -> bool {
    occupant
        .network_flags()
        .is_some_and(|own| own.intersects(flags))
}

/// Includes network occupants of the given types.
#[derive(Debug, Clone, Copy)]
pub struct NetworkFilter {
    flags: NetworkTypeFlags,
}

impl NetworkFilter {
    pub fn new(flags: NetworkTypeFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> NetworkTypeFlags {
        self.flags
    }
}

impl OccupantFilter for NetworkFilter {
    fn is_occupant_included(&self, occupant: &dyn Occupant) -> bool {
        is_network_occupant(occupant, self.flags)
    }
}

/// Includes everything except network occupants of the given types.
#[derive(Debug, Clone, Copy)]
pub struct KeepNetworksFilter {
    flags: NetworkTypeFlags,
}

impl KeepNetworksFilter {
    pub fn new(flags: NetworkTypeFlags) -> Self {
        Self { flags }
    }
}

impl OccupantFilter for KeepNetworksFilter {
    fn is_occupant_included(&self, occupant: &dyn Occupant) -> bool {
        !is_network_occupant(occupant, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::TestOccupant;

    #[test]
    fn test_flag_groups() {
        assert!(NetworkTypeFlags::ALL_ROAD.contains(NetworkTypeFlags::GROUND_HIGHWAY));
        assert!(NetworkTypeFlags::ALL_RAIL.contains(NetworkTypeFlags::SUBWAY));
        assert!(!NetworkTypeFlags::ALL_TRANSPORTATION.contains(NetworkTypeFlags::WATER_PIPE));
        assert!(!NetworkTypeFlags::ALL_TRANSPORTATION.contains(NetworkTypeFlags::POWER_POLE));
        assert_eq!(NetworkTypeFlags::ALL_TRANSPORTATION.bits(), 0x1FCF);
    }

    #[test]
    fn test_network_filter_matches_any_flag() {
        let filter = NetworkFilter::new(NetworkTypeFlags::ALL_RAIL);
        let tram_on_road = TestOccupant::network(NetworkTypeFlags::ROAD | NetworkTypeFlags::LIGHT_RAIL);

        assert!(filter.is_occupant_included(&tram_on_road));
        assert!(!filter.is_occupant_included(&TestOccupant::network(NetworkTypeFlags::AVENUE)));
        assert!(!filter.is_occupant_included(&TestOccupant::building()));
        assert!(filter.is_occupant_type_included(0x1234));
    }

    #[test]
    fn test_keep_networks_is_complement() {
        let flags = NetworkTypeFlags::ALL_TRANSPORTATION;
        let keep = KeepNetworksFilter::new(flags);
        let only = NetworkFilter::new(flags);

        for occupant in [
            TestOccupant::building(),
            TestOccupant::flora(),
            TestOccupant::network(NetworkTypeFlags::STREET),
            TestOccupant::network(NetworkTypeFlags::POWER_POLE),
        ] {
            assert_ne!(
                keep.is_occupant_included(&occupant),
                only.is_occupant_included(&occupant)
            );
        }
    }
}
