//! Occupant filters passed to the host's demolition routine.
//!
//! The host asks a filter twice per candidate: once with the occupant type
//! id, then with the occupant itself. An occupant is demolished only when
//! both answers are `true`.

pub mod dezone;
pub mod flora;
pub mod network;

use strum::Display;

pub use dezone::{DezoneKeepNetworksFilter, LotManager, ZoneType};
pub use flora::{FLORA_OCCUPANT_TYPE, FloraFilter};
pub use network::{KeepNetworksFilter, NetworkFilter, NetworkTypeFlags};

/// A host occupant as seen by the filters.
pub trait Occupant {
    fn occupant_type(&self) -> u32;

    /// Network flags of a network occupant, `None` for everything else
    fn network_flags(&self) -> Option<NetworkTypeFlags>;
}

pub trait OccupantFilter {
    fn is_occupant_included(&self, _occupant: &dyn Occupant) -> bool {
        true
    }

    fn is_occupant_type_included(&self, _occupant_type: u32) -> bool {
        true
    }
}

/// Includes every occupant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl OccupantFilter for AcceptAllFilter {}

/// Which filter a tool mode demolishes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum OccupantFilterKind {
    /// The host's own filter
    #[default]
    None,
    Flora,
    Network,
}

impl OccupantFilterKind {
    /// `None` keeps the host's default filter.
    pub fn create_filter(self) -> Option<Box<dyn OccupantFilter>> {
        match self {
            Self::None => None,
            Self::Flora => Some(Box::new(FloraFilter)),
            Self::Network => Some(Box::new(NetworkFilter::new(
                NetworkTypeFlags::ALL_TRANSPORTATION,
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Plain occupant for filter tests
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct TestOccupant {
        pub occupant_type: u32,
        pub network: Option<NetworkTypeFlags>,
    }

    impl TestOccupant {
        pub fn building() -> Self {
            Self {
                occupant_type: 0x278128A0,
                network: None,
            }
        }

        pub fn flora() -> Self {
            Self {
                occupant_type: FLORA_OCCUPANT_TYPE,
                network: None,
            }
        }

        pub fn network(flags: NetworkTypeFlags) -> Self {
            Self {
                occupant_type: 0x088E1962,
                network: Some(flags),
            }
        }
    }

    impl Occupant for TestOccupant {
        fn occupant_type(&self) -> u32 {
            self.occupant_type
        }

        fn network_flags(&self) -> Option<NetworkTypeFlags> {
            self.network
        }
    }

    #[test]
    fn test_accept_all() {
        let filter = AcceptAllFilter;
        assert!(filter.is_occupant_type_included(0));
        assert!(filter.is_occupant_included(&TestOccupant::building()));
        assert!(filter.is_occupant_included(&TestOccupant::network(NetworkTypeFlags::ROAD)));
    }

    #[test]
    fn test_filter_kind_factory() {
        assert!(OccupantFilterKind::None.create_filter().is_none());

        let flora = OccupantFilterKind::Flora.create_filter().unwrap();
        assert!(flora.is_occupant_type_included(FLORA_OCCUPANT_TYPE));
        assert!(!flora.is_occupant_type_included(0x278128A0));

        let network = OccupantFilterKind::Network.create_filter().unwrap();
        assert!(network.is_occupant_included(&TestOccupant::network(NetworkTypeFlags::MONORAIL)));
        assert!(!network.is_occupant_included(&TestOccupant::network(NetworkTypeFlags::WATER_PIPE)));
        assert!(!network.is_occupant_included(&TestOccupant::building()));
    }

    #[test]
    fn test_default_kind_is_none() {
        assert_eq!(OccupantFilterKind::default(), OccupantFilterKind::None);
        assert_eq!(OccupantFilterKind::Network.to_string(), "Network");
    }
}
