//! Staff attribute block

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::ecs::patrol::PatrolArea;

/// Energy every staff member walks with
pub const STAFF_ENERGY: u8 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StaffType {
    Handyman,
    Mechanic,
    Security,
    Entertainer,
}

impl StaffType {
    pub const ALL: [StaffType; 4] = [
        StaffType::Handyman,
        StaffType::Mechanic,
        StaffType::Security,
        StaffType::Entertainer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(SimError::UnknownStaffType(value))
    }

    pub fn default_orders(self) -> StaffOrders {
        match self {
            StaffType::Handyman => {
                StaffOrders::SWEEPING | StaffOrders::WATER_FLOWERS | StaffOrders::EMPTY_BINS
            }
            StaffType::Mechanic => StaffOrders::INSPECT_RIDES | StaffOrders::FIX_RIDES,
            StaffType::Security | StaffType::Entertainer => StaffOrders::empty(),
        }
    }
}

bitflags! {
    /// Duties a staff member is allowed to pick up
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StaffOrders: u8 {
        const SWEEPING = 1 << 0;
        const WATER_FLOWERS = 1 << 1;
        const EMPTY_BINS = 1 << 2;
        const MOWING = 1 << 3;
        const INSPECT_RIDES = 1 << 4;
        const FIX_RIDES = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntertainerCostume {
    Panda,
    Tiger,
    Elephant,
    Roman,
    Gorilla,
    Snowman,
    Knight,
    Astronaut,
    Bandit,
    Sheriff,
    Pirate,
}

impl EntertainerCostume {
    pub const ALL: [EntertainerCostume; 11] = [
        EntertainerCostume::Panda,
        EntertainerCostume::Tiger,
        EntertainerCostume::Elephant,
        EntertainerCostume::Roman,
        EntertainerCostume::Gorilla,
        EntertainerCostume::Snowman,
        EntertainerCostume::Knight,
        EntertainerCostume::Astronaut,
        EntertainerCostume::Bandit,
        EntertainerCostume::Sheriff,
        EntertainerCostume::Pirate,
    ];

    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(SimError::InvalidCostume(value))
    }
}

/// Work counters shown in the staff window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffStats {
    pub lawns_mown: u16,
    pub gardens_watered: u16,
    pub litter_swept: u16,
    pub bins_emptied: u16,
    pub rides_fixed: u16,
    pub rides_inspected: u16,
    pub vandals_stopped: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffData {
    pub staff_type: StaffType,
    pub orders: StaffOrders,
    pub costume: Option<EntertainerCostume>,
    /// `None` means the whole park
    pub patrol: Option<PatrolArea>,
    pub stats: StaffStats,
    pub mowing_timeout: u8,
    /// Ticks spent answering the current call
    pub mechanic_time_since_call: u16,
    pub hire_tick: u64,
}

impl StaffData {
    pub fn new(staff_type: StaffType, costume: Option<EntertainerCostume>, hire_tick: u64) -> Self {
        Self {
            staff_type,
            orders: staff_type.default_orders(),
            costume,
            patrol: None,
            stats: StaffStats::default(),
            mowing_timeout: 0,
            mechanic_time_since_call: 0,
            hire_tick,
        }
    }

    pub fn is_mechanic(&self) -> bool {
        self.staff_type == StaffType::Mechanic
    }

    pub fn has_patrol_area(&self) -> bool {
        self.patrol.as_ref().is_some_and(|area| !area.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_orders() {
        let handyman = StaffData::new(StaffType::Handyman, None, 0);
        assert!(handyman.orders.contains(StaffOrders::SWEEPING));
        assert!(handyman.orders.contains(StaffOrders::EMPTY_BINS));
        assert!(!handyman.orders.contains(StaffOrders::MOWING));

        let mechanic = StaffData::new(StaffType::Mechanic, None, 0);
        assert_eq!(
            mechanic.orders,
            StaffOrders::INSPECT_RIDES | StaffOrders::FIX_RIDES
        );
    }

    #[test]
    fn test_unknown_type_and_costume_rejected() {
        assert!(StaffType::from_u8(3).is_ok());
        assert!(matches!(
            StaffType::from_u8(9),
            Err(SimError::UnknownStaffType(9))
        ));
        assert!(matches!(
            EntertainerCostume::from_u8(11),
            Err(SimError::InvalidCostume(11))
        ));
    }

    #[test]
    fn test_empty_patrol_is_whole_park() {
        let mut staff = StaffData::new(StaffType::Security, None, 0);
        assert!(!staff.has_patrol_area());
        staff.patrol = Some(PatrolArea::new());
        assert!(!staff.has_patrol_area());
    }
}
