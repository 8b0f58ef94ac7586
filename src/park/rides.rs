//! Ride and economy collaborator
//!
//! Ratings, prices and queue state come from the ride simulation; agents
//! read them through [`RideEconomy`] and report customers, popularity,
//! satisfaction and income back through the same trait.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    CoordsXY, CoordsXYZ, Direction, Money, RideId, RideRating, RideTypeId, StationIndex, Tick,
};
use crate::ecs::pool::Handle;
use crate::entity::guest::Seat;
use crate::entity::items::ShopItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideClass {
    Ride,
    Shop,
    Toilets,
    FirstAid,
    CashMachine,
}

impl RideClass {
    pub fn is_ride(self) -> bool {
        self == RideClass::Ride
    }

    /// Facilities the guest walks into rather than buys from
    pub fn is_facility(self) -> bool {
        matches!(self, RideClass::Toilets | RideClass::FirstAid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideStatus {
    Closed,
    Open,
    Testing,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RideFlags: u16 {
        const TRANSPORT = 1 << 0;
        const CRASHED = 1 << 1;
        /// Guests check g-forces before riding an unrated ride
        const CHECK_G_FORCES = 1 << 2;
        const G_FORCES_TOO_HIGH = 1 << 3;
        const SINGLE_PIECE_STATION = 1 << 4;
        const NO_VEHICLES = 1 << 5;
        const MUSIC = 1 << 6;
        const BROKEN_DOWN = 1 << 7;
        const BREAKDOWN_PENDING = 1 << 8;
        const DUE_INSPECTION = 1 << 9;
        /// Guests with an umbrella may ride in the rain
        const UMBRELLA_OK = 1 << 10;
        /// Riders sit inside the ride rather than on it
        const IN_RIDE = 1 << 11;
        /// A guest found the queue full; cleared when someone next decides
        /// to ride. Guests choosing a ride from afar skip it meanwhile.
        const QUEUE_FULL = 1 << 12;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideRatings {
    pub excitement: RideRating,
    pub intensity: RideRating,
    pub nausea: RideRating,
}

/// Builds a rating from whole and hundredths parts, `rating(4, 70)` is 4.70
pub const fn rating(whole: i16, fraction: i16) -> RideRating {
    whole * 100 + fraction
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BreakdownReason {
    SafetyCutOut = 0,
    RestraintsStuckClosed = 1,
    RestraintsStuckOpen = 2,
    DoorsStuckClosed = 3,
    DoorsStuckOpen = 4,
    VehicleMalfunction = 5,
    BrakesFailure = 6,
    ControlFailure = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MechanicStatus {
    Undefined,
    Calling,
    Heading,
    Fixing,
    HasFixedStationBrakes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationInfo {
    /// First track piece of the platform
    pub start: CoordsXYZ,
    pub direction: Direction,
    /// Last track piece of the platform
    pub end: CoordsXYZ,
    pub entrance: Option<CoordsXYZ>,
    pub exit: Option<CoordsXYZ>,
    pub queue_length: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideInfo {
    pub id: RideId,
    pub ride_type: RideTypeId,
    pub class: RideClass,
    pub status: RideStatus,
    pub flags: RideFlags,
    /// Ride fee, or primary and secondary item prices for stalls
    pub price: [Money; 2],
    pub value: Option<Money>,
    pub ratings: Option<RideRatings>,
    pub sheltered_eighths: u8,
    pub highest_drop_height: u8,
    pub items: [Option<ShopItem>; 2],
    pub stations: Vec<StationInfo>,
    pub breakdown_reason: Option<BreakdownReason>,
    pub mechanic_status: MechanicStatus,
    pub mechanic: Handle,
    pub reliability_percentage: u8,
}

impl RideInfo {
    pub fn is_open(&self) -> bool {
        self.status == RideStatus::Open
    }

    pub fn is_broken(&self) -> bool {
        self.flags
            .intersects(RideFlags::BROKEN_DOWN | RideFlags::BREAKDOWN_PENDING)
    }

    pub fn station(&self, index: StationIndex) -> Option<&StationInfo> {
        self.stations.get(index.0 as usize)
    }

    /// Tile the ride is found at for distance checks
    pub fn location(&self) -> Option<CoordsXY> {
        self.stations.first().map(|s| s.start.xy())
    }

    /// Price a guest pays to ride or use the facility
    pub fn ride_price(&self) -> Money {
        self.price[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiderStatus {
    Riding,
    Finished,
    NotOnRide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenditureType {
    ParkEntranceTickets,
    ParkRideTickets,
    ShopSales,
    ShopStock,
    FoodDrinkSales,
    FoodDrinkStock,
}

pub trait RideEconomy {
    /// Every ride in id order
    fn ride_ids(&self) -> Vec<RideId>;

    fn ride(&self, id: RideId) -> Option<&RideInfo>;

    fn queue_front(&self, ride: RideId, station: StationIndex) -> Option<Handle>;

    fn join_queue(&mut self, ride: RideId, station: StationIndex, guest: Handle);

    fn leave_queue(&mut self, ride: RideId, station: StationIndex, guest: Handle);

    /// The guest directly in front of `guest` in the queue
    fn guest_ahead(&self, ride: RideId, station: StationIndex, guest: Handle) -> Option<Handle>;

    /// Seat the queue front in a waiting vehicle, taking it off the queue
    fn try_board(&mut self, ride: RideId, station: StationIndex, guest: Handle, tick: Tick)
        -> Option<Seat>;

    fn rider_status(&self, ride: RideId, guest: Handle, tick: Tick) -> RiderStatus;

    fn leave_vehicle(&mut self, ride: RideId, guest: Handle);

    fn add_customer(&mut self, ride: RideId);

    fn update_popularity(&mut self, ride: RideId, liked: bool);

    fn set_queue_full(&mut self, ride: RideId, full: bool);

    fn update_satisfaction(&mut self, ride: RideId, satisfaction: u8);

    fn add_income(&mut self, ride: RideId, amount: Money);

    /// Count a stall sale, `secondary` for the second item slot
    fn record_sale(&mut self, ride: RideId, secondary: bool);

    /// Book a park expense; negative amounts are income
    fn finance_payment(&mut self, amount: Money, kind: ExpenditureType);

    fn set_mechanic_status(&mut self, ride: RideId, status: MechanicStatus, mechanic: Handle);

    /// Where the broken car stands, if a vehicle broke
    fn broken_vehicle_location(&self, ride: RideId) -> Option<CoordsXYZ>;

    fn fix_vehicle(&mut self, ride: RideId);

    /// Clear the breakdown; `steps` scales the reliability regained
    fn fix_breakdown(&mut self, ride: RideId, steps: u32);

    /// Clear the due inspection and add `reliability_gain`
    fn mark_inspected(&mut self, ride: RideId, reliability_gain: u32);
}
