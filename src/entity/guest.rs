//! Guest attribute block

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::types::{Money, RideId, RideTypeId, Tick};
use crate::entity::items::{Inventory, ShopItem};
use crate::entity::needs::{GuestNeeds, IntensityRange, NauseaTolerance};
use crate::entity::thoughts::ThoughtQueue;

bitflags! {
    /// Behavioural flags carried by a guest
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GuestFlags: u32 {
        const LEAVING_PARK = 1 << 0;
        const SLOW_WALK = 1 << 1;
        const TRACKING = 1 << 3;
        const WAVING = 1 << 4;
        const HAS_PAID_FOR_PARK_ENTRY = 1 << 5;
        const PHOTO = 1 << 6;
        const PAINTING = 1 << 7;
        const WOW = 1 << 8;
        const LITTER = 1 << 9;
        const LOST = 1 << 10;
        const HUNGER = 1 << 11;
        const TOILET = 1 << 12;
        const CROWDED = 1 << 13;
        const HAPPINESS = 1 << 14;
        const NAUSEA = 1 << 15;
        const EXPLODE = 1 << 16;
        const RIDE_SHOULD_BE_MARKED_AS_FAVOURITE = 1 << 17;
        const PARK_ENTRANCE_CHOSEN = 1 << 18;
        /// Toggled on every path step; lost checks only count odd steps
        const LOST_TOGGLE = 1 << 21;
        const ANGRY = 1 << 22;
    }
}

/// One bit per ride id (or ride type id)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideSet {
    words: [u64; 4],
}

impl RideSet {
    pub fn insert(&mut self, index: usize) {
        if index < 256 {
            self.words[index / 64] |= 1 << (index % 64);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < 256 && self.words[index / 64] & (1 << (index % 64)) != 0
    }

    pub fn len(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voucher {
    FreeRide(RideId),
    FreeItem(ShopItem),
}

/// Where the guest sits on the current ride
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    pub train: u8,
    pub car: u8,
    pub seat: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appearance {
    pub mass: u8,
    pub tshirt_colour: u8,
    pub trousers_colour: u8,
}

/// Money spent, split by what it was spent on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expenditure {
    pub park_entry: Money,
    pub rides: Money,
    pub food: Money,
    pub drink: Money,
    pub souvenirs: Money,
}

/// Which expenditure bucket a payment lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpendCategory {
    ParkEntry,
    Rides,
    Food,
    Drink,
    Souvenirs,
}

impl Expenditure {
    pub fn record(&mut self, category: SpendCategory, amount: Money) {
        let bucket = match category {
            SpendCategory::ParkEntry => &mut self.park_entry,
            SpendCategory::Rides => &mut self.rides,
            SpendCategory::Food => &mut self.food,
            SpendCategory::Drink => &mut self.drink,
            SpendCategory::Souvenirs => &mut self.souvenirs,
        };
        *bucket += amount;
    }

    pub fn total(&self) -> Money {
        self.park_entry + self.rides + self.food + self.drink + self.souvenirs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestData {
    pub needs: GuestNeeds,
    pub nausea_tolerance: NauseaTolerance,
    pub intensity: IntensityRange,

    pub cash_in_pocket: Money,
    pub cash_spent: Money,
    pub spent: Expenditure,

    pub thoughts: ThoughtQueue,
    pub items: Inventory,
    pub voucher: Option<Voucher>,
    pub flags: GuestFlags,
    pub appearance: Appearance,

    pub rides_ridden: RideSet,
    pub ride_types_ridden: RideSet,
    pub num_rides: u8,
    pub num_food: u8,
    pub num_drinks: u8,
    pub num_souvenirs: u8,

    pub heading_to_ride: Option<RideId>,
    /// Counts down path steps while heading somewhere; the can't-find checks
    /// fire on fixed values
    pub lost_countdown: u8,
    pub previous_ride: Option<RideId>,
    pub previous_ride_timeout: u16,
    pub favourite_ride: Option<RideId>,
    pub favourite_ride_rating: u8,

    pub seat: Seat,
    pub time_in_queue: u16,
    pub time_on_ride: u8,
    pub time_to_consume: u8,
    pub time_lost: u8,

    pub outside_park: bool,
    pub park_entry_tick: Option<Tick>,

    pub angriness: u8,
    pub surroundings_thought_timeout: u8,
    /// Two bits of litter seen per recent step plus a two-bit cooldown
    pub litter_count: u8,
    pub disgusting_count: u8,
    pub vandalism_seen: u8,
}

impl GuestData {
    pub fn new(needs: GuestNeeds) -> Self {
        Self {
            needs,
            nausea_tolerance: NauseaTolerance::Average,
            intensity: IntensityRange::new(0, 15),
            cash_in_pocket: 0,
            cash_spent: 0,
            spent: Expenditure::default(),
            thoughts: ThoughtQueue::new(),
            items: Inventory::default(),
            voucher: None,
            flags: GuestFlags::empty(),
            appearance: Appearance::default(),
            rides_ridden: RideSet::default(),
            ride_types_ridden: RideSet::default(),
            num_rides: 0,
            num_food: 0,
            num_drinks: 0,
            num_souvenirs: 0,
            heading_to_ride: None,
            lost_countdown: 0,
            previous_ride: None,
            previous_ride_timeout: 0,
            favourite_ride: None,
            favourite_ride_rating: 0,
            seat: Seat::default(),
            time_in_queue: 0,
            time_on_ride: 0,
            time_to_consume: 0,
            time_lost: 0,
            outside_park: true,
            park_entry_tick: None,
            angriness: 0,
            surroundings_thought_timeout: 0,
            litter_count: 0,
            disgusting_count: 0,
            vandalism_seen: 0,
        }
    }

    pub fn is_leaving(&self) -> bool {
        self.flags.contains(GuestFlags::LEAVING_PARK)
    }

    pub fn has_ridden(&self, ride: RideId) -> bool {
        self.rides_ridden.contains(ride.index())
    }

    pub fn has_ridden_type(&self, ride_type: RideTypeId) -> bool {
        self.ride_types_ridden.contains(ride_type.0 as usize)
    }

    pub fn set_has_ridden(&mut self, ride: RideId, ride_type: RideTypeId) {
        self.rides_ridden.insert(ride.index());
        self.ride_types_ridden.insert(ride_type.0 as usize);
    }

    /// Voucher usable for a free ride on `ride`
    pub fn has_ride_voucher(&self, ride: RideId) -> bool {
        self.items.has(ShopItem::Voucher) && self.voucher == Some(Voucher::FreeRide(ride))
    }

    pub fn has_item_voucher(&self, item: ShopItem) -> bool {
        self.items.has(ShopItem::Voucher) && self.voucher == Some(Voucher::FreeItem(item))
    }

    pub fn remove_voucher(&mut self) {
        self.items.remove(ShopItem::Voucher);
        self.voucher = None;
    }
}
