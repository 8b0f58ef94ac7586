//! Fire-and-forget messages for the news feed

use serde::{Deserialize, Serialize};

use crate::core::types::RideId;
use crate::ecs::pool::Handle;
use crate::entity::items::ShopItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    /// No mechanic reached the ride before the call timed out
    MechanicNotAnswering { ride: RideId },
    RideFixed { ride: RideId, mechanic: Handle },
    GuestJoinedQueue { guest: Handle, ride: RideId },
    GuestOnRide { guest: Handle, ride: RideId },
    GuestBought { guest: Handle, item: ShopItem },
    GuestLeftPark { guest: Handle },
}

pub trait Notifier {
    fn post(&mut self, notification: Notification);
}
