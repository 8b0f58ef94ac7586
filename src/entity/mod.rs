pub mod agent;
pub mod guest;
pub mod items;
pub mod needs;
pub mod staff;
pub mod thoughts;

pub use agent::{Agent, AgentKind, AgentTag, Peep, PeepState, RideVisit};
pub use guest::{GuestData, GuestFlags};
pub use items::{Inventory, ShopItem};
pub use staff::{StaffData, StaffOrders, StaffType};
pub use thoughts::{ThoughtQueue, ThoughtType};
