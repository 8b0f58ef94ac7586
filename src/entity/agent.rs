//! Common agent record
//!
//! Every person in the park is an [`Agent`]: shared movement fields plus a
//! tagged [`AgentKind`] carrying either the guest or the staff attribute
//! block. The high-level [`PeepState`] carries its own sub-state payload.

use serde::{Deserialize, Serialize};

use crate::core::types::{CoordsXY, CoordsXYZ, Direction, RideId, StationIndex};
use crate::entity::guest::GuestData;
use crate::entity::staff::{StaffData, StaffType};

/// A ride plus the station the agent is using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideVisit {
    pub ride: RideId,
    pub station: StationIndex,
}

impl RideVisit {
    pub fn new(ride: RideId, station: StationIndex) -> Self {
        Self { ride, station }
    }
}

/// Steps of boarding, riding and leaving a ride or facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideSubState {
    AtEntrance,
    InEntrance,
    FreeVehicleCheck,
    ApproachVehicle,
    EnterVehicle,
    OnRide,
    LeaveVehicle,
    ApproachExit,
    InExit,
    LeaveExit,
    ApproachShop,
    InteractShop,
    LeaveShop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SittingSubState {
    TryingToSit,
    SatDown,
    /// Waiting out the remaining sit-down time
    TryGetUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchingSubState {
    Approach,
    Watching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsingBinSubState {
    WalkingToBin,
    GoingBack,
}

/// Approach-then-act sub-state shared by the handyman duties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DutySubState {
    Approach,
    Working,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallSubState {
    /// Playing the answer-call animation
    Acknowledge,
    Heading,
    /// Walking the last stretch from the entrance or exit onto the platform
    EnterPlatform,
}

/// Phases of fixing or inspecting a ride, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FixPhase {
    EnterStation = 0,
    MoveToBrokenDownVehicle = 1,
    FixVehicleClosedRestraints = 2,
    FixVehicleClosedDoors = 3,
    FixVehicleOpenRestraints = 4,
    FixVehicleOpenDoors = 5,
    FixVehicleMalfunction = 6,
    MoveToStationEnd = 7,
    FixStationEnd = 8,
    MoveToStationStart = 9,
    FixStationStart = 10,
    FixStationBrakes = 11,
    MoveToStationExit = 12,
    FinishFixOrInspect = 13,
    LeaveByEntranceExit = 14,
}

impl FixPhase {
    pub const ALL: [FixPhase; 15] = [
        FixPhase::EnterStation,
        FixPhase::MoveToBrokenDownVehicle,
        FixPhase::FixVehicleClosedRestraints,
        FixPhase::FixVehicleClosedDoors,
        FixPhase::FixVehicleOpenRestraints,
        FixPhase::FixVehicleOpenDoors,
        FixPhase::FixVehicleMalfunction,
        FixPhase::MoveToStationEnd,
        FixPhase::FixStationEnd,
        FixPhase::MoveToStationStart,
        FixPhase::FixStationStart,
        FixPhase::FixStationBrakes,
        FixPhase::MoveToStationExit,
        FixPhase::FinishFixOrInspect,
        FixPhase::LeaveByEntranceExit,
    ];

    pub fn bit(self) -> u16 {
        1 << (self as u8)
    }

    /// Next phase present in `mask`, or `None` after the last one
    pub fn next_in(self, mask: u16) -> Option<FixPhase> {
        Self::ALL[(self as usize + 1)..]
            .iter()
            .copied()
            .find(|phase| mask & phase.bit() != 0)
    }
}

/// Top-level behaviour state with its sub-state payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeepState {
    /// Transitional; resolves to Walking on a path or is removed
    Falling,
    EnteringPark {
        /// Paid at the entrance and walking in
        admitted: bool,
    },
    /// Past the park entrance, walking off the map
    LeavingPark,
    Walking,
    Queuing(RideVisit),
    /// First in the queue, waiting for a vehicle
    QueuingFront(RideVisit),
    EnteringRide {
        visit: RideVisit,
        sub: RideSubState,
    },
    OnRide(RideVisit),
    LeavingRide {
        visit: RideVisit,
        sub: RideSubState,
    },
    Sitting {
        sub: SittingSubState,
        /// Bench seat: edge in the low two bits, side in bit two
        seat: u8,
        time_left: u8,
    },
    Buying {
        ride: RideId,
        resolved: bool,
    },
    Watching {
        ride: Option<RideId>,
        sub: WatchingSubState,
        /// Viewing edge in the low two bits, position in bits two and three
        spot: u8,
        time_left: u8,
        tick_toggle: bool,
        /// Watching a ride the guest has never been on
        new_ride: bool,
    },
    UsingBin {
        sub: UsingBinSubState,
        slot: u8,
    },
    Patrolling,
    Mowing {
        waypoint: u8,
    },
    Sweeping {
        passes: u8,
    },
    Watering {
        sub: DutySubState,
        target: u8,
    },
    EmptyingBin {
        sub: DutySubState,
        slot: u8,
    },
    Answering {
        visit: RideVisit,
        sub: CallSubState,
    },
    HeadingToInspection {
        visit: RideVisit,
        sub: CallSubState,
    },
    Fixing {
        visit: RideVisit,
        phase: FixPhase,
    },
    Inspecting {
        visit: RideVisit,
        phase: FixPhase,
    },
}

impl PeepState {
    /// Ride the state refers to, if any
    pub fn ride(&self) -> Option<RideId> {
        match *self {
            PeepState::Queuing(visit)
            | PeepState::QueuingFront(visit)
            | PeepState::OnRide(visit)
            | PeepState::EnteringRide { visit, .. }
            | PeepState::LeavingRide { visit, .. }
            | PeepState::Answering { visit, .. }
            | PeepState::HeadingToInspection { visit, .. }
            | PeepState::Fixing { visit, .. }
            | PeepState::Inspecting { visit, .. } => Some(visit.ride),
            PeepState::Buying { ride, .. } => Some(ride),
            PeepState::Watching { ride, .. } => ride,
            _ => None,
        }
    }

    pub fn is_walking(&self) -> bool {
        matches!(self, PeepState::Walking)
    }

    pub fn is_queuing(&self) -> bool {
        matches!(self, PeepState::Queuing(_) | PeepState::QueuingFront(_))
    }

    /// Mechanic free to take a new call
    pub fn is_available_for_call(&self, for_inspection: bool) -> bool {
        match self {
            PeepState::Patrolling => true,
            PeepState::HeadingToInspection { sub, .. } => {
                !for_inspection && *sub != CallSubState::EnterPlatform
            }
            _ => false,
        }
    }
}

/// Timed animations; the agent stands still until the last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    CheckTime,
    EatFood,
    ShakeHead,
    EmptyPockets,
    SittingEatFood,
    SittingLookAroundLeft,
    SittingLookAroundRight,
    Wow,
    ThrowUp,
    Jump,
    ReadMap,
    Wave,
    Wave2,
    TakePhoto,
    DrawPicture,
    Joy,
    WithdrawMoney,
    StaffSweep,
    StaffWatering,
    StaffEmptyBin,
    StaffAnswerCall,
    StaffAnswerCall2,
    StaffCheckboard,
    StaffFix,
    StaffFix2,
    StaffFix3,
    StaffFixGround,
    EntertainerJoy,
}

impl ActionKind {
    pub fn frames(self) -> u8 {
        match self {
            ActionKind::Wave | ActionKind::Wave2 | ActionKind::Jump => 16,
            ActionKind::TakePhoto | ActionKind::ShakeHead => 20,
            ActionKind::CheckTime | ActionKind::ReadMap => 24,
            ActionKind::EatFood | ActionKind::SittingEatFood => 32,
            ActionKind::SittingLookAroundLeft | ActionKind::SittingLookAroundRight => 24,
            ActionKind::EmptyPockets | ActionKind::WithdrawMoney => 28,
            ActionKind::Wow | ActionKind::Joy => 24,
            ActionKind::ThrowUp => 26,
            ActionKind::DrawPicture => 40,
            ActionKind::StaffSweep | ActionKind::StaffWatering | ActionKind::StaffEmptyBin => 16,
            ActionKind::StaffAnswerCall | ActionKind::StaffAnswerCall2 => 16,
            ActionKind::StaffCheckboard => 32,
            ActionKind::StaffFix => 0x30,
            ActionKind::StaffFix2 => 0x60,
            ActionKind::StaffFix3 => 0x70,
            ActionKind::StaffFixGround => 0x30,
            ActionKind::EntertainerJoy => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeepAction {
    Walking,
    Animation { kind: ActionKind, frame: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub loc: CoordsXY,
    pub tolerance: u8,
}

/// Tile the pathfinder last chose to step onto
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NextTile {
    pub loc: CoordsXYZ,
    pub on_surface: bool,
    pub sloped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Guest(GuestData),
    Staff(StaffData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentTag {
    Guest,
    Staff,
}

/// Movement and state fields every person shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peep {
    pub position: CoordsXYZ,
    pub destination: Destination,
    pub direction: Direction,
    pub action: PeepAction,
    /// Path tile the peep last arrived on
    pub next: NextTile,
    /// Sub-tick walking accumulator; the state step runs when it wraps
    pub step_progress: u8,
    pub energy: u8,
    pub energy_target: u8,
    pub state: PeepState,
}

impl Peep {
    pub fn new(position: CoordsXYZ, state: PeepState) -> Self {
        Self {
            position,
            destination: Destination {
                loc: position.xy(),
                tolerance: 0,
            },
            direction: 0,
            action: PeepAction::Walking,
            next: NextTile {
                loc: position,
                on_surface: false,
                sloped: false,
            },
            step_progress: 0,
            energy: 0,
            energy_target: 0,
            state,
        }
    }

    pub fn set_destination(&mut self, loc: CoordsXY, tolerance: u8) {
        self.destination = Destination { loc, tolerance };
    }

    pub fn is_action_walking(&self) -> bool {
        self.action == PeepAction::Walking
    }

    pub fn start_action(&mut self, kind: ActionKind) {
        self.action = PeepAction::Animation { kind, frame: 0 };
    }

    pub fn current_action(&self) -> Option<ActionKind> {
        match self.action {
            PeepAction::Animation { kind, .. } => Some(kind),
            PeepAction::Walking => None,
        }
    }

    pub fn action_frame(&self) -> Option<u8> {
        match self.action {
            PeepAction::Animation { frame, .. } => Some(frame),
            PeepAction::Walking => None,
        }
    }

    pub fn set_state(&mut self, state: PeepState) {
        self.state = state;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub peep: Peep,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(position: CoordsXYZ, state: PeepState, kind: AgentKind) -> Self {
        Self {
            peep: Peep::new(position, state),
            kind,
        }
    }

    pub fn tag(&self) -> AgentTag {
        match self.kind {
            AgentKind::Guest(_) => AgentTag::Guest,
            AgentKind::Staff(_) => AgentTag::Staff,
        }
    }

    pub fn guest(&self) -> Option<&GuestData> {
        match &self.kind {
            AgentKind::Guest(guest) => Some(guest),
            AgentKind::Staff(_) => None,
        }
    }

    pub fn guest_mut(&mut self) -> Option<&mut GuestData> {
        match &mut self.kind {
            AgentKind::Guest(guest) => Some(guest),
            AgentKind::Staff(_) => None,
        }
    }

    pub fn staff(&self) -> Option<&StaffData> {
        match &self.kind {
            AgentKind::Staff(staff) => Some(staff),
            AgentKind::Guest(_) => None,
        }
    }

    pub fn staff_mut(&mut self) -> Option<&mut StaffData> {
        match &mut self.kind {
            AgentKind::Staff(staff) => Some(staff),
            AgentKind::Guest(_) => None,
        }
    }

    pub fn is_staff_type(&self, staff_type: StaffType) -> bool {
        self.staff().is_some_and(|s| s.staff_type == staff_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::needs::GuestNeeds;

    const SAFETY_MASK: u16 = (1 << 7) | (1 << 8) | (1 << 9) | (1 << 10) | (1 << 12) | (1 << 13) | (1 << 14);

    #[test]
    fn test_fix_phase_sequence_follows_mask() {
        let mut phase = FixPhase::EnterStation;
        let mut visited = vec![phase];
        while let Some(next) = phase.next_in(SAFETY_MASK) {
            visited.push(next);
            phase = next;
        }
        assert_eq!(
            visited,
            vec![
                FixPhase::EnterStation,
                FixPhase::MoveToStationEnd,
                FixPhase::FixStationEnd,
                FixPhase::MoveToStationStart,
                FixPhase::FixStationStart,
                FixPhase::MoveToStationExit,
                FixPhase::FinishFixOrInspect,
                FixPhase::LeaveByEntranceExit,
            ]
        );
    }

    #[test]
    fn test_kind_accessors() {
        let agent = Agent::new(
            CoordsXYZ::new(16, 16, 0),
            PeepState::Walking,
            AgentKind::Guest(GuestData::new(GuestNeeds::default())),
        );
        assert_eq!(agent.tag(), AgentTag::Guest);
        assert!(agent.guest().is_some());
        assert!(agent.staff().is_none());
        assert!(agent.peep.is_action_walking());
    }

    #[test]
    fn test_state_ride() {
        let visit = RideVisit::new(RideId(3), StationIndex(0));
        assert_eq!(PeepState::Queuing(visit).ride(), Some(RideId(3)));
        assert_eq!(PeepState::Walking.ride(), None);
        assert!(PeepState::QueuingFront(visit).is_queuing());
    }
}
