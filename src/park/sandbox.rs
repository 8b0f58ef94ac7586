//! In-memory park used by tests, benches and the headless runner
//!
//! A flat map at height zero. Paths, queues, entrances, rides and shops are
//! laid out through a small builder API, or all at once by [`SandboxPark::generate`].
//! Pathfinding is a breadth-first distance field per goal, cached until the
//! layout changes.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::rng::ScenarioRng;
use crate::core::types::{
    CoordsXY, CoordsXYZ, Direction, Money, RideId, RideTypeId, StationIndex, Tick, TileCoords,
    COORDS_XY_STEP, DIRECTION_DELTAS,
};
use crate::ecs::pool::Handle;
use crate::entity::guest::Seat;
use crate::entity::items::ShopItem;
use crate::park::map::{
    AdditionKind, Litter, PathAddition, PathInfo, RideView, Surroundings, WorldMap,
};
use crate::park::notify::{Notification, Notifier};
use crate::park::pathing::{
    PathGoal, PathInteraction, PathRequest, PathStep, Pathfinder, PathingFlags,
};
use crate::park::rides::{
    rating, BreakdownReason, ExpenditureType, MechanicStatus, RideClass, RideEconomy, RideFlags,
    RideInfo, RideRatings, RideStatus, RiderStatus, StationInfo,
};

/// Ticks between boarding and the ride letting its riders off
pub const DEFAULT_RIDE_DURATION: Tick = 240;

/// Range of the surroundings scan around a guest
const SURROUNDINGS_RANGE: i32 = 5 * COORDS_XY_STEP;

/// Reliability regained per fix step
const RELIABILITY_PER_FIX_STEP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileKind {
    Path,
    Queue { ride: RideId, station: StationIndex },
    ParkEntrance,
    RideEntrance { ride: RideId, station: StationIndex },
    Shop(RideId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SandboxTile {
    kind: TileKind,
    addition: Option<PathAddition>,
    /// Queue tile that joins the rest of the path network
    queue_head: bool,
}

impl SandboxTile {
    fn is_walkway(&self) -> bool {
        matches!(self.kind, TileKind::Path | TileKind::Queue { .. } | TileKind::ParkEntrance)
    }
}

/// Distance field key; guests and staff see queues differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FieldKey {
    Ride { ride: RideId, staff: bool },
    ParkEntrance,
    Tile { tile: TileCoords, staff: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rider {
    ride: RideId,
    finishes_at: Tick,
}

/// Per-ride counters the sandbox accumulates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RideStats {
    pub customers: u32,
    pub liked: u32,
    pub disliked: u32,
    pub satisfaction_total: u32,
    pub satisfaction_votes: u32,
    pub income: Money,
    pub primary_sales: u32,
    pub secondary_sales: u32,
}

#[derive(Debug, Clone)]
pub struct SandboxPark {
    owned_min: TileCoords,
    owned_max: TileCoords,
    tiles: AHashMap<TileCoords, SandboxTile>,
    entrances: Vec<(TileCoords, Direction)>,
    rides: BTreeMap<RideId, RideInfo>,
    stats: BTreeMap<RideId, RideStats>,
    footprints: AHashMap<TileCoords, RideId>,
    queue_lines: AHashSet<(RideId, StationIndex)>,
    queues: AHashMap<(RideId, StationIndex), VecDeque<Handle>>,
    riders: AHashMap<Handle, Rider>,
    broken_vehicles: AHashMap<RideId, CoordsXYZ>,
    lawns: BTreeMap<TileCoords, u8>,
    scenery: BTreeMap<TileCoords, u8>,
    litter: Vec<Litter>,
    notifications: Vec<Notification>,
    fields: RefCell<AHashMap<FieldKey, AHashMap<TileCoords, u16>>>,
    pub ride_duration: Tick,
    pub cash: Money,
    pub expenditure: BTreeMap<String, Money>,
}

impl SandboxPark {
    /// Empty park owning every tile in the inclusive rectangle
    pub fn new(owned_min: TileCoords, owned_max: TileCoords) -> Self {
        Self {
            owned_min,
            owned_max,
            tiles: AHashMap::new(),
            entrances: Vec::new(),
            rides: BTreeMap::new(),
            stats: BTreeMap::new(),
            footprints: AHashMap::new(),
            queue_lines: AHashSet::new(),
            queues: AHashMap::new(),
            riders: AHashMap::new(),
            broken_vehicles: AHashMap::new(),
            lawns: BTreeMap::new(),
            scenery: BTreeMap::new(),
            litter: Vec::new(),
            notifications: Vec::new(),
            fields: RefCell::new(AHashMap::new()),
            ride_duration: DEFAULT_RIDE_DURATION,
            cash: 10_000,
            expenditure: BTreeMap::new(),
        }
    }

    fn invalidate_routes(&mut self) {
        self.fields.get_mut().clear();
    }

    fn put_tile(&mut self, tile: TileCoords, kind: TileKind) {
        self.tiles.insert(
            tile,
            SandboxTile {
                kind,
                addition: None,
                queue_head: false,
            },
        );
        self.invalidate_routes();
    }

    pub fn add_path(&mut self, tile: TileCoords) -> &mut Self {
        self.put_tile(tile, TileKind::Path);
        self
    }

    /// Straight run of path between two tiles sharing a row or column
    pub fn add_path_line(&mut self, from: TileCoords, to: TileCoords) -> &mut Self {
        let (dx, dy) = ((to.x - from.x).signum(), (to.y - from.y).signum());
        let mut tile = from;
        loop {
            self.add_path(tile);
            if tile == to {
                break;
            }
            tile = TileCoords::new(tile.x + dx, tile.y + dy);
        }
        self
    }

    /// Queue line, listed from the end guests join at toward the ride
    pub fn add_queue(&mut self, ride: RideId, station: StationIndex, tiles: &[TileCoords]) -> &mut Self {
        for (i, tile) in tiles.iter().enumerate() {
            self.put_tile(*tile, TileKind::Queue { ride, station });
            if let Some(t) = self.tiles.get_mut(tile) {
                t.queue_head = i == 0;
            }
        }
        self.queue_lines.insert((ride, station));
        self
    }

    /// Park entrance facing `direction` into the park, plus the public path
    /// outside it
    pub fn add_park_entrance(&mut self, tile: TileCoords, direction: Direction) -> &mut Self {
        self.put_tile(tile, TileKind::ParkEntrance);
        let back = DIRECTION_DELTAS[direction as usize & 3];
        let outside = (tile.to_coords() + CoordsXY::new(-back.x, -back.y)).tile();
        self.put_tile(outside, TileKind::Path);
        self.entrances.push((tile, direction));
        self
    }

    pub fn add_addition(&mut self, tile: TileCoords, kind: AdditionKind) -> &mut Self {
        if let Some(t) = self.tiles.get_mut(&tile) {
            t.addition = Some(PathAddition {
                kind,
                broken: false,
                ghost: false,
                status: 0xFF,
            });
        }
        self
    }

    /// Register a ride, shop or facility
    ///
    /// Rides get an entrance tile at each station's `entrance`; stalls and
    /// facilities occupy their first station's start tile.
    pub fn add_ride(&mut self, ride: RideInfo) -> &mut Self {
        let id = ride.id;
        if ride.class.is_ride() {
            for (index, station) in ride.stations.iter().enumerate() {
                self.footprints.insert(station.start.tile(), id);
                self.footprints.insert(station.end.tile(), id);
                if let Some(entrance) = station.entrance {
                    self.put_tile(
                        entrance.tile(),
                        TileKind::RideEntrance {
                            ride: id,
                            station: StationIndex(index as u8),
                        },
                    );
                }
            }
        } else if let Some(loc) = ride.location() {
            self.put_tile(loc.tile(), TileKind::Shop(id));
        }
        self.stats.insert(id, RideStats::default());
        self.rides.insert(id, ride);
        self.invalidate_routes();
        self
    }

    /// Ride tiles guests can look at that carry no station
    pub fn add_footprint(&mut self, ride: RideId, tile: TileCoords) -> &mut Self {
        self.footprints.insert(tile, ride);
        self
    }

    pub fn add_lawn(&mut self, tile: TileCoords, length: u8) -> &mut Self {
        self.lawns.insert(tile, length);
        self
    }

    pub fn add_scenery(&mut self, tile: TileCoords, age: u8) -> &mut Self {
        self.scenery.insert(tile, age);
        self
    }

    pub fn ride_mut(&mut self, id: RideId) -> Option<&mut RideInfo> {
        self.rides.get_mut(&id)
    }

    pub fn stats(&self, id: RideId) -> Option<&RideStats> {
        self.stats.get(&id)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn litter(&self) -> &[Litter] {
        &self.litter
    }

    pub fn queue(&self, ride: RideId, station: StationIndex) -> Vec<Handle> {
        self.queues
            .get(&(ride, station))
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Where new guests appear: the public path outside the first entrance
    pub fn spawn_point(&self) -> Option<CoordsXYZ> {
        self.entrances.first().map(|(tile, direction)| {
            let back = DIRECTION_DELTAS[*direction as usize & 3];
            let outside = tile.to_coords() + CoordsXY::new(-back.x, -back.y);
            outside.to_tile_centre().with_z(0)
        })
    }

    /// First path tile inside the first entrance
    pub fn inside_entrance(&self) -> Option<CoordsXYZ> {
        self.entrances.first().map(|(tile, direction)| {
            let inside = tile.to_coords() + DIRECTION_DELTAS[*direction as usize & 3];
            inside.to_tile_centre().with_z(0)
        })
    }

    /// Break a ride down and start calling for a mechanic
    pub fn break_down(&mut self, id: RideId, reason: BreakdownReason) {
        let Some(ride) = self.rides.get_mut(&id) else {
            return;
        };
        ride.flags.insert(RideFlags::BROKEN_DOWN);
        ride.breakdown_reason = Some(reason);
        ride.mechanic_status = MechanicStatus::Calling;
        ride.mechanic = Handle::NULL;
        ride.reliability_percentage = ride.reliability_percentage.saturating_sub(10);
        let vehicle_fault = matches!(
            reason,
            BreakdownReason::RestraintsStuckClosed
                | BreakdownReason::RestraintsStuckOpen
                | BreakdownReason::DoorsStuckClosed
                | BreakdownReason::DoorsStuckOpen
                | BreakdownReason::VehicleMalfunction
        );
        if vehicle_fault {
            if let Some(station) = ride.stations.first() {
                let car = station.end.xy().to_tile_centre().with_z(station.end.z);
                self.broken_vehicles.insert(id, car);
            }
        }
        tracing::debug!("{:?} broke down: {:?}", id, reason);
    }

    /// Flag a ride as due for inspection
    pub fn request_inspection(&mut self, id: RideId) {
        if let Some(ride) = self.rides.get_mut(&id) {
            if ride.is_broken() {
                return;
            }
            ride.flags.insert(RideFlags::DUE_INSPECTION);
            ride.mechanic_status = MechanicStatus::Calling;
        }
    }

    /// Grow grass and age scenery
    pub fn advance(&mut self, tick: Tick) {
        if tick % 512 == 0 {
            for length in self.lawns.values_mut() {
                *length = (*length + 1).min(6);
            }
        }
        if tick % 256 == 0 {
            for age in self.scenery.values_mut() {
                *age = age.saturating_add(1);
            }
        }
    }

    fn is_owned_tile(&self, tile: TileCoords) -> bool {
        (self.owned_min.x..=self.owned_max.x).contains(&tile.x)
            && (self.owned_min.y..=self.owned_max.y).contains(&tile.y)
    }

    fn neighbour(tile: TileCoords, direction: Direction) -> TileCoords {
        (tile.to_coords() + DIRECTION_DELTAS[direction as usize & 3]).tile()
    }

    /// Whether two adjacent tiles join up
    fn connected(&self, a: TileCoords, b: TileCoords) -> bool {
        let (Some(ta), Some(tb)) = (self.tiles.get(&a), self.tiles.get(&b)) else {
            return false;
        };
        self.joins(ta, tb) || self.joins(tb, ta)
    }

    fn joins(&self, a: &SandboxTile, b: &SandboxTile) -> bool {
        match (a.kind, b.kind) {
            (TileKind::Path | TileKind::ParkEntrance, TileKind::Path | TileKind::ParkEntrance) => true,
            (TileKind::Queue { ride, station }, TileKind::Queue { ride: r, station: s }) => {
                ride == r && station == s
            }
            (TileKind::Queue { .. }, TileKind::Path) => a.queue_head,
            (TileKind::Queue { ride, station }, TileKind::RideEntrance { ride: r, station: s }) => {
                ride == r && station == s
            }
            (TileKind::Path, TileKind::RideEntrance { ride, station }) => {
                !self.queue_lines.contains(&(ride, station))
            }
            (TileKind::Path, TileKind::Shop(_)) => true,
            _ => false,
        }
    }

    fn edges(&self, tile: TileCoords) -> u8 {
        (0..4u8)
            .filter(|d| self.connected(tile, Self::neighbour(tile, *d)))
            .fold(0, |acc, d| acc | (1 << d))
    }

    /// Tiles an agent may stand on or pass through for a goal
    fn passable(&self, tile: TileCoords, key: FieldKey) -> bool {
        let Some(t) = self.tiles.get(&tile) else {
            return false;
        };
        let owned = self.is_owned_tile(tile);
        match (t.kind, key) {
            (TileKind::Path, FieldKey::ParkEntrance) => true,
            (TileKind::Path, _) => owned,
            (TileKind::Queue { .. }, FieldKey::Ride { staff: true, .. })
            | (TileKind::Queue { .. }, FieldKey::Tile { staff: true, .. }) => true,
            (TileKind::Queue { ride, .. }, FieldKey::Ride { ride: goal, .. }) => ride == goal,
            _ => false,
        }
    }

    fn is_target(&self, tile: TileCoords, key: FieldKey) -> bool {
        let Some(t) = self.tiles.get(&tile) else {
            return matches!(key, FieldKey::Tile { tile: goal, .. } if goal == tile);
        };
        match key {
            FieldKey::Ride { ride, staff } => match t.kind {
                TileKind::RideEntrance { ride: r, .. } | TileKind::Shop(r) => r == ride,
                // Staff heading to a ride without an entrance stop at its queue
                TileKind::Queue { ride: r, .. } => staff && r == ride && !self.has_entrance(ride),
                _ => false,
            },
            FieldKey::ParkEntrance => t.kind == TileKind::ParkEntrance,
            FieldKey::Tile { tile: goal, .. } => goal == tile,
        }
    }

    fn has_entrance(&self, ride: RideId) -> bool {
        self.tiles
            .values()
            .any(|t| matches!(t.kind, TileKind::RideEntrance { ride: r, .. } if r == ride))
    }

    /// Breadth-first distances from every target outward
    fn build_field(&self, key: FieldKey) -> AHashMap<TileCoords, u16> {
        let mut field = AHashMap::new();
        let mut frontier = VecDeque::new();
        let mut targets: Vec<TileCoords> = self
            .tiles
            .keys()
            .copied()
            .filter(|tile| self.is_target(*tile, key))
            .collect();
        if let FieldKey::Tile { tile, .. } = key {
            if !targets.contains(&tile) {
                targets.push(tile);
            }
        }
        targets.sort();
        for tile in targets {
            field.insert(tile, 0u16);
            frontier.push_back(tile);
        }

        while let Some(tile) = frontier.pop_front() {
            let distance = field[&tile];
            for direction in 0..4 {
                let next = Self::neighbour(tile, direction);
                if field.contains_key(&next) || !self.passable(next, key) {
                    continue;
                }
                // Targets that are not path tiles join any adjacent walkway
                let linked = self.connected(tile, next)
                    || (distance == 0 && !self.tiles.contains_key(&tile));
                if !linked {
                    continue;
                }
                field.insert(next, distance + 1);
                frontier.push_back(next);
            }
        }
        field
    }

    fn field_distance(&self, key: FieldKey, tile: TileCoords) -> Option<u16> {
        let mut fields = self.fields.borrow_mut();
        let field = fields.entry(key).or_insert_with(|| self.build_field(key));
        field.get(&tile).copied()
    }

    fn step_to(&self, from: TileCoords, direction: Direction, is_staff: bool) -> PathStep {
        let next = Self::neighbour(from, direction);
        let mut flags = PathingFlags::empty();
        let from_queue = matches!(
            self.tiles.get(&from).map(|t| t.kind),
            Some(TileKind::Queue { .. })
        );
        let interaction = match self.tiles.get(&next).map(|t| t.kind) {
            Some(TileKind::ParkEntrance) => Some(PathInteraction::ParkEntrance),
            Some(TileKind::RideEntrance { ride, station }) => {
                flags |= PathingFlags::RIDE_ENTRANCE;
                Some(PathInteraction::RideEntrance { ride, station })
            }
            Some(TileKind::Shop(ride)) => Some(PathInteraction::Shop(ride)),
            Some(TileKind::Queue { ride, station }) if !from_queue && !is_staff => {
                Some(PathInteraction::QueueEntrance { ride, station })
            }
            _ => None,
        };
        PathStep {
            next: Some(next.to_coords().with_z(0)),
            direction,
            on_surface: false,
            sloped: false,
            flags,
            interaction,
        }
    }

    fn wander(&self, from: TileCoords, request: &PathRequest, rng: &mut ScenarioRng) -> PathStep {
        let options: Vec<Direction> = (0..4u8)
            .filter(|d| request.allowed_directions & (1 << d) != 0)
            .filter(|d| {
                let next = Self::neighbour(from, *d);
                let Some(tile) = self.tiles.get(&next) else {
                    return false;
                };
                let allowed = match tile.kind {
                    TileKind::Path => self.is_owned_tile(next),
                    TileKind::Queue { .. } => true,
                    TileKind::Shop(_) => !request.is_staff,
                    TileKind::ParkEntrance | TileKind::RideEntrance { .. } => false,
                };
                allowed && self.joins_from(from, next)
            })
            .collect();
        if options.is_empty() {
            return PathStep::blocked();
        }
        let pick = options[rng.next_max(options.len() as u32) as usize];
        self.step_to(from, pick, request.is_staff)
    }

    /// Connectivity, treating a non-path starting tile as joined to any
    /// neighbouring walkway
    fn joins_from(&self, from: TileCoords, next: TileCoords) -> bool {
        match self.tiles.get(&from) {
            Some(tile) if tile.is_walkway() => self.connected(from, next),
            _ => self.tiles.get(&next).is_some_and(SandboxTile::is_walkway),
        }
    }

    fn route(&self, from: TileCoords, key: FieldKey, request: &PathRequest) -> PathStep {
        let here = self.field_distance(key, from);
        let mut best: Option<(u16, Direction)> = None;
        for direction in 0..4u8 {
            if request.allowed_directions & (1 << direction) == 0 {
                continue;
            }
            let next = Self::neighbour(from, direction);
            let Some(distance) = self.field_distance(key, next) else {
                continue;
            };
            // Off-path targets such as lawns are reached from any side
            let reachable = self.joins_from(from, next)
                || (distance == 0 && !self.tiles.contains_key(&next));
            if !reachable {
                continue;
            }
            if here.is_some_and(|h| distance >= h) {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, direction));
            }
        }
        match best {
            Some((_, direction)) => self.step_to(from, direction, request.is_staff),
            None => PathStep::blocked(),
        }
    }
}

impl WorldMap for SandboxPark {
    fn is_owned(&self, loc: CoordsXY) -> bool {
        self.is_owned_tile(loc.tile())
    }

    fn surface_height(&self, loc: CoordsXY) -> Option<i32> {
        loc.tile().is_on_map().then_some(0)
    }

    fn surface_blocked(&self, loc: CoordsXY) -> bool {
        let tile = loc.tile();
        if !tile.is_on_map() || self.footprints.contains_key(&tile) || self.scenery.contains_key(&tile) {
            return true;
        }
        self.tiles.get(&tile).is_some_and(|t| !t.is_walkway())
    }

    fn path_at(&self, loc: CoordsXYZ) -> Option<PathInfo> {
        if loc.z != 0 {
            return None;
        }
        let tile = loc.tile();
        let t = self.tiles.get(&tile)?;
        if !t.is_walkway() {
            return None;
        }
        let queue_for = match t.kind {
            TileKind::Queue { ride, .. } => Some(ride),
            _ => None,
        };
        Some(PathInfo {
            edges: self.edges(tile),
            sloped: false,
            queue_for,
            addition: t.addition,
        })
    }

    fn park_entrances(&self) -> Vec<CoordsXYZ> {
        self.entrances
            .iter()
            .map(|(tile, _)| tile.to_coords().with_z(0))
            .collect()
    }

    fn grass_length(&self, tile: TileCoords) -> Option<u8> {
        self.lawns.get(&tile).copied()
    }

    fn mow(&mut self, tile: TileCoords) {
        if let Some(length) = self.lawns.get_mut(&tile) {
            *length = 0;
        }
    }

    fn scenery_age(&self, tile: TileCoords, _z: i32) -> Option<u8> {
        self.scenery.get(&tile).copied()
    }

    fn water_scenery(&mut self, tile: TileCoords, _z: i32) -> u16 {
        match self.scenery.get_mut(&tile) {
            Some(age) => {
                *age = 0;
                1
            }
            None => 0,
        }
    }

    fn litter_on_tile(&self, tile: TileCoords) -> Vec<Litter> {
        self.litter
            .iter()
            .filter(|l| l.loc.tile() == tile)
            .copied()
            .collect()
    }

    fn place_litter(&mut self, litter: Litter) {
        self.litter.push(litter);
    }

    fn remove_litter_at(&mut self, loc: CoordsXYZ) -> usize {
        let tile = loc.tile();
        let before = self.litter.len();
        self.litter
            .retain(|l| !(l.loc.tile() == tile && (l.loc.z - loc.z).abs() <= 16));
        before - self.litter.len()
    }

    fn set_addition_status(&mut self, loc: CoordsXYZ, status: u8) {
        if let Some(addition) = self.tiles.get_mut(&loc.tile()).and_then(|t| t.addition.as_mut()) {
            addition.status = status;
        }
    }

    fn break_addition(&mut self, loc: CoordsXYZ) {
        if let Some(addition) = self.tiles.get_mut(&loc.tile()).and_then(|t| t.addition.as_mut()) {
            addition.broken = true;
        }
    }

    fn surroundings(&self, loc: CoordsXYZ) -> Surroundings {
        let centre = loc.xy();
        let near = |tile: &TileCoords| tile.centre().chebyshev(centre) <= SURROUNDINGS_RANGE;
        let mut found = Surroundings::default();
        let additions = self
            .tiles
            .iter()
            .filter(|(tile, _)| near(tile))
            .filter_map(|(_, t)| t.addition.filter(|a| !a.ghost));
        for addition in additions {
            if addition.kind == AdditionKind::JumpingFountain {
                found.fountains += 1;
            } else if addition.broken {
                found.rubbish += 1;
            }
        }
        found.scenery = self.scenery.keys().filter(|tile| near(tile)).count() as u16;
        found.rubbish += self
            .litter
            .iter()
            .filter(|l| l.loc.xy().chebyshev(centre) <= SURROUNDINGS_RANGE)
            .count() as u16;
        found.music = self
            .footprints
            .iter()
            .filter(|(tile, _)| near(tile))
            .filter_map(|(_, id)| self.rides.get(id))
            .any(|ride| {
                ride.flags.contains(RideFlags::MUSIC)
                    && ride.status != RideStatus::Closed
                    && !ride.flags.intersects(RideFlags::BROKEN_DOWN | RideFlags::CRASHED)
            });
        found
    }

    fn view_from_edge(&self, loc: CoordsXYZ, edge: Direction) -> Option<RideView> {
        let mut tile = loc.tile();
        for _ in 0..2 {
            tile = Self::neighbour(tile, edge);
            if let Some(ride) = self.footprints.get(&tile) {
                return Some(RideView {
                    ride: Some(*ride),
                    is_new_ride: false,
                });
            }
            if self.scenery.contains_key(&tile) {
                return Some(RideView {
                    ride: None,
                    is_new_ride: false,
                });
            }
            if self.tiles.contains_key(&tile) {
                return None;
            }
        }
        None
    }
}

impl Pathfinder for SandboxPark {
    fn next_step(&self, request: &PathRequest, rng: &mut ScenarioRng) -> PathStep {
        let from = request.from.tile();
        let key = match request.goal {
            PathGoal::Wander => return self.wander(from, request, rng),
            PathGoal::ParkExit => {
                if self.tiles.contains_key(&from) && !self.is_owned_tile(from) {
                    let mut step = PathStep::blocked();
                    step.flags |= PathingFlags::OUTSIDE_PARK;
                    return step;
                }
                FieldKey::ParkEntrance
            }
            PathGoal::ParkEntrance => FieldKey::ParkEntrance,
            PathGoal::Ride(ride) => FieldKey::Ride {
                ride,
                staff: request.is_staff,
            },
            PathGoal::Location(loc) => FieldKey::Tile {
                tile: loc.tile(),
                staff: request.is_staff,
            },
        };
        self.route(from, key, request)
    }
}

impl RideEconomy for SandboxPark {
    fn ride_ids(&self) -> Vec<RideId> {
        self.rides.keys().copied().collect()
    }

    fn ride(&self, id: RideId) -> Option<&RideInfo> {
        self.rides.get(&id)
    }

    fn queue_front(&self, ride: RideId, station: StationIndex) -> Option<Handle> {
        self.queues.get(&(ride, station)).and_then(|q| q.front().copied())
    }

    fn join_queue(&mut self, ride: RideId, station: StationIndex, guest: Handle) {
        self.queues.entry((ride, station)).or_default().push_back(guest);
        if let Some(info) = self
            .rides
            .get_mut(&ride)
            .and_then(|r| r.stations.get_mut(station.0 as usize))
        {
            info.queue_length = info.queue_length.saturating_add(1);
        }
    }

    fn leave_queue(&mut self, ride: RideId, station: StationIndex, guest: Handle) {
        let Some(queue) = self.queues.get_mut(&(ride, station)) else {
            return;
        };
        let Some(position) = queue.iter().position(|h| *h == guest) else {
            return;
        };
        queue.remove(position);
        if let Some(info) = self
            .rides
            .get_mut(&ride)
            .and_then(|r| r.stations.get_mut(station.0 as usize))
        {
            info.queue_length = info.queue_length.saturating_sub(1);
        }
    }

    fn guest_ahead(&self, ride: RideId, station: StationIndex, guest: Handle) -> Option<Handle> {
        let queue = self.queues.get(&(ride, station))?;
        let position = queue.iter().position(|h| *h == guest)?;
        position.checked_sub(1).and_then(|i| queue.get(i).copied())
    }

    fn try_board(&mut self, ride: RideId, station: StationIndex, guest: Handle, tick: Tick) -> Option<Seat> {
        let info = self.rides.get(&ride)?;
        if !info.is_open() || info.is_broken() {
            return None;
        }
        if self.queue_front(ride, station) != Some(guest) {
            return None;
        }
        self.leave_queue(ride, station, guest);
        let aboard = self.riders.values().filter(|r| r.ride == ride).count();
        self.riders.insert(
            guest,
            Rider {
                ride,
                finishes_at: tick + self.ride_duration,
            },
        );
        Some(Seat {
            train: 0,
            car: (aboard / 4) as u8,
            seat: (aboard % 4) as u8,
        })
    }

    fn rider_status(&self, ride: RideId, guest: Handle, tick: Tick) -> RiderStatus {
        match self.riders.get(&guest) {
            Some(rider) if rider.ride == ride => {
                if tick >= rider.finishes_at {
                    RiderStatus::Finished
                } else {
                    RiderStatus::Riding
                }
            }
            _ => RiderStatus::NotOnRide,
        }
    }

    fn leave_vehicle(&mut self, _ride: RideId, guest: Handle) {
        self.riders.remove(&guest);
    }

    fn add_customer(&mut self, ride: RideId) {
        if let Some(stats) = self.stats.get_mut(&ride) {
            stats.customers += 1;
        }
    }

    fn update_popularity(&mut self, ride: RideId, liked: bool) {
        if let Some(stats) = self.stats.get_mut(&ride) {
            if liked {
                stats.liked += 1;
            } else {
                stats.disliked += 1;
            }
        }
    }

    fn set_queue_full(&mut self, ride: RideId, full: bool) {
        if let Some(info) = self.rides.get_mut(&ride) {
            info.flags.set(RideFlags::QUEUE_FULL, full);
        }
    }

    fn update_satisfaction(&mut self, ride: RideId, satisfaction: u8) {
        if let Some(stats) = self.stats.get_mut(&ride) {
            stats.satisfaction_total += satisfaction as u32;
            stats.satisfaction_votes += 1;
        }
    }

    fn add_income(&mut self, ride: RideId, amount: Money) {
        if let Some(stats) = self.stats.get_mut(&ride) {
            stats.income += amount;
        }
    }

    fn record_sale(&mut self, ride: RideId, secondary: bool) {
        if let Some(stats) = self.stats.get_mut(&ride) {
            if secondary {
                stats.secondary_sales += 1;
            } else {
                stats.primary_sales += 1;
            }
        }
    }

    fn finance_payment(&mut self, amount: Money, kind: ExpenditureType) {
        self.cash -= amount;
        *self.expenditure.entry(format!("{:?}", kind)).or_default() += amount;
    }

    fn set_mechanic_status(&mut self, ride: RideId, status: MechanicStatus, mechanic: Handle) {
        if let Some(info) = self.rides.get_mut(&ride) {
            info.mechanic_status = status;
            info.mechanic = mechanic;
        }
    }

    fn broken_vehicle_location(&self, ride: RideId) -> Option<CoordsXYZ> {
        self.broken_vehicles.get(&ride).copied()
    }

    fn fix_vehicle(&mut self, ride: RideId) {
        self.broken_vehicles.remove(&ride);
    }

    fn fix_breakdown(&mut self, ride: RideId, steps: u32) {
        self.broken_vehicles.remove(&ride);
        if let Some(info) = self.rides.get_mut(&ride) {
            info.flags
                .remove(RideFlags::BROKEN_DOWN | RideFlags::BREAKDOWN_PENDING | RideFlags::DUE_INSPECTION);
            info.breakdown_reason = None;
            info.mechanic_status = MechanicStatus::Undefined;
            info.mechanic = Handle::NULL;
            let gain = (steps * RELIABILITY_PER_FIX_STEP).min(100) as u8;
            info.reliability_percentage = info.reliability_percentage.saturating_add(gain).min(100);
        }
    }

    fn mark_inspected(&mut self, ride: RideId, reliability_gain: u32) {
        if let Some(info) = self.rides.get_mut(&ride) {
            info.flags.remove(RideFlags::DUE_INSPECTION);
            info.mechanic_status = MechanicStatus::Undefined;
            info.mechanic = Handle::NULL;
            let gain = reliability_gain.min(100) as u8;
            info.reliability_percentage = info.reliability_percentage.saturating_add(gain).min(100);
        }
    }
}

impl Notifier for SandboxPark {
    fn post(&mut self, notification: Notification) {
        tracing::trace!("Notification: {:?}", notification);
        self.notifications.push(notification);
    }
}

// ============================================================================
// Generated demo park
// ============================================================================

/// Columns of the ride plots along each ride street
const RIDE_COLUMNS: [i32; 4] = [5, 10, 21, 26];
/// Street rows with rides hanging off them
const RIDE_STREETS: [i32; 2] = [8, 18];
const SHOP_STREET: i32 = 28;
const MAIN_STREET: i32 = 16;

/// A ride station with its entrance and exit laid out below a street
pub fn ride_plot(id: RideId, ride_type: RideTypeId, column: i32, street: i32) -> RideInfo {
    let station_tile = TileCoords::new(column, street + 4);
    RideInfo {
        id,
        ride_type,
        class: RideClass::Ride,
        status: RideStatus::Open,
        flags: RideFlags::empty(),
        price: [20, 0],
        value: Some(40),
        ratings: Some(RideRatings {
            excitement: rating(5, 0),
            intensity: rating(4, 0),
            nausea: rating(2, 0),
        }),
        sheltered_eighths: 0,
        highest_drop_height: 10,
        items: [None, None],
        stations: vec![StationInfo {
            start: station_tile.to_coords().with_z(0),
            direction: 1,
            end: TileCoords::new(column, street + 6).to_coords().with_z(0),
            entrance: Some(TileCoords::new(column, street + 3).to_coords().with_z(0)),
            exit: Some(TileCoords::new(column + 1, street + 3).to_coords().with_z(0)),
            queue_length: 0,
        }],
        breakdown_reason: None,
        mechanic_status: MechanicStatus::Undefined,
        mechanic: Handle::NULL,
        reliability_percentage: 100,
    }
}

/// A stall, toilet block, first aid room or cash machine on one tile
pub fn shop_plot(id: RideId, class: RideClass, tile: TileCoords, items: [Option<ShopItem>; 2]) -> RideInfo {
    let price = |item: Option<ShopItem>| item.map_or(0, |i| i.descriptor().default_price);
    RideInfo {
        id,
        ride_type: RideTypeId((id.0 as u8).wrapping_add(100)),
        class,
        status: RideStatus::Open,
        flags: RideFlags::empty(),
        price: match class {
            RideClass::Shop => [price(items[0]), price(items[1])],
            _ => [0, 0],
        },
        value: None,
        ratings: None,
        sheltered_eighths: 8,
        highest_drop_height: 0,
        items,
        stations: vec![StationInfo {
            start: tile.to_coords().with_z(0),
            direction: 3,
            end: tile.to_coords().with_z(0),
            entrance: None,
            exit: None,
            queue_length: 0,
        }],
        breakdown_reason: None,
        mechanic_status: MechanicStatus::Undefined,
        mechanic: Handle::NULL,
        reliability_percentage: 100,
    }
}

impl SandboxPark {
    /// Lay out a ride plot with its queue and exit path below `street`
    pub fn add_ride_plot(&mut self, ride: RideInfo, column: i32, street: i32) -> &mut Self {
        let id = ride.id;
        self.add_queue(
            id,
            StationIndex(0),
            &[
                TileCoords::new(column, street + 1),
                TileCoords::new(column, street + 2),
            ],
        );
        self.add_path_line(
            TileCoords::new(column + 1, street + 3),
            TileCoords::new(column + 2, street + 3),
        );
        self.add_path_line(
            TileCoords::new(column + 2, street + 2),
            TileCoords::new(column + 2, street + 1),
        );
        self.add_ride(ride);
        for dx in -1..=1 {
            for dy in 4..=6 {
                self.add_footprint(id, TileCoords::new(column + dx, street + dy));
            }
        }
        self
    }

    /// A 32x32 park with eight rides, six shops and facilities, benches,
    /// bins, lawns and gardens, varied by `seed`
    pub fn generate(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut park = SandboxPark::new(TileCoords::new(1, 2), TileCoords::new(30, 30));

        park.add_park_entrance(TileCoords::new(MAIN_STREET, 1), 1);
        park.add_path_line(
            TileCoords::new(MAIN_STREET, 2),
            TileCoords::new(MAIN_STREET, SHOP_STREET),
        );
        for street in RIDE_STREETS.into_iter().chain([SHOP_STREET]) {
            park.add_path_line(TileCoords::new(3, street), TileCoords::new(29, street));
            for x in (4..=28).step_by(3) {
                let kind = if x % 2 == 0 {
                    AdditionKind::Bench
                } else {
                    AdditionKind::Bin
                };
                if x != MAIN_STREET {
                    park.add_addition(TileCoords::new(x, street), kind);
                }
            }
        }

        let mut next_id = 0u16;
        for street in RIDE_STREETS {
            for column in RIDE_COLUMNS {
                let id = RideId(next_id);
                let mut ride = ride_plot(id, RideTypeId(next_id as u8), column, street);
                let excitement = rng.gen_range(200..900);
                ride.ratings = Some(RideRatings {
                    excitement,
                    intensity: rng.gen_range(100..1000),
                    nausea: rng.gen_range(50..700),
                });
                ride.value = Some((excitement / 10) as Money);
                ride.price = [rng.gen_range(1..=6) * 10, 0];
                ride.highest_drop_height = rng.gen_range(0..100);
                ride.sheltered_eighths = rng.gen_range(0..=8);
                if rng.gen_bool(0.5) {
                    ride.flags.insert(RideFlags::MUSIC);
                }
                if rng.gen_bool(0.25) {
                    ride.flags.insert(RideFlags::UMBRELLA_OK);
                }
                park.add_ride_plot(ride, column, street);
                next_id += 1;
            }
        }

        let shops = [
            (5, RideClass::Shop, [Some(ShopItem::Burger), Some(ShopItem::Drink)]),
            (8, RideClass::Shop, [Some(ShopItem::Drink), None]),
            (11, RideClass::Toilets, [None, None]),
            (21, RideClass::FirstAid, [None, None]),
            (24, RideClass::CashMachine, [None, None]),
            (27, RideClass::Shop, [Some(ShopItem::Balloon), Some(ShopItem::Umbrella)]),
        ];
        for (column, class, items) in shops {
            let id = RideId(next_id);
            let mut shop = shop_plot(id, class, TileCoords::new(column, SHOP_STREET + 1), items);
            if class == RideClass::Toilets {
                shop.price = [1, 0];
            }
            park.add_ride(shop);
            next_id += 1;
        }

        for y in 3..=7 {
            for x in 3..=14 {
                park.add_lawn(TileCoords::new(x, y), rng.gen_range(0..=6));
            }
            for x in 17..=29 {
                if rng.gen_bool(0.4) {
                    park.add_scenery(TileCoords::new(x, y), rng.gen_range(0..0x50));
                }
            }
        }

        tracing::debug!(
            "Generated sandbox park: {} rides, {} path tiles",
            park.rides.len(),
            park.tiles.len()
        );
        park
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_park() -> SandboxPark {
        let mut park = SandboxPark::new(TileCoords::new(0, 2), TileCoords::new(20, 20));
        park.add_park_entrance(TileCoords::new(5, 1), 1);
        park.add_path_line(TileCoords::new(5, 2), TileCoords::new(5, 8));
        park.add_path_line(TileCoords::new(2, 4), TileCoords::new(10, 4));
        let ride = ride_plot(RideId(0), RideTypeId(0), 8, 4);
        park.add_ride_plot(ride, 8, 4);
        park
    }

    fn request(from: TileCoords, goal: PathGoal) -> PathRequest {
        PathRequest {
            from: from.to_coords().with_z(0),
            goal,
            allowed_directions: 0xF,
            is_staff: false,
        }
    }

    #[test]
    fn test_edges_follow_neighbours() {
        let park = tiny_park();
        let info = park.path_at(CoordsXYZ::new(5 * 32, 4 * 32, 0)).expect("path");
        assert_eq!(info.edges, 0b1111);
        let queue = park.path_at(CoordsXYZ::new(8 * 32, 5 * 32, 0)).expect("queue");
        assert_eq!(queue.queue_for, Some(RideId(0)));
    }

    #[test]
    fn test_route_to_ride_enters_queue() {
        let park = tiny_park();
        let mut rng = ScenarioRng::from_state(1, 1);
        let step = park.next_step(&request(TileCoords::new(8, 4), PathGoal::Ride(RideId(0))), &mut rng);
        assert_eq!(step.next, Some(TileCoords::new(8, 5).to_coords().with_z(0)));
        assert_eq!(
            step.interaction,
            Some(PathInteraction::QueueEntrance {
                ride: RideId(0),
                station: StationIndex(0)
            })
        );

        let step = park.next_step(&request(TileCoords::new(8, 6), PathGoal::Ride(RideId(0))), &mut rng);
        assert!(step.flags.contains(PathingFlags::RIDE_ENTRANCE));
    }

    #[test]
    fn test_exit_route_leaves_park() {
        let park = tiny_park();
        let mut rng = ScenarioRng::from_state(1, 1);
        let step = park.next_step(&request(TileCoords::new(5, 2), PathGoal::ParkExit), &mut rng);
        assert_eq!(step.interaction, Some(PathInteraction::ParkEntrance));

        let outside = park.next_step(&request(TileCoords::new(5, 0), PathGoal::ParkExit), &mut rng);
        assert!(outside.flags.contains(PathingFlags::OUTSIDE_PARK));
    }

    #[test]
    fn test_queue_order_and_boarding() {
        let mut park = tiny_park();
        let a = Handle::from_bits(1);
        let b = Handle::from_bits(2);
        park.join_queue(RideId(0), StationIndex(0), a);
        park.join_queue(RideId(0), StationIndex(0), b);
        assert_eq!(park.guest_ahead(RideId(0), StationIndex(0), b), Some(a));
        assert_eq!(park.ride(RideId(0)).map(|r| r.stations[0].queue_length), Some(2));

        assert!(park.try_board(RideId(0), StationIndex(0), b, 0).is_none());
        assert!(park.try_board(RideId(0), StationIndex(0), a, 0).is_some());
        assert_eq!(park.queue_front(RideId(0), StationIndex(0)), Some(b));
        assert_eq!(park.rider_status(RideId(0), a, 10), RiderStatus::Riding);
        assert_eq!(park.rider_status(RideId(0), a, DEFAULT_RIDE_DURATION), RiderStatus::Finished);
    }

    #[test]
    fn test_broken_ride_refuses_boarding() {
        let mut park = tiny_park();
        let a = Handle::from_bits(1);
        park.join_queue(RideId(0), StationIndex(0), a);
        park.break_down(RideId(0), BreakdownReason::BrakesFailure);
        assert!(park.try_board(RideId(0), StationIndex(0), a, 0).is_none());
        park.fix_breakdown(RideId(0), 4);
        assert!(!park.ride(RideId(0)).is_some_and(RideInfo::is_broken));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = SandboxPark::generate(42);
        let b = SandboxPark::generate(42);
        assert_eq!(a.ride_ids(), b.ride_ids());
        for id in a.ride_ids() {
            assert_eq!(a.ride(id), b.ride(id));
        }
        assert_eq!(a.ride_ids().len(), 14);
        assert!(a.spawn_point().is_some());
    }
}
