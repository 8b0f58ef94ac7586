//! Guest thoughts
//!
//! A guest holds at most [`MAX_THOUGHTS`] thoughts, newest first. A new
//! thought waits in a holding zone (freshness 0) until no other thought is
//! fresh, stays fresh for 220 ticks, then ages until it expires.

use serde::{Deserialize, Serialize};

use crate::core::types::RideId;
use crate::entity::items::ShopItem;

pub const MAX_THOUGHTS: usize = 5;

/// Ticks a thought stays fresh before the next one may surface
pub const FRESH_TICKS: u8 = 220;

/// Freshness at which an aged thought is dropped
pub const EXPIRED_FRESHNESS: u8 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThoughtType {
    CantAffordRide,
    SpentMoney,
    Sick,
    VerySick,
    MoreThrilling,
    Intense,
    HaventFinished,
    Sickening,
    BadValue,
    GoHome,
    GoodValue,
    AlreadyGot,
    CantAffordItem,
    NotHungry,
    NotThirsty,
    Hungry,
    Thirsty,
    Toilet,
    CantFind,
    NotPaying,
    NotWhileRaining,
    BadLitter,
    CantFindExit,
    GetOff,
    GetOut,
    NotSafe,
    PathDisgusting,
    Crowded,
    Vandalism,
    Scenery,
    VeryClean,
    Fountains,
    Music,
    NewRide,
    Lost,
    WasGreat,
    QueuingAges,
    Tired,
    RunningOut,
    Wow,
    Bought,
    Watched,
}

/// What a thought refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThoughtSubject {
    None,
    Ride(RideId),
    Item(ShopItem),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    pub kind: ThoughtType,
    pub subject: ThoughtSubject,
    pub freshness: u8,
    pub fresh_timeout: u8,
}

/// Newest-first, always compacted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtQueue {
    slots: [Option<Thought>; MAX_THOUGHTS],
}

impl ThoughtQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thought> {
        self.slots.iter().map_while(|s| s.as_ref())
    }

    pub fn newest(&self) -> Option<&Thought> {
        self.slots[0].as_ref()
    }

    pub fn contains(&self, kind: ThoughtType) -> bool {
        self.iter().any(|t| t.kind == kind)
    }

    fn remove_at(&mut self, index: usize) {
        for i in index..MAX_THOUGHTS - 1 {
            self.slots[i] = self.slots[i + 1];
        }
        self.slots[MAX_THOUGHTS - 1] = None;
    }

    /// Push a thought to the front, replacing an identical older one
    ///
    /// When the queue is full the oldest thought falls off the end.
    pub fn insert(&mut self, kind: ThoughtType, subject: ThoughtSubject) {
        let existing = self
            .iter()
            .position(|t| t.kind == kind && t.subject == subject);
        if let Some(existing) = existing {
            self.remove_at(existing);
        }
        for i in (1..MAX_THOUGHTS).rev() {
            self.slots[i] = self.slots[i - 1];
        }
        self.slots[0] = Some(Thought {
            kind,
            subject,
            freshness: 0,
            fresh_timeout: 0,
        });
    }

    /// Drop every thought of `kind`
    pub fn remove_kind(&mut self, kind: ThoughtType) {
        let mut i = 0;
        while i < MAX_THOUGHTS {
            match self.slots[i] {
                Some(t) if t.kind == kind => self.remove_at(i),
                Some(_) => i += 1,
                None => break,
            }
        }
    }

    /// Per-tick freshness update
    pub fn update(&mut self) {
        let mut add_fresh = true;
        let mut waiting = None;
        let mut i = 0;
        while i < MAX_THOUGHTS {
            let Some(thought) = self.slots[i].as_mut() else {
                break;
            };
            if thought.freshness == 1 {
                add_fresh = false;
                thought.fresh_timeout += 1;
                if thought.fresh_timeout >= FRESH_TICKS {
                    thought.fresh_timeout = 0;
                    thought.freshness += 1;
                    add_fresh = true;
                }
            } else if thought.freshness > 1 {
                thought.fresh_timeout = thought.fresh_timeout.wrapping_add(1);
                if thought.fresh_timeout == 0 {
                    thought.freshness += 1;
                    if thought.freshness >= EXPIRED_FRESHNESS {
                        self.remove_at(i);
                        continue;
                    }
                }
            } else {
                waiting = Some(i);
            }
            i += 1;
        }

        if add_fresh {
            if let Some(index) = waiting {
                if let Some(thought) = self.slots[index].as_mut() {
                    thought.freshness = 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(queue: &ThoughtQueue) -> Vec<ThoughtType> {
        queue.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_insert_is_newest_first() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        q.insert(ThoughtType::Thirsty, ThoughtSubject::None);
        assert_eq!(kinds(&q), vec![ThoughtType::Thirsty, ThoughtType::Hungry]);
    }

    #[test]
    fn test_duplicate_moves_to_front() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        q.insert(ThoughtType::Thirsty, ThoughtSubject::None);
        q.insert(ThoughtType::Tired, ThoughtSubject::None);
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        assert_eq!(
            kinds(&q),
            vec![ThoughtType::Hungry, ThoughtType::Tired, ThoughtType::Thirsty]
        );
    }

    #[test]
    fn test_same_kind_other_subject_is_kept() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::BadValue, ThoughtSubject::Ride(RideId(1)));
        q.insert(ThoughtType::BadValue, ThoughtSubject::Ride(RideId(2)));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let mut q = ThoughtQueue::new();
        let all = [
            ThoughtType::Hungry,
            ThoughtType::Thirsty,
            ThoughtType::Tired,
            ThoughtType::Lost,
            ThoughtType::Toilet,
            ThoughtType::GoHome,
        ];
        for kind in all {
            q.insert(kind, ThoughtSubject::None);
        }
        assert_eq!(q.len(), MAX_THOUGHTS);
        assert!(!q.contains(ThoughtType::Hungry));
        assert_eq!(q.newest().map(|t| t.kind), Some(ThoughtType::GoHome));
    }

    #[test]
    fn test_first_thought_becomes_fresh() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        q.update();
        assert_eq!(q.newest().map(|t| t.freshness), Some(1));
    }

    #[test]
    fn test_second_thought_waits_for_first() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        q.update();
        q.insert(ThoughtType::Thirsty, ThoughtSubject::None);
        for _ in 0..10 {
            q.update();
        }
        let fresh: Vec<_> = q.iter().map(|t| t.freshness).collect();
        assert_eq!(fresh, vec![0, 1]);

        for _ in 0..FRESH_TICKS {
            q.update();
        }
        let thirsty = q.iter().find(|t| t.kind == ThoughtType::Thirsty).unwrap();
        assert_eq!(thirsty.freshness, 1);
    }

    #[test]
    fn test_old_thoughts_expire_and_compact() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        // 1 tick to surface, 220 fresh, then 26 wraps of 256 ticks
        for _ in 0..(1 + FRESH_TICKS as u32 + 26 * 256) {
            q.update();
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_remove_kind_compacts() {
        let mut q = ThoughtQueue::new();
        q.insert(ThoughtType::Hungry, ThoughtSubject::None);
        q.insert(ThoughtType::Thirsty, ThoughtSubject::None);
        q.insert(ThoughtType::Hungry, ThoughtSubject::Item(ShopItem::Burger));
        q.remove_kind(ThoughtType::Hungry);
        assert_eq!(kinds(&q), vec![ThoughtType::Thirsty]);
    }
}
