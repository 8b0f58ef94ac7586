//! Guest physiological needs
//!
//! Every need is a byte; arithmetic saturates so values stay in `0..=255`.

use serde::{Deserialize, Serialize};

/// Lowest energy a guest converges to
pub const MIN_ENERGY: u8 = 32;

/// Highest current energy; the energy target may exceed it
pub const MAX_ENERGY: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestNeeds {
    pub happiness: u8,
    pub happiness_target: u8,
    pub nausea: u8,
    pub nausea_target: u8,
    pub hunger: u8,
    pub thirst: u8,
    pub toilet: u8,
}

impl Default for GuestNeeds {
    fn default() -> Self {
        Self {
            happiness: 128,
            happiness_target: 128,
            nausea: 0,
            nausea_target: 0,
            hunger: 200,
            thirst: 200,
            toilet: 0,
        }
    }
}

impl GuestNeeds {
    /// Add a signed delta to the happiness target, clamped to a byte
    pub fn adjust_happiness_target(&mut self, delta: i32) {
        self.happiness_target = clamp_u8(self.happiness_target as i32 + delta);
    }

    /// Move happiness and nausea one slow-update step toward their targets
    pub fn converge(&mut self) {
        self.happiness = step_toward(self.happiness, self.happiness_target, 4, 4);
        self.nausea = step_toward(self.nausea, self.nausea_target, 4, 4);
    }
}

pub fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Step `current` toward `target`, falling by `down` or rising by `up`
/// without overshooting
pub fn step_toward(current: u8, target: u8, down: u8, up: u8) -> u8 {
    if current >= target {
        current.saturating_sub(down).max(target)
    } else {
        current.saturating_add(up).min(target)
    }
}

/// How well a guest copes with nausea-inducing rides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NauseaTolerance {
    None,
    Low,
    Average,
    High,
}

impl NauseaTolerance {
    pub fn index(self) -> usize {
        match self {
            NauseaTolerance::None => 0,
            NauseaTolerance::Low => 1,
            NauseaTolerance::Average => 2,
            NauseaTolerance::High => 3,
        }
    }

    /// Distribution new guests draw from (`r & 7`, +4 in thrill-seeking parks)
    pub const DISTRIBUTION: [NauseaTolerance; 12] = [
        NauseaTolerance::None,
        NauseaTolerance::Low,
        NauseaTolerance::Low,
        NauseaTolerance::Average,
        NauseaTolerance::Average,
        NauseaTolerance::Average,
        NauseaTolerance::High,
        NauseaTolerance::High,
        NauseaTolerance::High,
        NauseaTolerance::High,
        NauseaTolerance::High,
        NauseaTolerance::High,
    ];
}

/// Preferred ride intensity window, in whole rating points (0..=15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntensityRange {
    pub min: u8,
    pub max: u8,
}

impl IntensityRange {
    pub const MAX_VALUE: u8 = 15;

    pub fn new(min: u8, max: u8) -> Self {
        Self {
            min: min.min(Self::MAX_VALUE),
            max: max.min(Self::MAX_VALUE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_step_toward_does_not_overshoot() {
        assert_eq!(step_toward(100, 98, 4, 4), 98);
        assert_eq!(step_toward(100, 90, 4, 4), 96);
        assert_eq!(step_toward(10, 12, 4, 4), 12);
        assert_eq!(step_toward(2, 0, 4, 4), 0);
        assert_eq!(step_toward(254, 255, 4, 4), 255);
    }

    #[test]
    fn test_adjust_target_clamps() {
        let mut needs = GuestNeeds::default();
        needs.adjust_happiness_target(500);
        assert_eq!(needs.happiness_target, 255);
        needs.adjust_happiness_target(-1000);
        assert_eq!(needs.happiness_target, 0);
    }

    #[test]
    fn test_converge_moves_both() {
        let mut needs = GuestNeeds {
            happiness: 100,
            happiness_target: 200,
            nausea: 50,
            nausea_target: 0,
            ..GuestNeeds::default()
        };
        needs.converge();
        assert_eq!(needs.happiness, 104);
        assert_eq!(needs.nausea, 46);
    }

    proptest! {
        #[test]
        fn prop_step_toward_stays_between(
            current in any::<u8>(),
            target in any::<u8>(),
            down in 0u8..16,
            up in 0u8..16,
        ) {
            let next = step_toward(current, target, down, up);
            prop_assert!(next >= current.min(target));
            prop_assert!(next <= current.max(target));
        }
    }
}
