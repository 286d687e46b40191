use serde::{Deserialize, Serialize};

use crate::traits::LogicalClock;

/// A clock that advances `time_step` units on every full-resolution call and
/// reports a logical tick every `divider` calls.
///
/// With the default divider of 1 every call ticks, and the loop's sub-step
/// cadence alone decides how often the simulation advances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedStepClock {
    pub time_step: u64,
    pub divider: u32,
    calls: u32,
    time: u64,
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl FixedStepClock {
    pub fn new(time_step: u64, divider: u32) -> Self {
        Self {
            time_step,
            divider: divider.max(1),
            calls: 0,
            time: 0,
        }
    }
}

impl LogicalClock for FixedStepClock {
    fn tick(&mut self, sub_step: bool) -> bool {
        self.calls += 1;
        if self.calls < self.divider {
            return false;
        }
        self.calls = 0;
        if !sub_step {
            self.time += self.time_step;
        }
        true
    }

    fn current_time(&self) -> u64 {
        self.time
    }

    fn reset(&mut self) {
        self.calls = 0;
        self.time = 0;
    }
}
