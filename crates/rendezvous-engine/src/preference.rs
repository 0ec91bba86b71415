//! Working-hour desirability tiers.
//!
//! Meetings placed in the middle of someone's working day score best; the
//! margins of a working window score less, and time outside every window is
//! penalised unless the person is highly flexible.

use serde::{Deserialize, Serialize};

use crate::model::{Flexibility, TimeOfDay, WorkingWindow};

/// Start of the fixed core band (local time).
pub const CORE_BAND_START: TimeOfDay = TimeOfDay::hm(10, 0);
/// End of the fixed core band (local time, exclusive).
pub const CORE_BAND_END: TimeOfDay = TimeOfDay::hm(16, 0);

/// Desirability of a local instant for one person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeTier {
    /// Inside a working window and inside the 10:00–16:00 core band.
    Core,
    /// Inside a working window but outside the core band.
    Edge,
    /// Outside working hours, for a highly flexible person.
    Flexible,
    /// Outside working hours.
    Outside,
}

impl TimeTier {
    /// Additive score contribution.
    pub const fn score(self) -> i32 {
        match self {
            TimeTier::Core => 20,
            TimeTier::Edge => 10,
            TimeTier::Flexible => 5,
            TimeTier::Outside => -50,
        }
    }
}

/// Classify `time` against the working windows of its weekday.
pub fn classify(time: TimeOfDay, windows: &[WorkingWindow], flexibility: Flexibility) -> TimeTier {
    match windows.iter().find(|w| w.contains(time)) {
        Some(window) => {
            let core_start = window.start.max(CORE_BAND_START);
            let core_end = window.end.min(CORE_BAND_END);
            if core_start <= time && time < core_end {
                TimeTier::Core
            } else {
                TimeTier::Edge
            }
        }
        None if flexibility == Flexibility::High => TimeTier::Flexible,
        None => TimeTier::Outside,
    }
}
