//! Move-or-stay decision

use placestore::Location;
use serde::Serialize;

/// Why the persona leaves a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveReason {
    PlannedDurationReached,
    MaxDaysReached,
    AttractionsExhausted,
}

impl MoveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlannedDurationReached => "planned-duration-reached",
            Self::MaxDaysReached => "max-days-reached",
            Self::AttractionsExhausted => "attractions-exhausted",
        }
    }
}

impl std::fmt::Display for MoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs to the decision for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionInput {
    pub current_day: u32,
    pub planned_duration: u32,
    pub min_days: u32,
    pub max_days: u32,
    /// Attractions not yet included in a post; restaurants do not gate a move
    pub available_attractions: u32,
}

impl DecisionInput {
    pub fn for_location(location: &Location, min_days: u32, max_days: u32, available_attractions: u32) -> Self {
        Self {
            current_day: location.current_day,
            planned_duration: location.planned_duration,
            min_days,
            max_days,
            available_attractions,
        }
    }
}

/// Outcome of the decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Stay,
    /// Every clause that held, in evaluation order
    Move(Vec<MoveReason>),
}

impl Decision {
    pub fn should_move(&self) -> bool {
        matches!(self, Self::Move(_))
    }
}

/// Evaluate the three move clauses; any one of them means move
pub fn decide(input: DecisionInput) -> Decision {
    let mut reasons = Vec::new();
    if input.current_day >= input.planned_duration {
        reasons.push(MoveReason::PlannedDurationReached);
    }
    if input.current_day >= input.max_days {
        reasons.push(MoveReason::MaxDaysReached);
    }
    if input.available_attractions == 0 && input.current_day >= input.min_days {
        reasons.push(MoveReason::AttractionsExhausted);
    }

    if reasons.is_empty() {
        Decision::Stay
    } else {
        Decision::Move(reasons)
    }
}

/// Shorthand for `decide(..).should_move()`
pub fn should_move(input: DecisionInput) -> bool {
    decide(input).should_move()
}
