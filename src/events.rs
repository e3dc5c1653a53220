use chrono::{DateTime, Utc};

use crate::stats::StatCategory;

pub const SUICIDE_KILLER: &str = "Suicide";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Corpse,
}

impl ActorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorState::Corpse => "corpse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFact {
    VehicleDestruction {
        vehicle_id: String,
        from_level: u32,
        to_level: u32,
        cause_actor: String,
        weapon: String,
        at: DateTime<Utc>,
    },
    ActorDeath {
        victim: String,
        killer: String,
        weapon: Option<String>,
        damage_type: Option<String>,
        at: DateTime<Utc>,
    },
    ActorKill {
        killer: String,
        victim: String,
        method: Option<String>,
        at: DateTime<Utc>,
    },
    Incapacitation {
        target: String,
        at: DateTime<Utc>,
    },
    Appearance {
        name: String,
        at: DateTime<Utc>,
    },
    ActorStateChange {
        player: String,
        state: ActorState,
        at: DateTime<Utc>,
    },
}

impl EventFact {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            EventFact::VehicleDestruction { at, .. }
            | EventFact::ActorDeath { at, .. }
            | EventFact::ActorKill { at, .. }
            | EventFact::Incapacitation { at, .. }
            | EventFact::Appearance { at, .. }
            | EventFact::ActorStateChange { at, .. } => *at,
        }
    }

    /// Only facts a mission summary can absorb wait in the aggregator.
    pub fn is_aggregated(&self) -> bool {
        matches!(
            self,
            EventFact::VehicleDestruction { .. }
                | EventFact::ActorDeath { .. }
                | EventFact::ActorStateChange { .. }
        )
    }

    pub fn stat_entry(&self) -> Option<(StatCategory, &str)> {
        match self {
            EventFact::ActorKill { victim, .. } => Some((StatCategory::Kills, victim.as_str())),
            EventFact::ActorDeath { killer, .. } => Some((StatCategory::Deaths, killer.as_str())),
            EventFact::Incapacitation { target, .. } => Some((StatCategory::Incaps, target.as_str())),
            EventFact::Appearance { name, .. } => Some((StatCategory::Appearances, name.as_str())),
            EventFact::VehicleDestruction { .. } | EventFact::ActorStateChange { .. } => None,
        }
    }

    pub fn is_suicide(&self) -> bool {
        matches!(self, EventFact::ActorDeath { killer, .. } if killer == SUICIDE_KILLER)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventFact, SUICIDE_KILLER};
    use crate::stats::StatCategory;
    use chrono::{TimeZone, Utc};

    #[test]
    fn kills_incaps_and_appearances_bypass_aggregation() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let incap = EventFact::Incapacitation {
            target: "Raider".to_string(),
            at,
        };
        let kill = EventFact::ActorKill {
            killer: "Pilot".to_string(),
            victim: "Raider".to_string(),
            method: None,
            at,
        };

        let death = EventFact::ActorDeath {
            victim: "Pilot".to_string(),
            killer: "Raider".to_string(),
            weapon: None,
            damage_type: None,
            at,
        };

        assert!(!incap.is_aggregated());
        assert!(!kill.is_aggregated());
        assert!(death.is_aggregated());
    }

    #[test]
    fn suicide_counts_as_a_death_keyed_by_suicide() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let death = EventFact::ActorDeath {
            victim: "Pilot".to_string(),
            killer: SUICIDE_KILLER.to_string(),
            weapon: None,
            damage_type: None,
            at,
        };

        assert!(death.is_suicide());
        assert_eq!(
            death.stat_entry(),
            Some((StatCategory::Deaths, SUICIDE_KILLER))
        );
    }
}
