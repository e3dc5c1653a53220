mod names;
pub(crate) mod patterns;

use chrono::{DateTime, Utc};

use crate::events::{ActorState, EventFact, SUICIDE_KILLER};
use patterns::{
    capture_first, pattern, Grammar, ACTOR_KILL_TRIGGER, CONTROL_STATE_TRIGGER, INCAP_TRIGGER,
    NICKNAME_TRIGGER, VEHICLE_DESTROY_TRIGGER,
};

pub use names::{clean_name, is_same_player};

pub fn classify(line: &str, identity: &str, at: DateTime<Utc>) -> Vec<EventFact> {
    let mut facts = Vec::new();
    if identity.is_empty() {
        return facts;
    }

    if line.contains(VEHICLE_DESTROY_TRIGGER) {
        facts.extend(classify_vehicle_destruction(line, at));
    }

    if line.contains(ACTOR_KILL_TRIGGER) {
        facts.extend(classify_actor_kill(line, identity, at));
    }

    if is_state_change_line(line) {
        facts.extend(classify_state_change(line, identity, at));
    }

    if line.contains(INCAP_TRIGGER) {
        if let Some(target) = capture_first(Grammar::IncapNickname, line)
            .filter(|target| !is_same_player(target, identity))
        {
            facts.push(EventFact::Incapacitation {
                target: target.to_string(),
                at,
            });
        }
    }

    if line.contains(NICKNAME_TRIGGER) {
        if let Some(name) = capture_first(Grammar::QuotedNickname, line)
            .filter(|name| !is_same_player(name, identity))
        {
            facts.push(EventFact::Appearance {
                name: name.to_string(),
                at,
            });
        }
    }

    facts
}

pub fn is_state_change_line(line: &str) -> bool {
    pattern(Grammar::Corpse).is_match(line) || line.contains(CONTROL_STATE_TRIGGER)
}

fn classify_vehicle_destruction(line: &str, at: DateTime<Utc>) -> Option<EventFact> {
    let Some(captures) = pattern(Grammar::VehicleDestroyLevel).captures(line) else {
        tracing::debug!("Discarding vehicle destroy line without a complete match");
        return None;
    };

    let vehicle_id = captures.get(1)?.as_str();
    let from_level = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let to_level = captures.get(3)?.as_str().parse::<u32>().ok()?;
    let cause_actor = captures.get(4)?.as_str();
    let weapon = captures.get(5)?.as_str();

    Some(EventFact::VehicleDestruction {
        vehicle_id: vehicle_id.to_string(),
        from_level,
        to_level,
        cause_actor: cause_actor.to_string(),
        weapon: weapon.to_string(),
        at,
    })
}

fn classify_actor_kill(line: &str, identity: &str, at: DateTime<Utc>) -> Option<EventFact> {
    let Some(captures) = pattern(Grammar::ActorKill).captures(line) else {
        tracing::debug!("Discarding actor kill line without a complete match");
        return None;
    };

    let victim = captures.get(1)?.as_str();
    let killer = captures.get(2)?.as_str();
    let using = captures.get(3).map(|value| value.as_str().to_string());
    let damage_type = captures.get(4).map(|value| value.as_str().to_string());

    if victim == identity && killer == identity {
        return Some(EventFact::ActorDeath {
            victim: identity.to_string(),
            killer: SUICIDE_KILLER.to_string(),
            weapon: None,
            damage_type,
            at,
        });
    }

    if victim == identity {
        return Some(EventFact::ActorDeath {
            victim: identity.to_string(),
            killer: killer.to_string(),
            weapon: using,
            damage_type,
            at,
        });
    }

    if killer == identity {
        return Some(EventFact::ActorKill {
            killer: identity.to_string(),
            victim: victim.to_string(),
            method: using,
            at,
        });
    }

    None
}

fn classify_state_change(line: &str, identity: &str, at: DateTime<Utc>) -> Option<EventFact> {
    let player = capture_first(Grammar::StatePlayer, line)?;
    if player != identity {
        return None;
    }

    Some(EventFact::ActorStateChange {
        player: player.to_string(),
        state: ActorState::Corpse,
        at,
    })
}
