use crate::classifier::clean_name;
use crate::events::{ActorState, EventFact, SUICIDE_KILLER};

const COLLISION_WEAPON: &str = "Collision";
const UNKNOWN_WEAPON: &str = "unknown";

pub const MISSION_EVENT_PREFIX: &str = "Mission Event: ";

pub fn destroy_status(level: u32) -> Option<&'static str> {
    match level {
        1 => Some("disabled"),
        2 => Some("destroyed"),
        _ => None,
    }
}

pub fn render_fact(fact: &EventFact) -> String {
    match fact {
        EventFact::VehicleDestruction {
            vehicle_id,
            to_level,
            cause_actor,
            weapon,
            ..
        } => render_vehicle_destruction(vehicle_id, *to_level, cause_actor, weapon),
        EventFact::ActorDeath { killer, weapon, .. } => {
            if killer == SUICIDE_KILLER {
                return "You died by suicide".to_string();
            }

            match weapon
                .as_deref()
                .filter(|weapon| !weapon.eq_ignore_ascii_case(UNKNOWN_WEAPON))
            {
                Some(weapon) => format!("You were killed by: {killer} using {weapon}"),
                None => format!("You were killed by: {killer}"),
            }
        }
        EventFact::ActorKill { victim, method, .. } => match method {
            Some(method) => format!("You killed: {victim} using {}", clean_name(method)),
            None => format!("You killed: {victim}"),
        },
        EventFact::Incapacitation { target, .. } => format!("You incapacitated: {target}"),
        EventFact::Appearance { name, .. } => format!("Player appeared: {name}"),
        EventFact::ActorStateChange { state, .. } => match state {
            ActorState::Corpse => "You turned to a corpse".to_string(),
        },
    }
}

fn render_vehicle_destruction(
    vehicle_id: &str,
    to_level: u32,
    cause_actor: &str,
    weapon: &str,
) -> String {
    let vehicle_name = clean_name(vehicle_id);
    let mut message = match destroy_status(to_level) {
        Some(status) => format!("Vehicle {vehicle_name} was {status} by {cause_actor}"),
        None => format!(
            "Vehicle {vehicle_name} advanced to destroy level {to_level}, caused by {cause_actor}"
        ),
    };

    if weapon.eq_ignore_ascii_case(COLLISION_WEAPON) {
        message.push_str(" (collision)");
    } else {
        message.push_str(&format!(" using {}", clean_name(weapon)));
    }

    message
}

pub fn render_mission_crash(player: &str, vehicle_id: Option<&str>) -> String {
    match vehicle_id.filter(|vehicle_id| !vehicle_id.is_empty()) {
        Some(vehicle_id) => format!(
            "{MISSION_EVENT_PREFIX}{player} crashed their {} and died",
            clean_name(vehicle_id)
        ),
        None => format!("{MISSION_EVENT_PREFIX}{player} died in a crash"),
    }
}

pub fn render_identity_detected(player: &str) -> String {
    format!("Detected player name: {player}")
}

pub fn render_unattributed_state_change(raw_line: &str) -> String {
    format!("Player status change: {}", raw_line.trim())
}
