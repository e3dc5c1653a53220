use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::events::EventFact;
use crate::narrative::{render_fact, render_mission_crash};
use crate::sink::{FeedEntry, FeedKind};

pub const AGGREGATION_WINDOW_SECONDS: i64 = 5;

const CRASH_CAUSES: [&str; 2] = ["collision", "crash"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub identity: String,
    pub fact: EventFact,
    pub raw_line: String,
}

impl PendingEvent {
    pub fn at(&self) -> DateTime<Utc> {
        self.fact.at()
    }
}

#[derive(Debug)]
pub struct EventAggregator {
    pending: BTreeMap<String, Vec<PendingEvent>>,
    window: Duration,
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new(Duration::seconds(AGGREGATION_WINDOW_SECONDS))
    }
}

impl EventAggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: BTreeMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn pending_len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn add_event(&mut self, event: PendingEvent) {
        self.pending
            .entry(event.identity.clone())
            .or_default()
            .push(event);
    }

    /// An event leaves only when it is strictly more than one window older
    /// than `watermark`.
    pub fn drain_older_than(&mut self, watermark: DateTime<Utc>) -> Vec<(String, Vec<PendingEvent>)> {
        let window = self.window;
        let mut drained = Vec::new();

        for (identity, queue) in self.pending.iter_mut() {
            let (old_events, retained_events): (Vec<_>, Vec<_>) = std::mem::take(queue)
                .into_iter()
                .partition(|event| watermark - event.at() > window);
            *queue = retained_events;

            if !old_events.is_empty() {
                drained.push((identity.clone(), old_events));
            }
        }

        self.pending.retain(|_, queue| !queue.is_empty());
        drained
    }

    pub fn flush_older_than(&mut self, watermark: DateTime<Utc>) -> Vec<FeedEntry> {
        self.drain_older_than(watermark)
            .into_iter()
            .flat_map(|(_, events)| summarize_group(events))
            .collect()
    }

    pub fn flush_all(&mut self) -> Vec<FeedEntry> {
        std::mem::take(&mut self.pending)
            .into_values()
            .flat_map(summarize_group)
            .collect()
    }
}

pub fn summarize_group(mut events: Vec<PendingEvent>) -> Vec<FeedEntry> {
    events.sort_by_key(PendingEvent::at);

    if let Some(summary) = create_mission_summary(&events) {
        return vec![summary];
    }

    events
        .into_iter()
        .map(|event| {
            FeedEntry::new(FeedKind::Event, render_fact(&event.fact))
                .at(event.at())
                .with_raw_line(event.raw_line)
        })
        .collect()
}

/// Only a vehicle destruction plus a death with a collision or crash cause
/// correlate. Expects `events` sorted by time.
pub fn create_mission_summary(events: &[PendingEvent]) -> Option<FeedEntry> {
    let mut vehicle_id: Option<&str> = None;
    let mut vehicle_destroyed = false;
    let mut death: Option<(&str, DateTime<Utc>)> = None;
    let mut crash_cause = false;

    for event in events {
        match &event.fact {
            EventFact::VehicleDestruction {
                vehicle_id: id,
                cause_actor,
                weapon,
                ..
            } => {
                vehicle_destroyed = true;
                vehicle_id = Some(id.as_str());
                crash_cause |= is_crash_cause(cause_actor) || is_crash_cause(weapon);
            }
            EventFact::ActorDeath {
                victim,
                killer,
                weapon,
                at,
                ..
            } => {
                death = Some((victim.as_str(), *at));
                crash_cause |=
                    is_crash_cause(killer) || weapon.as_deref().is_some_and(is_crash_cause);
            }
            _ => {}
        }
    }

    let (player, died_at) = death.filter(|(player, _)| !player.is_empty())?;
    if !vehicle_destroyed || !crash_cause {
        return None;
    }

    let raw_lines = events
        .iter()
        .map(|event| event.raw_line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    Some(
        FeedEntry::new(FeedKind::MissionSummary, render_mission_crash(player, vehicle_id))
            .at(died_at)
            .with_raw_line(raw_lines),
    )
}

fn is_crash_cause(value: &str) -> bool {
    CRASH_CAUSES
        .iter()
        .any(|cause| value.eq_ignore_ascii_case(cause))
}
