use chrono::{DateTime, Utc};

use crate::aggregator::{EventAggregator, PendingEvent};
use crate::classifier::{classify, is_state_change_line};
use crate::error::PersistenceError;
use crate::events::EventFact;
use crate::identity::IdentityResolver;
use crate::narrative::{render_fact, render_identity_detected, render_unattributed_state_change};
use crate::sink::{FeedEntry, FeedKind, OutputSink};
use crate::stats::{StatsAccumulator, StatsScope, StatsStore};
use crate::timestamp::LineTime;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub report_unattributed_state_changes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            report_unattributed_state_changes: true,
        }
    }
}

/// Calls must be serialized: the engine holds no locks and expects each line
/// to be fully handled before the next one arrives.
pub struct Engine<S: StatsStore> {
    resolver: IdentityResolver,
    stats: StatsAccumulator<S>,
    aggregator: EventAggregator,
    options: EngineOptions,
    clock: fn() -> DateTime<Utc>,
    last_raw_line: Option<String>,
}

impl<S: StatsStore> Engine<S> {
    pub fn new(store: S, options: EngineOptions) -> Self {
        Self {
            resolver: IdentityResolver::default(),
            stats: StatsAccumulator::new(store),
            aggregator: EventAggregator::default(),
            options,
            clock: Utc::now,
            last_raw_line: None,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.resolver.identity()
    }

    pub fn stats(&self) -> &StatsAccumulator<S> {
        &self.stats
    }

    pub fn pending_event_count(&self) -> usize {
        self.aggregator.pending_len()
    }

    pub fn last_raw_line(&self) -> Option<&str> {
        self.last_raw_line.as_deref()
    }

    pub fn resolve_identity(&mut self, line: &str, sink: &mut dyn OutputSink) -> bool {
        let line = trim_line_ending(line);
        if !self.resolver.is_resolved() {
            let line_time = LineTime::resolve(line, self.clock);
            self.detect_identity(line, line_time, sink);
        }

        self.resolver.is_resolved()
    }

    pub fn process_line(&mut self, line: &str, sink: &mut dyn OutputSink) {
        let line = trim_line_ending(line);
        self.last_raw_line = Some(line.to_string());
        let line_time = LineTime::resolve(line, self.clock);

        let Some(identity) = self.resolver.identity().map(str::to_string) else {
            self.detect_identity(line, line_time, sink);
            return;
        };

        for entry in self.aggregator.flush_older_than(line_time.at) {
            sink.emit(entry);
        }

        let facts = classify(line, &identity, line_time.at);
        if facts.is_empty() {
            if self.options.report_unattributed_state_changes && is_state_change_line(line) {
                sink.emit(
                    FeedEntry::new(FeedKind::Event, render_unattributed_state_change(line))
                        .at(line_time.at)
                        .with_raw_line(line),
                );
            }
            return;
        }

        for fact in facts {
            self.accept_fact(&identity, fact, line, sink);
        }
    }

    pub fn flush_all(&mut self, sink: &mut dyn OutputSink) {
        for entry in self.aggregator.flush_all() {
            sink.emit(entry);
        }
    }

    pub fn reset_stats(&mut self, scope: StatsScope) -> Result<(), PersistenceError> {
        self.stats.reset(scope)
    }

    fn detect_identity(&mut self, line: &str, line_time: LineTime, sink: &mut dyn OutputSink) {
        let Some(player) = self.resolver.resolve(line).map(str::to_string) else {
            return;
        };

        tracing::info!(player = %player, "Detected player name");
        self.stats.load_player(&player);

        let mut entry = FeedEntry::new(FeedKind::Notice, render_identity_detected(&player))
            .with_raw_line(line);
        if line_time.from_log {
            entry = entry.at(line_time.at);
        }
        sink.emit(entry);
    }

    fn accept_fact(
        &mut self,
        identity: &str,
        fact: EventFact,
        line: &str,
        sink: &mut dyn OutputSink,
    ) {
        if let Some((category, key)) = fact.stat_entry() {
            if let Err(error) = self.stats.record(category, key) {
                tracing::warn!(
                    player = %identity,
                    stats_error = %error,
                    "Failed to persist stats"
                );
                sink.emit(FeedEntry::new(
                    FeedKind::Advisory,
                    format!("Failed to save stats for {identity}: {error}"),
                ));
            }
        }

        if fact.is_aggregated() {
            self.aggregator.add_event(PendingEvent {
                identity: identity.to_string(),
                fact,
                raw_line: line.to_string(),
            });
            return;
        }

        let at = fact.at();
        sink.emit(
            FeedEntry::new(FeedKind::Event, render_fact(&fact))
                .at(at)
                .with_raw_line(line),
        );
    }
}

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::{Engine, EngineOptions};
    use crate::error::PersistenceError;
    use crate::sink::{FeedCollector, FeedKind};
    use crate::stats::{MemoryStatsStore, StatCategory, StatsRecord, StatsScope, StatsStore};
    use chrono::{DateTime, TimeZone, Utc};

    const IDENTITY_LINE: &str = r#"<2025-03-01T18:00:00.000Z> [Notice] <Expect Incoming Connection> nickname="Star_Pilot" playerGEID=2001"#;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn engine() -> Engine<MemoryStatsStore> {
        Engine::new(MemoryStatsStore::default(), EngineOptions::default()).with_clock(fixed_clock)
    }

    fn line_at(second: u32, body: &str) -> String {
        format!("<2025-03-01T18:{:02}:{:02}.000Z> {body}", second / 60, second % 60)
    }

    fn kill_of(victim: &str, killer: &str, second: u32) -> String {
        line_at(
            second,
            &format!("[Notice] <Actor Death> CActor::Kill: '{victim}' [1] in zone 'OOC' killed by '{killer}' [2] using 'KSAR_Rifle_01_77' [Class x] with damage type 'Bullet'"),
        )
    }

    #[derive(Debug, Default)]
    struct FailingStore;

    impl StatsStore for FailingStore {
        fn load(&self, _player: &str) -> StatsRecord {
            StatsRecord::default()
        }

        fn save(&mut self, player: &str, _record: &StatsRecord) -> Result<(), PersistenceError> {
            Err(PersistenceError::Finalize {
                path: format!("{player}_stats.json").into(),
                message: "disk full".to_string(),
            })
        }
    }

    #[test]
    fn identity_line_is_not_classified_and_later_lines_cannot_change_it() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();

        engine.process_line(&kill_of("Raider_77", "Star_Pilot", 1), &mut feed);
        assert!(feed.entries.is_empty(), "Nothing is classified before identity");

        engine.process_line(IDENTITY_LINE, &mut feed);
        engine.process_line(r#"nickname="Intruder""#, &mut feed);
        engine.process_line("Player[Intruder] requested inventory", &mut feed);

        assert_eq!(engine.identity(), Some("Star_Pilot"));
        assert_eq!(feed.entries[0].text, "Detected player name: Star_Pilot");
        assert_eq!(feed.entries[0].kind, FeedKind::Notice);
        assert_eq!(
            feed.texts()[1..],
            ["Player appeared: Intruder"],
            "A later nickname line is an appearance, not a new identity"
        );
    }

    #[test]
    fn suicide_increments_deaths_only() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);

        engine.process_line(&kill_of("Star_Pilot", "Star_Pilot", 10), &mut feed);
        engine.flush_all(&mut feed);

        let all_time = engine.stats().all_time();
        assert_eq!(all_time.count(StatCategory::Deaths, "Suicide"), 1);
        assert!(all_time.kills.is_empty());
        assert_eq!(feed.texts().last().copied(), Some("You died by suicide"));
    }

    #[test]
    fn incaps_and_appearances_are_emitted_while_a_death_is_pending() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);

        engine.process_line(&kill_of("Star_Pilot", "Raider_77", 10), &mut feed);
        engine.process_line(
            &line_at(11, "Logged an incap. nickname: Raider_78, causes: [Bleed]"),
            &mut feed,
        );
        assert_eq!(feed.texts().last().copied(), Some("You incapacitated: Raider_78"));

        engine.process_line(
            &line_at(
                12,
                r#"[Notice] <Expect Incoming Connection> nickname="Trader_5" playerGEID=9"#,
            ),
            &mut feed,
        );
        assert_eq!(feed.texts().last().copied(), Some("Player appeared: Trader_5"));
        assert_eq!(engine.pending_event_count(), 1, "The death is still buffered");

        engine.process_line(&line_at(20, "[Notice] unrelated"), &mut feed);
        assert_eq!(
            feed.texts()[1..],
            [
                "You incapacitated: Raider_78",
                "Player appeared: Trader_5",
                "You were killed by: Raider_77 using KSAR_Rifle_01_77",
            ]
        );
        assert_eq!(engine.pending_event_count(), 0);
    }

    #[test]
    fn kills_are_emitted_at_once_and_survive_a_crash_summary() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);

        engine.process_line(&kill_of("Raider_77", "Star_Pilot", 99), &mut feed);
        assert_eq!(
            feed.texts().last().copied(),
            Some("You killed: Raider_77 using KSAR Rifle 01")
        );

        engine.process_line(
            &line_at(100, "[Notice] <Vehicle Destruction> CVehicle::OnAdvanceDestroyLevel: Vehicle 'AEGS_Gladius_9911' [9911] in zone 'OOC' driven by 'Star_Pilot' [2] advanced from destroy level 1 to 2 caused by 'Star_Pilot' [2] with 'Collision' [Class x]"),
            &mut feed,
        );
        engine.process_line(
            &line_at(102, "[Notice] <Actor Death> CActor::Kill: 'Star_Pilot' [2] in zone 'AEGS_Gladius_9911' killed by 'Star_Pilot' [2] using 'unknown' [Class unknown] with damage type 'Crash'"),
            &mut feed,
        );
        engine.process_line(&line_at(150, "[Notice] unrelated"), &mut feed);

        assert_eq!(
            feed.texts(),
            vec![
                "Detected player name: Star_Pilot",
                "You killed: Raider_77 using KSAR Rifle 01",
                "Mission Event: Star_Pilot crashed their AEGS Gladius and died",
            ]
        );
        assert_eq!(engine.stats().all_time().count(StatCategory::Kills, "Raider_77"), 1);
    }

    #[test]
    fn stats_are_recorded_when_facts_are_read() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);

        for second in 10..13 {
            engine.process_line(&kill_of("Raider_77", "Star_Pilot", second), &mut feed);
        }

        assert_eq!(
            engine.stats().all_time().count(StatCategory::Kills, "Raider_77"),
            3,
            "Counters move as soon as the line is read"
        );
        assert_eq!(
            engine
                .stats()
                .store()
                .load("Star_Pilot")
                .count(StatCategory::Kills, "Raider_77"),
            3
        );
        assert_eq!(
            engine
                .stats()
                .session()
                .map(|record| record.count(StatCategory::Kills, "Raider_77")),
            Some(3)
        );
    }

    #[test]
    fn failed_stats_write_is_advisory_and_keeps_the_count() {
        let mut engine = Engine::new(FailingStore, EngineOptions::default()).with_clock(fixed_clock);
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);

        engine.process_line(&kill_of("Raider_77", "Star_Pilot", 10), &mut feed);
        engine.process_line(&kill_of("Raider_78", "Star_Pilot", 11), &mut feed);

        let advisories = feed
            .entries
            .iter()
            .filter(|entry| entry.kind == FeedKind::Advisory)
            .count();
        assert_eq!(advisories, 2);
        assert_eq!(engine.stats().all_time().count(StatCategory::Kills, "Raider_78"), 1);
        assert!(
            feed.texts().contains(&"You killed: Raider_78 using KSAR Rifle 01"),
            "Feed keeps going after a failed write"
        );
    }

    #[test]
    fn all_time_reset_keeps_session_counts() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(IDENTITY_LINE, &mut feed);
        engine.process_line(&kill_of("Raider_77", "Star_Pilot", 10), &mut feed);

        engine
            .reset_stats(StatsScope::AllTime)
            .expect("Memory store should not fail");

        assert!(engine.stats().all_time().is_empty());
        assert!(engine.stats().store().load("Star_Pilot").is_empty());
        assert_eq!(
            engine
                .stats()
                .session()
                .map(|record| record.count(StatCategory::Kills, "Raider_77")),
            Some(1)
        );
    }

    #[test]
    fn separate_engines_do_not_share_session_stats() {
        let mut first = engine();
        let second = engine();
        let mut feed = FeedCollector::default();
        first.process_line(IDENTITY_LINE, &mut feed);
        first.process_line(&kill_of("Raider_77", "Star_Pilot", 10), &mut feed);

        assert!(first.stats().session().is_some());
        assert!(second.stats().session_registry().get("Star_Pilot").is_none());
    }

    #[test]
    fn unattributed_state_changes_are_reported_unless_disabled() {
        let corpse = line_at(10, "<[ActorState] Corpse> Player 'Raider_77' <remote client>: Running corpsify");

        let mut reporting = engine();
        let mut reporting_feed = FeedCollector::default();
        reporting.process_line(IDENTITY_LINE, &mut reporting_feed);
        reporting.process_line(&corpse, &mut reporting_feed);
        assert_eq!(
            reporting_feed.texts().last().copied(),
            Some(format!("Player status change: {corpse}").as_str())
        );
        assert!(reporting.stats().all_time().is_empty());
        assert_eq!(reporting.pending_event_count(), 0);

        let mut quiet = Engine::new(
            MemoryStatsStore::default(),
            EngineOptions {
                report_unattributed_state_changes: false,
            },
        );
        let mut quiet_feed = FeedCollector::default();
        quiet.process_line(IDENTITY_LINE, &mut quiet_feed);
        quiet.process_line(&corpse, &mut quiet_feed);
        assert_eq!(quiet_feed.entries.len(), 1);
    }

    #[test]
    fn lines_without_timestamp_use_the_engine_clock() {
        let mut engine = engine();
        let mut feed = FeedCollector::default();
        engine.process_line(r#"nickname="Star_Pilot""#, &mut feed);
        engine.process_line("Logged an incap. nickname: Raider_78", &mut feed);

        assert_eq!(feed.entries[0].at, None);
        assert_eq!(feed.entries[1].at, Some(fixed_clock()));
        assert_eq!(engine.last_raw_line(), Some("Logged an incap. nickname: Raider_78"));
    }
}
