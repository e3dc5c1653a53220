mod store;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

pub use store::{JsonStatsStore, MemoryStatsStore, StatsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Kills,
    Deaths,
    Incaps,
    Appearances,
}

impl StatCategory {
    pub const ALL: [StatCategory; 4] = [
        StatCategory::Kills,
        StatCategory::Deaths,
        StatCategory::Incaps,
        StatCategory::Appearances,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatCategory::Kills => "Kills",
            StatCategory::Deaths => "Deaths",
            StatCategory::Incaps => "Incaps",
            StatCategory::Appearances => "Appearances",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    AllTime,
    Session,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    #[serde(default)]
    pub kills: BTreeMap<String, u64>,
    #[serde(default)]
    pub deaths: BTreeMap<String, u64>,
    #[serde(default)]
    pub incaps: BTreeMap<String, u64>,
    #[serde(default)]
    pub appearances: BTreeMap<String, u64>,
}

impl StatsRecord {
    pub fn counters(&self, category: StatCategory) -> &BTreeMap<String, u64> {
        match category {
            StatCategory::Kills => &self.kills,
            StatCategory::Deaths => &self.deaths,
            StatCategory::Incaps => &self.incaps,
            StatCategory::Appearances => &self.appearances,
        }
    }

    fn counters_mut(&mut self, category: StatCategory) -> &mut BTreeMap<String, u64> {
        match category {
            StatCategory::Kills => &mut self.kills,
            StatCategory::Deaths => &mut self.deaths,
            StatCategory::Incaps => &mut self.incaps,
            StatCategory::Appearances => &mut self.appearances,
        }
    }

    pub fn increment(&mut self, category: StatCategory, key: &str) -> u64 {
        let count = self
            .counters_mut(category)
            .entry(key.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn count(&self, category: StatCategory, key: &str) -> u64 {
        self.counters(category).get(key).copied().unwrap_or(0)
    }

    pub fn total(&self, category: StatCategory) -> u64 {
        self.counters(category).values().sum()
    }

    pub fn is_empty(&self) -> bool {
        StatCategory::ALL
            .iter()
            .all(|category| self.counters(*category).is_empty())
    }

    pub fn ranked(&self, category: StatCategory) -> Vec<(&str, u64)> {
        let mut entries = self
            .counters(category)
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect::<Vec<_>>();
        entries.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(right.0)));
        entries
    }
}

#[derive(Debug, Default)]
pub struct SessionStatsRegistry {
    records: HashMap<String, StatsRecord>,
}

impl SessionStatsRegistry {
    pub fn get(&self, player: &str) -> Option<&StatsRecord> {
        self.records.get(player)
    }

    fn record_mut(&mut self, player: &str) -> &mut StatsRecord {
        self.records.entry(player.to_string()).or_default()
    }

    pub fn reset_all(&mut self) {
        self.records.clear();
    }
}

#[derive(Debug)]
pub struct StatsAccumulator<S: StatsStore> {
    store: S,
    player: Option<String>,
    all_time: StatsRecord,
    session: SessionStatsRegistry,
}

impl<S: StatsStore> StatsAccumulator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            player: None,
            all_time: StatsRecord::default(),
            session: SessionStatsRegistry::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    pub fn all_time(&self) -> &StatsRecord {
        &self.all_time
    }

    pub fn session(&self) -> Option<&StatsRecord> {
        self.player
            .as_deref()
            .and_then(|player| self.session.get(player))
    }

    pub fn session_registry(&self) -> &SessionStatsRegistry {
        &self.session
    }

    pub fn load_player(&mut self, player: &str) {
        self.all_time = self.store.load(player);
        self.player = Some(player.to_string());
        tracing::info!(
            player = %player,
            kills = self.all_time.total(StatCategory::Kills),
            deaths = self.all_time.total(StatCategory::Deaths),
            "Loaded all-time stats"
        );
    }

    /// The in-memory counters stay incremented even when saving fails.
    pub fn record(&mut self, category: StatCategory, key: &str) -> Result<(), PersistenceError> {
        let Some(player) = self.player.as_deref() else {
            tracing::debug!(key = %key, "Skipping stats update before a player is known");
            return Ok(());
        };

        self.all_time.increment(category, key);
        self.session.record_mut(player).increment(category, key);
        self.store.save(player, &self.all_time)
    }

    pub fn reset(&mut self, scope: StatsScope) -> Result<(), PersistenceError> {
        match scope {
            StatsScope::Session => {
                self.session.reset_all();
                Ok(())
            }
            StatsScope::AllTime => {
                self.all_time = StatsRecord::default();
                match self.player.as_deref() {
                    Some(player) => self.store.save(player, &self.all_time),
                    None => Ok(()),
                }
            }
        }
    }
}
