use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::{Engine, EngineOptions};
use crate::log_watch::{replay_file, resolve_game_log_path, watch_log_file};
use crate::settings::TrackerSettings;
use crate::sink::ConsoleSink;
use crate::stats::{
    JsonStatsStore, MemoryStatsStore, StatCategory, StatsAccumulator, StatsRecord, StatsScope,
    StatsStore,
};

#[derive(Parser, Debug)]
#[command(name = "killfeed")]
#[command(about = "Turn a Star Citizen game log into a kill feed with per-player stats")]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to settings.json in the app directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding <player>_stats.json files
    #[arg(long, global = true)]
    pub stats_dir: Option<PathBuf>,

    /// Print the raw log line under every message
    #[arg(long, global = true)]
    pub raw: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow a live game log until Ctrl-C
    Watch {
        /// Game log file or the directory that contains it
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Run a finished game log through the feed
    Replay {
        path: PathBuf,

        /// Keep stats in memory instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show all-time stats of a player
    Stats {
        player: String,

        #[arg(long)]
        json: bool,
    },
    /// Clear all-time stats of a player
    ResetStats { player: String },
    /// List players that have stats on disk
    Players,
}

impl Args {
    pub fn apply_to(&self, settings: &mut TrackerSettings) {
        if let Some(stats_dir) = &self.stats_dir {
            settings.stats_dir = Some(stats_dir.clone());
        }
        if self.raw {
            settings.show_raw_lines = true;
        }
        if let Command::Watch { log: Some(log) } = &self.command {
            settings.log_path = Some(log.clone());
        }
    }
}

pub async fn execute(command: &Command, settings: &TrackerSettings) -> Result<(), String> {
    match command {
        Command::Watch { .. } => watch(settings).await,
        Command::Replay { path, dry_run } => {
            if *dry_run {
                replay_with_store(path, MemoryStatsStore::default(), settings)
            } else {
                replay_with_store(path, json_store(settings)?, settings)
            }
        }
        Command::Stats { player, json } => show_stats(&json_store(settings)?, player, *json),
        Command::ResetStats { player } => reset_stats(json_store(settings)?, player),
        Command::Players => list_players(&json_store(settings)?),
    }
}

fn json_store(settings: &TrackerSettings) -> Result<JsonStatsStore, String> {
    Ok(JsonStatsStore::new(settings.resolved_stats_dir()?))
}

fn engine_options(settings: &TrackerSettings) -> EngineOptions {
    EngineOptions {
        report_unattributed_state_changes: settings.report_unattributed_state_changes,
    }
}

async fn watch(settings: &TrackerSettings) -> Result<(), String> {
    let configured_path = settings
        .log_path
        .as_deref()
        .ok_or_else(|| "No game log configured, pass --log or set log_path".to_string())?;
    let log_path = resolve_game_log_path(configured_path).map_err(|error| error.to_string())?;

    let mut engine = Engine::new(json_store(settings)?, engine_options(settings));
    let mut sink = ConsoleSink::new(std::io::stdout(), settings.show_raw_lines);
    watch_log_file(&log_path, &mut engine, &mut sink)
        .await
        .map_err(|error| error.to_string())
}

fn replay_with_store<S: StatsStore>(
    path: &Path,
    store: S,
    settings: &TrackerSettings,
) -> Result<(), String> {
    let log_path = resolve_game_log_path(path).map_err(|error| error.to_string())?;
    let mut engine = Engine::new(store, engine_options(settings));
    let mut sink = ConsoleSink::new(std::io::stdout(), settings.show_raw_lines);

    replay_file(&log_path, &mut engine, &mut sink).map_err(|error| error.to_string())?;
    Ok(())
}

fn show_stats(store: &JsonStatsStore, player: &str, as_json: bool) -> Result<(), String> {
    let record = store.load(player);
    let output = if as_json {
        serde_json::to_string_pretty(&record).map_err(|error| error.to_string())?
    } else {
        format_stats_report(player, &record)
    };

    print_output(&output)
}

fn reset_stats(store: JsonStatsStore, player: &str) -> Result<(), String> {
    let mut stats = StatsAccumulator::new(store);
    stats.load_player(player);
    stats
        .reset(StatsScope::AllTime)
        .map_err(|error| error.to_string())?;

    tracing::info!(player = %player, "Cleared all-time stats");
    print_output(&format!("Cleared all-time stats for {player}"))
}

fn list_players(store: &JsonStatsStore) -> Result<(), String> {
    let players = store.list_players().map_err(|error| error.to_string())?;
    if players.is_empty() {
        return print_output(&format!("No stats in {}", store.directory().display()));
    }

    print_output(&players.join("\n"))
}

fn print_output(output: &str) -> Result<(), String> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").map_err(|error| error.to_string())
}

pub fn format_stats_report(player: &str, record: &StatsRecord) -> String {
    let mut report = format!("Stats for {player}");
    if record.is_empty() {
        report.push_str("\n  no interactions recorded");
        return report;
    }

    for category in StatCategory::ALL {
        let entries = record.ranked(category);
        if entries.is_empty() {
            continue;
        }

        report.push_str(&format!("\n{} ({})", category.label(), record.total(category)));
        for (name, count) in entries {
            report.push_str(&format!("\n  {name}: {count}"));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{format_stats_report, Args, Command};
    use crate::settings::TrackerSettings;
    use crate::stats::{StatCategory, StatsRecord};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn report_lists_categories_by_rank() {
        let mut record = StatsRecord::default();
        for victim in ["Raider_77", "Raider_78", "Raider_78"] {
            record.increment(StatCategory::Kills, victim);
        }
        record.increment(StatCategory::Deaths, "Suicide");

        assert_eq!(
            format_stats_report("Star_Pilot", &record),
            "Stats for Star_Pilot\nKills (3)\n  Raider_78: 2\n  Raider_77: 1\nDeaths (1)\n  Suicide: 1"
        );
        assert_eq!(
            format_stats_report("Nobody", &StatsRecord::default()),
            "Stats for Nobody\n  no interactions recorded"
        );
    }

    #[test]
    fn flags_override_settings_file() {
        let args = Args::try_parse_from([
            "killfeed",
            "--raw",
            "--stats-dir",
            "/tmp/feeds",
            "watch",
            "--log",
            "/games/LIVE/Game.log",
        ])
        .expect("Expected arguments to parse");
        let mut settings = TrackerSettings {
            stats_dir: Some(PathBuf::from("/ignored")),
            ..TrackerSettings::default()
        };

        args.apply_to(&mut settings);

        assert!(settings.show_raw_lines);
        assert_eq!(settings.stats_dir, Some(PathBuf::from("/tmp/feeds")));
        assert_eq!(settings.log_path, Some(PathBuf::from("/games/LIVE/Game.log")));
    }

    #[test]
    fn parses_replay_and_stats_commands() {
        let replay = Args::try_parse_from(["killfeed", "replay", "Game.log", "--dry-run"])
            .expect("Expected replay to parse");
        assert!(matches!(replay.command, Command::Replay { dry_run: true, .. }));

        let stats = Args::try_parse_from(["killfeed", "stats", "Star_Pilot", "--json", "-v"])
            .expect("Expected stats to parse");
        assert!(stats.verbose);
        assert!(matches!(
            stats.command,
            Command::Stats { ref player, json: true } if player == "Star_Pilot"
        ));

        let reset = Args::try_parse_from(["killfeed", "reset-stats", "Star_Pilot"])
            .expect("Expected reset-stats to parse");
        assert!(matches!(reset.command, Command::ResetStats { .. }));
    }
}
