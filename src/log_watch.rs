use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::fs::File;
use std::future::Future;
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::engine::Engine;
use crate::error::WatchError;
use crate::sink::OutputSink;
use crate::stats::StatsStore;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const PREFERRED_LOG_FILE_NAME: &str = "game.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStatus {
    Continued,
    Restarted,
}

/// Only complete lines are handed out. Bytes after the last newline are kept
/// until the rest of the line is written.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl LogTail {
    pub fn open_at_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            partial: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn restart(&mut self) {
        self.offset = 0;
        self.partial.clear();
    }

    pub fn read_new_lines(&mut self) -> Result<(TailStatus, Vec<String>), WatchError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(log_path = %self.path.display(), "Game log is missing, waiting");
                return Ok((TailStatus::Continued, Vec::new()));
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let file_length = file
            .metadata()
            .map_err(|source| self.io_error(source))?
            .len();

        let mut status = TailStatus::Continued;
        if file_length < self.offset {
            tracing::info!(
                log_path = %self.path.display(),
                previous_offset = self.offset,
                file_length,
                "Game log shrank, reading from the start"
            );
            self.restart();
            status = TailStatus::Restarted;
        }

        file.seek(SeekFrom::Start(self.offset))
            .map_err(|source| self.io_error(source))?;

        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut chunk = Vec::new();

        loop {
            chunk.clear();
            let bytes_read = reader
                .read_until(b'\n', &mut chunk)
                .map_err(|source| self.io_error(source))?;
            if bytes_read == 0 {
                break;
            }

            self.offset = self.offset.saturating_add(bytes_read as u64);
            self.partial.extend_from_slice(&chunk);
            if !chunk.ends_with(b"\n") {
                break;
            }

            let line = String::from_utf8_lossy(&self.partial)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            self.partial.clear();
            lines.push(line);
        }

        Ok((status, lines))
    }

    fn io_error(&self, source: std::io::Error) -> WatchError {
        WatchError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

pub fn replay_file<S: StatsStore>(
    log_path: &Path,
    engine: &mut Engine<S>,
    sink: &mut dyn OutputSink,
) -> Result<u64, WatchError> {
    let io_error = |source| WatchError::Io {
        path: log_path.to_path_buf(),
        source,
    };
    let file = File::open(log_path).map_err(io_error)?;
    let mut reader = BufReader::new(file);
    let mut chunk = Vec::new();
    let mut total_lines = 0_u64;

    loop {
        chunk.clear();
        let bytes_read = reader.read_until(b'\n', &mut chunk).map_err(io_error)?;
        if bytes_read == 0 {
            break;
        }

        total_lines += 1;
        engine.process_line(&String::from_utf8_lossy(&chunk), sink);
    }

    engine.flush_all(sink);
    tracing::info!(log_path = %log_path.display(), total_lines, "Replay finished");
    Ok(total_lines)
}

pub async fn watch_log_file<S: StatsStore>(
    log_path: &Path,
    engine: &mut Engine<S>,
    sink: &mut dyn OutputSink,
) -> Result<(), WatchError> {
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(signal_error = %error, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    watch_log_file_until(log_path, engine, sink, shutdown).await
}

/// Lines already in the file when watching starts only feed identity
/// detection; new lines go through the full engine.
pub async fn watch_log_file_until<S, F>(
    log_path: &Path,
    engine: &mut Engine<S>,
    sink: &mut dyn OutputSink,
    shutdown: F,
) -> Result<(), WatchError>
where
    S: StatsStore,
    F: Future<Output = ()>,
{
    let mut tail = LogTail::open_at_start(log_path);
    let (_, history) = tail.read_new_lines()?;
    for line in &history {
        if engine.resolve_identity(line, sink) {
            break;
        }
    }
    tracing::info!(
        log_path = %log_path.display(),
        history_lines = history.len(),
        player = engine.identity().unwrap_or("<unknown>"),
        "Watching game log"
    );

    let (notify_sender, mut notify_receiver) =
        mpsc::unbounded_channel::<Result<Event, notify::Error>>();
    let watcher = match start_watcher(log_path, notify_sender) {
        Ok(watcher) => Some(watcher),
        Err(error) => {
            tracing::warn!(watch_error = %error, "File notifications unavailable, polling only");
            None
        }
    };
    let mut notifications_open = watcher.is_some();

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            notification = notify_receiver.recv(), if notifications_open => match notification {
                Some(Ok(event)) if is_relevant_notification(&event, log_path) => {
                    if is_replacement_notification(&event) {
                        tracing::info!(log_path = %log_path.display(), "Game log replaced, reading from the start");
                        tail.restart();
                    }
                    read_and_process_new_lines(&mut tail, engine, sink);
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!("Game log watcher error: {error}");
                }
                None => notifications_open = false,
            },
            _ = poll.tick() => read_and_process_new_lines(&mut tail, engine, sink),
        }
    }

    drop(watcher);
    read_and_process_new_lines(&mut tail, engine, sink);
    engine.flush_all(sink);
    tracing::info!(log_path = %log_path.display(), "Stopped watching game log");
    Ok(())
}

fn start_watcher(
    log_path: &Path,
    notify_sender: mpsc::UnboundedSender<Result<Event, notify::Error>>,
) -> Result<notify::RecommendedWatcher, WatchError> {
    let mut watcher = notify::recommended_watcher(move |result| {
        if notify_sender.send(result).is_err() {
            tracing::debug!("Game log watcher notification receiver dropped");
        }
    })?;

    let watch_directory = match log_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(WatchError::InvalidPath(log_path.to_path_buf())),
    };
    watcher.watch(watch_directory, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn read_and_process_new_lines<S: StatsStore>(
    tail: &mut LogTail,
    engine: &mut Engine<S>,
    sink: &mut dyn OutputSink,
) {
    match tail.read_new_lines() {
        Ok((_, lines)) => {
            for line in lines {
                engine.process_line(&line, sink);
            }
        }
        Err(error) => {
            tracing::warn!("Failed to read game log update: {error}");
        }
    }
}

fn is_relevant_notification(event: &Event, log_path: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    );
    if !relevant_kind {
        return false;
    }

    let Some(log_file_name) = log_path.file_name() else {
        return false;
    };

    event.paths.iter().any(|path| {
        path == log_path
            || path
                .file_name()
                .map(|file_name| file_name == log_file_name)
                .unwrap_or(false)
    })
}

fn is_replacement_notification(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

pub fn resolve_game_log_path(path: &Path) -> Result<PathBuf, WatchError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    if path.is_dir() {
        return find_latest_game_log_path(path)?
            .ok_or_else(|| WatchError::InvalidPath(path.to_path_buf()));
    }

    Err(WatchError::InvalidPath(path.to_path_buf()))
}

fn is_game_log_file_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".log")
}

fn find_latest_game_log_path(log_directory: &Path) -> Result<Option<PathBuf>, WatchError> {
    let io_error = |source| WatchError::Io {
        path: log_directory.to_path_buf(),
        source,
    };
    let directory_entries = std::fs::read_dir(log_directory).map_err(io_error)?;

    let mut latest_match: Option<(SystemTime, PathBuf)> = None;

    for entry_result in directory_entries {
        let entry = entry_result.map_err(io_error)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.eq_ignore_ascii_case(PREFERRED_LOG_FILE_NAME) {
            return Ok(Some(path));
        }
        if !is_game_log_file_name(file_name) {
            continue;
        }

        let modified_time = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        if latest_match
            .as_ref()
            .map(|(latest_time, _)| modified_time > *latest_time)
            .unwrap_or(true)
        {
            latest_match = Some((modified_time, path));
        }
    }

    Ok(latest_match.map(|(_, path)| path))
}
