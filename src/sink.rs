use std::io::Write;

use chrono::{DateTime, Local, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Notice,
    Event,
    MissionSummary,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub kind: FeedKind,
    pub text: String,
    pub at: Option<DateTime<Utc>>,
    pub raw_line: Option<String>,
}

impl FeedEntry {
    pub fn new(kind: FeedKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            at: None,
            raw_line: None,
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_raw_line(mut self, raw_line: impl Into<String>) -> Self {
        self.raw_line = Some(raw_line.into());
        self
    }
}

pub trait OutputSink {
    fn emit(&mut self, entry: FeedEntry);
}

#[derive(Debug, Default)]
pub struct FeedCollector {
    pub entries: Vec<FeedEntry>,
}

impl FeedCollector {
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.text.as_str()).collect()
    }
}

impl OutputSink for FeedCollector {
    fn emit(&mut self, entry: FeedEntry) {
        self.entries.push(entry);
    }
}

pub struct ConsoleSink<W: Write> {
    writer: W,
    show_raw_lines: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, show_raw_lines: bool) -> Self {
        Self {
            writer,
            show_raw_lines,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_entry(&mut self, entry: &FeedEntry) -> std::io::Result<()> {
        let at = entry.at.unwrap_or_else(Utc::now);
        writeln!(self.writer, "{} {}", format_local_time(at), entry.text)?;

        if self.show_raw_lines {
            if let Some(raw_line) = entry.raw_line.as_deref() {
                for line in raw_line.lines() {
                    writeln!(self.writer, "    ↳ Raw: {}", line.trim_end())?;
                }
            }
        }

        self.writer.flush()
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn emit(&mut self, entry: FeedEntry) {
        if let Err(error) = self.write_entry(&entry) {
            tracing::warn!(
                feed_text = %entry.text,
                write_error = %error,
                "Failed to write feed entry"
            );
        }
    }
}

pub fn format_local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
