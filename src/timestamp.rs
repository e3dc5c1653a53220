use chrono::{DateTime, Utc};

const MIN_TIMESTAMP_FIELD_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTime {
    pub at: DateTime<Utc>,
    pub from_log: bool,
}

impl LineTime {
    pub fn resolve(line: &str, fallback: impl FnOnce() -> DateTime<Utc>) -> Self {
        match extract_log_timestamp(line) {
            Some(at) => Self { at, from_log: true },
            None => Self {
                at: fallback(),
                from_log: false,
            },
        }
    }
}

/// The bracketed `<2025-03-01T18:22:09.511Z>` prefix is tried first, then
/// leading fields up to the first one without date or time punctuation.
pub fn extract_log_timestamp(line: &str) -> Option<DateTime<Utc>> {
    if let Some(timestamp) = extract_bracketed_timestamp(line) {
        return Some(timestamp);
    }

    for field in line.split_whitespace() {
        if field.len() >= MIN_TIMESTAMP_FIELD_LENGTH && has_utc_designator(field) {
            if let Some(timestamp) = parse_rfc3339_utc(field) {
                return Some(timestamp);
            }
        }

        if !field.contains('-') && !field.contains(':') {
            break;
        }
    }

    None
}

fn extract_bracketed_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let open_index = line.find('<')?;
    let remainder = &line[open_index + 1..];
    let close_index = remainder.find('>')?;
    parse_rfc3339_utc(&remainder[..close_index])
}

fn parse_rfc3339_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

fn has_utc_designator(field: &str) -> bool {
    if field.ends_with('Z') || field.ends_with('z') {
        return true;
    }

    // Numeric offset suffix: `+HH:MM` or `-HH:MM`.
    let bytes = field.as_bytes();
    let Some(offset) = bytes.len().checked_sub(6).map(|start| &bytes[start..]) else {
        return false;
    };

    matches!(offset[0], b'+' | b'-')
        && offset[1].is_ascii_digit()
        && offset[2].is_ascii_digit()
        && offset[3] == b':'
        && offset[4].is_ascii_digit()
        && offset[5].is_ascii_digit()
}
