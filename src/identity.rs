use crate::classifier::patterns::{capture_first, Grammar, NICKNAME_TRIGGER, PLAYER_BRACKET_TRIGGER};

const LEGACY_CHARACTER_MARKER: &str = "Character:";
const LEGACY_NAME_TOKEN: &str = "name";
const LEGACY_NAME_TRIM: &[char] = &['-', ':', '[', ']', '{', '}', '\\', '"', '\'', ','];

#[derive(Debug, Default)]
pub struct IdentityResolver {
    identity: Option<String>,
}

impl IdentityResolver {
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns the name only on the call that resolves it.
    pub fn resolve(&mut self, line: &str) -> Option<&str> {
        if self.identity.is_some() {
            return None;
        }

        let detected_name = extract_identity(line)?;
        self.identity = Some(detected_name);
        self.identity.as_deref()
    }
}

pub fn extract_identity(line: &str) -> Option<String> {
    if line.contains(NICKNAME_TRIGGER) {
        if let Some(name) = capture_first(Grammar::QuotedNickname, line) {
            return Some(name.to_string());
        }
    }

    if line.contains(PLAYER_BRACKET_TRIGGER) {
        if let Some(name) = capture_first(Grammar::PlayerBracket, line) {
            return Some(name.to_string());
        }
    }

    if line.contains(LEGACY_CHARACTER_MARKER) && line.contains(LEGACY_NAME_TOKEN) {
        return extract_legacy_character_name(line);
    }

    None
}

fn extract_legacy_character_name(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    tokens.find(|token| *token == LEGACY_NAME_TOKEN)?;

    let name = tokens.next()?.trim_matches(LEGACY_NAME_TRIM);
    if name.is_empty() {
        return None;
    }

    Some(name.to_string())
}
