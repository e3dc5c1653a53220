use std::collections::HashMap;

use regex::Regex;

pub(crate) const VEHICLE_DESTROY_TRIGGER: &str = "CVehicle::OnAdvanceDestroyLevel";
pub(crate) const ACTOR_KILL_TRIGGER: &str = "CActor::Kill:";
pub(crate) const INCAP_TRIGGER: &str = "Logged an incap";
pub(crate) const NICKNAME_TRIGGER: &str = "nickname=";
pub(crate) const CONTROL_STATE_TRIGGER: &str = "Entering control state";
pub(crate) const PLAYER_BRACKET_TRIGGER: &str = "Player[";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Grammar {
    VehicleDestroyLevel,
    ActorKill,
    Corpse,
    StatePlayer,
    IncapNickname,
    QuotedNickname,
    PlayerBracket,
}

impl Grammar {
    const ALL: [Grammar; 7] = [
        Grammar::VehicleDestroyLevel,
        Grammar::ActorKill,
        Grammar::Corpse,
        Grammar::StatePlayer,
        Grammar::IncapNickname,
        Grammar::QuotedNickname,
        Grammar::PlayerBracket,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Grammar::VehicleDestroyLevel => {
                r"CVehicle::OnAdvanceDestroyLevel: Vehicle '([^']+)' .*advanced from destroy level ([0-9]+) to ([0-9]+) caused by '([^']+)' .*with '([^']+)'"
            }
            Grammar::ActorKill => {
                r"CActor::Kill: '([^']+)'.*killed by '([^']+)'(?:.*using '([^']+)')?(?:.*with damage type '([^']+)')?"
            }
            Grammar::Corpse => r"\bCorpse\b",
            Grammar::StatePlayer => r"Player '([^']*)'",
            Grammar::IncapNickname => r"nickname: ([A-Za-z0-9_]+)",
            Grammar::QuotedNickname => r#"nickname="([^"]+)""#,
            Grammar::PlayerBracket => r"Player\[([^\]]+)\]",
        }
    }
}

lazy_static::lazy_static! {
    static ref PATTERN_TABLE: HashMap<Grammar, Regex> = Grammar::ALL
        .iter()
        .map(|grammar| {
            let regex = Regex::new(grammar.pattern())
                .unwrap_or_else(|error| panic!("{grammar:?} pattern must compile: {error}"));
            (*grammar, regex)
        })
        .collect();
}

pub(crate) fn pattern(grammar: Grammar) -> &'static Regex {
    &PATTERN_TABLE[&grammar]
}

pub(crate) fn capture_first(grammar: Grammar, line: &str) -> Option<&str> {
    pattern(grammar)
        .captures(line)?
        .get(1)
        .map(|value| value.as_str())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{capture_first, pattern, Grammar};

    #[test]
    fn every_grammar_is_in_the_table() {
        for grammar in Grammar::ALL {
            assert!(!pattern(grammar).as_str().is_empty());
        }
    }

    #[test]
    fn corpse_requires_whole_word() {
        assert!(pattern(Grammar::Corpse).is_match("<Actor State> Corpse created"));
        assert!(!pattern(Grammar::Corpse).is_match("CorpseHandler tick"));
    }

    #[test]
    fn captures_quoted_nickname() {
        let line = r#"<Expect Incoming Connection> node_id=1 nickname="Star_Pilot" playerGEID=200"#;
        assert_eq!(capture_first(Grammar::QuotedNickname, line), Some("Star_Pilot"));
    }
}
