//! Content pattern dispatch.

use regex::{Captures, Regex};
use tracing::debug;

/// A request recognised in the content of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Republish the profile of the answering identity.
    Persona,
    Shanten {
        hand: String,
    },
    Score {
        hand: String,
        winning: String,
        round_wind: Option<String>,
        seat_wind: Option<String>,
    },
    Machi {
        hand: String,
    },
    /// A bare number answering a quiz puzzle.
    QuizAnswer {
        points: u32,
    },
}

/// One row of the dispatch table.
pub struct CommandRule {
    pub name: &'static str,
    pub pattern: Regex,
    build: fn(&Captures) -> Option<Command>,
}

impl std::fmt::Debug for CommandRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

fn group(caps: &Captures, idx: usize) -> Option<String> {
    caps.get(idx).map(|m| m.as_str().to_string())
}

/// Ordered rules; the first pattern that matches decides the command.
#[derive(Debug)]
pub struct CommandTable {
    rules: Vec<CommandRule>,
}

impl Default for CommandTable {
    fn default() -> Self {
        // Only the quiz answer is anchored at the start, so mentions may
        // precede the other commands.
        let rules: [(&'static str, &str, fn(&Captures) -> Option<Command>); 5] = [
            ("persona", r"\\s\[0\]$", |_| Some(Command::Persona)),
            ("shanten", r"shanten\s([<>()0-9mpsz]{2,44})$", |c| {
                Some(Command::Shanten { hand: group(c, 1)? })
            }),
            (
                "score",
                r"score\s([<>()0-9mpsz]{2,42})\s([0-9][mpsz])(\s([0-9][mpsz]))?(\s([0-9][mpsz]))?$",
                |c| {
                    Some(Command::Score {
                        hand: group(c, 1)?,
                        winning: group(c, 2)?,
                        round_wind: group(c, 4),
                        seat_wind: group(c, 6),
                    })
                },
            ),
            ("machi", r"machi\s([<>()0-9mpsz]{2,42})$", |c| {
                Some(Command::Machi { hand: group(c, 1)? })
            }),
            ("quiz", r"^\s*([0-9]{1,6})\s*$", |c| {
                Some(Command::QuizAnswer {
                    points: c.get(1)?.as_str().parse().ok()?,
                })
            }),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(name, pattern, build)| CommandRule {
                    name,
                    pattern: Regex::new(pattern).expect("static pattern"),
                    build,
                })
                .collect(),
        }
    }
}

impl CommandTable {
    /// Rule names in dispatch order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name)
    }

    /// First command whose pattern matches `content`.
    pub fn parse(&self, content: &str) -> Option<Command> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.pattern.captures(content)?;
            debug!(rule = rule.name, "command matched");
            (rule.build)(&caps)
        })
    }
}
