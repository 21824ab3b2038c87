//! Supported games and their per-variant normalization rules.
//!
//! Each variant carries its drawn-number ordering rule and the routing of the
//! upstream "heart team / lucky month" field as data, so the adapter selects
//! behaviour by lookup instead of branching on game codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// One of the ten lottery variants published upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    MaisMilionaria,
    MegaSena,
    Lotofacil,
    Quina,
    Lotomania,
    Timemania,
    DuplaSena,
    Federal,
    DiaDeSorte,
    SuperSete,
}

/// How the drawn numbers of a game are ordered after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOrdering {
    /// Sort the full list ascending (as text).
    SortAll,
    /// With exactly `2 * group` numbers, sort each half independently and
    /// concatenate; any other count falls back to `SortAll`.
    SplitSorted { group: usize },
    /// Keep upstream order.
    Preserve,
}

/// Where the upstream affinity field lands on the canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityRouting {
    None,
    LuckyMonth,
    FavoriteTeam,
}

impl Game {
    pub const ALL: [Game; 10] = [
        Game::MaisMilionaria,
        Game::MegaSena,
        Game::Lotofacil,
        Game::Quina,
        Game::Lotomania,
        Game::Timemania,
        Game::DuplaSena,
        Game::Federal,
        Game::DiaDeSorte,
        Game::SuperSete,
    ];

    /// Upstream path segment / public identifier.
    pub fn code(&self) -> &'static str {
        match self {
            Game::MaisMilionaria => "maismilionaria",
            Game::MegaSena => "megasena",
            Game::Lotofacil => "lotofacil",
            Game::Quina => "quina",
            Game::Lotomania => "lotomania",
            Game::Timemania => "timemania",
            Game::DuplaSena => "duplasena",
            Game::Federal => "federal",
            Game::DiaDeSorte => "diadesorte",
            Game::SuperSete => "supersete",
        }
    }

    pub fn ordering(&self) -> NumberOrdering {
        match self {
            Game::DuplaSena => NumberOrdering::SplitSorted { group: 6 },
            Game::SuperSete | Game::Federal => NumberOrdering::Preserve,
            _ => NumberOrdering::SortAll,
        }
    }

    pub fn affinity(&self) -> AffinityRouting {
        match self {
            Game::DiaDeSorte => AffinityRouting::LuckyMonth,
            Game::Timemania => AffinityRouting::FavoriteTeam,
            _ => AffinityRouting::None,
        }
    }

    pub fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(Game::code).collect()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Game {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Game::ALL
            .iter()
            .copied()
            .find(|g| g.code() == s)
            .ok_or_else(|| ModelError::UnknownGame {
                code: s.to_string(),
                supported: Game::codes().join(", "),
            })
    }
}
