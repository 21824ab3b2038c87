//! Canonical record model: games, identities and normalized draw results.

pub mod game;
pub mod record;

pub use game::{AffinityRouting, Game, NumberOrdering};
pub use record::{DrawResult, MonetaryTotals, PrizeTier, ResultId, WinnerLocation};
