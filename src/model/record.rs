//! Canonical draw-result record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::game::Game;

/// Identity of a stored result. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultId {
    pub game: Game,
    pub contest: u32,
}

impl ResultId {
    pub fn new(game: Game, contest: u32) -> Self {
        Self { game, contest }
    }
}

/// One prize tier of a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeTier {
    pub description: String,
    pub tier: u32,
    pub winners: u32,
    pub prize: Decimal,
}

/// Where winners of a tier bought their tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerLocation {
    pub winners: u32,
    pub municipality: String,
    pub rank: u32,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_number: Option<String>,
}

/// Accumulated and estimated amounts. `None` means the upstream did not send
/// the amount, which is different from a zero amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonetaryTotals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_0_5: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_special: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_next: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_next: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub game: Game,
    pub contest: u32,
    pub draw_date: String,
    pub location: String,
    /// Drawn numbers as published, in draw order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numbers_in_draw_order: Vec<String>,
    /// Drawn numbers after the game's ordering rule.
    pub numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub second_draw_numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bonus_symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lucky_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_team: Option<String>,
    pub prize_tiers: Vec<PrizeTier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub winner_locations: Vec<WinnerLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub rollover: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_contest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_contest_date: Option<String>,
    #[serde(default)]
    pub totals: MonetaryTotals,
}

impl DrawResult {
    pub fn id(&self) -> ResultId {
        ResultId::new(self.game, self.contest)
    }

    /// Overwrite the fields that may still change after the nominal draw
    /// time (prize figures, winners, rollover and next-contest projections).
    /// Identity and drawn numbers are left untouched.
    pub fn refresh_from(&mut self, latest: &DrawResult) {
        self.draw_date = latest.draw_date.clone();
        self.location = latest.location.clone();
        self.prize_tiers = latest.prize_tiers.clone();
        self.winner_locations = latest.winner_locations.clone();
        self.rollover = latest.rollover;
        self.next_contest = latest.next_contest;
        self.next_contest_date = latest.next_contest_date.clone();
        self.totals.accumulated_next = latest.totals.accumulated_next;
        self.totals.estimated_next = latest.totals.estimated_next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> DrawResult {
        DrawResult {
            game: Game::MegaSena,
            contest: 2700,
            draw_date: "01/06/2024".to_string(),
            location: "ESPAÇO DA SORTE em SÃO PAULO, SP".to_string(),
            numbers_in_draw_order: vec![],
            numbers: vec!["04".into(), "17".into(), "23".into()],
            second_draw_numbers: vec![],
            bonus_symbols: vec![],
            lucky_month: None,
            favorite_team: None,
            prize_tiers: vec![],
            winner_locations: vec![],
            remark: None,
            rollover: true,
            next_contest: Some(2701),
            next_contest_date: Some("04/06/2024".to_string()),
            totals: MonetaryTotals::default(),
        }
    }

    #[test]
    fn test_absent_amount_is_not_zero() {
        let mut record = sample();
        record.totals.collected = Some(Decimal::ZERO);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totals"]["collected"], serde_json::json!("0"));
        assert!(json["totals"].get("estimatedNext").is_none());

        let back: DrawResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.totals.collected, Some(Decimal::ZERO));
        assert_eq!(back.totals.estimated_next, None);
    }

    #[test]
    fn test_refresh_keeps_identity_and_numbers() {
        let mut stored = sample();
        let mut latest = sample();
        latest.numbers = vec!["99".into()];
        latest.rollover = false;
        latest.prize_tiers = vec![PrizeTier {
            description: "6 acertos".into(),
            tier: 1,
            winners: 2,
            prize: Decimal::from_str("1500000.55").unwrap(),
        }];
        latest.totals.estimated_next = Some(Decimal::from(3_000_000));
        latest.totals.collected = Some(Decimal::from(10));

        stored.refresh_from(&latest);

        assert_eq!(stored.id(), ResultId::new(Game::MegaSena, 2700));
        assert_eq!(stored.numbers, vec!["04", "17", "23"]);
        assert!(!stored.rollover);
        assert_eq!(stored.prize_tiers.len(), 1);
        assert_eq!(stored.totals.estimated_next, Some(Decimal::from(3_000_000)));
        // collected amount is fixed at draw time
        assert_eq!(stored.totals.collected, None);
    }
}
