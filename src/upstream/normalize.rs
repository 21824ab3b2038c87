//! Upstream payload → canonical `DrawResult`.
//!
//! The per-game rules (number ordering, affinity routing) come from
//! `Game::ordering` and `Game::affinity`.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::types::{UpstreamDraw, UpstreamPrizeTier, UpstreamWinnerLocation};
use crate::error::FetchError;
use crate::model::{
    AffinityRouting, DrawResult, Game, MonetaryTotals, NumberOrdering, PrizeTier, WinnerLocation,
};

/// Separator between venue and municipality in the location string.
const LOCATION_SEPARATOR: &str = " em ";

/// Maximum number of body characters kept in a decode error.
const DECODE_EXCERPT_CHARS: usize = 200;

const MONTHS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Decode a raw upstream body for `game` into a canonical record.
pub fn decode_draw(game: Game, body: &str) -> Result<DrawResult, FetchError> {
    let raw: UpstreamDraw = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        message: e.to_string(),
        excerpt: excerpt(body),
    })?;
    normalize_draw(game, raw)
}

/// Map an already-parsed upstream draw onto the canonical shape. Fails only
/// when an amount does not fit a `Decimal`.
pub fn normalize_draw(game: Game, raw: UpstreamDraw) -> Result<DrawResult, FetchError> {
    let numbers = order_numbers(
        game,
        raw.lista_dezenas.as_deref().unwrap_or_default(),
        raw.lista_dezenas_segundo_sorteio.as_deref().unwrap_or_default(),
    );

    let affinity = raw
        .nome_time_coracao_mes_sorte
        .as_deref()
        .filter(|v| !v.is_empty());
    let (lucky_month, favorite_team) = match (game.affinity(), affinity) {
        (AffinityRouting::LuckyMonth, Some(v)) => (Some(month_name(v)), None),
        (AffinityRouting::FavoriteTeam, Some(v)) => (None, Some(v.to_string())),
        _ => (None, None),
    };

    let prize_tiers = raw
        .lista_rateio_premio
        .unwrap_or_default()
        .into_iter()
        .map(prize_tier)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DrawResult {
        game,
        contest: raw.numero,
        draw_date: raw.data_apuracao.unwrap_or_default(),
        location: format!(
            "{}{}{}",
            raw.local_sorteio.unwrap_or_default(),
            LOCATION_SEPARATOR,
            raw.nome_municipio_uf_sorteio.unwrap_or_default()
        ),
        numbers_in_draw_order: raw.dezenas_sorteadas_ordem_sorteio.unwrap_or_default(),
        numbers,
        second_draw_numbers: raw.lista_dezenas_segundo_sorteio.unwrap_or_default(),
        bonus_symbols: raw.trevos_sorteados.unwrap_or_default(),
        lucky_month,
        favorite_team,
        prize_tiers,
        winner_locations: raw
            .lista_municipio_uf_ganhadores
            .unwrap_or_default()
            .into_iter()
            .map(winner_location)
            .collect(),
        remark: raw.observacao.filter(|s| !s.is_empty()),
        rollover: raw.acumulado,
        next_contest: raw.numero_concurso_proximo,
        next_contest_date: raw.data_proximo_concurso.filter(|s| !s.is_empty()),
        totals: MonetaryTotals {
            collected: amount("valorArrecadado", raw.valor_arrecadado)?,
            accumulated_0_5: amount("valorAcumuladoConcurso_0_5", raw.valor_acumulado_concurso_0_5)?,
            accumulated_special: amount(
                "valorAcumuladoConcursoEspecial",
                raw.valor_acumulado_concurso_especial,
            )?,
            accumulated_next: amount(
                "valorAcumuladoProximoConcurso",
                raw.valor_acumulado_proximo_concurso,
            )?,
            estimated_next: amount(
                "valorEstimadoProximoConcurso",
                raw.valor_estimado_proximo_concurso,
            )?,
        },
    })
}

/// Apply the game's ordering rule to the primary list with the secondary
/// draw appended.
pub fn order_numbers(game: Game, primary: &[String], secondary: &[String]) -> Vec<String> {
    let mut numbers: Vec<String> = primary.iter().chain(secondary).cloned().collect();

    match game.ordering() {
        NumberOrdering::Preserve => {}
        NumberOrdering::SplitSorted { group } if numbers.len() == group * 2 => {
            let (first, second) = numbers.split_at_mut(group);
            first.sort();
            second.sort();
        }
        NumberOrdering::SplitSorted { .. } | NumberOrdering::SortAll => numbers.sort(),
    }
    numbers
}

/// `"1"`..`"12"` → Portuguese month name; anything else passes through.
pub fn month_name(code: &str) -> String {
    match code.parse::<usize>() {
        Ok(n @ 1..=12) => MONTHS[n - 1].to_string(),
        _ => code.to_string(),
    }
}

fn prize_tier(raw: UpstreamPrizeTier) -> Result<PrizeTier, FetchError> {
    Ok(PrizeTier {
        prize: amount("valorPremio", Some(raw.valor_premio))?.unwrap_or_default(),
        description: raw.descricao_faixa,
        tier: raw.faixa,
        winners: raw.numero_de_ganhadores,
    })
}

fn winner_location(raw: UpstreamWinnerLocation) -> WinnerLocation {
    WinnerLocation {
        winners: raw.ganhadores,
        municipality: raw.municipio,
        rank: raw.posicao,
        state: raw.uf,
        series: raw.serie.filter(|s| !s.is_empty()),
        ticket_number: raw.numero_bilhete.filter(|s| !s.is_empty()),
    }
}

/// Convert an upstream float through its shortest round-trip text form so
/// `1234.56` becomes exactly `1234.56`. A present amount never turns into
/// an absent one: values outside the `Decimal` range are a decode error.
fn amount(field: &str, value: Option<f64>) -> Result<Option<Decimal>, FetchError> {
    let Some(v) = value else {
        return Ok(None);
    };
    let text = v.to_string();
    Decimal::from_str(&text)
        .map(Some)
        .map_err(|e| FetchError::Decode {
            message: format!("{field}: amount out of range: {e}"),
            excerpt: excerpt(&text),
        })
}

fn excerpt(body: &str) -> String {
    body.chars().take(DECODE_EXCERPT_CHARS).collect()
}
