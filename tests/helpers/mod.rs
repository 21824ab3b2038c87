//! Scripted fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use loterias_sync::error::{FetchError, TransportError};
use loterias_sync::model::{DrawResult, Game, MonetaryTotals};
use loterias_sync::upstream::{
    BlockGate, ClientIdentity, DrawSource, PageRenderer, RendererLauncher, UpstreamResponse,
    UpstreamTransport,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Upstream JSON for one Mega-Sena contest.
pub fn megasena_body(contest: u32) -> String {
    json!({
        "numero": contest,
        "dataApuracao": "01/06/2024",
        "localSorteio": "ESPAÇO DA SORTE",
        "nomeMunicipioUFSorteio": "SÃO PAULO, SP",
        "dezenasSorteadasOrdemSorteio": ["42", "07", "15", "03", "23", "11"],
        "listaDezenas": ["42", "07", "15", "03", "23", "11"],
        "listaRateioPremio": [
            { "descricaoFaixa": "6 acertos", "faixa": 1, "numeroDeGanhadores": 0, "valorPremio": 0.0 },
            { "descricaoFaixa": "5 acertos", "faixa": 2, "numeroDeGanhadores": 41, "valorPremio": 52301.47 }
        ],
        "listaMunicipioUFGanhadores": [],
        "observacao": "",
        "acumulado": true,
        "dataProximoConcurso": "04/06/2024",
        "numeroConcursoProximo": contest + 1,
        "valorArrecadado": 98765432.1,
        "valorAcumuladoProximoConcurso": 45000000.0,
        "valorEstimadoProximoConcurso": 50000000.0
    })
    .to_string()
}

/// Canonical record with minimal content.
pub fn record(game: Game, contest: u32) -> DrawResult {
    DrawResult {
        game,
        contest,
        draw_date: "01/06/2024".into(),
        location: "ESPAÇO DA SORTE em SÃO PAULO, SP".into(),
        numbers_in_draw_order: vec![],
        numbers: vec!["03".into(), "07".into(), "15".into()],
        second_draw_numbers: vec![],
        bonus_symbols: vec![],
        lucky_month: None,
        favorite_team: None,
        prize_tiers: vec![],
        winner_locations: vec![],
        remark: None,
        rollover: false,
        next_contest: Some(contest + 1),
        next_contest_date: None,
        totals: MonetaryTotals::default(),
    }
}

pub fn blocked() -> FetchError {
    FetchError::Blocked {
        remaining: Duration::from_secs(3600),
        until: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Transport that replays a fixed script. Once the script runs out every call
/// answers 500.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>,
    calls: AtomicUsize,
    identities: Mutex<Vec<ClientIdentity>>,
    urls: Mutex<Vec<String>>,
    /// Opens a block window on the shared gate when the given call arrives.
    trip_on_call: Mutex<Option<(usize, Arc<BlockGate>, Duration)>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<UpstreamResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub fn statuses(statuses: &[u16], body: &str) -> Arc<Self> {
        Self::new(
            statuses
                .iter()
                .map(|s| Ok(UpstreamResponse::new(*s, body)))
                .collect(),
        )
    }

    pub fn push(&self, response: Result<UpstreamResponse, TransportError>) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Simulate another caller opening a block window of `duration` while
    /// call number `call` (1-based) is in flight.
    pub fn trip_gate_on_call(&self, call: usize, gate: Arc<BlockGate>, duration: Duration) {
        *self.trip_on_call.lock().unwrap() = Some((call, gate, duration));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn identities(&self) -> Vec<ClientIdentity> {
        self.identities.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn get(&self, url: &str, identity: &ClientIdentity) -> Result<UpstreamResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, gate, duration)) = self.trip_on_call.lock().unwrap().as_ref() {
            if *at == call {
                gate.trip(*duration);
            }
        }
        self.identities.lock().unwrap().push(*identity);
        self.urls.lock().unwrap().push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(UpstreamResponse::new(500, "script exhausted")))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renderer that returns a fixed page, or fails when `page` is `None`.
pub struct FixedRenderer {
    page: Option<String>,
    renders: AtomicUsize,
}

#[async_trait]
impl PageRenderer for FixedRenderer {
    async fn render_body(&self, _url: &str, _settle: Duration) -> Result<String> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.page.clone().ok_or_else(|| anyhow!("navigation failed"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FixedLauncher {
    renderer: Arc<FixedRenderer>,
    pub launches: AtomicUsize,
}

impl FixedLauncher {
    pub fn serving(page: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            renderer: Arc::new(FixedRenderer {
                page,
                renders: AtomicUsize::new(0),
            }),
            launches: AtomicUsize::new(0),
        })
    }

    pub fn renders(&self) -> usize {
        self.renderer.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RendererLauncher for FixedLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageRenderer>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(self.renderer.clone())
    }
}

// ---------------------------------------------------------------------------
// Draw source
// ---------------------------------------------------------------------------

/// In-memory upstream for orchestrator tests.
#[derive(Default)]
pub struct FakeSource {
    latest: Mutex<HashMap<Game, u32>>,
    /// Latest lookups that fail before one succeeds, per game.
    latest_failures: Mutex<HashMap<Game, usize>>,
    /// Contests that fail this many more times before succeeding.
    transient: Mutex<HashMap<(Game, u32), usize>>,
    /// Contests that never succeed.
    broken: Mutex<HashSet<(Game, u32)>>,
    /// Contests that answer with a block.
    blocking: Mutex<HashSet<(Game, u32)>>,
    /// Games whose latest lookup answers with a block.
    blocking_latest: Mutex<HashSet<Game>>,
    /// Per-contest record overrides (used for the latest record too).
    overrides: Mutex<HashMap<(Game, u32), DrawResult>>,
    contest_calls: Mutex<HashMap<(Game, u32), usize>>,
    latest_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_latest(&self, game: Game, contest: u32) {
        self.latest.lock().unwrap().insert(game, contest);
    }

    pub fn fail_latest(&self, game: Game, times: usize) {
        self.latest_failures.lock().unwrap().insert(game, times);
    }

    pub fn fail_transiently(&self, game: Game, contest: u32, times: usize) {
        self.transient.lock().unwrap().insert((game, contest), times);
    }

    pub fn break_contest(&self, game: Game, contest: u32) {
        self.broken.lock().unwrap().insert((game, contest));
    }

    pub fn block_at(&self, game: Game, contest: u32) {
        self.blocking.lock().unwrap().insert((game, contest));
    }

    pub fn block_latest(&self, game: Game) {
        self.blocking_latest.lock().unwrap().insert(game);
    }

    /// Clear every fault configured for a contest.
    pub fn heal(&self, game: Game, contest: u32) {
        self.broken.lock().unwrap().remove(&(game, contest));
        self.blocking.lock().unwrap().remove(&(game, contest));
        self.transient.lock().unwrap().remove(&(game, contest));
    }

    pub fn override_record(&self, result: DrawResult) {
        self.overrides
            .lock()
            .unwrap()
            .insert((result.game, result.contest), result);
    }

    pub fn contest_calls(&self, game: Game, contest: u32) -> usize {
        self.contest_calls
            .lock()
            .unwrap()
            .get(&(game, contest))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_contest_calls(&self) -> usize {
        self.contest_calls.lock().unwrap().values().sum()
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    fn build(&self, game: Game, contest: u32) -> DrawResult {
        self.overrides
            .lock()
            .unwrap()
            .get(&(game, contest))
            .cloned()
            .unwrap_or_else(|| record(game, contest))
    }
}

#[async_trait]
impl DrawSource for FakeSource {
    async fn fetch_by_contest(&self, game: Game, contest: u32) -> Result<DrawResult, FetchError> {
        *self
            .contest_calls
            .lock()
            .unwrap()
            .entry((game, contest))
            .or_default() += 1;
        tokio::task::yield_now().await;

        if self.blocking.lock().unwrap().contains(&(game, contest)) {
            return Err(blocked());
        }
        if self.broken.lock().unwrap().contains(&(game, contest)) {
            return Err(FetchError::UnexpectedStatus { status: 500 });
        }
        if let Some(left) = self.transient.lock().unwrap().get_mut(&(game, contest)) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::Transport(TransportError("connection reset".into())));
            }
        }
        Ok(self.build(game, contest))
    }

    async fn fetch_latest(&self, game: Game) -> Result<DrawResult, FetchError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);

        if self.blocking_latest.lock().unwrap().contains(&game) {
            return Err(blocked());
        }

        if let Some(left) = self.latest_failures.lock().unwrap().get_mut(&game) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::Transport(TransportError("timeout".into())));
            }
        }
        let contest = self
            .latest
            .lock()
            .unwrap()
            .get(&game)
            .copied()
            .ok_or(FetchError::UnexpectedStatus { status: 404 })?;
        Ok(self.build(game, contest))
    }
}
