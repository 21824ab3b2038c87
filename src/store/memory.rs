use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ResultStore;
use crate::model::{DrawResult, Game, ResultId};

/// In-process store. Keeps a count of written records so callers can check
/// how much a run actually wrote.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: RwLock<BTreeMap<ResultId, DrawResult>>,
    writes: AtomicU64,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records written through `save`/`save_all` so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }

    /// Contest numbers stored for `game`, ascending.
    pub async fn contests(&self, game: Game) -> Vec<u32> {
        self.results
            .read()
            .await
            .keys()
            .filter(|id| id.game == game)
            .map(|id| id.contest)
            .collect()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn find_by_game(&self, game: Game) -> Result<Vec<DrawResult>> {
        let results = self.results.read().await;
        Ok(results
            .range(ResultId::new(game, 0)..=ResultId::new(game, u32::MAX))
            .rev()
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn find_by_id(&self, id: ResultId) -> Result<Option<DrawResult>> {
        Ok(self.results.read().await.get(&id).cloned())
    }

    async fn find_latest_by_game(&self, game: Game) -> Result<Option<DrawResult>> {
        let results = self.results.read().await;
        Ok(results
            .range(ResultId::new(game, 0)..=ResultId::new(game, u32::MAX))
            .next_back()
            .map(|(_, r)| r.clone()))
    }

    async fn save(&self, result: &DrawResult) -> Result<()> {
        self.results.write().await.insert(result.id(), result.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_all(&self, results: &[DrawResult]) -> Result<()> {
        let mut map = self.results.write().await;
        for result in results {
            map.insert(result.id(), result.clone());
        }
        self.writes.fetch_add(results.len() as u64, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(game: Game, contest: u32) -> DrawResult {
        DrawResult {
            game,
            contest,
            draw_date: "01/01/2024".into(),
            location: "ESPAÇO DA SORTE em SÃO PAULO, SP".into(),
            numbers_in_draw_order: vec![],
            numbers: vec!["01".into(), "02".into()],
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
            totals: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_latest_is_scoped_to_game() {
        let store = MemoryResultStore::new();
        store
            .save_all(&[result(Game::MegaSena, 3), result(Game::MegaSena, 7), result(Game::Quina, 99)])
            .await
            .unwrap();

        let latest = store.find_latest_by_game(Game::MegaSena).await.unwrap().unwrap();
        assert_eq!(latest.contest, 7);
        assert!(store.find_latest_by_game(Game::Federal).await.unwrap().is_none());

        let all: Vec<u32> = store
            .find_by_game(Game::MegaSena)
            .await
            .unwrap()
            .iter()
            .map(|r| r.contest)
            .collect();
        assert_eq!(all, vec![7, 3]);
    }

    #[tokio::test]
    async fn test_save_replaces_by_identity() {
        let store = MemoryResultStore::new();
        store.save(&result(Game::Lotofacil, 10)).await.unwrap();

        let mut updated = result(Game::Lotofacil, 10);
        updated.rollover = true;
        store.save(&updated).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.write_count(), 2);
        let stored = store
            .find_by_id(ResultId::new(Game::Lotofacil, 10))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.rollover);
    }
}
