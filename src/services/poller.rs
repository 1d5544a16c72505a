//! Timer-driven subscriptions over the read operations.
//!
//! Each subscription owns a background task that fetches immediately, then on
//! every tick of its interval, and once more whenever its cache key is
//! invalidated. Results land in the shared [`QueryCache`] (last writer wins)
//! and are pushed to the subscriber through a watch channel. Dropping the
//! [`QueryHandle`] ends the task after any in-flight fetch, whose result is
//! discarded.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::Config;
use crate::error::Result;
use crate::models::{CurrentTurn, GameListing, GameState, RoundInfo};
use crate::services::queries::GameQueries;
use crate::utils::{normalize_address, same_address};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Game(String),
    RoundInfo(String),
    CurrentTurn { game_id: String, viewer: String },
    AvailableGames(String),
    UserActiveGames(String),
}

impl QueryKey {
    pub fn game(game_id: &str) -> Self {
        Self::Game(normalize_address(game_id))
    }

    pub fn round_info(game_id: &str) -> Self {
        Self::RoundInfo(normalize_address(game_id))
    }

    pub fn current_turn(game_id: &str, viewer: &str) -> Self {
        Self::CurrentTurn {
            game_id: normalize_address(game_id),
            viewer: normalize_address(viewer),
        }
    }

    pub fn available_games(viewer: &str) -> Self {
        Self::AvailableGames(normalize_address(viewer))
    }

    pub fn user_active_games(viewer: &str) -> Self {
        Self::UserActiveGames(normalize_address(viewer))
    }

    pub fn game_id(&self) -> Option<&str> {
        match self {
            Self::Game(id) | Self::RoundInfo(id) => Some(id),
            Self::CurrentTurn { game_id, .. } => Some(game_id),
            Self::AvailableGames(_) | Self::UserActiveGames(_) => None,
        }
    }

    pub fn is_listing(&self) -> bool {
        matches!(self, Self::AvailableGames(_) | Self::UserActiveGames(_))
    }
}

struct CacheEntry {
    value: Option<Arc<dyn Any + Send + Sync>>,
    error: Option<String>,
    stale: bool,
}

/// Latest fetched value per key, plus an invalidation signal per key.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    generations: Mutex<HashMap<QueryKey, watch::Sender<u64>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entry. `None` records "no data".
    pub async fn put<T: Any + Send + Sync>(
        &self,
        key: QueryKey,
        value: Option<T>,
        error: Option<String>,
    ) {
        let entry = CacheEntry {
            value: value.map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>),
            error,
            stale: false,
        };
        self.entries.write().await.insert(key, entry);
    }

    pub async fn get<T: Any + Clone + Send + Sync>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .and_then(|entry| entry.value.as_ref())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub async fn last_error(&self, key: &QueryKey) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(key).and_then(|entry| entry.error.clone())
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(|entry| entry.stale)
    }

    /// Receiver that changes every time `key` is invalidated.
    pub async fn watch(&self, key: &QueryKey) -> watch::Receiver<u64> {
        let mut generations = self.generations.lock().await;
        generations
            .entry(key.clone())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Marks matching entries stale and wakes their subscriptions.
    pub async fn invalidate_where<F>(&self, matches: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut touched = 0;
        {
            let mut entries = self.entries.write().await;
            for (key, entry) in entries.iter_mut() {
                if matches(key) {
                    entry.stale = true;
                }
            }
        }

        let generations = self.generations.lock().await;
        for (key, sender) in generations.iter() {
            if matches(key) {
                sender.send_modify(|generation| *generation += 1);
                touched += 1;
            }
        }
        touched
    }

    /// Game state, round info, and current turn of one game.
    pub async fn invalidate_game(&self, game_id: &str) {
        let woken = self
            .invalidate_where(|key| key.game_id().is_some_and(|id| same_address(id, game_id)))
            .await;
        tracing::debug!("Invalidated game {} ({} subscriptions)", game_id, woken);
    }

    /// Every available-games and user-active-games entry.
    pub async fn invalidate_listings(&self) {
        let woken = self.invalidate_where(QueryKey::is_listing).await;
        tracing::debug!("Invalidated game listings ({} subscriptions)", woken);
    }
}

#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QuerySnapshot<T> {
    fn pending() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.updated_at.is_none()
    }
}

/// Subscriber side of a poll. Dropping it stops the poll.
pub struct QueryHandle<T> {
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot<T>>,
}

impl<T: Clone> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn latest(&self) -> QuerySnapshot<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot. `None` once the poll task has ended.
    pub async fn changed(&mut self) -> Option<QuerySnapshot<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

pub struct Poller {
    queries: Arc<GameQueries>,
    cache: Arc<QueryCache>,
    game_state_interval: Duration,
    round_info_interval: Duration,
    current_turn_interval: Duration,
    games_list_interval: Duration,
}

impl Poller {
    pub fn new(queries: Arc<GameQueries>, cache: Arc<QueryCache>, config: &Config) -> Self {
        Self {
            queries,
            cache,
            game_state_interval: config.game_state_interval(),
            round_info_interval: config.round_info_interval(),
            current_turn_interval: config.current_turn_interval(),
            games_list_interval: config.games_list_interval(),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn watch_game(&self, game_id: &str) -> QueryHandle<GameState> {
        let id = game_id.to_string();
        self.subscribe(QueryKey::game(game_id), self.game_state_interval, move |q| {
            let id = id.clone();
            async move { q.fetch_game_state(&id).await }
        })
    }

    pub fn watch_round_info(&self, game_id: &str) -> QueryHandle<RoundInfo> {
        let id = game_id.to_string();
        self.subscribe(QueryKey::round_info(game_id), self.round_info_interval, move |q| {
            let id = id.clone();
            async move { q.fetch_round_info(&id).await }
        })
    }

    pub fn watch_current_turn(&self, game_id: &str, viewer: &str) -> QueryHandle<CurrentTurn> {
        let id = game_id.to_string();
        let viewer_owned = viewer.to_string();
        self.subscribe(
            QueryKey::current_turn(game_id, viewer),
            self.current_turn_interval,
            move |q| {
                let id = id.clone();
                let viewer = viewer_owned.clone();
                async move { q.fetch_current_turn(&id, &viewer).await.map(Some) }
            },
        )
    }

    pub fn watch_available_games(&self, viewer: &str) -> QueryHandle<Vec<GameListing>> {
        let viewer_owned = viewer.to_string();
        self.subscribe(
            QueryKey::available_games(viewer),
            self.games_list_interval,
            move |q| {
                let viewer = viewer_owned.clone();
                async move { q.fetch_available_games(&viewer).await.map(Some) }
            },
        )
    }

    pub fn watch_user_active_games(&self, viewer: &str) -> QueryHandle<Vec<GameListing>> {
        let viewer_owned = viewer.to_string();
        self.subscribe(
            QueryKey::user_active_games(viewer),
            self.games_list_interval,
            move |q| {
                let viewer = viewer_owned.clone();
                async move { q.fetch_user_active_games(&viewer).await.map(Some) }
            },
        )
    }

    fn subscribe<T, F, Fut>(&self, key: QueryKey, period: Duration, fetch: F) -> QueryHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<GameQueries>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(QuerySnapshot::pending());
        let queries = self.queries.clone();
        let cache = self.cache.clone();
        let task_key = key.clone();

        tokio::spawn(async move {
            let mut invalidated = cache.watch(&task_key).await;
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = invalidated.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        tracing::debug!("Refetching {:?} after invalidation", task_key);
                        ticker.reset();
                    }
                    _ = tx.closed() => break,
                }

                let snapshot = match fetch(queries.clone()).await {
                    Ok(data) => {
                        cache.put(task_key.clone(), data.clone(), None).await;
                        QuerySnapshot {
                            data,
                            error: None,
                            updated_at: Some(Utc::now()),
                        }
                    }
                    Err(err) => {
                        if err.is_transient() {
                            tracing::debug!("Poll {:?} failed: {}", task_key, err);
                        } else {
                            tracing::warn!("Poll {:?} failed: {}", task_key, err);
                        }
                        cache
                            .put::<T>(task_key.clone(), None, Some(err.to_string()))
                            .await;
                        QuerySnapshot {
                            data: None,
                            error: Some(err.to_string()),
                            updated_at: Some(Utc::now()),
                        }
                    }
                };

                if tx.send(snapshot).is_err() {
                    tracing::debug!("Subscriber for {:?} gone; discarding result", task_key);
                    break;
                }
            }
        });

        QueryHandle { key, rx }
    }
}
