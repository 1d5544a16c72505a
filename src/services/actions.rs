use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use crate::config::Config;
use crate::constants::{
    FN_CREATE_GAME, FN_JOIN_GAME, FN_KEEP, FN_SHOOT, FN_START_GAME, RECEIPT_BACKOFF_MAX_MS,
};
use crate::error::{AppError, Result};
use crate::models::{Direction, Role};
use crate::rpc::{EventParser, SuiRpc, TransactionBlockResponse};
use crate::services::onchain::OnchainInvoker;
use crate::services::poller::QueryCache;
use crate::services::queries::GameQueries;

/// Delay before retry number `attempt + 1`: `base * 2^(attempt-1)`, capped.
pub fn backoff_delay(base_ms: u64, attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(32);
    let millis = base_ms
        .saturating_mul(1_u64 << exponent)
        .min(RECEIPT_BACKOFF_MAX_MS);
    Duration::from_millis(millis)
}

#[derive(Debug)]
pub enum JoinOutcome {
    Joined(TransactionBlockResponse),
    /// Already seated in the game; nothing was submitted.
    Rejoined,
}

#[derive(Debug, Clone)]
pub struct CreatedGame {
    pub game_id: String,
    pub digest: String,
}

/// State-changing calls on the game contract.
pub struct GameActions {
    rpc: Arc<dyn SuiRpc>,
    invoker: Arc<OnchainInvoker>,
    queries: Arc<GameQueries>,
    cache: Arc<QueryCache>,
    parser: EventParser,
    registry_id: String,
    receipt_poll_attempts: usize,
    receipt_backoff_ms: u64,
}

impl GameActions {
    pub fn new(
        rpc: Arc<dyn SuiRpc>,
        invoker: Arc<OnchainInvoker>,
        queries: Arc<GameQueries>,
        cache: Arc<QueryCache>,
        config: &Config,
    ) -> Self {
        Self {
            rpc,
            invoker,
            queries,
            cache,
            parser: EventParser::new(config.module_name.clone()),
            registry_id: config.game_registry_id.clone(),
            receipt_poll_attempts: config.receipt_poll_attempts.max(1),
            receipt_backoff_ms: config.receipt_backoff_ms,
        }
    }

    pub fn sender(&self) -> String {
        self.invoker.sender()
    }

    /// Creates a game in the registry and recovers its object id from the
    /// finalized receipt.
    pub async fn create_game(&self) -> Result<CreatedGame> {
        let receipt = self
            .invoker
            .invoke(FN_CREATE_GAME, vec![Value::String(self.registry_id.clone())])
            .await?;
        self.cache.invalidate_listings().await;

        let game_id = self.recover_game_id(&receipt.digest).await?;
        Ok(CreatedGame {
            game_id,
            digest: receipt.digest,
        })
    }

    pub async fn join_game(&self, game_id: &str) -> Result<TransactionBlockResponse> {
        let receipt = self.invoke_on_game(FN_JOIN_GAME, game_id, None).await?;
        self.cache.invalidate_game(game_id).await;
        self.cache.invalidate_listings().await;
        Ok(receipt)
    }

    pub async fn start_game(&self, game_id: &str) -> Result<TransactionBlockResponse> {
        let receipt = self.invoke_on_game(FN_START_GAME, game_id, None).await?;
        self.cache.invalidate_game(game_id).await;
        Ok(receipt)
    }

    pub async fn shoot(
        &self,
        game_id: &str,
        direction: Direction,
    ) -> Result<TransactionBlockResponse> {
        let receipt = self
            .invoke_on_game(FN_SHOOT, game_id, Some(direction))
            .await?;
        self.cache.invalidate_game(game_id).await;
        Ok(receipt)
    }

    pub async fn keep(
        &self,
        game_id: &str,
        direction: Direction,
    ) -> Result<TransactionBlockResponse> {
        let receipt = self.invoke_on_game(FN_KEEP, game_id, Some(direction)).await?;
        self.cache.invalidate_game(game_id).await;
        Ok(receipt)
    }

    /// Joins `game_id` unless the sender already plays in it.
    pub async fn join_or_rejoin(&self, game_id: &str) -> Result<JoinOutcome> {
        let state = self
            .queries
            .fetch_game_state(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game {}", game_id)))?;

        if state.finished {
            return Err(AppError::BadRequest(format!(
                "Game {} is already finished",
                game_id
            )));
        }

        let sender = self.sender();
        if state.is_participant(&sender) {
            tracing::info!("{} rejoining game {}", sender, game_id);
            return Ok(JoinOutcome::Rejoined);
        }

        self.join_game(game_id).await.map(JoinOutcome::Joined)
    }

    /// Shoots or keeps depending on the sender's role this round.
    pub async fn play(
        &self,
        game_id: &str,
        direction: Direction,
    ) -> Result<(Role, TransactionBlockResponse)> {
        let round = self
            .queries
            .fetch_round_info(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No round info for game {}", game_id)))?;

        let sender = self.sender();
        let role = round.role_of(&sender).ok_or_else(|| {
            AppError::BadRequest(format!(
                "{} is neither shooter nor keeper in round {}",
                sender, round.round_number
            ))
        })?;
        if round.has_submitted(role) {
            return Err(AppError::BadRequest(format!(
                "Move for round {} already submitted",
                round.round_number
            )));
        }

        let receipt = match role {
            Role::Shooter => self.shoot(game_id, direction).await?,
            Role::Keeper => self.keep(game_id, direction).await?,
        };
        Ok((role, receipt))
    }

    async fn invoke_on_game(
        &self,
        function: &str,
        game_id: &str,
        direction: Option<Direction>,
    ) -> Result<TransactionBlockResponse> {
        let mut arguments = vec![Value::String(game_id.to_string())];
        if let Some(direction) = direction {
            arguments.push(Value::from(direction.code()));
        }
        self.invoker.invoke(function, arguments).await
    }

    async fn recover_game_id(&self, digest: &str) -> Result<String> {
        let attempts = self.receipt_poll_attempts;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.rpc.get_transaction_block(digest).await {
                Ok(receipt) => {
                    for event in self.parser.parse_all(receipt.events()) {
                        tracing::debug!("{:?} in {}", event.kind, digest);
                    }
                    match self.parser.extract_game_id(&receipt) {
                        Some((game_id, source)) => {
                            tracing::info!(
                                "Game created: {} (from {:?}, attempt {})",
                                game_id,
                                source,
                                attempt
                            );
                            return Ok(game_id);
                        }
                        None => last_error = format!("receipt {} carries no game id", digest),
                    }
                }
                Err(err) => last_error = err.to_string(),
            }

            if attempt < attempts {
                let delay = backoff_delay(self.receipt_backoff_ms, attempt);
                tracing::warn!(
                    "Game id lookup {}/{} failed ({}); retrying in {:?}",
                    attempt,
                    attempts,
                    last_error,
                    delay
                );
                sleep(delay).await;
            }
        }

        Err(AppError::GameIdUnavailable {
            attempts,
            last_error,
        })
    }
}
