use std::sync::Arc;

use futures_util::{stream, StreamExt};
use serde_json::Value;

use crate::config::Config;
use crate::constants::{
    FN_GET_AVAILABLE_GAMES, FN_GET_CURRENT_ROUND_INFO, FN_GET_CURRENT_TURN, FN_GET_GAME_STATE,
};
use crate::decoder::{
    decode_address, decode_bool, decode_id_vector, decode_optional_address, decode_u64,
    is_empty_address,
};
use crate::error::{AppError, Result};
use crate::models::{CurrentTurn, GameListing, GameState, RoundInfo};
use crate::rpc::sui_client::ReturnValue;
use crate::services::onchain::OnchainReader;
use crate::utils::same_address;

/// Per-game state lookups running at once while building a listing.
const LISTING_CONCURRENCY: usize = 4;

/// Round shown when the round number cannot be decoded. Rounds count from 1.
const FALLBACK_ROUND: u64 = 1;

// Game fields as named on the Move object.
const FIELD_PLAYER1: &str = "player1";
const FIELD_PLAYER2: &str = "player2";
const FIELD_STARTED: &str = "started";
const FIELD_FINISHED: &str = "finished";
const FIELD_CURRENT_ROUND: &str = "current_round";
const FIELD_PLAYER1_SCORE: &str = "player1_score";
const FIELD_PLAYER2_SCORE: &str = "player2_score";
const FIELD_WINNER: &str = "winner";

/// Read operations over the game contract.
pub struct GameQueries {
    reader: Arc<OnchainReader>,
    registry_id: String,
}

impl GameQueries {
    pub fn new(reader: Arc<OnchainReader>, config: &Config) -> Self {
        Self {
            reader,
            registry_id: config.game_registry_id.clone(),
        }
    }

    /// Game state from the object's own fields. A missing object or one
    /// without Move content is `None`.
    pub async fn fetch_game_state(&self, game_id: &str) -> Result<Option<GameState>> {
        let object = match self.reader.get_object(game_id).await {
            Ok(object) => object,
            Err(AppError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(object.move_fields().map(game_state_from_fields))
    }

    /// Game state through `get_game_state`.
    pub async fn fetch_game_state_inspected(&self, game_id: &str) -> Result<Option<GameState>> {
        let values = self.reader.inspect(FN_GET_GAME_STATE, game_id).await?;
        Ok(game_state_from_returns(&values))
    }

    pub async fn fetch_round_info(&self, game_id: &str) -> Result<Option<RoundInfo>> {
        let values = self.reader.inspect(FN_GET_CURRENT_ROUND_INFO, game_id).await?;
        Ok(round_info_from_returns(&values))
    }

    /// Whose move the contract is waiting for. An empty answer means the
    /// viewer may act.
    pub async fn fetch_current_turn(&self, game_id: &str, viewer: &str) -> Result<CurrentTurn> {
        let values = self.reader.inspect(FN_GET_CURRENT_TURN, game_id).await?;
        let current_player = values.first().and_then(address_from_return);
        let is_my_turn = current_player
            .as_deref()
            .map_or(true, |player| same_address(player, viewer));
        Ok(CurrentTurn {
            is_my_turn,
            current_player,
        })
    }

    /// Open games the viewer could join: not finished, no opponent, and not
    /// created by the viewer.
    pub async fn fetch_available_games(&self, viewer: &str) -> Result<Vec<GameListing>> {
        let listings = self.fetch_registry_listings().await?;
        Ok(listings
            .into_iter()
            .filter(|listing| listing.game_state.is_joinable_by(viewer))
            .collect())
    }

    /// Unfinished games the viewer takes part in.
    pub async fn fetch_user_active_games(&self, viewer: &str) -> Result<Vec<GameListing>> {
        let listings = self.fetch_registry_listings().await?;
        Ok(listings
            .into_iter()
            .filter(|listing| listing.game_state.is_active_for(viewer))
            .collect())
    }

    pub async fn fetch_registry_game_ids(&self) -> Result<Vec<String>> {
        let values = self
            .reader
            .inspect(FN_GET_AVAILABLE_GAMES, &self.registry_id)
            .await?;
        Ok(values
            .first()
            .map(|value| decode_id_vector(value.bytes()))
            .unwrap_or_default())
    }

    // Registry failures propagate; a single game failing is logged and skipped.
    async fn fetch_registry_listings(&self) -> Result<Vec<GameListing>> {
        let game_ids = self.fetch_registry_game_ids().await?;
        tracing::debug!("Registry lists {} games", game_ids.len());

        let listings = stream::iter(game_ids)
            .map(|game_id| async move {
                match self.fetch_game_state_inspected(&game_id).await {
                    Ok(Some(game_state)) => Some(GameListing {
                        game_id,
                        game_state,
                    }),
                    Ok(None) => {
                        tracing::warn!("Game {} returned no state; skipping", game_id);
                        None
                    }
                    Err(err) => {
                        tracing::warn!("Failed to fetch game {}: {}", game_id, err);
                        None
                    }
                }
            })
            .buffered(LISTING_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(listings.into_iter().flatten().collect())
    }
}

fn game_state_from_fields(fields: &Value) -> GameState {
    let field = |name: &str| fields.get(name).cloned().unwrap_or(Value::Null);
    GameState {
        player1: decode_address(&field(FIELD_PLAYER1)),
        player2: decode_optional_address(&unwrap_move_option(field(FIELD_PLAYER2))),
        started: decode_bool(&field(FIELD_STARTED)),
        finished: decode_bool(&field(FIELD_FINISHED)),
        current_round: decode_u64(&field(FIELD_CURRENT_ROUND)).unwrap_or(FALLBACK_ROUND),
        player1_score: decode_u64(&field(FIELD_PLAYER1_SCORE)).unwrap_or_default(),
        player2_score: decode_u64(&field(FIELD_PLAYER2_SCORE)).unwrap_or_default(),
        winner: decode_optional_address(&unwrap_move_option(field(FIELD_WINNER))),
    }
}

// Options may come back as `{"vec": [x]}` depending on the node version.
fn unwrap_move_option(value: Value) -> Value {
    match value.get("vec").and_then(Value::as_array) {
        Some(items) => items.first().cloned().unwrap_or(Value::Null),
        None => value,
    }
}

fn game_state_from_returns(values: &[ReturnValue]) -> Option<GameState> {
    if values.len() < 8 {
        return None;
    }
    Some(GameState {
        player1: decode_address(&Value::String(values[0].as_text())),
        player2: address_from_return(&values[1]),
        started: decode_bool(&values[2].wire_value()),
        finished: decode_bool(&values[3].wire_value()),
        current_round: decode_u64(&values[4].wire_value()).unwrap_or(FALLBACK_ROUND),
        player1_score: decode_u64(&values[5].wire_value()).unwrap_or_default(),
        player2_score: decode_u64(&values[6].wire_value()).unwrap_or_default(),
        winner: address_from_return(&values[7]),
    })
}

fn round_info_from_returns(values: &[ReturnValue]) -> Option<RoundInfo> {
    if values.len() < 5 {
        return None;
    }
    Some(RoundInfo {
        round_number: decode_u64(&values[0].wire_value()).unwrap_or(FALLBACK_ROUND),
        shooter: decode_address(&Value::String(values[1].as_text())),
        keeper: decode_address(&Value::String(values[2].as_text())),
        shoot_submitted: decode_bool(&values[3].wire_value()),
        keep_submitted: decode_bool(&values[4].wire_value()),
    })
}

// Plain addresses and `Option<address>` both appear in return values.
fn address_from_return(value: &ReturnValue) -> Option<String> {
    if value.type_tag().contains("Option") {
        return decode_optional_address(&value.wire_value());
    }
    let address = decode_address(&Value::String(value.as_text()));
    (!is_empty_address(&address)).then_some(address)
}
