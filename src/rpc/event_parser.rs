use super::sui_client::{is_shared_owner, SuiEvent, TransactionBlockResponse};
use crate::constants::{
    EVENT_GAME_CREATED, EVENT_GAME_FINISHED, EVENT_GAME_STARTED, EVENT_MOVE_SUBMITTED,
    EVENT_PLAYER_JOINED, EVENT_ROUND_COMPLETED, GAME_STRUCT_NAME,
};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEventKind {
    GameCreated,
    PlayerJoined,
    GameStarted,
    MoveSubmitted,
    RoundCompleted,
    GameFinished,
}

impl GameEventKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            EVENT_GAME_CREATED => Some(Self::GameCreated),
            EVENT_PLAYER_JOINED => Some(Self::PlayerJoined),
            EVENT_GAME_STARTED => Some(Self::GameStarted),
            EVENT_MOVE_SUBMITTED => Some(Self::MoveSubmitted),
            EVENT_ROUND_COMPLETED => Some(Self::RoundCompleted),
            EVENT_GAME_FINISHED => Some(Self::GameFinished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub kind: GameEventKind,
    pub data: Value,
    pub sender: Option<String>,
}

impl ParsedEvent {
    pub fn game_id(&self) -> Option<String> {
        self.data
            .get("game_id")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .map(String::from)
    }
}

/// Where `extract_game_id` found the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameIdSource {
    ObjectChanges,
    CreatedEffects,
    CreatedEvent,
}

/// Event Parser - recognises game events in transaction receipts
pub struct EventParser {
    module_name: String,
}

impl EventParser {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Parse event based on its fully qualified Move type
    pub fn parse_event(&self, event: &SuiEvent) -> Option<ParsedEvent> {
        let name = self.member_name(&event.event_type)?;
        let kind = GameEventKind::from_name(name)?;
        Some(ParsedEvent {
            kind,
            data: event.parsed_json.clone(),
            sender: event.sender.clone(),
        })
    }

    pub fn parse_all(&self, events: &[SuiEvent]) -> Vec<ParsedEvent> {
        events.iter().filter_map(|e| self.parse_event(e)).collect()
    }

    /// True for `<pkg>::<module>::Game`, with or without type parameters.
    pub fn is_game_type(&self, type_name: &str) -> bool {
        self.member_name(type_name) == Some(GAME_STRUCT_NAME)
    }

    /// Recovers the id of a freshly created game. Sources are tried in
    /// order: created shared object changes, shared entries in
    /// `effects.created`, then the `GameCreated` event payload.
    pub fn extract_game_id(
        &self,
        receipt: &TransactionBlockResponse,
    ) -> Option<(String, GameIdSource)> {
        let from_changes = receipt.object_changes().iter().find_map(|change| {
            let shared = change.owner.as_ref().is_some_and(is_shared_owner);
            let game_type = change
                .object_type
                .as_deref()
                .is_some_and(|t| self.is_game_type(t));
            if change.change_type == "created" && shared && game_type {
                change.object_id.clone()
            } else {
                None
            }
        });
        if let Some(id) = from_changes {
            return Some((id, GameIdSource::ObjectChanges));
        }

        let from_effects = receipt
            .created()
            .iter()
            .find(|created| is_shared_owner(&created.owner))
            .map(|created| created.reference.object_id.clone());
        if let Some(id) = from_effects {
            return Some((id, GameIdSource::CreatedEffects));
        }

        self.parse_all(receipt.events())
            .into_iter()
            .filter(|event| event.kind == GameEventKind::GameCreated)
            .find_map(|event| event.game_id())
            .map(|id| (id, GameIdSource::CreatedEvent))
    }

    // `0xpkg::game::GameCreated<T>` -> `GameCreated` when the module matches.
    fn member_name<'a>(&self, type_name: &'a str) -> Option<&'a str> {
        let base = type_name.split('<').next().unwrap_or(type_name);
        let mut parts = base.rsplitn(3, "::");
        let name = parts.next()?;
        let module = parts.next()?;
        parts.next()?;
        (module == self.module_name).then_some(name)
    }
}
