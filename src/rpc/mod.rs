pub mod bcs;
pub mod event_parser;
pub mod sui_client;

pub use event_parser::{EventParser, GameEventKind, GameIdSource, ParsedEvent};
pub use sui_client::{SuiClient, SuiRpc, TransactionBlockResponse};
