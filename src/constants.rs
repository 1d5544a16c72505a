/// Application constants

// Deployed contract (Sui testnet)
pub const DEFAULT_PACKAGE_ID: &str =
    "0x3d5e2d0c1d471702dbcf36f503bf72a70a97247552e4b4cedf8a84f0fe21948b";
pub const DEFAULT_GAME_REGISTRY_ID: &str =
    "0x44a5f492ca938c4f5a3a8d4a07e79db4a16a6f721b136eefadddf49a2fd54cc9";
pub const DEFAULT_MODULE_NAME: &str = "game";
pub const DEFAULT_SUI_RPC_URL: &str = "https://fullnode.testnet.sui.io:443";

// Entry points
pub const FN_CREATE_GAME: &str = "create_game";
pub const FN_JOIN_GAME: &str = "join_game";
pub const FN_START_GAME: &str = "start_game";
pub const FN_SHOOT: &str = "shoot";
pub const FN_KEEP: &str = "keep";

// Read-only functions (inspection calls)
pub const FN_GET_GAME_STATE: &str = "get_game_state";
pub const FN_GET_CURRENT_ROUND_INFO: &str = "get_current_round_info";
pub const FN_GET_CURRENT_TURN: &str = "get_current_turn";
pub const FN_GET_AVAILABLE_GAMES: &str = "get_available_games";

// Event names
pub const EVENT_GAME_CREATED: &str = "GameCreated";
pub const EVENT_PLAYER_JOINED: &str = "PlayerJoined";
pub const EVENT_GAME_STARTED: &str = "GameStarted";
pub const EVENT_MOVE_SUBMITTED: &str = "MoveSubmitted";
pub const EVENT_ROUND_COMPLETED: &str = "RoundCompleted";
pub const EVENT_GAME_FINISHED: &str = "GameFinished";

// Struct name of the shared game object
pub const GAME_STRUCT_NAME: &str = "Game";

pub const MAX_ROUNDS: u64 = 5;

// Addresses
pub const ADDRESS_LENGTH: usize = 32;
pub const ZERO_ADDRESS: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";
/// Sender used for read-only inspection calls.
pub const INSPECT_SENDER: &str = ZERO_ADDRESS;

// Poll intervals
pub const GAME_STATE_POLL_MS: u64 = 2_000;
pub const ROUND_INFO_POLL_MS: u64 = 1_000;
pub const CURRENT_TURN_POLL_MS: u64 = 1_000;
pub const GAMES_LIST_POLL_MS: u64 = 5_000;

// Receipt lookup after create_game
pub const DEFAULT_RECEIPT_POLL_ATTEMPTS: usize = 5;
pub const DEFAULT_RECEIPT_BACKOFF_MS: u64 = 1_000;
pub const RECEIPT_BACKOFF_MAX_MS: u64 = 8_000;

// Gas
pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;

// Session persistence
pub const SESSION_KEY_PREFIX: &str = "penalsui_game_";
pub const DEFAULT_SESSION_FILE: &str = ".penalsui-session.json";
