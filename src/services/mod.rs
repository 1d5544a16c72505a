// Game services
pub mod actions;
pub mod onchain;
pub mod poller;
pub mod queries;
pub mod session;

// Re-export for convenience
pub use actions::{CreatedGame, GameActions, JoinOutcome};
pub use onchain::{OnchainInvoker, OnchainReader};
pub use poller::{Poller, QueryCache, QueryHandle, QueryKey, QuerySnapshot};
pub use queries::GameQueries;
pub use session::{ActiveGameTracker, FileSessionStore, MemorySessionStore, SessionStore};
