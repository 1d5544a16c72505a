use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use penalsui_client::config::Config;
use penalsui_client::constants::{INSPECT_SENDER, MAX_ROUNDS};
use penalsui_client::crypto::{Ed25519Signer, TransactionSigner};
use penalsui_client::models::{Direction, GameListing, GameState, Role};
use penalsui_client::rpc::{SuiClient, SuiRpc};
use penalsui_client::services::{
    ActiveGameTracker, FileSessionStore, GameActions, GameQueries, JoinOutcome, OnchainInvoker,
    OnchainReader, Poller, QueryCache,
};

#[derive(Debug, Parser)]
#[command(name = "penalsui")]
#[command(about = "Play PenalSui penalty shootouts from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a new Ed25519 key for SUI_PRIVATE_KEY.
    Keygen,
    /// Print the address of SUI_PRIVATE_KEY.
    Address,
    /// List games open for joining and your unfinished games.
    Lobby {
        /// Print once instead of refreshing.
        #[arg(long)]
        once: bool,
    },
    /// Create a new game.
    Create,
    /// Join a game, or resume one you already play in.
    Join { game_id: String },
    /// Start a game that has two players.
    Start { game_id: Option<String> },
    /// Shoot in the given direction (left, center, right).
    Shoot {
        direction: Direction,
        #[arg(long = "game")]
        game_id: Option<String>,
    },
    /// Dive in the given direction as keeper.
    Keep {
        direction: Direction,
        #[arg(long = "game")]
        game_id: Option<String>,
    },
    /// Shoot or keep, whichever your role is this round.
    Play {
        direction: Direction,
        #[arg(long = "game")]
        game_id: Option<String>,
    },
    /// Follow a game until it finishes.
    Watch { game_id: Option<String> },
    /// Forget the remembered active game.
    Leave,
}

struct Client {
    config: Config,
    rpc: Arc<dyn SuiRpc>,
    queries: Arc<GameQueries>,
    cache: Arc<QueryCache>,
    tracker: ActiveGameTracker,
    signer: Option<Arc<Ed25519Signer>>,
}

impl Client {
    fn new(config: Config) -> anyhow::Result<Self> {
        let rpc: Arc<dyn SuiRpc> = Arc::new(SuiClient::new(config.sui_rpc_url.clone()));
        let reader = Arc::new(OnchainReader::new(rpc.clone(), &config)?);
        let queries = Arc::new(GameQueries::new(reader, &config));
        let store = FileSessionStore::open(&config.session_file)
            .with_context(|| format!("Failed to open session file {}", config.session_file))?;
        let signer = match &config.sui_private_key {
            Some(key) => Some(Arc::new(Ed25519Signer::from_key_str(key)?)),
            None => None,
        };

        Ok(Self {
            rpc,
            queries,
            cache: Arc::new(QueryCache::new()),
            tracker: ActiveGameTracker::new(Arc::new(store)),
            signer,
            config,
        })
    }

    fn signer(&self) -> anyhow::Result<Arc<Ed25519Signer>> {
        self.signer
            .clone()
            .context("SUI_PRIVATE_KEY is not set; run `penalsui keygen` first")
    }

    /// Reads run as the zero address when no key is configured.
    fn viewer(&self) -> String {
        self.signer
            .as_ref()
            .map(|signer| signer.address())
            .unwrap_or_else(|| INSPECT_SENDER.to_string())
    }

    fn actions(&self) -> anyhow::Result<GameActions> {
        let signer: Arc<dyn TransactionSigner> = self.signer()?;
        let invoker = Arc::new(OnchainInvoker::new(self.rpc.clone(), signer, &self.config));
        Ok(GameActions::new(
            self.rpc.clone(),
            invoker,
            self.queries.clone(),
            self.cache.clone(),
            &self.config,
        ))
    }

    fn poller(&self) -> Poller {
        Poller::new(self.queries.clone(), self.cache.clone(), &self.config)
    }

    fn resolve_game(&self, game_id: Option<String>) -> anyhow::Result<String> {
        if let Some(id) = game_id {
            return Ok(id);
        }
        self.tracker
            .last_active(&self.viewer())?
            .context("No game id given and no active game remembered")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "penalsui_client=info,penalsui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command).await {
        tracing::error!("{:#}", err);
        return Err(err);
    }
    Ok(())
}

async fn run(command: Command) -> anyhow::Result<()> {
    // Key generation needs neither config nor network.
    if let Command::Keygen = command {
        print_new_key();
        return Ok(());
    }

    let config = Config::from_env()?;
    config.validate()?;
    if !config.is_testnet() {
        tracing::warn!("RPC {} does not look like a test network", config.sui_rpc_url);
    }
    let client = Client::new(config)?;

    match command {
        Command::Keygen => print_new_key(),
        Command::Address => println!("{}", client.signer()?.address()),
        Command::Lobby { once } => lobby(&client, once).await?,
        Command::Create => {
            let actions = client.actions()?;
            let created = actions.create_game().await?;
            client.tracker.remember(&actions.sender(), &created.game_id)?;
            println!("Created game {} (tx {})", created.game_id, created.digest);
        }
        Command::Join { game_id } => {
            let actions = client.actions()?;
            match actions.join_or_rejoin(&game_id).await? {
                JoinOutcome::Joined(receipt) => {
                    println!("Joined game {} (tx {})", game_id, receipt.digest)
                }
                JoinOutcome::Rejoined => println!("Rejoined game {}", game_id),
            }
            client.tracker.remember(&actions.sender(), &game_id)?;
        }
        Command::Start { game_id } => {
            let game_id = client.resolve_game(game_id)?;
            let receipt = client.actions()?.start_game(&game_id).await?;
            println!("Started game {} (tx {})", game_id, receipt.digest);
        }
        Command::Shoot { direction, game_id } => {
            let game_id = client.resolve_game(game_id)?;
            let receipt = client.actions()?.shoot(&game_id, direction).await?;
            println!("Shot {} (tx {})", direction, receipt.digest);
        }
        Command::Keep { direction, game_id } => {
            let game_id = client.resolve_game(game_id)?;
            let receipt = client.actions()?.keep(&game_id, direction).await?;
            println!("Dove {} (tx {})", direction, receipt.digest);
        }
        Command::Play { direction, game_id } => {
            let game_id = client.resolve_game(game_id)?;
            let (role, receipt) = client.actions()?.play(&game_id, direction).await?;
            let verb = match role {
                Role::Shooter => "Shot",
                Role::Keeper => "Dove",
            };
            println!("{} {} (tx {})", verb, direction, receipt.digest);
        }
        Command::Watch { game_id } => {
            let game_id = client.resolve_game(game_id)?;
            watch(&client, &game_id).await?;
        }
        Command::Leave => {
            let viewer = client.signer()?.address();
            client.tracker.forget(&viewer)?;
            println!("Forgot active game for {}", viewer);
        }
    }

    Ok(())
}

async fn lobby(client: &Client, once: bool) -> anyhow::Result<()> {
    let viewer = client.viewer();
    if once {
        let available = client.queries.fetch_available_games(&viewer).await?;
        print_listings("Open games", &available);
        let mine = client.queries.fetch_user_active_games(&viewer).await?;
        print_listings("Your games", &mine);
        return Ok(());
    }

    let poller = client.poller();
    let mut available = poller.watch_available_games(&viewer);
    let mut mine = poller.watch_user_active_games(&viewer);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = available.changed() => {
                let Some(snapshot) = snapshot else { break };
                match (snapshot.data, snapshot.error) {
                    (Some(games), _) => print_listings("Open games", &games),
                    (None, Some(err)) => tracing::warn!("Open games unavailable: {}", err),
                    (None, None) => {}
                }
            }
            snapshot = mine.changed() => {
                let Some(snapshot) = snapshot else { break };
                match (snapshot.data, snapshot.error) {
                    (Some(games), _) => print_listings("Your games", &games),
                    (None, Some(err)) => tracing::warn!("Your games unavailable: {}", err),
                    (None, None) => {}
                }
            }
        }
    }
    Ok(())
}

async fn watch(client: &Client, game_id: &str) -> anyhow::Result<()> {
    let viewer = client.viewer();
    let poller = client.poller();
    let mut game = poller.watch_game(game_id);
    let mut round = poller.watch_round_info(game_id);
    let mut turn = poller.watch_current_turn(game_id, &viewer);

    let mut last_state = None;
    let mut last_round = None;
    let mut last_turn = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = game.changed() => {
                let Some(snapshot) = snapshot else { break };
                if let Some(err) = snapshot.error {
                    tracing::warn!("Game state unavailable: {}", err);
                    continue;
                }
                let Some(state) = snapshot.data else {
                    bail!("Game {} not found", game_id);
                };
                if last_state.as_ref() != Some(&state) {
                    print_state(game_id, &state);
                    last_state = Some(state.clone());
                }
                if state.finished {
                    client.tracker.observe(&viewer, game_id, &state)?;
                    break;
                }
            }
            snapshot = round.changed() => {
                let Some(snapshot) = snapshot else { break };
                if let Some(info) = snapshot.data {
                    if last_round.as_ref() != Some(&info) {
                        if info.awaiting_resolution() {
                            println!("Round {}: both moves in, awaiting resolution", info.round_number);
                        } else {
                            println!(
                                "Round {}: shooter {} [{}], keeper {} [{}]",
                                info.round_number,
                                info.shooter,
                                if info.shoot_submitted { "ready" } else { "waiting" },
                                info.keeper,
                                if info.keep_submitted { "ready" } else { "waiting" },
                            );
                        }
                        last_round = Some(info);
                    }
                }
            }
            snapshot = turn.changed() => {
                let Some(snapshot) = snapshot else { break };
                if let Some(current) = snapshot.data {
                    if last_turn.as_ref() != Some(&current) {
                        if current.is_my_turn {
                            println!("Your move");
                        } else if let Some(player) = &current.current_player {
                            println!("Waiting for {}", player);
                        }
                        last_turn = Some(current);
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_new_key() {
    let signer = Ed25519Signer::generate();
    println!("address:     {}", signer.address());
    println!("private key: {}", signer.export());
}

fn print_state(game_id: &str, state: &GameState) {
    let opponent = state.player2.as_deref().unwrap_or("(waiting)");
    println!(
        "Game {}: {} vs {} | {}-{} | round {}/{}{}",
        game_id,
        state.player1,
        opponent,
        state.player1_score,
        state.player2_score,
        state.current_round.min(MAX_ROUNDS),
        MAX_ROUNDS,
        match (&state.winner, state.finished, state.started) {
            (Some(winner), _, _) => format!(" | winner {}", winner),
            (None, true, _) => " | finished".to_string(),
            (None, false, false) => " | not started".to_string(),
            (None, false, true) => String::new(),
        }
    );
}

fn print_listings(title: &str, games: &[GameListing]) {
    println!("{} ({}):", title, games.len());
    for listing in games {
        let state = &listing.game_state;
        println!(
            "  {}  host {}  {}",
            listing.game_id,
            state.player1,
            if state.started { "in progress" } else { "open" }
        );
    }
}
