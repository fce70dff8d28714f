//! The coordinator: one task that owns every client and every game.
//!
//! Connection tasks never touch the registry or the store directly. They
//! send commands over a bounded channel; the coordinator applies each
//! command, and each broadcast tick, to completion before looking at the
//! next one. That single ordering point is what makes every join atomic
//! with respect to every other join, play, disconnect and tick.
//!
//! ```text
//!  conn task ─┐                    ┌─────────────── coordinator ───────────────┐
//!  conn task ─┼─ Command (mpsc) ──→│ ClientRegistry  SessionStore  TickScheduler│
//!  conn task ─┘                    └──────┬──────────────────────────────┬──────┘
//!                                         │ Frame (bounded mpsc)         │ every period
//!                                         └──→ conn writer tasks ←───────┘
//! ```

use chroma_game::{GameConfig, GameError, SessionStore};
use chroma_protocol::{
    ClientId, ClientMessage, Codec, GameId, GameSnapshot, JsonCodec, MoveId, ServerMessage,
    SlotLabel,
};
use chroma_registry::{ClientRegistry, ClientSender};
use chroma_tick::{TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::ChromaError;

/// The text sent to a client whose frame could not be decoded.
pub const MALFORMED_MESSAGE: &str = "An error occurred processing your request";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Palette and board size for every game.
    pub game: GameConfig,
    /// Broadcast schedule.
    pub tick: TickConfig,
    /// Remove a client from its games when its channel closes, freeing
    /// its slot for the next joiner. Default: `true`.
    pub reclaim_on_disconnect: bool,
    /// Capacity of the command channel. Connection tasks wait when it is
    /// full. Default: 1024.
    pub command_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            tick: TickConfig::default(),
            reclaim_on_disconnect: true,
            command_buffer: 1024,
        }
    }
}

impl CoordinatorConfig {
    /// The time between broadcast ticks.
    pub fn broadcast_period(&self) -> std::time::Duration {
        self.tick.period
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What handling one inbound frame did.
///
/// Most failures are silent on the wire; the outcome is how callers and
/// tests can still tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A game was created and sent to the requesting client.
    Created(GameId),
    /// A client was seated. `started` is set when the join filled the game
    /// for the first time.
    Joined { game_id: GameId, started: bool },
    /// A play was recorded.
    Played(GameId),
    /// The request was understood but refused.
    Rejected(GameError),
    /// The frame did not decode; the sender got a generic error.
    Malformed,
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

/// Commands sent to the coordinator task.
pub(crate) enum Command {
    /// Register a freshly opened channel.
    Connect {
        sender: ClientSender,
        reply: oneshot::Sender<ClientId>,
    },
    /// Handle one inbound frame from `from`.
    Frame {
        from: ClientId,
        data: Vec<u8>,
        reply: oneshot::Sender<Outcome>,
    },
    /// The channel of `client_id` closed.
    Disconnect { client_id: ClientId },
    /// Copy out every game.
    Snapshot {
        reply: oneshot::Sender<Vec<GameSnapshot>>,
    },
    Pause,
    Resume,
    Shutdown,
}

/// Handle to a running coordinator. Cheap to clone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers a client channel and returns its new identity. The
    /// `connect` message is already queued on `sender` when this returns.
    pub async fn connect(&self, sender: ClientSender) -> Result<ClientId, ChromaError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect { sender, reply }).await?;
        rx.await.map_err(|_| ChromaError::CoordinatorUnavailable)
    }

    /// Hands one inbound frame to the coordinator and waits for it to be
    /// handled.
    pub async fn frame(&self, from: ClientId, data: Vec<u8>) -> Result<Outcome, ChromaError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Frame { from, data, reply }).await?;
        rx.await.map_err(|_| ChromaError::CoordinatorUnavailable)
    }

    /// Reports that a client's channel has closed.
    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), ChromaError> {
        self.send(Command::Disconnect { client_id }).await
    }

    /// Returns a copy of every game.
    pub async fn snapshot(&self) -> Result<Vec<GameSnapshot>, ChromaError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| ChromaError::CoordinatorUnavailable)
    }

    /// Stops periodic broadcasts until [`resume`](Self::resume).
    pub async fn pause(&self) -> Result<(), ChromaError> {
        self.send(Command::Pause).await
    }

    /// Restarts periodic broadcasts; the next one is a full period away.
    pub async fn resume(&self) -> Result<(), ChromaError> {
        self.send(Command::Resume).await
    }

    /// Stops the coordinator. Commands sent afterwards fail with
    /// [`ChromaError::CoordinatorUnavailable`].
    pub async fn shutdown(&self) -> Result<(), ChromaError> {
        self.send(Command::Shutdown).await
    }

    /// Resolves once the coordinator task has stopped.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: Command) -> Result<(), ChromaError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| ChromaError::CoordinatorUnavailable)
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Owns the client registry and the session store and applies every
/// request to them.
///
/// The methods here are synchronous and can be driven directly (tests do);
/// [`spawn`](Self::spawn) moves the coordinator into its own task.
pub struct Coordinator<C: Codec + Clone = JsonCodec> {
    registry: ClientRegistry<C>,
    store: SessionStore,
    codec: C,
    config: CoordinatorConfig,
}

impl Coordinator<JsonCodec> {
    /// Creates a coordinator that speaks JSON.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl Default for Coordinator<JsonCodec> {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl<C: Codec + Clone> Coordinator<C> {
    pub fn with_codec(config: CoordinatorConfig, codec: C) -> Self {
        Self {
            registry: ClientRegistry::with_codec(codec.clone()),
            store: SessionStore::new(config.game.clone()),
            codec,
            config,
        }
    }

    pub fn registry(&self) -> &ClientRegistry<C> {
        &self.registry
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Registers a new client channel; see [`ClientRegistry::register`].
    pub fn connect(&mut self, sender: ClientSender) -> ClientId {
        self.registry.register(sender)
    }

    /// Forgets a client whose channel closed.
    ///
    /// With `reclaim_on_disconnect` the client also leaves every game it
    /// sat in; those games are returned.
    pub fn disconnect(&mut self, client_id: &ClientId) -> Vec<GameId> {
        if !self.registry.unregister(client_id) {
            return Vec::new();
        }
        tracing::info!(%client_id, clients = self.registry.len(), "client disconnected");

        if self.config.reclaim_on_disconnect {
            self.store.remove_client(client_id)
        } else {
            Vec::new()
        }
    }

    /// Decodes and handles one inbound frame from `from`.
    pub fn handle_frame(&mut self, from: &ClientId, data: &[u8]) -> Outcome {
        let msg: ClientMessage = match self.codec.decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(client_id = %from, error = %e, "failed to decode frame");
                self.send_error(from, MALFORMED_MESSAGE);
                return Outcome::Malformed;
            }
        };

        let method = msg.method();
        tracing::trace!(client_id = %from, method, "frame received");

        let result = match msg {
            ClientMessage::Create { client_id } => self.handle_create(client_id),
            ClientMessage::Join { client_id, game_id } => self.handle_join(client_id, game_id),
            ClientMessage::Play {
                game_id,
                ball_id,
                color,
            } => self.handle_play(game_id, ball_id, color),
        };

        result.unwrap_or_else(|e| {
            match &e {
                GameError::Full { .. } => {
                    tracing::warn!(client_id = %from, method, error = %e, "request rejected");
                }
                _ => tracing::debug!(client_id = %from, method, error = %e, "request rejected"),
            }
            Outcome::Rejected(e)
        })
    }

    fn handle_create(&mut self, client_id: Option<ClientId>) -> Result<Outcome, GameError> {
        let client_id = required(client_id, "create", "clientId")?;
        if !self.registry.contains(&client_id) {
            return Err(GameError::ClientUnknown(client_id));
        }

        let game = self.store.create();
        let game_id = game.id().clone();
        let reply = ServerMessage::Create {
            game: game.snapshot(),
        };
        if let Err(e) = self.registry.send(&client_id, &reply) {
            tracing::debug!(%client_id, %game_id, error = %e, "create reply not delivered");
        }

        Ok(Outcome::Created(game_id))
    }

    fn handle_join(
        &mut self,
        client_id: Option<ClientId>,
        game_id: Option<GameId>,
    ) -> Result<Outcome, GameError> {
        let client_id = required(client_id, "join", "clientId")?;
        let game_id = required(game_id, "join", "gameId")?;

        let (snapshot, participants, started) =
            match self.store.join(&game_id, &client_id, &self.registry) {
                Ok(joined) => (
                    joined.game.snapshot(),
                    joined.game.participant_ids().cloned().collect::<Vec<_>>(),
                    joined.started,
                ),
                Err(e) => {
                    if let Some(message) = e.client_message() {
                        self.send_error(&client_id, &message);
                    }
                    return Err(e);
                }
            };

        // Filling a game pushes one full round of updates ahead of the
        // join notice. The regular schedule is left alone.
        if started {
            self.broadcast_tick();
        }

        self.fan_out(&participants, &ServerMessage::Join { game: snapshot });
        Ok(Outcome::Joined { game_id, started })
    }

    fn handle_play(
        &mut self,
        game_id: Option<GameId>,
        ball_id: Option<MoveId>,
        color: Option<SlotLabel>,
    ) -> Result<Outcome, GameError> {
        let game_id = required(game_id, "play", "gameId")?;
        let ball_id = required(ball_id, "play", "ballId")?;
        let color = required(color, "play", "color")?;

        self.store.record_play(&game_id, ball_id, color)?;
        Ok(Outcome::Played(game_id))
    }

    /// Sends every game's full state to each of its participants.
    ///
    /// Each game is encoded once. Returns the number of frames queued.
    pub fn broadcast_tick(&self) -> usize {
        let mut queued = 0;
        for game in self.store.games() {
            if game.player_count() == 0 {
                continue;
            }
            let update = ServerMessage::Update {
                game: game.snapshot(),
            };
            match self.registry.encode(&update) {
                Ok(frame) => queued += self.registry.send_to_all(game.participant_ids(), &frame),
                Err(e) => {
                    tracing::error!(game_id = %game.id(), error = %e, "failed to encode update");
                }
            }
        }
        queued
    }

    /// Copies out every game.
    pub fn snapshot(&self) -> Vec<GameSnapshot> {
        self.store.games().map(|game| game.snapshot()).collect()
    }

    fn fan_out(&self, recipients: &[ClientId], msg: &ServerMessage) -> usize {
        match self.registry.encode(msg) {
            Ok(frame) => self.registry.send_to_all(recipients, &frame),
            Err(e) => {
                tracing::error!(method = msg.method(), error = %e, "failed to encode message");
                0
            }
        }
    }

    fn send_error(&self, to: &ClientId, message: &str) {
        let msg = ServerMessage::Error {
            message: message.to_string(),
        };
        if let Err(e) = self.registry.send(to, &msg) {
            tracing::debug!(client_id = %to, error = %e, "error reply not delivered");
        }
    }

    /// Moves the coordinator into its own task.
    ///
    /// Returns the handle used to talk to it and the task's `JoinHandle`,
    /// which completes after [`CoordinatorHandle::shutdown`] or once every
    /// handle is dropped.
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.command_buffer.max(1));
        let scheduler = TickScheduler::new(self.config.tick.clone());
        let task = tokio::spawn(self.run(rx, scheduler));
        (CoordinatorHandle { sender: tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut scheduler: TickScheduler) {
        tracing::info!(
            period_ms = scheduler.period().as_millis() as u64,
            "coordinator started"
        );

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.apply(cmd, &mut scheduler),
                },
                info = scheduler.wait_for_tick() => {
                    let queued = self.broadcast_tick();
                    tracing::trace!(tick = info.tick, queued, "broadcast tick");
                    scheduler.record_tick_end();
                }
            }
        }

        tracing::info!(
            ticks = scheduler.tick_count(),
            games = self.store.len(),
            "coordinator stopped"
        );
    }

    fn apply(&mut self, cmd: Command, scheduler: &mut TickScheduler) {
        match cmd {
            Command::Connect { sender, reply } => {
                let id = self.connect(sender);
                let _ = reply.send(id);
            }
            Command::Frame { from, data, reply } => {
                let outcome = self.handle_frame(&from, &data);
                let _ = reply.send(outcome);
            }
            Command::Disconnect { client_id } => {
                self.disconnect(&client_id);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Pause => scheduler.pause(),
            Command::Resume => scheduler.resume(),
            Command::Shutdown => {}
        }
    }
}

/// A wire field that can be present yet empty.
trait Blank {
    fn is_blank(&self) -> bool;
}

macro_rules! impl_blank {
    ($($ty:ty),*) => {
        $(impl Blank for $ty {
            fn is_blank(&self) -> bool {
                self.as_str().is_empty()
            }
        })*
    };
}

impl_blank!(ClientId, GameId, MoveId, SlotLabel);

/// Treats an absent or empty field as missing.
fn required<T: Blank>(
    value: Option<T>,
    method: &'static str,
    field: &'static str,
) -> Result<T, GameError> {
    value
        .filter(|v| !v.is_blank())
        .ok_or(GameError::MissingField { method, field })
}
