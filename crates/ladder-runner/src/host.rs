//! Table hosting: each table runs in its own task and is driven through a
//! command channel.

use crate::protocol::{command_for, ConsoleCommand, GameSummary, SeatSpec, TableMessage};
use crate::table::{GameTable, TableError};
use dashmap::DashMap;
use futures_util::future::join_all;
use ladder_core::{session::describe, GameAction, GameConfig, GameEvent, PlayerId};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use uuid::Uuid;

type Reply<T> = oneshot::Sender<Result<T, TableError>>;

/// Requests handled by a table task.
enum TableCommand {
    Start(Reply<Vec<GameEvent>>),
    Restart(Reply<Vec<GameEvent>>),
    Submit {
        seat: PlayerId,
        action: GameAction,
        reply: Reply<Vec<GameEvent>>,
    },
    ValidActions(oneshot::Sender<Option<(PlayerId, Vec<GameAction>)>>),
    Snapshot(oneshot::Sender<Option<serde_json::Value>>),
    Describe {
        events: Vec<GameEvent>,
        reply: oneshot::Sender<Vec<String>>,
    },
    Summary(oneshot::Sender<GameSummary>),
}

/// Handle to a running table task.
#[derive(Clone)]
pub struct TableHandle {
    pub id: Uuid,
    sender: mpsc::UnboundedSender<TableCommand>,
}

impl TableHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TableCommand,
    ) -> anyhow::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .map_err(|_| anyhow::anyhow!("table {} has shut down", self.id))?;
        Ok(rx.await?)
    }

    pub async fn start(&self) -> anyhow::Result<Result<Vec<GameEvent>, TableError>> {
        self.request(TableCommand::Start).await
    }

    pub async fn restart(&self) -> anyhow::Result<Result<Vec<GameEvent>, TableError>> {
        self.request(TableCommand::Restart).await
    }

    pub async fn submit(
        &self,
        seat: PlayerId,
        action: GameAction,
    ) -> anyhow::Result<Result<Vec<GameEvent>, TableError>> {
        self.request(|reply| TableCommand::Submit {
            seat,
            action,
            reply,
        })
        .await
    }

    pub async fn valid_actions(&self) -> anyhow::Result<Option<(PlayerId, Vec<GameAction>)>> {
        self.request(TableCommand::ValidActions).await
    }

    pub async fn snapshot(&self) -> anyhow::Result<Option<serde_json::Value>> {
        self.request(TableCommand::Snapshot).await
    }

    pub async fn describe(&self, events: Vec<GameEvent>) -> anyhow::Result<Vec<String>> {
        self.request(|reply| TableCommand::Describe { events, reply })
            .await
    }

    pub async fn summary(&self) -> anyhow::Result<GameSummary> {
        self.request(TableCommand::Summary).await
    }
}

/// Host state shared across all tables.
pub struct HostState {
    /// All running tables
    pub tables: DashMap<Uuid, TableHandle>,
}

impl HostState {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Spawn a task owning `table` and register it
    pub fn open_table(&self, table: GameTable) -> TableHandle {
        let id = table.id;
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_table(table, receiver));

        let handle = TableHandle { id, sender };
        self.tables.insert(id, handle.clone());
        info!(table = %id, "table opened");
        handle
    }

    /// Drop a table; its task ends once every handle is gone
    pub fn close_table(&self, id: Uuid) {
        if self.tables.remove(&id).is_some() {
            info!(table = %id, "table closed");
        }
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::new()
    }
}

/// Table task: owns the game and serves commands one at a time.
async fn run_table(mut table: GameTable, mut receiver: mpsc::UnboundedReceiver<TableCommand>) {
    while let Some(command) = receiver.recv().await {
        match command {
            TableCommand::Start(reply) => {
                let _ = reply.send(table.start_game());
            }
            TableCommand::Restart(reply) => {
                let _ = reply.send(table.restart());
            }
            TableCommand::Submit {
                seat,
                action,
                reply,
            } => {
                let _ = reply.send(table.apply_action(seat, action));
            }
            TableCommand::ValidActions(reply) => {
                let _ = reply.send(table.get_valid_actions());
            }
            TableCommand::Snapshot(reply) => {
                let _ = reply.send(table.get_game_state());
            }
            TableCommand::Describe { events, reply } => {
                let lines = match table.state() {
                    Some(state) => events.iter().filter_map(|e| describe(state, e)).collect(),
                    None => Vec::new(),
                };
                let _ = reply.send(lines);
            }
            TableCommand::Summary(reply) => {
                let _ = reply.send(table.summary());
            }
        }
    }
    info!(table = %table.id, "table task finished");
}

/// Play `games` bot-only games concurrently and collect their summaries.
pub async fn run_simulations(
    host: Arc<HostState>,
    seats: Vec<SeatSpec>,
    config: GameConfig,
    games: u32,
) -> anyhow::Result<Vec<GameSummary>> {
    let mut handles = Vec::new();
    for i in 0..games {
        let mut config = config.clone();
        config.seed = config.seed.map(|s| s.wrapping_add(i as u64));
        let table = GameTable::new(Uuid::new_v4(), seats.clone(), config)?;
        if !table.is_all_bots() {
            anyhow::bail!("simulation needs every seat to be a bot");
        }
        handles.push(host.open_table(table));
    }

    let runs = handles.iter().map(|handle| async move {
        if let Err(e) = handle.start().await? {
            warn!(table = %handle.id, "game failed: {}", e);
        }
        handle.summary().await
    });

    let results = join_all(runs).await;
    for handle in &handles {
        host.close_table(handle.id);
    }
    results.into_iter().collect()
}

fn emit(message: &TableMessage, json: bool) {
    if json {
        match serde_json::to_string(message) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("failed to encode message: {}", e),
        }
    }
}

/// Play one table from standard input.
pub async fn run_interactive(
    host: Arc<HostState>,
    seats: Vec<SeatSpec>,
    config: GameConfig,
    json: bool,
) -> anyhow::Result<()> {
    let table = GameTable::new(Uuid::new_v4(), seats, config)?;
    emit(&TableMessage::TableCreated { table: table.to_info() }, json);
    let handle = host.open_table(table);

    let events = handle.start().await??;
    report(&handle, events, json).await?;
    prompt(&handle, json).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                emit(&TableMessage::Error { message: e.to_string() }, json);
                continue;
            }
        };

        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::State => {
                if let Some(state) = handle.snapshot().await? {
                    if json {
                        emit(&TableMessage::GameState { state }, json);
                    } else {
                        println!("{}", serde_json::to_string_pretty(&state)?);
                    }
                }
            }
            ConsoleCommand::Actions => {}
            ConsoleCommand::Restart => {
                let events = handle.restart().await??;
                report(&handle, events, json).await?;
            }
            ConsoleCommand::Action(action) => {
                let Some((seat, _)) = handle.valid_actions().await? else {
                    continue;
                };
                match handle.submit(seat, action).await? {
                    Ok(events) => report(&handle, events, json).await?,
                    Err(e) => {
                        println!("Can't do that: {}", e);
                        emit(&TableMessage::Error { message: e.to_string() }, json);
                    }
                }
            }
        }

        let summary = handle.summary().await?;
        if summary.finished {
            emit(
                &TableMessage::GameOver {
                    winners: summary.winners.clone(),
                    loser: summary.loser.clone(),
                },
                json,
            );
            println!("Type `restart` to play again or `quit` to leave.");
            continue;
        }
        prompt(&handle, json).await?;
    }

    host.close_table(handle.id);
    Ok(())
}

async fn report(handle: &TableHandle, events: Vec<GameEvent>, json: bool) -> anyhow::Result<()> {
    if json {
        let encoded = events
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        emit(&TableMessage::Events { events: encoded }, json);
    }
    for line in handle.describe(events).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn prompt(handle: &TableHandle, json: bool) -> anyhow::Result<()> {
    let Some((player, actions)) = handle.valid_actions().await? else {
        return Ok(());
    };
    let commands: Vec<String> = actions.iter().map(command_for).collect();
    emit(
        &TableMessage::ValidActions {
            player,
            actions: commands.clone(),
        },
        json,
    );
    if !commands.is_empty() {
        println!("[seat {}] {}", player, commands.join(" | "));
    }
    Ok(())
}
