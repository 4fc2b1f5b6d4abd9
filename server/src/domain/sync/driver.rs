//! Debounced filter synchronization
//!
//! A background task owns the [`FilterState`]. Mutations arrive over a
//! channel and re-arm a quiet-period timer; when it fires the current state is
//! fetched under a fresh [`RequestToken`]. Starting a fetch aborts the one in
//! flight, and a response is applied only if its token is still the latest.
//! Observers read [`SyncSnapshot`]s from a watch channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::fetcher::{FetchError, Fetcher};
use super::state::{FilterState, Mutation};
use crate::core::constants::DEFAULT_DEBOUNCE_MS;
use crate::data::Document;
use crate::domain::query::QueryResult;

const COMMAND_BUFFER: usize = 64;

/// Identifies one issued fetch; later fetches carry larger tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What observers see
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    /// Current state, including edits not fetched yet
    pub state: FilterState,
    /// Commands the driver has processed
    pub revision: u64,
    /// A change is waiting out the quiet period
    pub pending: bool,
    /// A fetch is in flight
    pub loading: bool,
    /// Token of the response `result`/`error` came from
    pub token: Option<RequestToken>,
    pub result: Option<QueryResult<Document>>,
    pub error: Option<String>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Filter synchronizer has stopped")]
pub struct SyncClosed;

enum Command {
    Mutate(Mutation),
    Refresh,
}

/// Handle to a running synchronizer; cheap to clone
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SyncSnapshot>,
    sent: Arc<AtomicU64>,
}

impl SyncHandle {
    async fn send(&self, command: Command) -> Result<(), SyncClosed> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.commands.send(command).await.map_err(|_| SyncClosed)
    }

    /// Apply an edit; the fetch follows after the quiet period
    pub async fn mutate(&self, mutation: Mutation) -> Result<(), SyncClosed> {
        self.send(Command::Mutate(mutation)).await
    }

    /// Fetch the current state now, skipping any pending quiet period
    pub async fn refresh(&self) -> Result<(), SyncClosed> {
        self.send(Command::Refresh).await
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until every command sent so far is processed and its fetch applied
    pub async fn settled(&self) -> Result<SyncSnapshot, SyncClosed> {
        let sent = self.sent.load(Ordering::SeqCst);
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| s.revision >= sent && !s.pending && !s.loading)
            .await
            .map_err(|_| SyncClosed)?;
        Ok(snapshot.clone())
    }
}

/// Synchronizer configuration
pub struct FilterSync {
    entity: String,
    fetcher: Arc<dyn Fetcher>,
    debounce: Duration,
    state: FilterState,
}

impl FilterSync {
    pub fn new(entity: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            entity: entity.into(),
            fetcher,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            state: FilterState::default(),
        }
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn initial_state(mut self, state: FilterState) -> Self {
        self.state = state;
        self
    }

    /// Start the driver; the initial state is fetched immediately
    ///
    /// The task ends once every [`SyncHandle`] is dropped.
    pub fn spawn(self) -> (SyncHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(SyncSnapshot {
            state: self.state.clone(),
            loading: true,
            ..SyncSnapshot::default()
        });
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            entity: self.entity,
            fetcher: self.fetcher,
            state: self.state,
            issued: 0,
            latest: None,
            in_flight: None,
            done_tx,
            snapshots: snapshots_tx,
        };
        let task = tokio::spawn(driver.run(commands_rx, done_rx, self.debounce));

        let handle = SyncHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            sent: Arc::new(AtomicU64::new(0)),
        };
        (handle, task)
    }
}

type Outcome = (RequestToken, Result<QueryResult<Document>, FetchError>);

struct Driver {
    entity: String,
    fetcher: Arc<dyn Fetcher>,
    state: FilterState,
    issued: u64,
    latest: Option<RequestToken>,
    in_flight: Option<JoinHandle<()>>,
    done_tx: mpsc::UnboundedSender<Outcome>,
    snapshots: watch::Sender<SyncSnapshot>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut done: mpsc::UnboundedReceiver<Outcome>,
        debounce: Duration,
    ) {
        let timer = tokio::time::sleep(debounce);
        tokio::pin!(timer);
        let mut armed = false;

        self.issue();
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Mutate(mutation) => {
                            self.state.apply(mutation);
                            timer.as_mut().reset(Instant::now() + debounce);
                            armed = true;
                        }
                        Command::Refresh => armed = false,
                    }
                    let state = self.state.clone();
                    self.snapshots.send_modify(|s| {
                        s.state = state;
                        s.revision += 1;
                        s.pending = armed;
                    });
                    if !armed {
                        self.issue();
                    }
                }
                Some((token, outcome)) = done.recv() => self.complete(token, outcome),
                () = &mut timer, if armed => {
                    armed = false;
                    self.issue();
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        tracing::debug!(entity = %self.entity, "Filter synchronizer stopped");
    }

    fn issue(&mut self) {
        self.issued += 1;
        let token = RequestToken(self.issued);
        self.latest = Some(token);
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let query = self.state.search_query();
        tracing::debug!(
            entity = %self.entity,
            token = token.value(),
            filter = ?query.filter,
            "Issuing fetch"
        );
        let fetcher = self.fetcher.clone();
        let entity = self.entity.clone();
        let done = self.done_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = fetcher.fetch(&entity, &query).await;
            let _ = done.send((token, outcome));
        }));
        self.snapshots.send_modify(|s| {
            s.pending = false;
            s.loading = true;
        });
    }

    fn complete(
        &mut self,
        token: RequestToken,
        outcome: Result<QueryResult<Document>, FetchError>,
    ) {
        if self.latest != Some(token) {
            tracing::trace!(token = token.value(), "Discarding superseded response");
            return;
        }
        self.in_flight = None;
        self.snapshots.send_modify(|s| {
            s.loading = false;
            s.token = Some(token);
            match outcome {
                Ok(result) => {
                    s.result = Some(result);
                    s.error = None;
                }
                Err(e) => {
                    tracing::warn!(token = token.value(), error = %e, "Fetch failed");
                    s.error = Some(e.to_string());
                }
            }
        });
    }
}
