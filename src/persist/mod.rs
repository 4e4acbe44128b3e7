//! Persistence selector and debounced persister.
//!
//! On every observed store change, after a quiescence delay, the current
//! snapshot is written to exactly one target: the remote account row when a
//! session is active, the local key-value entries otherwise. Auto-persist
//! failures are logged, never surfaced; the in-memory state stays the source
//! of truth and the next mutation reschedules the attempt.

mod local;

pub use local::*;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::errors::AppError;
use crate::models::{Session, Snapshot};
use crate::remote::RemoteClient;
use crate::store::RecordStore;

/// Where snapshots are persisted for the active identity.
#[derive(Clone)]
pub enum PersistTarget {
    /// Guest mode: device-local key-value entries
    Local(LocalStore),
    /// Signed-in mode: account-scoped remote row
    Remote {
        client: RemoteClient,
        session: Session,
    },
}

impl PersistTarget {
    /// Choose the target for the active identity.
    pub fn select(local: LocalStore, remote: Option<(RemoteClient, Session)>) -> Self {
        match remote {
            Some((client, session)) => PersistTarget::Remote { client, session },
            None => PersistTarget::Local(local),
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        match self {
            PersistTarget::Local(local) => local.save(snapshot).await,
            PersistTarget::Remote { client, session } => {
                client.upsert_snapshot(session, snapshot).await
            }
        }
    }
}

enum Command {
    /// Persist immediately if dirty, then acknowledge
    Flush(oneshot::Sender<Result<(), AppError>>),
}

/// Debounced persister task handle.
pub struct Persister {
    command_tx: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

impl Persister {
    /// Spawn the persister, subscribed to the store's revision channel.
    pub fn spawn(store: RecordStore, target: PersistTarget, debounce: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(8);
        // Subscribe before spawning so mutations landing before the task's
        // first poll are still observed (watch marks prior sends as seen).
        let revision_rx = store.subscribe();
        let handle = tokio::spawn(run(store, revision_rx, target, debounce, command_rx));
        Self { command_tx, handle }
    }

    /// Persist the current snapshot now, cancelling any pending debounce.
    /// Unlike the debounced path, the result is returned so interactive
    /// callers can report it.
    pub async fn flush(&self) -> Result<(), AppError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Flush(tx))
            .await
            .map_err(|_| AppError::Storage("Persister is gone".to_string()))?;
        rx.await
            .map_err(|_| AppError::Storage("Persister is gone".to_string()))?
    }

    /// Stop the task, flushing any pending snapshot first.
    pub async fn shutdown(self) -> Result<(), AppError> {
        let result = self.flush().await;
        self.handle.abort();
        result
    }
}

async fn run(
    store: RecordStore,
    mut revision_rx: tokio::sync::watch::Receiver<u64>,
    target: PersistTarget,
    debounce: Duration,
    mut command_rx: mpsc::Receiver<Command>,
) {
    // Deadline of the pending persist, if a mutation is waiting to settle
    let mut deadline: Option<Instant> = None;

    loop {
        if let Some(at) = deadline {
            tokio::select! {
                _ = sleep_until(at) => {
                    deadline = None;
                    if let Err(e) = target.persist(&store.snapshot()).await {
                        tracing::error!("Auto-persist failed (will retry on next change): {}", e);
                    }
                }
                changed = revision_rx.changed() => {
                    match changed {
                        Ok(()) => deadline = Some(Instant::now() + debounce),
                        Err(_) => break,
                    }
                }
                command = command_rx.recv() => {
                    match command {
                        Some(Command::Flush(ack)) => {
                            deadline = None;
                            revision_rx.borrow_and_update();
                            let _ = ack.send(target.persist(&store.snapshot()).await);
                        }
                        None => break,
                    }
                }
            }
        } else {
            tokio::select! {
                changed = revision_rx.changed() => {
                    match changed {
                        Ok(()) => deadline = Some(Instant::now() + debounce),
                        Err(_) => break,
                    }
                }
                command = command_rx.recv() => {
                    match command {
                        Some(Command::Flush(ack)) => {
                            // Persist unconditionally: a mutation may have
                            // landed that this task has not observed yet
                            revision_rx.borrow_and_update();
                            let _ = ack.send(target.persist(&store.snapshot()).await);
                        }
                        None => break,
                    }
                }
            }
        }
    }
}
