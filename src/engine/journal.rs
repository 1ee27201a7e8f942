use std::io;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::model::Event;
use crate::wal::Wal;

use super::EngineError;

/// Where committed events go before they are applied in memory.
///
/// The engine only talks to this trait, so a purely in-memory engine and a
/// WAL-backed one run the same code.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Durably record one event. Returns once the event is safe to apply.
    async fn append(&self, event: &Event) -> Result<(), EngineError>;

    /// Replace the journal with a minimal event set describing current state.
    async fn compact(&self, events: Vec<Event>) -> Result<(), EngineError>;

    async fn appends_since_compact(&self) -> u64;
}

/// Keeps nothing. State lives only as long as the engine.
#[derive(Debug, Default)]
pub struct MemoryJournal;

#[async_trait]
impl Journal for MemoryJournal {
    async fn append(&self, _event: &Event) -> Result<(), EngineError> {
        Ok(())
    }

    async fn compact(&self, _events: Vec<Event>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn appends_since_compact(&self) -> u64 {
        0
    }
}

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Journal backed by a [`Wal`] file, written by a background task.
pub struct WalJournal {
    tx: mpsc::Sender<WalCommand>,
}

impl WalJournal {
    /// Hand the WAL to a writer task. Must be called inside a tokio runtime.
    pub fn spawn(wal: Wal) -> Self {
        let (tx, rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        cmd: WalCommand,
        rx: oneshot::Receiver<io::Result<T>>,
    ) -> Result<T, EngineError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }
}

#[async_trait]
impl Journal for WalJournal {
    async fn append(&self, event: &Event) -> Result<(), EngineError> {
        let (response, rx) = oneshot::channel();
        let cmd = WalCommand::Append {
            event: event.clone(),
            response,
        };
        self.request(cmd, rx).await
    }

    async fn compact(&self, events: Vec<Event>) -> Result<(), EngineError> {
        let (response, rx) = oneshot::channel();
        self.request(WalCommand::Compact { events, response }, rx)
            .await
    }

    async fn appends_since_compact(&self) -> u64 {
        let (response, rx) = oneshot::channel();
        if self
            .tx
            .send(WalCommand::AppendsSinceCompact { response })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// Owns the WAL and batches appends for group commit:
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends.
/// 4. One commit (fsync) for the whole batch.
/// 5. Answer every sender with the batch result.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush what we have first, then handle it.
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!("WAL flush failed for {} events: {e}", batch.len());
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.push(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even on append error so half-buffered bytes don't leak into the next batch.
    let flush_err = wal.commit().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.rewrite(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appended());
        }
        // Appends are always batched by the caller loop.
        WalCommand::Append { event, response } => {
            let mut batch = vec![(event, response)];
            commit_batch(wal, &mut batch);
        }
    }
}
