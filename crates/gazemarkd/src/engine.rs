use gazemark_core::{stats, DatasetStats, Sample};
use gazemark_store::{DatasetStore, StoreError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to start dataset thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("dataset thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the dataset thread.
enum EngineRequest {
    Append {
        samples: Vec<Sample>,
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    Stats {
        reply: oneshot::Sender<Result<DatasetStats, EngineError>>,
    },
}

/// Clone-safe handle to the dataset thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Append processed samples and return the new dataset size.
    pub async fn append(&self, samples: Vec<Sample>) -> Result<usize, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Append {
                samples,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Re-read the dataset and compute statistics over it.
    pub async fn stats(&self) -> Result<DatasetStats, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Stats { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the dataset owner on a dedicated OS thread.
///
/// The thread is the only code that touches `store`, so every
/// read-modify-write cycle runs to completion before the next request is
/// looked at. Concurrent ingests queue up instead of overwriting each other.
pub fn spawn_engine<S>(mut store: S) -> Result<EngineHandle, EngineError>
where
    S: DatasetStore + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(32);

    std::thread::Builder::new()
        .name("gazemark-dataset".into())
        .spawn(move || {
            tracing::info!("dataset thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Append { samples, reply } => {
                        let result = store.append(samples).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Stats { reply } => {
                        let result = store
                            .read_all()
                            .map(|dataset| stats::compute(dataset.as_deref()))
                            .map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("dataset thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
