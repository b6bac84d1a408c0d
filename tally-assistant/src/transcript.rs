//! Fire-and-forget transcript hand-off.
//!
//! Chat turns push exchanges into a bounded queue and move on. A background
//! task drains the queue into an [`ExchangeSink`]. Sink failures are logged
//! and counted in the [`ForwarderReport`] returned when the task finishes,
//! which happens once every [`TranscriptForwarder`] clone is dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tally_core::{ChatExchange, TallyResult, TranscriptError};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Durable destination for chat exchanges.
#[async_trait]
pub trait ExchangeSink: Send + Sync {
    async fn record(&self, exchange: ChatExchange) -> TallyResult<()>;

    /// Name used in logs.
    fn sink_name(&self) -> &str {
        "transcript"
    }
}

/// Outcome of a drained forwarder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderReport {
    pub delivered: u64,
    pub failed: u64,
}

/// Sending half of the transcript queue.
#[derive(Debug, Clone)]
pub struct TranscriptForwarder {
    tx: mpsc::Sender<ChatExchange>,
    capacity: usize,
}

impl TranscriptForwarder {
    /// Start draining into `sink`. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn ExchangeSink>, capacity: usize) -> (Self, JoinHandle<ForwarderReport>) {
        let capacity = capacity.max(1);
        let (tx, mut rx) = mpsc::channel::<ChatExchange>(capacity);

        let handle = tokio::spawn(async move {
            let mut report = ForwarderReport::default();
            while let Some(exchange) = rx.recv().await {
                let session_id = exchange.session_id.clone();
                match sink.record(exchange).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            sink = sink.sink_name(),
                            session_id = %session_id,
                            error = %e,
                            "Transcript sink failed to record exchange"
                        );
                    }
                }
            }
            info!(
                sink = sink.sink_name(),
                delivered = report.delivered,
                failed = report.failed,
                "Transcript forwarder stopped"
            );
            report
        });

        (Self { tx, capacity }, handle)
    }

    /// Queue `exchange` without waiting.
    pub fn forward(&self, exchange: ChatExchange) -> Result<(), TranscriptError> {
        match self.tx.try_send(exchange) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    session_id = %dropped.session_id,
                    capacity = self.capacity,
                    "Transcript queue full, exchange dropped"
                );
                Err(TranscriptError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(session_id = %dropped.session_id, "Transcript queue closed, exchange dropped");
                Err(TranscriptError::QueueClosed)
            }
        }
    }
}

// ============================================================================
// IN-MEMORY SINK
// ============================================================================

/// Sink keeping every exchange in memory. Can be told to reject writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    exchanges: Mutex<Vec<ChatExchange>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that fails every write.
    pub fn rejecting() -> Self {
        Self {
            exchanges: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub async fn exchanges(&self) -> Vec<ChatExchange> {
        self.exchanges.lock().await.clone()
    }
}

#[async_trait]
impl ExchangeSink for MemorySink {
    async fn record(&self, exchange: ChatExchange) -> TallyResult<()> {
        if self.reject {
            return Err(TranscriptError::SinkRejected {
                reason: "sink is read-only".to_string(),
            }
            .into());
        }
        debug!(session_id = %exchange.session_id, "Recorded exchange");
        self.exchanges.lock().await.push(exchange);
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "memory"
    }
}
