//! Channel-backed cursor shared by the database adapters.
//!
//! A producer task streams rows from the driver into a bounded channel; the
//! cursor pulls from the other end. The channel bound is the read-ahead
//! window, so a slow destination applies backpressure to the query.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::row::Row;
use crate::core::traits::RowCursor;
use crate::error::Result;

/// Cursor fed by a background producer task.
pub struct ChannelCursor {
    rx: mpsc::Receiver<Result<Row>>,
    producer: Option<JoinHandle<()>>,
    exhausted: bool,
}

impl ChannelCursor {
    /// Spawn `produce` with the sending half of a channel of `capacity` rows.
    ///
    /// The producer ends the cursor by returning (dropping the sender).
    pub fn spawn<F, Fut>(capacity: usize, produce: F) -> Self
    where
        F: FnOnce(mpsc::Sender<Result<Row>>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let producer = tokio::spawn(produce(tx));
        Self {
            rx,
            producer: Some(producer),
            exhausted: false,
        }
    }
}

#[async_trait]
impl RowCursor for ChannelCursor {
    async fn advance(&mut self) -> Option<Result<Row>> {
        if self.exhausted {
            return None;
        }
        match self.rx.recv().await {
            Some(item) => Some(item),
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    async fn close(&mut self) {
        self.exhausted = true;
        self.rx.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
            let _ = producer.await;
        }
    }
}

impl Drop for ChannelCursor {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
