//! Continuous draining of the scanner's output pipes.
//!
//! Each stream gets its own reader task for the whole run, so the scanner can
//! never block on a full stdout pipe while we wait on stderr (or the reverse).
//! Bytes land in a shared buffer; whatever was read is still available if the
//! task has to be abandoned.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{trace, warn};

const CHUNK_SIZE: usize = 4096;

pub(crate) struct StreamCapture {
    name: &'static str,
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StreamCapture {
    /// Starts draining `reader`. `None` yields an always-empty capture.
    pub(crate) fn spawn<R>(name: &'static str, reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = reader.map(|mut reader| {
            let sink = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; CHUNK_SIZE];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            trace!("scanner {}: {} bytes", name, n);
                            sink.lock().extend_from_slice(&chunk[..n]);
                        }
                        Err(e) => {
                            warn!("Reading scanner {} failed: {}", name, e);
                            break;
                        }
                    }
                }
            })
        });
        Self { name, buffer, task }
    }

    /// Waits up to `grace` for end-of-stream, then returns everything captured.
    pub(crate) async fn finish(mut self, grace: Duration) -> Vec<u8> {
        if let Some(mut task) = self.task.take() {
            if timeout(grace, &mut task).await.is_err() {
                warn!(
                    "Scanner {} still open {:?} after exit; keeping partial output",
                    self.name, grace
                );
                task.abort();
            }
        }
        std::mem::take(&mut *self.buffer.lock())
    }
}
