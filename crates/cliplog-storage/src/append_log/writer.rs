//! Single-writer appender for the operation log
//!
//! All writes go through one background task fed by an unbounded channel.
//! Requests are enqueued synchronously, so records land in the file in the
//! order the calls were made and never interleave. Each request is answered
//! through a [`WriteTicket`] that the caller may await to learn whether the
//! bytes reached the disk.

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::codec::LogOp;
use crate::config::StorageConfig;
use crate::error::StorageError;

type Reply = oneshot::Sender<Result<(), StorageError>>;

enum WriteRequest {
    /// Append records to the end of the log
    Append { ops: Vec<LogOp>, reply: Reply },
    /// Replace the whole log with these records
    Rewrite { ops: Vec<LogOp>, reply: Reply },
    /// Answer once everything queued before it is done
    Flush { reply: Reply },
}

/// Handle to the outcome of a queued write
#[must_use = "a WriteTicket carries the only report of a failed write"]
#[derive(Debug)]
pub struct WriteTicket {
    rx: oneshot::Receiver<Result<(), StorageError>>,
}

impl WriteTicket {
    /// Wait for the write to complete
    pub async fn wait(self) -> Result<(), StorageError> {
        self.rx.await.map_err(|_| StorageError::WriterClosed)?
    }
}

/// Handle to the background log writer
#[derive(Debug)]
pub struct LogWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
    task: JoinHandle<()>,
    log_path: PathBuf,
}

impl LogWriter {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(config: &StorageConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = WriterTask {
            log_path: config.log_path(),
            rewrite_path: config.rewrite_path(),
            flush_every: config.flush_every.max(1),
            sync_on_write: config.sync_on_write,
        };
        let log_path = worker.log_path.clone();
        let task = tokio::spawn(worker.run(rx));

        debug!(path = %log_path.display(), "Log writer started");

        Self { tx, task, log_path }
    }

    /// Path of the log this writer appends to
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Queue a single record
    pub fn append(&self, op: LogOp) -> WriteTicket {
        self.append_all(vec![op])
    }

    /// Queue several records to be written together
    pub fn append_all(&self, ops: Vec<LogOp>) -> WriteTicket {
        self.submit(|reply| WriteRequest::Append { ops, reply })
    }

    /// Queue a full replacement of the log
    pub fn rewrite(&self, ops: Vec<LogOp>) -> WriteTicket {
        self.submit(|reply| WriteRequest::Rewrite { ops, reply })
    }

    /// Wait until every write queued so far has finished
    ///
    /// Failures of earlier writes are reported through their own tickets,
    /// not here.
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.submit(|reply| WriteRequest::Flush { reply }).wait().await
    }

    /// Drain the queue and stop the writer task
    pub async fn close(self) -> Result<(), StorageError> {
        let LogWriter { tx, task, log_path } = self;
        drop(tx);
        task.await
            .map_err(|e| StorageError::io(format!("log writer task failed: {}", e)))?;
        debug!(path = %log_path.display(), "Log writer stopped");
        Ok(())
    }

    fn submit(&self, request: impl FnOnce(Reply) -> WriteRequest) -> WriteTicket {
        let (reply, rx) = oneshot::channel();
        // On failure the request, and with it the reply sender, is dropped,
        // which resolves the ticket to WriterClosed.
        if self.tx.send(request(reply)).is_err() {
            warn!("Log writer is gone, write dropped");
        }
        WriteTicket { rx }
    }
}

struct WriterTask {
    log_path: PathBuf,
    rewrite_path: PathBuf,
    flush_every: usize,
    sync_on_write: bool,
}

impl WriterTask {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<WriteRequest>) {
        while let Some(request) = rx.recv().await {
            let (result, reply) = match request {
                WriteRequest::Append { ops, reply } => (self.append(&ops).await, reply),
                WriteRequest::Rewrite { ops, reply } => (self.rewrite(&ops).await, reply),
                WriteRequest::Flush { reply } => (Ok(()), reply),
            };
            if let Err(e) = &result {
                warn!(path = %self.log_path.display(), error = %e, "Log write failed");
            }
            // The caller may have dropped its ticket
            let _ = reply.send(result);
        }
    }

    async fn append(&self, ops: &[LogOp]) -> Result<(), StorageError> {
        let buf = LogOp::encode_all(ops);

        let mut file = private_options().append(true).open(&self.log_path).await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        if self.sync_on_write {
            file.sync_data().await?;
        }

        trace!(records = ops.len(), bytes = buf.len(), "Appended to log");
        Ok(())
    }

    #[instrument(skip_all, fields(records = ops.len()))]
    async fn rewrite(&self, ops: &[LogOp]) -> Result<(), StorageError> {
        let file = private_options()
            .write(true)
            .truncate(true)
            .open(&self.rewrite_path)
            .await?;
        let mut writer = BufWriter::new(file);
        let mut buf = BytesMut::new();
        let mut bytes_written = 0usize;

        // Flush in chunks so a large history never sits in memory twice
        for chunk in ops.chunks(self.flush_every) {
            buf.clear();
            for op in chunk {
                op.encode(&mut buf);
            }
            writer.write_all(&buf).await?;
            writer.flush().await?;
            bytes_written += buf.len();
        }

        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        drop(writer);

        tokio::fs::rename(&self.rewrite_path, &self.log_path).await?;

        info!(
            path = %self.log_path.display(),
            bytes = bytes_written,
            "Rewrote log"
        );
        Ok(())
    }
}

/// Log files are readable by their owner only
fn private_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.create(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}
