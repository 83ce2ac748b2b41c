//! Single-writer persistence: one worker serializing all SQLite writes to
//! avoid write-write contention on the embedded database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cxxcache_domain::ports::{ParsePayload, SingleWriter, StorageEngine, WriterStats};
use cxxcache_domain::{error, warn, Error, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tuning knobs for [`SqliteSingleWriter`], mirroring the cache's
/// `writer_*` configuration keys.
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    /// Bounded channel capacity.
    pub queue_size: usize,
    /// Maximum payloads persisted per drain iteration.
    pub batch_size: usize,
    /// Attempts per payload before it is dropped with a logged failure.
    pub retry_attempts: u32,
    /// Delay between retry attempts.
    pub retry_delay: Duration,
    /// Overlay file-count ceiling forwarded to `update_context_overlay_stats`.
    pub max_overlay_files: u64,
    /// Overlay row-count ceiling forwarded to `update_context_overlay_stats`.
    pub max_overlay_rows: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            batch_size: 16,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(200),
            max_overlay_files: 500,
            max_overlay_rows: 50_000,
        }
    }
}

struct QueueTracker {
    depth: AtomicUsize,
    oldest_enqueue: StdMutex<Option<Instant>>,
}

/// Serializes all writes through a single background worker draining a
/// bounded `mpsc` channel, batching persistence and retrying transient
/// failures with a fixed delay.
pub struct SqliteSingleWriter {
    storage: Arc<dyn StorageEngine>,
    config: WriterConfig,
    sender: StdMutex<Option<mpsc::Sender<ParsePayload>>>,
    worker: StdMutex<Option<JoinHandle<()>>>,
    tracker: Arc<QueueTracker>,
}

impl SqliteSingleWriter {
    /// Builds a writer over `storage`, not yet started.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageEngine>, config: WriterConfig) -> Self {
        Self {
            storage,
            config,
            sender: StdMutex::new(None),
            worker: StdMutex::new(None),
            tracker: Arc::new(QueueTracker {
                depth: AtomicUsize::new(0),
                oldest_enqueue: StdMutex::new(None),
            }),
        }
    }
}

async fn persist_one(storage: &Arc<dyn StorageEngine>, payload: &ParsePayload, config: &WriterConfig) {
    let row_delta = (payload.symbols.len()
        + payload.references.len()
        + payload.call_edges.len()
        + payload.include_deps.len()) as i64;

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let result = async {
            storage.upsert_parse_payload(payload).await?;
            storage
                .update_context_overlay_stats(
                    &payload.context_id,
                    1,
                    row_delta,
                    config.max_overlay_files,
                    config.max_overlay_rows,
                )
                .await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => return,
            Err(err) if attempts < config.retry_attempts.max(1) => {
                warn!(
                    "writer",
                    &format!("{}: persist attempt {attempts} failed: {err}", payload.file_key)
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(err) => {
                error!(
                    "writer",
                    &format!(
                        "{}: dropping payload after {attempts} failed attempts: {err}",
                        payload.file_key
                    )
                );
                return;
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<ParsePayload>,
    storage: Arc<dyn StorageEngine>,
    config: WriterConfig,
    tracker: Arc<QueueTracker>,
) {
    let batch_size = config.batch_size.max(1);
    loop {
        let Some(first) = rx.recv().await else {
            return;
        };
        let mut batch = vec![first];
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(payload) => batch.push(payload),
                Err(_) => break,
            }
        }

        let batch_len = batch.len();
        for payload in &batch {
            persist_one(&storage, payload, &config).await;
        }
        tracker.depth.fetch_sub(batch_len, Ordering::SeqCst);
        if tracker.depth.load(Ordering::SeqCst) == 0 {
            *tracker.oldest_enqueue.lock().unwrap() = None;
        }
    }
}

#[async_trait]
impl SingleWriter for SqliteSingleWriter {
    async fn start(&self) {
        let mut sender_guard = self.sender.lock().unwrap();
        if sender_guard.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel(self.config.queue_size.max(1));
        *sender_guard = Some(tx);
        drop(sender_guard);

        let storage = Arc::clone(&self.storage);
        let config = self.config;
        let tracker = Arc::clone(&self.tracker);
        let handle = tokio::spawn(run_worker(rx, storage, config, tracker));
        *self.worker.lock().unwrap() = Some(handle);
    }

    async fn enqueue(&self, payload: ParsePayload) -> Result<()> {
        let sender = self.sender.lock().unwrap().clone();
        let Some(sender) = sender else {
            return Err(Error::writer_not_running(
                "enqueue attempted before start() or after stop()",
            ));
        };

        {
            let mut oldest = self.tracker.oldest_enqueue.lock().unwrap();
            if self.tracker.depth.load(Ordering::SeqCst) == 0 {
                *oldest = Some(Instant::now());
            }
        }
        self.tracker.depth.fetch_add(1, Ordering::SeqCst);

        sender
            .send(payload)
            .await
            .map_err(|_| Error::writer_not_running("worker channel closed"))
    }

    async fn flush(&self) {
        while self.tracker.depth.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn stop(&self) {
        self.flush().await;
        let sender = self.sender.lock().unwrap().take();
        drop(sender);
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn stats(&self) -> WriterStats {
        let lag_ms = self
            .tracker
            .oldest_enqueue
            .lock()
            .unwrap()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        WriterStats {
            queue_depth: self.tracker.depth.load(Ordering::SeqCst),
            lag_ms,
        }
    }
}
