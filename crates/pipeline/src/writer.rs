//! Background writer for full design documents.
//!
//! Saving a design hands its serialized document to [`DocumentWriter`] and
//! returns without waiting. Each document is uploaded by its own task,
//! retrying with backoff (1 s, 2 s, 4 s by default), so a failing upload
//! never holds up the ones queued behind it. Uploads that still fail are
//! logged with their key and dropped.

use std::sync::Arc;
use std::time::Duration;

use layerhub_core::blob::BlobStore;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Backoff between upload attempts.
pub const DEFAULT_RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 8;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DocumentWriterConfig {
    /// One retry per entry, sleeping the given delay first.
    pub retry_delays: Vec<Duration>,
    pub max_concurrent_uploads: usize,
    /// How long `shutdown` waits for pending uploads.
    pub shutdown_timeout: Duration,
}

impl DocumentWriterConfig {
    /// `retries` retries with doubling delays starting at one second.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retry_delays: (0..retries)
                .map(|attempt| Duration::from_secs(1u64 << attempt.min(16)))
                .collect(),
            ..Default::default()
        }
    }
}

impl Default for DocumentWriterConfig {
    fn default() -> Self {
        Self {
            retry_delays: DEFAULT_RETRY_DELAYS_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

#[derive(Debug)]
enum Job {
    Write { key: String, body: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

/// Sending side of the document queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    tx: mpsc::UnboundedSender<Job>,
}

/// Owns the writer task.
pub struct WriterHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl DocumentWriter {
    /// Start the writer task.
    pub fn spawn(blobs: Arc<dyn BlobStore>, config: DocumentWriterConfig) -> (Self, WriterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let uploader = Uploader {
            blobs,
            retry_delays: config.retry_delays.into(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_uploads.max(1))),
        };
        let task = tokio::spawn(run(uploader, rx, cancel.clone()));

        let handle = WriterHandle {
            cancel,
            task,
            shutdown_timeout: config.shutdown_timeout,
        };
        (Self { tx }, handle)
    }

    /// Queue `body` for upload under `key`. Never waits.
    pub fn enqueue(&self, key: String, body: Vec<u8>) {
        if let Err(mpsc::error::SendError(Job::Write { key, .. })) =
            self.tx.send(Job::Write { key, body })
        {
            tracing::error!(key = %key, "Document writer stopped, document dropped");
        }
    }

    /// Wait until every document queued before this call has been uploaded
    /// or given up on.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl WriterHandle {
    /// Stop accepting work, finish pending uploads and join the task.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        match tokio::time::timeout(self.shutdown_timeout, &mut self.task).await {
            Ok(Ok(())) => tracing::info!("Document writer stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Document writer task failed"),
            Err(_) => {
                self.task.abort();
                tracing::warn!(
                    timeout = ?self.shutdown_timeout,
                    "Document writer did not drain in time, pending documents dropped"
                );
            }
        }
    }
}

#[derive(Clone)]
struct Uploader {
    blobs: Arc<dyn BlobStore>,
    retry_delays: Arc<[Duration]>,
    permits: Arc<Semaphore>,
}

impl Uploader {
    async fn upload(self, key: String, body: Vec<u8>) {
        // The semaphore is never closed.
        let Ok(_permit) = self.permits.acquire().await else {
            return;
        };
        write_with_retry(self.blobs.as_ref(), &key, body, &self.retry_delays).await;
    }
}

async fn run(uploader: Uploader, mut rx: mpsc::UnboundedReceiver<Job>, cancel: CancellationToken) {
    tracing::debug!(retries = uploader.retry_delays.len(), "Document writer started");
    let mut uploads = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            job = rx.recv() => match job {
                Some(job) => dispatch(&uploader, &mut uploads, job).await,
                None => break,
            },
            _ = cancel.cancelled() => {
                rx.close();
                while let Some(job) = rx.recv().await {
                    dispatch(&uploader, &mut uploads, job).await;
                }
                break;
            }
            Some(finished) = uploads.join_next(), if !uploads.is_empty() => reap(finished),
        }
    }

    drain(&mut uploads).await;
}

async fn dispatch(uploader: &Uploader, uploads: &mut JoinSet<()>, job: Job) {
    match job {
        Job::Write { key, body } => {
            uploads.spawn(uploader.clone().upload(key, body));
        }
        Job::Flush(done) => {
            drain(uploads).await;
            let _ = done.send(());
        }
    }
}

async fn drain(uploads: &mut JoinSet<()>) {
    while let Some(finished) = uploads.join_next().await {
        reap(finished);
    }
}

fn reap(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        tracing::error!(error = %e, "Document upload task failed");
    }
}

async fn write_with_retry(blobs: &dyn BlobStore, key: &str, body: Vec<u8>, retry_delays: &[Duration]) {
    let size = body.len();

    let mut attempt = 1;
    let mut delays = retry_delays.iter();
    loop {
        match blobs.put(key, body.clone()).await {
            Ok(_) => {
                tracing::debug!(key, size, attempt, "Stored design document");
                return;
            }
            Err(e) => match delays.next() {
                Some(delay) => {
                    tracing::warn!(key, attempt, error = %e, "Document upload failed, retrying");
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::error!(key, attempts = attempt, error = %e, "Document upload failed after all retries");
                    return;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use layerhub_core::error::BlobError;

    use super::*;

    /// Fails the first `failures` puts, then stores. Puts of `broken_key`
    /// always fail.
    #[derive(Default)]
    struct FlakyBlobs {
        failures: AtomicUsize,
        broken_key: Option<String>,
        attempts: AtomicUsize,
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FlakyBlobs {
        fn failing(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicUsize::new(failures),
                ..Default::default()
            })
        }

        fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl BlobStore for FlakyBlobs {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.broken_key.as_deref() == Some(key) {
                return Err(BlobError::Backend("unavailable".into()));
            }
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(BlobError::Backend("unavailable".into()));
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(format!("mem://{key}"))
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
            self.object(key).ok_or_else(|| BlobError::NotFound(key.to_string()))
        }

        async fn delete(&self, key: &str) -> Result<(), BlobError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn fast_config(retries: usize) -> DocumentWriterConfig {
        DocumentWriterConfig {
            retry_delays: vec![Duration::from_millis(5); retries],
            max_concurrent_uploads: 4,
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn default_backoff_is_one_two_four_seconds() {
        let config = DocumentWriterConfig::default();
        assert_eq!(
            config.retry_delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(DocumentWriterConfig::with_retries(3).retry_delays, config.retry_delays);
        assert!(DocumentWriterConfig::with_retries(0).retry_delays.is_empty());
    }

    #[tokio::test]
    async fn flush_waits_for_queued_writes() {
        let blobs = FlakyBlobs::failing(0);
        let (writer, handle) = DocumentWriter::spawn(blobs.clone(), fast_config(3));

        for i in 0..3 {
            writer.enqueue(format!("temp_{i}.layerhub"), vec![i]);
        }
        writer.flush().await;

        for i in 0..3 {
            assert_eq!(blobs.object(&format!("temp_{i}.layerhub")), Some(vec![i]));
        }
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let blobs = FlakyBlobs::failing(2);
        let (writer, handle) = DocumentWriter::spawn(blobs.clone(), fast_config(3));

        writer.enqueue("proj_a.layerhub".into(), b"{}".to_vec());
        writer.flush().await;

        assert_eq!(blobs.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(blobs.object("proj_a.layerhub"), Some(b"{}".to_vec()));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn gives_up_after_last_retry() {
        let blobs = FlakyBlobs::failing(usize::MAX);
        let (writer, handle) = DocumentWriter::spawn(blobs.clone(), fast_config(2));

        writer.enqueue("temp_lost.layerhub".into(), b"{}".to_vec());
        writer.flush().await;

        assert_eq!(blobs.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(blobs.object("temp_lost.layerhub"), None);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_drains_the_queue() {
        let blobs = FlakyBlobs::failing(0);
        let (writer, handle) = DocumentWriter::spawn(blobs.clone(), fast_config(0));

        writer.enqueue("comp_a.layerhub".into(), b"a".to_vec());
        writer.enqueue("comp_b.layerhub".into(), b"b".to_vec());
        handle.shutdown().await;

        assert_eq!(blobs.object("comp_a.layerhub"), Some(b"a".to_vec()));
        assert_eq!(blobs.object("comp_b.layerhub"), Some(b"b".to_vec()));

        // The queue is closed; later documents are dropped and flush returns.
        writer.enqueue("comp_c.layerhub".into(), b"c".to_vec());
        writer.flush().await;
        assert_eq!(blobs.object("comp_c.layerhub"), None);
    }

    #[tokio::test]
    async fn failing_upload_does_not_hold_up_later_documents() {
        let blobs = Arc::new(FlakyBlobs {
            broken_key: Some("temp_down.layerhub".into()),
            ..Default::default()
        });
        let config = DocumentWriterConfig {
            retry_delays: vec![Duration::from_secs(10); 3],
            max_concurrent_uploads: 4,
            shutdown_timeout: Duration::from_millis(50),
        };
        let (writer, handle) = DocumentWriter::spawn(blobs.clone(), config);

        let start = std::time::Instant::now();
        writer.enqueue("temp_down.layerhub".into(), b"x".to_vec());
        for i in 0..50u8 {
            writer.enqueue(format!("temp_{i}.layerhub"), vec![i]);
        }
        assert!(start.elapsed() < Duration::from_millis(100));

        tokio::time::timeout(Duration::from_secs(2), async {
            while blobs.object("temp_49.layerhub").is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("later documents were stalled behind the failing upload");
        assert_eq!(blobs.object("temp_down.layerhub"), None);

        handle.shutdown().await;
    }
}
