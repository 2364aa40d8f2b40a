use crate::collab::engine::MergeEngine;
use crate::db::dbdocs::Db;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Where a session's flattened text goes on flush.
pub enum FlushTarget {
    /// Demo mode and file-manifest rooms: nothing durable to write.
    None,
    /// Legacy document row, keyed by the opaque document id.
    Document { db: Arc<Db>, document_id: String },
    /// Content column of a project file row.
    File { db: Arc<Db>, file_id: Uuid },
    #[cfg(test)]
    Capture(Arc<testutil::CaptureSink>),
}

/// Debounced persistence for one session.
///
/// `notify_mutated` (re)arms a quiet-period timer; when it expires with no
/// further mutation, one upsert writes the current text. A burst of edits
/// collapses into a single write, a failed write is retried by the next
/// mutation's cycle, and an idle room generates no I/O.
#[derive(Clone)]
pub struct Flusher {
    inner: Arc<FlusherInner>,
}

struct FlusherInner {
    engine: Arc<dyn MergeEngine>,
    target: FlushTarget,
    quiet: Duration,
    /// Bumped on every mutation.
    generation: AtomicU64,
    /// Generation covered by the last successful write.
    flushed: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Flusher {
    pub fn new(engine: Arc<dyn MergeEngine>, target: FlushTarget, quiet: Duration) -> Self {
        Self {
            inner: Arc::new(FlusherInner {
                engine,
                target,
                quiet,
                generation: AtomicU64::new(0),
                flushed: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Record a state mutation and (re)arm the quiet-period timer.
    pub async fn notify_mutated(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let mut pending = self.inner.pending.lock().await;
        // Re-arming cancels the pending timer only; a flush that already
        // started writing runs to completion in its own task.
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet).await;
            let inner = Arc::clone(&inner);
            tokio::spawn(async move { inner.flush(generation).await });
        }));
    }

    /// Whether mutations have arrived since the last successful write.
    pub fn is_dirty(&self) -> bool {
        self.inner.flushed.load(Ordering::SeqCst) < self.inner.generation.load(Ordering::SeqCst)
    }
}

impl FlusherInner {
    async fn flush(&self, generation: u64) {
        if self.flushed.load(Ordering::SeqCst) >= generation {
            return;
        }
        let text = self.engine.current_text();
        let written = match &self.target {
            FlushTarget::None => true,
            FlushTarget::Document { db, document_id } => {
                match db.upsert_document(document_id, &text).await {
                    Ok(_) => {
                        info!("Flushed document '{}' ({} chars)", document_id, text.chars().count());
                        true
                    }
                    Err(e) => {
                        error!("Failed to flush document '{}': {}", document_id, e);
                        false
                    }
                }
            }
            FlushTarget::File { db, file_id } => {
                match db.update_file_content(*file_id, &text).await {
                    Ok(true) => {
                        info!("Flushed file '{}' ({} chars)", file_id, text.chars().count());
                        true
                    }
                    Ok(false) => {
                        // Row was deleted out from under the session. Nothing
                        // left to persist into.
                        debug!("File row '{}' no longer exists, skipping flush", file_id);
                        true
                    }
                    Err(e) => {
                        error!("Failed to flush file '{}': {}", file_id, e);
                        false
                    }
                }
            }
            #[cfg(test)]
            FlushTarget::Capture(sink) => sink.write(&text),
        };
        if written {
            // A mutation may have landed mid-write; only mark what this
            // write actually covered so the next cycle picks up the rest.
            self.flushed.fetch_max(generation, Ordering::SeqCst);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::CaptureSink;
    use super::*;
    use crate::collab::engine::testutil::FakeEngine;
    use std::sync::atomic::Ordering as AtomicOrdering;

    const QUIET: Duration = Duration::from_millis(100);

    fn setup() -> (Arc<FakeEngine>, Arc<CaptureSink>, Flusher) {
        let engine = Arc::new(FakeEngine::new());
        let sink = Arc::new(CaptureSink::default());
        let flusher = Flusher::new(
            engine.clone(),
            FlushTarget::Capture(sink.clone()),
            QUIET,
        );
        (engine, sink, flusher)
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_produces_exactly_one_write() {
        let (engine, sink, flusher) = setup();
        engine.apply_remote_update(b"hello").unwrap();
        flusher.notify_mutated().await;

        tokio::time::sleep(QUIET * 3).await;
        assert_eq!(sink.written(), vec!["hello".to_string()]);
        assert!(!flusher.is_dirty());

        // No further mutation, no further I/O.
        tokio::time::sleep(QUIET * 10).await;
        assert_eq!(sink.attempts.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_write_with_final_state() {
        let (engine, sink, flusher) = setup();
        for update in [&b"a"[..], b"b", b"c"] {
            engine.apply_remote_update(update).unwrap();
            flusher.notify_mutated().await;
            tokio::time::sleep(QUIET / 4).await;
        }

        tokio::time::sleep(QUIET * 3).await;
        // One write, containing the state after the last mutation.
        assert_eq!(sink.written(), vec!["abc".to_string()]);
        assert_eq!(sink.attempts.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_retries_on_next_cycle() {
        let (engine, sink, flusher) = setup();
        sink.fail_next.store(true, AtomicOrdering::SeqCst);

        engine.apply_remote_update(b"first").unwrap();
        flusher.notify_mutated().await;
        tokio::time::sleep(QUIET * 3).await;
        assert!(sink.written().is_empty());
        assert!(flusher.is_dirty());

        // The next mutation's cycle carries the retry.
        engine.apply_remote_update(b"second").unwrap();
        flusher.notify_mutated().await;
        tokio::time::sleep(QUIET * 3).await;
        assert_eq!(sink.written(), vec!["firstsecond".to_string()]);
        assert!(!flusher.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn none_target_marks_clean_without_io() {
        let (engine, _, _) = setup();
        let flusher = Flusher::new(engine.clone(), FlushTarget::None, QUIET);
        engine.apply_remote_update(b"x").unwrap();
        flusher.notify_mutated().await;
        tokio::time::sleep(QUIET * 3).await;
        assert!(!flusher.is_dirty());
    }
}
