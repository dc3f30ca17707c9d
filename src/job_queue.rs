//! Generic multi-producer / multi-consumer job queue (§4.A).
//!
//! One concrete `JobQueue<T>` is instantiated per payload type — per
//! §9's redesign note, this replaces the "one generic untyped queue"
//! shape with a typed queue per stage (`JobQueue<ClaimEnvelope>` for
//! `Q_claims` and each `Q_payer[p]`, `JobQueue<Remittance>` for
//! `Q_remittance`), while keeping the teacher's `tokio::spawn`-per-task
//! concurrency idiom from `payer.rs`/`biller.rs`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::time::Instant;

pub type JobId = u64;
type BoxFuture<'a, O> = Pin<Box<dyn Future<Output = O> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Diagnostic snapshot of a job retained in the completed/failed rings.
#[derive(Debug, Clone)]
pub struct JobMeta {
    pub id: JobId,
    pub attempts: u32,
    pub max_attempts: u32,
    pub state: JobState,
    pub last_error: Option<String>,
}

struct PendingJob<T> {
    id: JobId,
    payload: T,
    attempts: u32,
    max_attempts: u32,
    not_before: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_added: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl AddOptions {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            delay: Duration::ZERO,
            max_attempts,
        }
    }
}

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const COMPLETED_RING_CAP: usize = 100;
const FAILED_RING_CAP: usize = 50;

struct Inner<T> {
    pending: VecDeque<PendingJob<T>>,
    running: usize,
    completed: VecDeque<JobMeta>,
    failed: VecDeque<JobMeta>,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            running: 0,
            completed: VecDeque::new(),
            failed: VecDeque::new(),
        }
    }
}

/// A bounded-concurrency, retrying job queue for payloads of type `T`.
///
/// `add` is always accepted, even while paused — per §9's open question,
/// `pause()` only stops the dispatcher from handing jobs to the handler,
/// it does not block producers.
pub struct JobQueue<T> {
    inner: Arc<Mutex<Inner<T>>>,
    concurrency: usize,
    retry_base: Duration,
    next_id: Arc<AtomicU64>,
    total_added: Arc<AtomicU64>,
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
    name: String,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            concurrency: self.concurrency,
            retry_base: self.retry_base,
            next_id: self.next_id.clone(),
            total_added: self.total_added.clone(),
            paused: self.paused.clone(),
            notify: self.notify.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: Send + Clone + 'static> JobQueue<T> {
    pub fn new(name: impl Into<String>, concurrency: usize) -> Self {
        Self::with_retry_base(name, concurrency, Duration::from_secs(1))
    }

    pub fn with_retry_base(name: impl Into<String>, concurrency: usize, retry_base: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            concurrency: concurrency.max(1),
            retry_base,
            next_id: Arc::new(AtomicU64::new(1)),
            total_added: Arc::new(AtomicU64::new(0)),
            paused: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a job. `add` cannot fail under normal operation (§4.A).
    pub async fn add(&self, payload: T, opts: AddOptions) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let max_attempts = if opts.max_attempts == 0 {
            DEFAULT_MAX_ATTEMPTS
        } else {
            opts.max_attempts
        };
        let not_before = Instant::now() + opts.delay;
        let job = PendingJob {
            id,
            payload,
            attempts: 0,
            max_attempts,
            not_before,
        };
        {
            let mut inner = self.inner.lock().await;
            inner.pending.push_back(job);
        }
        self.total_added.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
        id
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.pending.clear();
    }

    pub async fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().await;
        QueueStats {
            pending: inner.pending.len(),
            running: inner.running,
            completed: inner.completed.len(),
            failed: inner.failed.len(),
            total_added: self.total_added.load(Ordering::SeqCst),
        }
    }

    pub async fn completed_ring(&self) -> Vec<JobMeta> {
        self.inner.lock().await.completed.iter().cloned().collect()
    }

    pub async fn failed_ring(&self) -> Vec<JobMeta> {
        self.inner.lock().await.failed.iter().cloned().collect()
    }

    /// Registers the handler and spawns the dispatcher task. Returns a
    /// `JoinHandle` the caller may use to await shutdown after `drain`.
    ///
    /// `handler` must be cheap to clone (an `Arc`-wrapped closure is the
    /// usual shape) since the dispatcher invokes it once per job.
    pub fn process<F, Fut>(&self, handler: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let handler: Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), String>> + Send + Sync> =
            Arc::new(move |payload: T| Box::pin(handler(payload)));
        let inner = self.inner.clone();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let paused = self.paused.clone();
        let notify = self.notify.clone();
        let retry_base = self.retry_base;
        let queue_name = self.name.clone();

        tokio::spawn(async move {
            loop {
                if paused.load(Ordering::SeqCst) {
                    notify.notified().await;
                    continue;
                }

                let next = {
                    let mut guard = inner.lock().await;
                    let now = Instant::now();
                    let pos = guard
                        .pending
                        .iter()
                        .position(|job| job.not_before <= now);
                    pos.map(|idx| guard.pending.remove(idx).unwrap())
                };

                let job = match next {
                    Some(job) => job,
                    None => {
                        tokio::select! {
                            _ = notify.notified() => {}
                            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                        }
                        continue;
                    }
                };

                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                {
                    let mut guard = inner.lock().await;
                    guard.running += 1;
                }

                let inner2 = inner.clone();
                let handler2 = handler.clone();
                let notify2 = notify.clone();
                let queue_name2 = queue_name.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let PendingJob {
                        id,
                        payload,
                        mut attempts,
                        max_attempts,
                        not_before: _,
                    } = job;
                    attempts += 1;
                    // keep a copy around so a failed attempt can be requeued
                    let retry_payload = payload.clone();
                    let result = handler2(payload).await;
                    let mut guard = inner2.lock().await;
                    guard.running = guard.running.saturating_sub(1);
                    match result {
                        Ok(()) => {
                            push_ring(
                                &mut guard.completed,
                                JobMeta {
                                    id,
                                    attempts,
                                    max_attempts,
                                    state: JobState::Completed,
                                    last_error: None,
                                },
                                COMPLETED_RING_CAP,
                            );
                        }
                        Err(err) => {
                            if attempts < max_attempts {
                                let backoff = retry_base * 2u32.pow(attempts - 1);
                                tracing::warn!(
                                    queue = queue_name2.as_str(),
                                    job_id = id,
                                    attempt = attempts,
                                    error = err.as_str(),
                                    "job failed, retrying"
                                );
                                guard.pending.push_back(PendingJob {
                                    id,
                                    payload: retry_payload,
                                    attempts,
                                    max_attempts,
                                    not_before: Instant::now() + backoff,
                                });
                            } else {
                                tracing::error!(
                                    queue = queue_name2.as_str(),
                                    job_id = id,
                                    attempt = attempts,
                                    error = err.as_str(),
                                    "job permanently failed"
                                );
                                push_ring(
                                    &mut guard.failed,
                                    JobMeta {
                                        id,
                                        attempts,
                                        max_attempts,
                                        state: JobState::Failed,
                                        last_error: Some(err),
                                    },
                                    FAILED_RING_CAP,
                                );
                            }
                        }
                    }
                    drop(guard);
                    notify2.notify_one();
                });
            }
        })
    }
}

fn push_ring<M>(ring: &mut VecDeque<M>, item: M, cap: usize) {
    if ring.len() >= cap {
        ring.pop_front();
    }
    ring.push_back(item);
}
