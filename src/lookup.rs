//! Atomic lookup request
//!
//! [`LookupRequest`] is the concrete request for an operation that is not
//! split into smaller parts, e.g. a lookup for one term against one index.
//! It owns the state machine: the fetch subsystem drives it through the
//! mutating surface while any number of readers poll it through the
//! [`Request`] contract.
//!
//! # Concurrency
//!
//! All mutable fields live behind one `RwLock`, so every mutating operation
//! is a single atomic transition and every accessor observes one consistent
//! snapshot. The request performs no blocking operations beyond lock
//! acquisition and owns no threads.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::config::StageSet;
use crate::error::Error;
use crate::request::{Request, SharedRequest};
use crate::types::{Event, RequestInfo, RequestStatus};

/// Capacity of the per-request event channel
///
/// Slow subscribers that fall more than this many events behind observe a
/// lag error on their receiver; the request itself never waits for them.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Mutable state, guarded as one unit so readers never see a torn view
#[derive(Debug)]
struct Inner<T> {
    status: RequestStatus,
    stage: usize,
    blocks_completed: u64,
    blocks_total: u64,
    blocks_finalized: bool,
    expected_size: Option<u64>,
    last_event: Option<String>,
    error: Option<Error>,
    result: Option<BTreeSet<T>>,
    finished_at: Option<DateTime<Utc>>,
}

/// A request for an operation which isn't split into smaller parts
///
/// Created `Unstarted` with empty progress; the owning fetch logic moves it
/// through stages with [`set_stage`](Self::set_stage), posts results with
/// [`set_result`](Self::set_result)/[`add_result`](Self::add_result), and
/// ends it with [`set_finished`](Self::set_finished) or
/// [`set_error`](Self::set_error). Block counters are fed by the
/// progress-event decoder in [`decoder`](crate::decoder).
///
/// `Finished` and `Failed` are terminal by contract: the fetch subsystem
/// must not mutate a request after ending it. No runtime check enforces
/// this; a violation is a caller bug.
#[derive(Debug)]
pub struct LookupRequest<T> {
    subject: String,
    stages: StageSet,
    created_at: DateTime<Utc>,
    revision: AtomicU64,
    events: broadcast::Sender<Event>,
    inner: RwLock<Inner<T>>,
}

impl<T: Clone + Ord> LookupRequest<T> {
    /// Create an unstarted request for `subject` with the default stage set
    pub fn new(subject: impl Into<String>) -> Self {
        Self::with_stages(subject, StageSet::default())
    }

    /// Create an unstarted request with a custom stage pipeline
    pub fn with_stages(subject: impl Into<String>, stages: StageSet) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            subject: subject.into(),
            stages,
            created_at: Utc::now(),
            revision: AtomicU64::new(0),
            events,
            inner: RwLock::new(Inner {
                status: RequestStatus::Unstarted,
                stage: 0,
                blocks_completed: 0,
                blocks_total: 0,
                blocks_finalized: false,
                expected_size: None,
                last_event: None,
                error: None,
                result: None,
                finished_at: None,
            }),
        }
    }

    /// Subscribe to the events this request emits on every mutation
    ///
    /// Sending is fire-and-forget: the request never waits for subscribers
    /// and having none is not an error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Overwrite status and stage to announce movement into a new phase
    ///
    /// No monotonicity validation is performed; the owning fetch logic is
    /// trusted to supply a stage index that is valid for this request's
    /// stage set.
    pub fn set_stage(&self, status: RequestStatus, stage: usize) {
        debug_assert!(stage < self.stages.len(), "stage index out of range");
        {
            let mut inner = self.write();
            inner.status = status;
            inner.stage = stage;
            if status.is_terminal() && inner.finished_at.is_none() {
                inner.finished_at = Some(Utc::now());
            }
            self.bump_revision();
        }
        tracing::debug!(subject = %self.subject, ?status, stage, "request staged");
        self.emit(Event::Staged {
            subject: self.subject.clone(),
            status,
            stage,
        });
    }

    /// Replace the result set wholesale and mark the request PartialResult
    ///
    /// Use when the fetch subsystem recomputes results rather than
    /// appending; call [`set_finished`](Self::set_finished) once no more
    /// will arrive.
    pub fn set_result(&self, result: BTreeSet<T>) {
        let entries = result.len();
        {
            let mut inner = self.write();
            inner.status = RequestStatus::PartialResult;
            inner.result = Some(result);
            self.bump_revision();
        }
        self.emit(Event::PartialResult {
            subject: self.subject.clone(),
            entries,
        });
    }

    /// Append one entry to the result set and mark the request PartialResult
    ///
    /// A backing set is created on first use, so calling this before any
    /// [`set_result`](Self::set_result) is safe.
    pub fn add_result(&self, entry: T) {
        let entries;
        {
            let mut inner = self.write();
            let set = inner.result.get_or_insert_with(BTreeSet::new);
            set.insert(entry);
            entries = set.len();
            inner.status = RequestStatus::PartialResult;
            self.bump_revision();
        }
        self.emit(Event::PartialResult {
            subject: self.subject.clone(),
            entries,
        });
    }

    /// Mark the request Finished
    ///
    /// Stage, progress counters and any stored result are left untouched.
    pub fn set_finished(&self) {
        {
            let mut inner = self.write();
            inner.status = RequestStatus::Finished;
            if inner.finished_at.is_none() {
                inner.finished_at = Some(Utc::now());
            }
            self.bump_revision();
        }
        tracing::debug!(subject = %self.subject, "request finished");
        self.emit(Event::Finished {
            subject: self.subject.clone(),
        });
    }

    /// Record a failure and mark the request Failed
    ///
    /// A partial result collected before the failure is kept, so consumers
    /// can still display whatever was found.
    pub fn set_error(&self, error: Error) {
        let rendered = error.to_string();
        {
            let mut inner = self.write();
            inner.error = Some(error);
            inner.status = RequestStatus::Failed;
            if inner.finished_at.is_none() {
                inner.finished_at = Some(Utc::now());
            }
            self.bump_revision();
        }
        tracing::debug!(subject = %self.subject, error = %rendered, "request failed");
        self.emit(Event::Failed {
            subject: self.subject.clone(),
            error: rendered,
        });
    }

    /// Expected size of the index file, if the fetch subsystem announced one
    ///
    /// Best-effort hint from a "file" progress notice; not reflected in the
    /// block counters.
    pub fn expected_size(&self) -> Option<u64> {
        self.read().expected_size
    }

    /// Raw text of the last progress notice applied to this request
    pub fn last_event(&self) -> Option<String> {
        self.read().last_event.clone()
    }

    /// When this request was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When this request reached a terminal state, or None while running
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.read().finished_at
    }

    /// True iff any mutation happened since the revision `last` was read
    pub fn changed_since(&self, last: u64) -> bool {
        self.revision.load(Ordering::SeqCst) != last
    }

    /// Apply a decoded progress notice to the block counters
    ///
    /// Once the total has been finalized it is frozen: later notices update
    /// the completed count only. Status and stage are never touched here.
    pub(crate) fn apply_progress(&self, completed: u64, total: u64, finalized: bool, raw: &str) {
        let (completed, total, finalized) = {
            let mut inner = self.write();
            inner.last_event = Some(raw.to_owned());
            inner.blocks_completed = completed;
            if !inner.blocks_finalized {
                inner.blocks_total = total;
                inner.blocks_finalized = finalized;
            }
            self.bump_revision();
            (
                inner.blocks_completed,
                inner.blocks_total,
                inner.blocks_finalized,
            )
        };
        self.emit(Event::Progress {
            subject: self.subject.clone(),
            completed,
            total,
            finalized,
        });
    }

    /// Record the expected-size hint from a "file" notice
    pub(crate) fn apply_size_hint(&self, expected_size: u64, raw: &str) {
        {
            let mut inner = self.write();
            inner.last_event = Some(raw.to_owned());
            inner.expected_size = Some(expected_size);
            self.bump_revision();
        }
        self.emit(Event::SizeHint {
            subject: self.subject.clone(),
            expected_size,
        });
    }

    fn emit(&self, event: Event) {
        // No receivers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Ord + Send + Sync> Request<T> for LookupRequest<T> {
    fn status(&self) -> RequestStatus {
        self.read().status
    }

    fn error(&self) -> Option<Error> {
        self.read().error.clone()
    }

    fn stage(&self) -> usize {
        self.read().stage
    }

    fn stage_names(&self) -> &StageSet {
        &self.stages
    }

    fn blocks_completed(&self) -> u64 {
        self.read().blocks_completed
    }

    fn blocks_total(&self) -> u64 {
        self.read().blocks_total
    }

    fn blocks_finalized(&self) -> bool {
        self.read().blocks_finalized
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn result(&self) -> Option<BTreeSet<T>> {
        self.read().result.clone()
    }

    fn sub_requests(&self) -> Option<Vec<SharedRequest<T>>> {
        None
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn info(&self) -> RequestInfo {
        let inner = self.read();
        RequestInfo {
            subject: self.subject.clone(),
            status: inner.status,
            stage: inner.stage,
            stage_name: self
                .stages
                .name(inner.stage)
                .unwrap_or_default()
                .to_string(),
            stage_count: self.stages.len(),
            blocks_completed: inner.blocks_completed,
            blocks_total: inner.blocks_total,
            blocks_finalized: inner.blocks_finalized,
            expected_size: inner.expected_size,
            result_len: inner.result.as_ref().map(BTreeSet::len),
            error: inner.error.as_ref().map(ToString::to_string),
            created_at: self.created_at,
            finished_at: inner.finished_at,
            revision: self.revision.load(Ordering::SeqCst),
        }
    }
}

/// Logging/debugging rendering; not a stable wire format
impl<T: Clone + Ord> std::fmt::Display for LookupRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        write!(
            f,
            "Request subject={} status={} event={} stage={} progress={}",
            self.subject,
            inner.status,
            inner.last_event.as_deref().unwrap_or("none"),
            inner.stage,
            inner.blocks_completed,
        )
    }
}

/// Requests compare by subject; it is the sole ordering key
impl<T> PartialEq for LookupRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
    }
}

impl<T> Eq for LookupRequest<T> {}

impl<T> PartialOrd for LookupRequest<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for LookupRequest<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.subject.cmp(&other.subject)
    }
}
