//! The read-only request contract
//!
//! Every request variant — the atomic [`LookupRequest`] leaf and the
//! aggregating [`CompositeRequest`] — exposes the same polling surface
//! through this trait. All methods are non-mutating and safe to call from
//! any number of concurrent readers; the implementations synchronize
//! internally so each call observes one consistent snapshot.
//!
//! [`LookupRequest`]: crate::LookupRequest
//! [`CompositeRequest`]: crate::CompositeRequest

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::StageSet;
use crate::error::Error;
use crate::types::{RequestInfo, RequestStatus};

/// Shared handle to any request variant
pub type SharedRequest<T> = Arc<dyn Request<T>>;

/// Read surface every request variant provides
///
/// Progress is produced elsewhere (the fetch subsystem drives the mutating
/// surface of the concrete types); consumers only ever need this trait.
pub trait Request<T>: Send + Sync {
    /// Current lifecycle status
    fn status(&self) -> RequestStatus;

    /// True iff the request reached a terminal state (Finished or Failed)
    fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// The failure attached to this request, if it failed
    fn error(&self) -> Option<Error>;

    /// Current stage index, always within `[0, stage_count())`
    fn stage(&self) -> usize;

    /// Number of stages in this request's pipeline
    fn stage_count(&self) -> usize {
        self.stage_names().len()
    }

    /// Ordered names of the stages this request moves through
    fn stage_names(&self) -> &StageSet;

    /// Blocks completed in the current stage
    fn blocks_completed(&self) -> u64;

    /// Total blocks in the current stage (provisional until finalized)
    fn blocks_total(&self) -> u64;

    /// Whether the block total is known to be final
    fn blocks_finalized(&self) -> bool;

    /// The subject being looked up; immutable and the sole ordering key
    fn subject(&self) -> &str;

    /// Snapshot of the accumulated result set, if one exists
    fn result(&self) -> Option<BTreeSet<T>>;

    /// True iff a (possibly partial) result set is available
    fn has_result(&self) -> bool {
        self.status().has_result()
    }

    /// Child requests, or None for atomic leaves
    fn sub_requests(&self) -> Option<Vec<SharedRequest<T>>>;

    /// Monotonically increasing mutation counter
    ///
    /// Readers keep the last value they saw and compare; a changed counter
    /// means at least one mutation happened since.
    fn revision(&self) -> u64;

    /// One-shot consistent snapshot of the full read surface
    fn info(&self) -> RequestInfo;
}

/// Total order over request handles: lexicographic by subject
///
/// This is the sole sort key for building sorted displays; two requests
/// tie only when their subjects are equal strings.
pub fn cmp_by_subject<T>(a: &dyn Request<T>, b: &dyn Request<T>) -> Ordering {
    a.subject().cmp(b.subject())
}

/// Sort a list of request handles by subject
pub fn sort_by_subject<T>(requests: &mut [SharedRequest<T>]) {
    requests.sort_by(|a, b| cmp_by_subject(a.as_ref(), b.as_ref()));
}
