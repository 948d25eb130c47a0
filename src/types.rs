//! Core types for lookup-progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a lookup request
///
/// `Finished` and `Failed` are terminal; once either is reached the request
/// no longer changes. `InProgress` and `PartialResult` may alternate freely
/// as the fetch subsystem posts more progress after a usable partial
/// result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Created, no work started yet
    Unstarted,
    /// The fetch subsystem is actively working the request
    InProgress,
    /// A usable but possibly incomplete result set is available
    PartialResult,
    /// Completed successfully
    Finished,
    /// Failed with an error
    Failed,
}

impl RequestStatus {
    /// True iff the status is one of the two terminal states
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Finished | RequestStatus::Failed)
    }

    /// True iff a result set is available in this status
    pub fn has_result(&self) -> bool {
        matches!(self, RequestStatus::PartialResult | RequestStatus::Finished)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestStatus::Unstarted => "unstarted",
            RequestStatus::InProgress => "in progress",
            RequestStatus::PartialResult => "partial result",
            RequestStatus::Finished => "finished",
            RequestStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Event emitted on every mutation of a lookup request
///
/// Consumers that prefer push over poll subscribe via
/// [`LookupRequest::subscribe`](crate::LookupRequest::subscribe). Events
/// are fire-and-forget; a request never waits for its subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The request moved into a named stage
    Staged {
        /// Request subject
        subject: String,
        /// New lifecycle status
        status: RequestStatus,
        /// New stage index
        stage: usize,
    },

    /// Block counters changed from a decoded progress notice
    Progress {
        /// Request subject
        subject: String,
        /// Blocks completed in the current stage
        completed: u64,
        /// Total blocks in the current stage (may be provisional)
        total: u64,
        /// Whether the total is final
        finalized: bool,
    },

    /// The fetch subsystem announced the expected size of the index file
    SizeHint {
        /// Request subject
        subject: String,
        /// Expected size in bytes
        expected_size: u64,
    },

    /// A result set (possibly incomplete) became available or grew
    PartialResult {
        /// Request subject
        subject: String,
        /// Number of entries currently in the result set
        entries: usize,
    },

    /// The request completed successfully
    Finished {
        /// Request subject
        subject: String,
    },

    /// The request failed
    Failed {
        /// Request subject
        subject: String,
        /// Rendered error message
        error: String,
    },
}

/// One-shot consistent snapshot of a request's full read surface
///
/// Built under the request's lock, so every field reflects the same
/// instant. Intended for UI layers that want a single serializable value
/// rather than a series of accessor calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Subject being looked up
    pub subject: String,

    /// Current lifecycle status
    pub status: RequestStatus,

    /// Current stage index
    pub stage: usize,

    /// Name of the current stage
    pub stage_name: String,

    /// Total number of stages
    pub stage_count: usize,

    /// Blocks completed in the current stage
    pub blocks_completed: u64,

    /// Total blocks in the current stage
    pub blocks_total: u64,

    /// Whether the block total is final
    pub blocks_finalized: bool,

    /// Expected size of the index file, if announced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_size: Option<u64>,

    /// Number of entries in the result set, if one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_len: Option<usize>,

    /// Rendered error message, if the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the request was created
    pub created_at: DateTime<Utc>,

    /// When the request reached a terminal state (None while running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Mutation counter at the time of the snapshot
    pub revision: u64,
}
