//! Progress-event decoder
//!
//! The fetch subsystem reports progress as terse, whitespace-delimited
//! status lines. This module tokenizes one line into a typed
//! [`FetchNotice`] and applies it to every request in a supplied group —
//! one underlying fetch can serve several logically distinct requests
//! (e.g. multiple search terms resolved from the same subindex page), so
//! the update is a broadcast, not per-request.
//!
//! Each request in the group locks independently; there is no transaction
//! across the group, so readers may observe different members updated at
//! slightly different instants.

use std::sync::Arc;

use crate::lookup::LookupRequest;

/// Literal marker the fetch subsystem appends once a block total is final
const FINALIZED_MARKER: &str = "(finalized total)";

/// One decoded progress notice
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchNotice {
    /// Content-type announcement; carries no progress information
    Mime,

    /// Expected size of the index file being fetched
    SizeHint {
        /// Expected size in bytes
        expected_size: u64,
    },

    /// Block counters for the current stage
    Progress {
        /// Blocks completed
        completed: u64,
        /// Total blocks (provisional unless finalized)
        total: u64,
        /// Whether the total is final
        finalized: bool,
    },

    /// The line did not match any known shape; ignored
    Malformed,
}

impl FetchNotice {
    /// Decode one status line from the fetch subsystem
    ///
    /// The notation is positional: token 1 selects the shape, and the
    /// payload sits at a fixed index. Lines with fewer than three tokens,
    /// and "file" lines with a missing or non-numeric size, decode to
    /// [`Malformed`](Self::Malformed). A malformed `<completed>/<total>`
    /// fraction is softer still: it degrades to `0/0` rather than
    /// discarding the whole line, since those lines are otherwise well
    /// formed.
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<&str> = text.split(' ').collect();
        if tokens.len() < 3 {
            tracing::warn!(event = %text, "progress notice too short, ignoring");
            return FetchNotice::Malformed;
        }

        match tokens[1] {
            "MIME" => FetchNotice::Mime,
            "file" => match tokens.get(3).and_then(|t| t.parse::<u64>().ok()) {
                Some(expected_size) => FetchNotice::SizeHint { expected_size },
                None => {
                    tracing::warn!(event = %text, "file notice without a size, ignoring");
                    FetchNotice::Malformed
                }
            },
            _ => {
                let (completed, total) = parse_fraction(tokens[2]);
                FetchNotice::Progress {
                    completed,
                    total,
                    finalized: text.contains(FINALIZED_MARKER),
                }
            }
        }
    }
}

/// Parse `<completed>/<total>`, degrading to `0/0` on any failure
fn parse_fraction(token: &str) -> (u64, u64) {
    let parsed: Option<(u64, u64)> = token
        .split_once('/')
        .and_then(|(completed, total)| Some((completed.parse().ok()?, total.parse().ok()?)));
    match parsed {
        Some(pair) => pair,
        None => {
            tracing::warn!(fraction = %token, "malformed progress fraction, treating as 0/0");
            (0, 0)
        }
    }
}

/// Update a group of requests with progress from one event description
///
/// The line is decoded once and the resulting notice is applied
/// identically to every request in `requests`. Status and stage are never
/// changed here; those transitions belong exclusively to the mutating
/// surface of [`LookupRequest`]. Decoding never fails toward the caller:
/// unrecognized or malformed lines are logged and dropped.
pub fn update_with_description<T: Clone + Ord>(
    requests: &[Arc<LookupRequest<T>>],
    event_description: &str,
) {
    match FetchNotice::parse(event_description) {
        FetchNotice::Mime | FetchNotice::Malformed => {}
        FetchNotice::SizeHint { expected_size } => {
            for request in requests {
                request.apply_size_hint(expected_size, event_description);
            }
        }
        FetchNotice::Progress {
            completed,
            total,
            finalized,
        } => {
            for request in requests {
                request.apply_progress(completed, total, finalized, event_description);
            }
        }
    }
}
