//! Composite lookup request
//!
//! [`CompositeRequest`] aggregates an ordered list of child requests
//! behind the same [`Request`] contract, for operations that are split
//! into smaller parts (e.g. one search phrase resolved as several
//! single-term lookups). It stores no progress of its own; status, stage
//! and counters are derived from the children on every read.
//!
//! Children lock independently, so a composite read is not a transaction
//! across them; two children may be observed at slightly different
//! instants. Per-child snapshots are still individually consistent.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::config::StageSet;
use crate::error::Error;
use crate::request::{Request, SharedRequest};
use crate::types::{RequestInfo, RequestStatus};

/// A request decomposed into child requests, with derived progress
///
/// Aggregation policy:
/// - Failed if any child failed (the first failing child's error wins)
/// - Finished only when every child is finished and none failed
/// - PartialResult if any child has a usable result
/// - InProgress if any child has left Unstarted
/// - Unstarted otherwise (including the empty composite)
///
/// Block counters are summed across children; the total counts as
/// finalized only once every child's total is. The reported stage is the
/// furthest-behind child's stage. The result is the union of child
/// results.
pub struct CompositeRequest<T> {
    subject: String,
    stages: StageSet,
    created_at: DateTime<Utc>,
    children: Vec<SharedRequest<T>>,
}

impl<T> CompositeRequest<T> {
    /// Create a composite over an ordered list of child handles
    ///
    /// The stage names are taken from the first child (children of one
    /// composite are expected to share a pipeline); an empty composite
    /// falls back to the default stage set.
    pub fn new(subject: impl Into<String>, children: Vec<SharedRequest<T>>) -> Self {
        let stages = children
            .first()
            .map(|child| child.stage_names().clone())
            .unwrap_or_default();
        Self {
            subject: subject.into(),
            stages,
            created_at: Utc::now(),
            children,
        }
    }

    /// Number of child requests
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True iff the composite has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// When this composite was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<T: Clone + Ord + Send + Sync> Request<T> for CompositeRequest<T> {
    fn status(&self) -> RequestStatus {
        let mut any_result = false;
        let mut any_started = false;
        let mut all_finished = !self.children.is_empty();

        for child in &self.children {
            match child.status() {
                RequestStatus::Failed => return RequestStatus::Failed,
                RequestStatus::Finished => {
                    any_result = true;
                    any_started = true;
                }
                RequestStatus::PartialResult => {
                    any_result = true;
                    any_started = true;
                    all_finished = false;
                }
                RequestStatus::InProgress => {
                    any_started = true;
                    all_finished = false;
                }
                RequestStatus::Unstarted => {
                    all_finished = false;
                }
            }
        }

        if all_finished {
            RequestStatus::Finished
        } else if any_result {
            RequestStatus::PartialResult
        } else if any_started {
            RequestStatus::InProgress
        } else {
            RequestStatus::Unstarted
        }
    }

    fn error(&self) -> Option<Error> {
        self.children.iter().find_map(|child| child.error())
    }

    fn stage(&self) -> usize {
        let min_stage = self
            .children
            .iter()
            .map(|child| child.stage())
            .min()
            .unwrap_or(0);
        // Children may carry a longer pipeline than the first child's;
        // keep the reported stage a valid index into our stage names.
        min_stage.min(self.stages.len().saturating_sub(1))
    }

    fn stage_names(&self) -> &StageSet {
        &self.stages
    }

    fn blocks_completed(&self) -> u64 {
        self.children
            .iter()
            .fold(0, |sum, child| sum.saturating_add(child.blocks_completed()))
    }

    fn blocks_total(&self) -> u64 {
        self.children
            .iter()
            .fold(0, |sum, child| sum.saturating_add(child.blocks_total()))
    }

    fn blocks_finalized(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|child| child.blocks_finalized())
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn result(&self) -> Option<BTreeSet<T>> {
        let mut union: Option<BTreeSet<T>> = None;
        for child in &self.children {
            if let Some(entries) = child.result() {
                union.get_or_insert_with(BTreeSet::new).extend(entries);
            }
        }
        union
    }

    fn sub_requests(&self) -> Option<Vec<SharedRequest<T>>> {
        Some(self.children.clone())
    }

    fn revision(&self) -> u64 {
        // Children's counters are monotonic, so the sum is too.
        self.children
            .iter()
            .fold(0, |sum, child| sum.saturating_add(child.revision()))
    }

    fn info(&self) -> RequestInfo {
        let status = self.status();
        let stage = self.stage();
        let finished_at = if status.is_terminal() {
            self.children
                .iter()
                .filter_map(|child| child.info().finished_at)
                .max()
        } else {
            None
        };
        RequestInfo {
            subject: self.subject.clone(),
            status,
            stage,
            stage_name: self.stages.name(stage).unwrap_or_default().to_string(),
            stage_count: self.stages.len(),
            blocks_completed: self.blocks_completed(),
            blocks_total: self.blocks_total(),
            blocks_finalized: self.blocks_finalized(),
            expected_size: None,
            result_len: self.result().map(|set| set.len()),
            error: self.error().map(|err| err.to_string()),
            created_at: self.created_at,
            finished_at,
            revision: self.revision(),
        }
    }
}

/// Requests compare by subject; it is the sole ordering key
impl<T> PartialEq for CompositeRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
    }
}

impl<T> Eq for CompositeRequest<T> {}

impl<T> PartialOrd for CompositeRequest<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for CompositeRequest<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.subject.cmp(&other.subject)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupRequest;
    use std::sync::Arc;

    fn leaves(subjects: &[&str]) -> (Vec<Arc<LookupRequest<String>>>, CompositeRequest<String>) {
        let leaves: Vec<Arc<LookupRequest<String>>> = subjects
            .iter()
            .map(|s| Arc::new(LookupRequest::new(*s)))
            .collect();
        let children: Vec<SharedRequest<String>> = leaves
            .iter()
            .map(|leaf| Arc::clone(leaf) as SharedRequest<String>)
            .collect();
        let composite = CompositeRequest::new("phrase", children);
        (leaves, composite)
    }

    #[test]
    fn empty_composite_is_unstarted() {
        let composite: CompositeRequest<String> = CompositeRequest::new("empty", Vec::new());
        assert_eq!(composite.status(), RequestStatus::Unstarted);
        assert!(!composite.blocks_finalized());
        assert_eq!(composite.stage(), 0);
        assert!(composite.result().is_none());
        assert!(composite.is_empty());
    }

    #[test]
    fn fresh_children_leave_composite_unstarted() {
        let (_, composite) = leaves(&["a", "b"]);
        assert_eq!(composite.status(), RequestStatus::Unstarted);
    }

    #[test]
    fn one_started_child_makes_composite_in_progress() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_stage(RequestStatus::InProgress, 1);
        assert_eq!(composite.status(), RequestStatus::InProgress);
    }

    #[test]
    fn any_child_result_makes_composite_partial() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_stage(RequestStatus::InProgress, 1);
        leaves[1].set_result(std::iter::once("hit".to_string()).collect());

        assert_eq!(composite.status(), RequestStatus::PartialResult);
        assert!(composite.has_result());
    }

    #[test]
    fn finished_only_when_every_child_finished() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_finished();
        assert_ne!(
            composite.status(),
            RequestStatus::Finished,
            "one unfinished child must hold the composite open"
        );

        leaves[1].set_finished();
        assert_eq!(composite.status(), RequestStatus::Finished);
        assert!(composite.is_finished());
    }

    #[test]
    fn any_failed_child_fails_the_composite_with_first_error() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_finished();
        leaves[1].set_error(Error::Fetch("subindex gone".into()));

        assert_eq!(composite.status(), RequestStatus::Failed);
        assert_eq!(composite.error(), Some(Error::Fetch("subindex gone".into())));
        assert!(composite.is_finished());
    }

    #[test]
    fn counters_are_summed_and_finalized_requires_all_children() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].apply_progress(10, 100, true, "x y 10/100 (finalized total)");
        leaves[1].apply_progress(5, 50, false, "x y 5/50");

        assert_eq!(composite.blocks_completed(), 15);
        assert_eq!(composite.blocks_total(), 150);
        assert!(
            !composite.blocks_finalized(),
            "one provisional child total keeps the sum provisional"
        );

        leaves[1].apply_progress(5, 50, true, "x y 5/50 (finalized total)");
        assert!(composite.blocks_finalized());
    }

    #[test]
    fn stage_is_the_furthest_behind_child() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_stage(RequestStatus::InProgress, 3);
        leaves[1].set_stage(RequestStatus::InProgress, 1);

        assert_eq!(composite.stage(), 1);
        assert!(composite.stage() < composite.stage_count());
    }

    #[test]
    fn result_is_the_union_of_child_results() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_result(["x".to_string(), "y".to_string()].into_iter().collect());
        leaves[1].set_result(["y".to_string(), "z".to_string()].into_iter().collect());

        let union = composite.result().unwrap();
        assert_eq!(union.len(), 3, "duplicate entries must collapse in the union");
        assert!(union.contains("x") && union.contains("y") && union.contains("z"));
    }

    #[test]
    fn sub_requests_exposes_children_in_order() {
        let (_, composite) = leaves(&["first", "second"]);
        let children = composite.sub_requests().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].subject(), "first");
        assert_eq!(children[1].subject(), "second");
    }

    #[test]
    fn revision_grows_with_child_mutations() {
        let (leaves, composite) = leaves(&["a", "b"]);
        let before = composite.revision();
        leaves[0].set_stage(RequestStatus::InProgress, 1);
        leaves[1].add_result("hit".to_string());
        assert!(composite.revision() > before);
    }

    #[test]
    fn info_reports_aggregate_state() {
        let (leaves, composite) = leaves(&["a", "b"]);
        leaves[0].set_result(std::iter::once("hit".to_string()).collect());
        leaves[0].set_finished();
        leaves[1].set_finished();

        let info = composite.info();
        assert_eq!(info.subject, "phrase");
        assert_eq!(info.status, RequestStatus::Finished);
        assert_eq!(info.result_len, Some(1));
        assert!(
            info.finished_at.is_some(),
            "terminal composite should surface the latest child finish time"
        );
    }
}
