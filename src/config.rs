//! Configuration types for lookup-progress

use serde::{Deserialize, Serialize};

/// Ordered list of named phases a lookup moves through
///
/// Index 0 is the "not started" phase; a request's current stage index is
/// always a valid index into this list. The default set matches the
/// classic index-lookup pipeline (fetch the index root, page through the
/// subindex, parse it), but callers tracking a different pipeline can
/// supply their own names.
///
/// Cloning is cheap enough to hand every request its own copy; the list is
/// immutable once a request is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageSet {
    names: Vec<String>,
}

impl StageSet {
    /// Create a stage set from a list of phase names
    ///
    /// An empty list is replaced by the default set so that stage index 0
    /// always names a valid phase.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Self::default()
        } else {
            Self { names }
        }
    }

    /// Number of stages, including the initial "not started" phase
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty (never the case for constructed sets)
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the stage at `index`, if in range
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// All stage names in order
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self {
            names: vec![
                "Nothing".to_string(),
                "Fetching Index Root".to_string(),
                "Fetching Subindex".to_string(),
                "Parsing Subindex".to_string(),
            ],
        }
    }
}
