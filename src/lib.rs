//! # lookup-progress
//!
//! Progress-tracking library for long-running, multi-stage lookups against
//! distributed content stores.
//!
//! Callers issue a request identified by a subject key and hand it to
//! their fetch subsystem. The fetch subsystem drives the request through
//! named stages, posts (partial) results, and pushes terse progress lines
//! into the decoder; any number of readers — UI widgets, orchestration
//! logic — poll the request concurrently through the read-only [`Request`]
//! contract without ever blocking the underlying operation. The library
//! performs no I/O and owns no threads; it is a pure state-aggregation
//! layer between an event source and its consumers.
//!
//! ## Design Philosophy
//!
//! - **Poll or subscribe** - Every accessor returns a consistent snapshot;
//!   push-minded consumers can subscribe to per-request events instead
//! - **Fail-soft decoding** - Malformed progress lines degrade or are
//!   dropped, never surfaced as request failures
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use lookup_progress::{LookupRequest, Request, RequestStatus, update_with_description};
//!
//! // One underlying fetch serving two search terms
//! let rust = Arc::new(LookupRequest::<String>::new("rust"));
//! let tokio = Arc::new(LookupRequest::<String>::new("tokio"));
//! let group = vec![Arc::clone(&rust), Arc::clone(&tokio)];
//!
//! // The fetch subsystem announces a stage and pushes progress lines
//! rust.set_stage(RequestStatus::InProgress, 1);
//! update_with_description(&group, "state transferring 10/100");
//!
//! // Readers poll at any time
//! assert_eq!(rust.blocks_completed(), 10);
//! assert_eq!(tokio.blocks_total(), 100);
//!
//! // Results may land before the request finishes
//! rust.add_result("crates.io/rust".to_string());
//! assert!(rust.has_result());
//! rust.set_finished();
//! assert!(rust.is_finished());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Composite requests aggregating child requests
pub mod composite;
/// Configuration types
pub mod config;
/// Progress-event decoding and broadcast updates
pub mod decoder;
/// Error types
pub mod error;
/// Atomic lookup requests
pub mod lookup;
/// The read-only request contract
pub mod request;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use composite::CompositeRequest;
pub use config::StageSet;
pub use decoder::{FetchNotice, update_with_description};
pub use error::{Error, Result};
pub use lookup::LookupRequest;
pub use request::{Request, SharedRequest, cmp_by_subject, sort_by_subject};
pub use types::{Event, RequestInfo, RequestStatus};
