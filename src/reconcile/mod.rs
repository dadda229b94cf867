//! Reconciliation of candidate addresses against mapped data.
//!
//! A run derives one working region from the batch, builds a
//! [`ReferenceIndex`](crate::index::ReferenceIndex) for it and then
//! classifies every record as kept, suppressed or flagged. Geodata lookups
//! are memoized per run and stop as soon as the [`CancelToken`] is set.

mod bounds;
mod engine;
mod lookup;
mod report;

pub use bounds::working_region;
pub use engine::{Outcome, Reconciler};
pub use lookup::{CancelToken, Lookups};
pub use report::{FileSummary, RunReport};
