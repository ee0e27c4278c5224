//! Read-only summaries over an artifact snapshot.
//!
//! # Responsibility
//! - Compute dashboard figures (status counts, groups, progress, totals).
//! - Stay pure: no I/O, no mutation of the input collection.
//!
//! # Invariants
//! - Helpers never panic on missing or malformed `data` fields; absent
//!   values read as empty/zero.

pub mod dates;
pub mod filter;
pub mod group;
pub mod histogram;
pub mod order;
pub mod progress;

pub use dates::{days_until_clamped, days_until_signed, is_overdue, parse_day};
pub use filter::ArtifactFilter;
pub use group::{group_by, group_by_field};
pub use histogram::{status_histogram, typed_histogram, StatusHistogram};
pub use order::{move_item, step_index, step_reached};
pub use progress::{completion_ratio, percent, percent_of_fields, percent_of_max, sum_field};
