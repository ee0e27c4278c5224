//! Status histogram for dashboard badges.
//!
//! # Invariants
//! - Every enumerated status is present as a bucket, zero-filled if unused.
//! - Bucket order follows the enumeration order given by the caller.
//! - Artifacts without a recognized status are counted separately and never
//!   invent new buckets.

use crate::model::artifact::Artifact;
use crate::model::status::LensStatus;
use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHistogram {
    buckets: Vec<(String, usize)>,
    unrecognized: usize,
}

impl StatusHistogram {
    /// Count for one status; `0` for statuses outside the enumeration.
    pub fn get(&self, status: &str) -> usize {
        self.buckets
            .iter()
            .find(|(name, _)| name == status)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.buckets
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum over enumerated buckets.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, count)| count).sum()
    }

    /// Artifacts whose status was absent or not in the enumeration.
    pub fn unrecognized(&self) -> usize {
        self.unrecognized
    }
}

impl Serialize for StatusHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (name, count) in &self.buckets {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Counts artifacts per status over a fixed enumeration.
pub fn status_histogram<'a>(
    items: impl IntoIterator<Item = &'a Artifact>,
    statuses: &[&str],
) -> StatusHistogram {
    let mut buckets: Vec<(String, usize)> = Vec::with_capacity(statuses.len());
    for status in statuses {
        if !buckets.iter().any(|(name, _)| name == status) {
            buckets.push(((*status).to_string(), 0));
        }
    }

    let mut unrecognized = 0;
    for artifact in items {
        let bucket = artifact
            .status()
            .and_then(|status| buckets.iter_mut().find(|(name, _)| name == status));
        match bucket {
            Some((_, count)) => *count += 1,
            None => unrecognized += 1,
        }
    }

    StatusHistogram {
        buckets,
        unrecognized,
    }
}

/// Histogram over a typed status enumeration.
pub fn typed_histogram<'a, S: LensStatus>(
    items: impl IntoIterator<Item = &'a Artifact>,
) -> StatusHistogram {
    status_histogram(items, &S::names())
}
