//! Per-type status enumerations.
//!
//! # Responsibility
//! - Give each artifact type a closed set of status values.
//! - Expose the canonical ordering used by progress steppers.
//!
//! # Invariants
//! - No transition graph is enforced: any status may follow any other.
//! - `PROGRESSION` is a display ordering only and may omit terminal
//!   side-branches (e.g. `denied`, `cancelled`).

use std::fmt::Debug;

/// Closed status enumeration for one artifact type.
pub trait LensStatus: Copy + Eq + Debug + Send + Sync + 'static {
    /// Every valid value, in dashboard display order.
    const ALL: &'static [Self];
    /// Canonical happy-path ordering rendered by the stepper.
    const PROGRESSION: &'static [Self];

    /// Stable wire string.
    fn as_str(self) -> &'static str;

    /// Exact wire-string match; padded or re-cased input is rejected.
    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == value)
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|status| status.as_str()).collect()
    }

    /// Position on the progression, `None` for off-path statuses.
    fn step_index(self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|step| *step == self)
    }
}

/// Type-erased view of a status enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    values: Vec<&'static str>,
    progression: Vec<&'static str>,
}

impl StatusSet {
    pub fn of<S: LensStatus>() -> Self {
        Self {
            values: S::names(),
            progression: S::PROGRESSION.iter().map(|status| status.as_str()).collect(),
        }
    }

    pub fn values(&self) -> &[&'static str] {
        &self.values
    }

    pub fn progression(&self) -> &[&'static str] {
        &self.progression
    }

    pub fn contains(&self, status: &str) -> bool {
        self.values.contains(&status)
    }

    /// Default status for newly created rows.
    pub fn initial(&self) -> Option<&'static str> {
        self.values.first().copied()
    }
}

/// Declares a status enum with wire names and a stepper progression.
macro_rules! lens_status {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
        progression: [$($step:ident),* $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $crate::model::status::LensStatus for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
            const PROGRESSION: &'static [Self] = &[$(Self::$step),*];

            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::model::status::LensStatus::as_str(*self))
            }
        }
    };
}

pub(crate) use lens_status;

#[cfg(test)]
mod tests {
    use super::{LensStatus, StatusSet};

    lens_status! {
        enum Light {
            Red => "red",
            Amber => "amber",
            Green => "green",
            Broken => "broken",
        }
        progression: [Red, Amber, Green]
    }

    #[test]
    fn parse_accepts_wire_names_only() {
        assert_eq!(Light::parse("amber"), Some(Light::Amber));
        assert_eq!(Light::parse(" amber "), None);
        assert_eq!(Light::parse("Amber"), None);
        assert_eq!(Light::Green.to_string(), "green");
    }

    #[test]
    fn off_path_status_has_no_step() {
        assert_eq!(Light::Green.step_index(), Some(2));
        assert_eq!(Light::Broken.step_index(), None);
    }

    #[test]
    fn status_set_mirrors_enum() {
        let set = StatusSet::of::<Light>();
        assert_eq!(set.values(), ["red", "amber", "green", "broken"]);
        assert_eq!(set.progression(), ["red", "amber", "green"]);
        assert!(set.contains("broken"));
        assert!(!set.contains(" broken "));
        assert_eq!(set.initial(), Some("red"));
    }
}
