//! Goals lens: goals with checklist subtasks and derived progress.
//!
//! # Invariants
//! - `progress` is `done / total` over subtasks, rounded to two decimals,
//!   and `0.0` when the checklist is empty.
//! - Every subtask mutation recomputes `progress` before returning.

use crate::derive::dates::days_until_clamped;
use crate::derive::order::move_item;
use crate::derive::progress::completion_ratio;
use crate::model::status::lens_status;
use crate::schema::ArtifactKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goal;

impl ArtifactKind for Goal {
    const DOMAIN: &'static str = "goals";
    const TYPE_NAME: &'static str = "Goal";
    type Data = GoalData;
    type Status = GoalStatus;
}

lens_status! {
    pub enum GoalStatus {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        Abandoned => "abandoned",
    }
    progression: [NotStarted, InProgress, Completed]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Subtask {
    pub title: String,
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalData {
    /// Fraction in `[0, 1]`.
    #[serde(deserialize_with = "crate::schema::lenient::number")]
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    pub subtasks: Vec<Subtask>,
}

impl GoalData {
    pub fn with_subtasks<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = Self {
            subtasks: titles
                .into_iter()
                .map(|title| Subtask {
                    title: title.into(),
                    done: false,
                })
                .collect(),
            ..Self::default()
        };
        data.recompute_progress();
        data
    }

    pub fn add_subtask(&mut self, title: impl Into<String>) {
        self.subtasks.push(Subtask {
            title: title.into(),
            done: false,
        });
        self.recompute_progress();
    }

    /// Flips one subtask. Returns `false` for an out-of-range index.
    pub fn toggle_subtask(&mut self, index: usize) -> bool {
        let Some(subtask) = self.subtasks.get_mut(index) else {
            return false;
        };
        subtask.done = !subtask.done;
        self.recompute_progress();
        true
    }

    /// Drag-and-reorder of the checklist.
    pub fn reorder_subtasks(&mut self, from: usize, to: usize) -> bool {
        move_item(&mut self.subtasks, from, to)
    }

    pub fn remove_subtask(&mut self, index: usize) -> Option<Subtask> {
        if index >= self.subtasks.len() {
            return None;
        }
        let removed = self.subtasks.remove(index);
        self.recompute_progress();
        Some(removed)
    }

    pub fn recompute_progress(&mut self) -> f64 {
        let done = self.subtasks.iter().filter(|subtask| subtask.done).count();
        self.progress = completion_ratio(done, self.subtasks.len());
        self.progress
    }

    /// Countdown to the target date; `0` once it has passed.
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.target_date
            .as_deref()
            .and_then(|date| days_until_clamped(date, today))
    }
}

#[cfg(test)]
mod tests {
    use super::GoalData;
    use chrono::NaiveDate;

    #[test]
    fn toggling_two_of_three_yields_two_thirds() {
        let mut goal = GoalData::with_subtasks(["draft", "review", "publish"]);
        assert_eq!(goal.progress, 0.0);

        assert!(goal.toggle_subtask(0));
        assert!(goal.toggle_subtask(2));
        assert_eq!(goal.progress, 0.67);

        assert!(goal.toggle_subtask(0));
        assert_eq!(goal.progress, 0.33);
        assert!(!goal.toggle_subtask(9));
    }

    #[test]
    fn reorder_keeps_progress() {
        let mut goal = GoalData::with_subtasks(["a", "b"]);
        goal.toggle_subtask(0);
        assert!(goal.reorder_subtasks(0, 1));
        assert_eq!(goal.subtasks[1].title, "a");
        assert!(goal.subtasks[1].done);
        assert_eq!(goal.progress, 0.5);
    }

    #[test]
    fn removing_last_subtask_resets_progress() {
        let mut goal = GoalData::with_subtasks(["only"]);
        goal.toggle_subtask(0);
        assert_eq!(goal.progress, 1.0);
        assert_eq!(goal.remove_subtask(0).map(|s| s.title), Some("only".to_string()));
        assert_eq!(goal.progress, 0.0);
    }

    #[test]
    fn days_left_is_clamped() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let mut goal = GoalData {
            target_date: Some("2026-05-20".to_string()),
            ..GoalData::default()
        };
        assert_eq!(goal.days_left(today), Some(0));
        goal.target_date = Some("2026-06-11".to_string());
        assert_eq!(goal.days_left(today), Some(10));
    }
}
