//! Cycle records and the read models derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validated payload accepted by the create transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleData {
    pub task: String,
    pub minutes_amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    pub task: String,
    pub minutes_amount: u32,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_date: Option<DateTime<Utc>>,
}

impl Cycle {
    pub fn new(id: String, data: CreateCycleData, start_date: DateTime<Utc>) -> Self {
        Self {
            id,
            task: data.task,
            minutes_amount: data.minutes_amount,
            start_date,
            interrupted_date: None,
            finished_date: None,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.minutes_amount) * 60
    }

    /// Interrupted or finished cycles never change again.
    pub fn is_terminal(&self) -> bool {
        self.interrupted_date.is_some() || self.finished_date.is_some()
    }

    pub fn status(&self, active_cycle_id: Option<&str>) -> CycleStatus {
        if self.interrupted_date.is_some() {
            CycleStatus::Interrupted
        } else if self.finished_date.is_some() {
            CycleStatus::Finished
        } else if active_cycle_id == Some(self.id.as_str()) {
            CycleStatus::Running
        } else {
            CycleStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CycleStatus {
    Running,
    Interrupted,
    Finished,
    /// Never reached a terminal date and is no longer active. Only happens
    /// when a new cycle is created on top of a running one.
    Pending,
}

/// One row of the history list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub id: String,
    pub task: String,
    pub minutes_amount: u32,
    pub duration_label: String,
    pub start_date: DateTime<Utc>,
    pub status: CycleStatus,
}

impl CycleSummary {
    pub fn from_cycle(cycle: &Cycle, active_cycle_id: Option<&str>) -> Self {
        Self {
            id: cycle.id.clone(),
            task: cycle.task.clone(),
            minutes_amount: cycle.minutes_amount,
            duration_label: format!("{} minutes", cycle.minutes_amount),
            start_date: cycle.start_date,
            status: cycle.status(active_cycle_id),
        }
    }
}
