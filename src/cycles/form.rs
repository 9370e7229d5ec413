//! Validation for the "new cycle" form. The store trusts whatever reaches it,
//! so every payload passes through [`NewCycleForm::validate`] first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::CreateCycleData;

pub const MIN_MINUTES: i64 = 5;
pub const MAX_MINUTES: i64 = 60;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Inform the task")]
    MissingTask,
    #[error("The cycle must be at least 5 minutes.")]
    TooShort { minutes_amount: i64 },
    #[error("The cycle must be at most 60 minutes.")]
    TooLong { minutes_amount: i64 },
}

impl FormError {
    /// Name of the form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            FormError::MissingTask => "task",
            FormError::TooShort { .. } | FormError::TooLong { .. } => "minutesAmount",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewCycleForm {
    pub task: String,
    pub minutes_amount: i64,
}

impl NewCycleForm {
    pub fn new(task: impl Into<String>, minutes_amount: i64) -> Self {
        Self {
            task: task.into(),
            minutes_amount,
        }
    }

    /// Start stays disabled while the task field is empty. Same rule as
    /// [`validate`](Self::validate): any non-empty text counts, whitespace
    /// included.
    pub fn can_submit(&self) -> bool {
        !self.task.is_empty()
    }

    pub fn validate(&self) -> Result<CreateCycleData, FormError> {
        if self.task.is_empty() {
            return Err(FormError::MissingTask);
        }
        if self.minutes_amount < MIN_MINUTES {
            return Err(FormError::TooShort {
                minutes_amount: self.minutes_amount,
            });
        }
        if self.minutes_amount > MAX_MINUTES {
            return Err(FormError::TooLong {
                minutes_amount: self.minutes_amount,
            });
        }

        Ok(CreateCycleData {
            task: self.task.clone(),
            // bounds checked above
            minutes_amount: self.minutes_amount as u32,
        })
    }
}
