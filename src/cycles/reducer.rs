use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Cycle;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CyclesState {
    pub cycles: Vec<Cycle>,
    pub active_cycle_id: Option<String>,
}

impl CyclesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_cycle(&self) -> Option<&Cycle> {
        let id = self.active_cycle_id.as_deref()?;
        self.cycles.iter().find(|cycle| cycle.id == id)
    }

    fn active_index(&self) -> Option<usize> {
        let id = self.active_cycle_id.as_deref()?;
        self.cycles
            .iter()
            .position(|cycle| cycle.id == id && !cycle.is_terminal())
    }
}

/// Commands accepted by [`reduce`]. Timestamps travel with the action so the
/// transition itself stays a pure function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleAction {
    Create { cycle: Cycle },
    Interrupt { at: DateTime<Utc> },
    Finish { at: DateTime<Utc> },
}

/// Applies one action. Interrupt and finish without a matching active cycle
/// hand the state back untouched.
pub fn reduce(mut state: CyclesState, action: CycleAction) -> CyclesState {
    match action {
        CycleAction::Create { cycle } => {
            state.active_cycle_id = Some(cycle.id.clone());
            state.cycles.push(cycle);
            state
        }
        CycleAction::Interrupt { at } => {
            let Some(index) = state.active_index() else {
                return state;
            };
            state.active_cycle_id = None;
            state.cycles[index].interrupted_date = Some(at);
            state
        }
        CycleAction::Finish { at } => {
            let Some(index) = state.active_index() else {
                return state;
            };
            state.active_cycle_id = None;
            state.cycles[index].finished_date = Some(at);
            state
        }
    }
}
