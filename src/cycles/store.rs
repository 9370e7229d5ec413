use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::clock::Clock;
use crate::timer::countdown::Remaining;

use super::model::{CreateCycleData, Cycle, CycleSummary};
use super::reducer::{reduce, CycleAction, CyclesState};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Everything a renderer needs in one read.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CyclesSnapshot {
    pub cycles: Vec<Cycle>,
    pub active_cycle_id: Option<String>,
    pub active_cycle: Option<Cycle>,
    pub amount_seconds_passed: u64,
    pub remaining: String,
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) cycles: CyclesState,
    pub(crate) amount_seconds_passed: u64,
}

impl StoreState {
    /// Runs the reducer in place. Returns false when the action was a no-op.
    pub(crate) fn dispatch(&mut self, action: CycleAction) -> bool {
        let previous_active = self.cycles.active_cycle_id.clone();
        let current = std::mem::take(&mut self.cycles);
        self.cycles = reduce(current, action);
        self.cycles.active_cycle_id != previous_active
    }

    /// Dispatches interrupt or finish and returns the cycle it closed.
    pub(crate) fn close_active(&mut self, action: CycleAction) -> Option<Cycle> {
        let target = self.cycles.active_cycle_id.clone()?;
        if !self.dispatch(action) {
            return None;
        }
        self.cycles
            .cycles
            .iter()
            .find(|cycle| cycle.id == target)
            .cloned()
    }

    pub(crate) fn snapshot(&self) -> CyclesSnapshot {
        let active_cycle = self.cycles.active_cycle().cloned();
        let remaining = Remaining::for_cycle(active_cycle.as_ref(), self.amount_seconds_passed);
        CyclesSnapshot {
            cycles: self.cycles.cycles.clone(),
            active_cycle_id: self.cycles.active_cycle_id.clone(),
            active_cycle,
            amount_seconds_passed: self.amount_seconds_passed,
            remaining: remaining.to_string(),
        }
    }
}

/// Owns the cycle history and the elapsed-seconds value. Clones share state.
#[derive(Clone)]
pub struct CycleStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl CycleStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().await
    }

    pub async fn create_new_cycle(&self, data: CreateCycleData) -> Cycle {
        let cycle = Cycle::new(Uuid::new_v4().to_string(), data, self.clock.now());

        let mut guard = self.state.lock().await;
        if let Some(previous) = guard.cycles.active_cycle() {
            log_warn!(
                "cycle {} replaced by {} while still running; it stays without an end date",
                previous.id,
                cycle.id
            );
        }
        guard.dispatch(CycleAction::Create {
            cycle: cycle.clone(),
        });
        guard.amount_seconds_passed = 0;

        log_info!(
            "created cycle {} ({} minutes): {}",
            cycle.id,
            cycle.minutes_amount,
            cycle.task
        );
        cycle
    }

    pub async fn interrupt_current_cycle(&self) -> Option<Cycle> {
        let at = self.clock.now();
        let closed = self
            .state
            .lock()
            .await
            .close_active(CycleAction::Interrupt { at });
        match &closed {
            Some(cycle) => log_info!("interrupted cycle {}", cycle.id),
            None => log::debug!("interrupt ignored: no active cycle"),
        }
        closed
    }

    pub async fn mark_current_cycle_as_finished(&self) -> Option<Cycle> {
        let at = self.clock.now();
        let closed = self
            .state
            .lock()
            .await
            .close_active(CycleAction::Finish { at });
        match &closed {
            Some(cycle) => log_info!("finished cycle {}", cycle.id),
            None => log::debug!("finish ignored: no active cycle"),
        }
        closed
    }

    pub async fn set_seconds_passed(&self, seconds: u64) {
        self.state.lock().await.amount_seconds_passed = seconds;
    }

    pub async fn amount_seconds_passed(&self) -> u64 {
        self.state.lock().await.amount_seconds_passed
    }

    pub async fn active_cycle(&self) -> Option<Cycle> {
        self.state.lock().await.cycles.active_cycle().cloned()
    }

    pub async fn active_cycle_id(&self) -> Option<String> {
        self.state.lock().await.cycles.active_cycle_id.clone()
    }

    pub async fn cycles(&self) -> Vec<Cycle> {
        self.state.lock().await.cycles.cycles.clone()
    }

    pub async fn state(&self) -> CyclesState {
        self.state.lock().await.cycles.clone()
    }

    pub async fn snapshot(&self) -> CyclesSnapshot {
        self.state.lock().await.snapshot()
    }

    /// History rows, newest first.
    pub async fn history(&self) -> Vec<CycleSummary> {
        let guard = self.state.lock().await;
        let active = guard.cycles.active_cycle_id.as_deref();
        guard
            .cycles
            .cycles
            .iter()
            .rev()
            .map(|cycle| CycleSummary::from_cycle(cycle, active))
            .collect()
    }
}
