//! Operations the UI layer calls. Finish is not here: only the countdown
//! driver triggers it.

use crate::{
    cycles::{Cycle, CycleSummary, CyclesSnapshot, FormError, NewCycleForm},
    host::HostEvent,
    AppState,
};

pub async fn get_cycles_snapshot(state: &AppState) -> CyclesSnapshot {
    state.store.snapshot().await
}

pub async fn list_cycle_history(state: &AppState) -> Vec<CycleSummary> {
    state.store.history().await
}

/// Validates the form, creates and activates the cycle, and points the
/// countdown at it.
pub async fn create_new_cycle(state: &AppState, form: NewCycleForm) -> Result<Cycle, FormError> {
    let data = form.validate()?;
    let cycle = state.store.create_new_cycle(data).await;
    state.driver.start().await;
    emit_state_changed(state).await;
    Ok(cycle)
}

/// Returns the interrupted cycle, or `None` when nothing was running.
pub async fn interrupt_current_cycle(state: &AppState) -> Option<Cycle> {
    let interrupted = state.store.interrupt_current_cycle().await;
    state.driver.stop().await;
    if interrupted.is_some() {
        emit_state_changed(state).await;
    }
    interrupted
}

async fn emit_state_changed(state: &AppState) {
    let snapshot = state.store.snapshot().await;
    state.emitter.emit(HostEvent::CycleStateChanged { snapshot });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        host::ChannelEmitter,
        settings::{Settings, SettingsStore},
    };
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn app() -> (AppState, tokio::sync::mpsc::UnboundedReceiver<HostEvent>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let (emitter, events) = ChannelEmitter::new();
        let state = AppState::new(
            Arc::new(clock),
            Arc::new(emitter),
            SettingsStore::in_memory(Settings::default()),
        );
        (state, events)
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_store() {
        let (state, mut events) = app();

        let err = create_new_cycle(&state, NewCycleForm::new("Write", 3))
            .await
            .unwrap_err();

        assert_eq!(err, FormError::TooShort { minutes_amount: 3 });
        assert!(get_cycles_snapshot(&state).await.cycles.is_empty());
        assert!(!state.driver.is_ticking().await);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn create_then_interrupt_round_trip() {
        let (state, mut events) = app();

        let cycle = create_new_cycle(&state, NewCycleForm::new("Write", 25))
            .await
            .unwrap();
        assert_eq!(state.driver.ticking_cycle_id().await, Some(cycle.id.clone()));
        assert!(matches!(
            events.try_recv(),
            Ok(HostEvent::CycleStateChanged { snapshot }) if snapshot.active_cycle_id == Some(cycle.id.clone())
        ));

        let interrupted = interrupt_current_cycle(&state).await.unwrap();
        assert_eq!(interrupted.id, cycle.id);
        assert!(!state.driver.is_ticking().await);

        assert!(interrupt_current_cycle(&state).await.is_none());

        let history = list_cycle_history(&state).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, crate::cycles::CycleStatus::Interrupted);
    }
}
