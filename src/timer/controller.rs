use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    cycles::{reducer::CycleAction, CycleStore},
    host::{Emitter, HostEvent},
    settings::Settings,
};

use super::countdown::{evaluate, Remaining, TickOutcome};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

struct Ticker {
    cycle_id: String,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Ticker {
    async fn shutdown(self) {
        self.cancel_token.cancel();
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() {
                log_error!("countdown ticker for {} failed: {err}", self.cycle_id);
            }
        }
    }
}

/// Per-ticker bookkeeping that only matters for what gets emitted.
#[derive(Debug, Default)]
struct TickMemory {
    ticks: u32,
    last_title: Option<String>,
}

#[derive(Clone)]
struct TickContext {
    store: CycleStore,
    emitter: Arc<dyn Emitter>,
    update_title: bool,
    heartbeat_every_ticks: u32,
}

impl TickContext {
    /// One firing of the countdown against `cycle_id`. Does nothing once that
    /// cycle stops being the active one.
    async fn tick(&self, cycle_id: &str, memory: &mut TickMemory) -> TickOutcome {
        let now = self.store.now();

        let (outcome, cycle) = {
            let mut guard = self.store.lock().await;
            let Some(cycle) = guard
                .cycles
                .active_cycle()
                .filter(|cycle| cycle.id == cycle_id)
                .cloned()
            else {
                return TickOutcome::Idle;
            };

            let outcome = evaluate(&cycle, now);
            match outcome {
                TickOutcome::Finished { seconds_passed } => {
                    guard.amount_seconds_passed = seconds_passed;
                    let closed = guard.close_active(CycleAction::Finish { at: now });
                    (outcome, closed)
                }
                TickOutcome::Running { seconds_passed } => {
                    guard.amount_seconds_passed = seconds_passed;
                    (outcome, Some(cycle))
                }
                TickOutcome::Idle => return TickOutcome::Idle,
            }
        };

        memory.ticks = memory.ticks.wrapping_add(1);

        match (outcome, cycle) {
            (TickOutcome::Running { seconds_passed }, Some(cycle)) => {
                let remaining = Remaining::for_cycle(Some(&cycle), seconds_passed);
                self.publish_title(remaining, memory);

                if self.heartbeat_every_ticks > 0 && memory.ticks % self.heartbeat_every_ticks == 0 {
                    self.emitter.emit(HostEvent::Heartbeat {
                        cycle_id: cycle.id,
                        amount_seconds_passed: seconds_passed,
                        remaining_seconds: remaining.total_seconds(),
                    });
                }
            }
            (TickOutcome::Finished { .. }, Some(cycle)) => {
                log_info!("cycle {} reached {} minutes", cycle.id, cycle.minutes_amount);
                self.emitter.emit(HostEvent::CycleFinished { cycle });
                let snapshot = self.store.snapshot().await;
                self.emitter.emit(HostEvent::CycleStateChanged { snapshot });
            }
            (outcome, None) => {
                log_warn!("tick for {} produced {:?} without a cycle", cycle_id, outcome);
            }
            _ => {}
        }

        outcome
    }

    fn publish_title(&self, remaining: Remaining, memory: &mut TickMemory) {
        if !self.update_title {
            return;
        }
        let title = remaining.to_string();
        if memory.last_title.as_deref() == Some(title.as_str()) {
            return;
        }
        memory.last_title = Some(title.clone());
        self.emitter.emit(HostEvent::TitleChanged { title });
    }
}

/// Drives the active cycle's countdown on a recurring tick and finishes it
/// when its duration elapses. At most one ticker runs at a time.
#[derive(Clone)]
pub struct CountdownDriver {
    context: TickContext,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
}

impl CountdownDriver {
    pub fn new(store: CycleStore, emitter: Arc<dyn Emitter>, settings: &Settings) -> Self {
        Self {
            context: TickContext {
                store,
                emitter,
                update_title: settings.update_title,
                heartbeat_every_ticks: settings.heartbeat_every_ticks,
            },
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: settings.tick_interval(),
        }
    }

    /// Points the ticker at the store's current active cycle, shutting down
    /// whatever ticker ran before. Returns the id being counted, if any.
    pub async fn start(&self) -> Option<String> {
        let mut ticker_guard = self.ticker.lock().await;
        let (cycle, seconds_passed) = {
            let guard = self.context.store.lock().await;
            (guard.cycles.active_cycle().cloned(), guard.amount_seconds_passed)
        };

        if let (Some(current), Some(cycle)) = (ticker_guard.as_ref(), cycle.as_ref()) {
            if current.cycle_id == cycle.id && !current.handle.is_finished() {
                return Some(cycle.id.clone());
            }
        }

        if let Some(previous) = ticker_guard.take() {
            log_info!("shutting down countdown ticker for {}", previous.cycle_id);
            previous.shutdown().await;
        }

        let Some(cycle) = cycle else {
            log_info!("no active cycle; countdown stays idle");
            return None;
        };

        let mut memory = TickMemory::default();
        self.context
            .publish_title(Remaining::for_cycle(Some(&cycle), seconds_passed), &mut memory);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(
            self.context.clone(),
            cycle.id.clone(),
            self.tick_interval,
            cancel_token.clone(),
            memory,
        ));

        log_info!(
            "countdown started for cycle {} ({}s)",
            cycle.id,
            cycle.total_seconds()
        );

        *ticker_guard = Some(Ticker {
            cycle_id: cycle.id.clone(),
            handle,
            cancel_token,
        });
        Some(cycle.id)
    }

    pub async fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            log_info!("countdown stopped for cycle {}", ticker.cycle_id);
            ticker.shutdown().await;
        }
    }

    /// Cycle id of the ticker that is still running, if any.
    pub async fn ticking_cycle_id(&self) -> Option<String> {
        self.ticker
            .lock()
            .await
            .as_ref()
            .filter(|ticker| !ticker.handle.is_finished())
            .map(|ticker| ticker.cycle_id.clone())
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticking_cycle_id().await.is_some()
    }

    /// Runs a single tick against the current active cycle, for hosts that
    /// schedule their own timer.
    pub async fn tick(&self) -> TickOutcome {
        let Some(cycle_id) = self.context.store.active_cycle_id().await else {
            return TickOutcome::Idle;
        };
        self.context
            .tick(&cycle_id, &mut TickMemory::default())
            .await
    }
}

async fn run_ticker(
    context: TickContext,
    cycle_id: String,
    tick_interval: Duration,
    cancel_token: CancellationToken,
    mut memory: TickMemory,
) {
    let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = interval.tick() => {}
        }

        match context.tick(&cycle_id, &mut memory).await {
            TickOutcome::Running { .. } => {}
            TickOutcome::Finished { .. } => break,
            TickOutcome::Idle => {
                log_info!("cycle {} is no longer active; ticker exiting", cycle_id);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        cycles::CreateCycleData,
        host::ChannelEmitter,
    };
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        store: CycleStore,
        clock: ManualClock,
        driver: CountdownDriver,
        events: UnboundedReceiver<HostEvent>,
    }

    fn harness(settings: Settings) -> Harness {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let store = CycleStore::new(Arc::new(clock.clone()));
        let (emitter, events) = ChannelEmitter::new();
        let driver = CountdownDriver::new(store.clone(), Arc::new(emitter), &settings);
        Harness {
            store,
            clock,
            driver,
            events,
        }
    }

    fn data(minutes: u32) -> CreateCycleData {
        CreateCycleData {
            task: "Write".into(),
            minutes_amount: minutes,
        }
    }

    fn titles(events: &mut UnboundedReceiver<HostEvent>) -> Vec<String> {
        let mut titles = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let HostEvent::TitleChanged { title } = event {
                titles.push(title);
            }
        }
        titles
    }

    #[tokio::test]
    async fn manual_tick_publishes_elapsed_and_title() {
        let mut h = harness(Settings::default());
        h.store.create_new_cycle(data(5)).await;
        h.clock.advance(chrono::Duration::milliseconds(61_900));

        assert_eq!(
            h.driver.tick().await,
            TickOutcome::Running { seconds_passed: 61 }
        );
        assert_eq!(h.store.amount_seconds_passed().await, 61);
        assert_eq!(titles(&mut h.events), vec!["03:59".to_string()]);
    }

    #[tokio::test]
    async fn manual_tick_finishes_once_and_clamps() {
        let h = harness(Settings::default());
        let cycle = h.store.create_new_cycle(data(5)).await;
        h.clock.advance(chrono::Duration::seconds(900));

        assert_eq!(
            h.driver.tick().await,
            TickOutcome::Finished { seconds_passed: 300 }
        );
        assert_eq!(h.store.amount_seconds_passed().await, 300);
        assert_eq!(h.store.active_cycle_id().await, None);
        let stored = &h.store.cycles().await[0];
        assert_eq!(stored.id, cycle.id);
        assert_eq!(stored.finished_date, Some(h.clock.now()));

        assert_eq!(h.driver.tick().await, TickOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_runs_until_finish() {
        let mut h = harness(Settings::default());
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;

        h.clock.advance(chrono::Duration::seconds(299));
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.store.amount_seconds_passed().await, 299);
        assert!(h.driver.is_ticking().await);

        h.clock.advance(chrono::Duration::seconds(1));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.store.amount_seconds_passed().await, 300);
        assert_eq!(h.store.active_cycle_id().await, None);
        assert!(!h.driver.is_ticking().await);

        let mut finished = 0;
        while let Ok(event) = h.events.try_recv() {
            if matches!(event, HostEvent::CycleFinished { .. }) {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_ticker() {
        let h = harness(Settings::default());
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;
        let b = h.store.create_new_cycle(data(10)).await;
        assert_eq!(h.driver.start().await, Some(b.id.clone()));

        assert_eq!(h.driver.ticking_cycle_id().await, Some(b.id.clone()));

        // A's deadline passes but only B is being counted.
        h.clock.advance(chrono::Duration::seconds(330));
        time::sleep(Duration::from_millis(1500)).await;

        let cycles = h.store.cycles().await;
        assert!(!cycles[0].is_terminal());
        assert!(!cycles[1].is_terminal());
        assert_eq!(h.store.active_cycle_id().await, Some(b.id));
        assert_eq!(h.store.amount_seconds_passed().await, 330);
    }

    #[tokio::test(start_paused = true)]
    async fn orphaned_ticker_leaves_interrupted_cycle_alone() {
        let h = harness(Settings::default());
        h.store.create_new_cycle(data(10)).await;
        h.driver.start().await;

        h.clock.advance(chrono::Duration::seconds(30));
        let interrupted = h.store.interrupt_current_cycle().await.unwrap();
        // No stop(): the ticker has to notice on its own.
        h.clock.advance(chrono::Duration::seconds(600));
        time::sleep(Duration::from_millis(2500)).await;

        assert!(!h.driver.is_ticking().await);
        assert_eq!(h.store.cycles().await[0], interrupted);
        assert!(interrupted.finished_date.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticking() {
        let h = harness(Settings::default());
        let cycle = h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;
        h.driver.stop().await;

        h.clock.advance(chrono::Duration::seconds(400));
        time::sleep(Duration::from_secs(3)).await;

        assert!(!h.driver.is_ticking().await);
        assert_eq!(h.store.active_cycle_id().await, Some(cycle.id));
        assert_eq!(h.store.amount_seconds_passed().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn title_only_emitted_on_change_and_heartbeat_on_schedule() {
        let mut h = harness(Settings {
            heartbeat_every_ticks: 2,
            ..Settings::default()
        });
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;

        // Clock frozen: three ticks, one distinct title.
        time::sleep(Duration::from_millis(3500)).await;

        let mut titles = Vec::new();
        let mut heartbeats = 0;
        while let Ok(event) = h.events.try_recv() {
            match event {
                HostEvent::TitleChanged { title } => titles.push(title),
                HostEvent::Heartbeat { .. } => heartbeats += 1,
                _ => {}
            }
        }
        assert_eq!(titles, vec!["05:00".to_string()]);
        assert_eq!(heartbeats, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn title_updates_can_be_disabled() {
        let mut h = harness(Settings {
            update_title: false,
            ..Settings::default()
        });
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;
        h.clock.advance(chrono::Duration::seconds(10));
        time::sleep(Duration::from_millis(1500)).await;

        assert!(titles(&mut h.events).is_empty());
        assert_eq!(h.store.amount_seconds_passed().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn late_start_for_older_cycle_keeps_counting_newest() {
        let h = harness(Settings::default());
        h.store.create_new_cycle(data(60)).await;
        let newest = h.store.create_new_cycle(data(5)).await;

        // Two overlapping creates whose starts land in reverse order.
        assert_eq!(h.driver.start().await, Some(newest.id.clone()));
        assert_eq!(h.driver.start().await, Some(newest.id.clone()));
        assert_eq!(h.driver.ticking_cycle_id().await, Some(newest.id.clone()));

        h.clock.advance(chrono::Duration::seconds(400));
        time::sleep(Duration::from_secs(3)).await;

        assert_eq!(h.store.active_cycle_id().await, None);
        assert_eq!(h.store.amount_seconds_passed().await, 300);
        let cycles = h.store.cycles().await;
        assert!(cycles[1].finished_date.is_some());
        assert!(!cycles[0].is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_active_cycle_stops_previous_ticker() {
        let h = harness(Settings::default());
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;
        h.store.interrupt_current_cycle().await;

        assert_eq!(h.driver.start().await, None);
        assert!(!h.driver.is_ticking().await);
    }

    #[tokio::test(start_paused = true)]
    async fn full_duration_title_published_at_start() {
        let mut h = harness(Settings::default());
        h.store.create_new_cycle(data(5)).await;
        h.driver.start().await;
        assert_eq!(titles(&mut h.events), vec!["05:00".to_string()]);

        h.clock.advance(chrono::Duration::seconds(1));
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(titles(&mut h.events), vec!["04:59".to_string()]);
    }
}
