pub mod clock;
pub mod cycles;
pub mod host;
pub mod settings;
pub mod timer;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use log::info;

use clock::{Clock, SystemClock};
use cycles::{CycleStore, NewCycleForm};
use host::{ChannelEmitter, Emitter, HostEvent, LogEmitter};
use settings::{Settings, SettingsStore};
use timer::{
    commands::{create_new_cycle, interrupt_current_cycle, list_cycle_history},
    CountdownDriver,
};

/// The one owned bundle of cycle state, handed to every command.
pub struct AppState {
    pub store: CycleStore,
    pub driver: CountdownDriver,
    pub settings: SettingsStore,
    pub(crate) emitter: Arc<dyn Emitter>,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>, emitter: Arc<dyn Emitter>, settings: SettingsStore) -> Self {
        let store = CycleStore::new(clock);
        let driver = CountdownDriver::new(store.clone(), emitter.clone(), &settings.settings());
        Self {
            store,
            driver,
            settings,
            emitter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub task: String,
    pub minutes: i64,
    pub settings_path: Option<PathBuf>,
    pub interrupt_after: Option<Duration>,
}

fn init_logging() {
    let debug_mode = std::env::var("POMOCYCLE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug_mode { "debug" } else { "info" };

    // Reads RUST_LOG; a second init (tests, embedding hosts) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

/// Interrupts and reports it. Returns false when the cycle had already
/// finished (or never ran) by the time the interrupt landed.
async fn report_interrupt(state: &AppState) -> bool {
    match interrupt_current_cycle(state).await {
        Some(cycle) => {
            println!("interrupted: {}", cycle.task);
            true
        }
        None => {
            info!("nothing to interrupt");
            false
        }
    }
}

/// Runs one cycle in the terminal: prints the remaining time as it changes and
/// returns once the cycle finishes or gets interrupted.
pub async fn run(options: RunOptions) -> Result<()> {
    init_logging();

    info!("pomocycle starting up...");

    let settings = match &options.settings_path {
        Some(path) => SettingsStore::new(path.clone())?,
        None => SettingsStore::in_memory(Settings::default()),
    };

    let (emitter, mut events) = ChannelEmitter::new();
    let state = AppState::new(Arc::new(SystemClock), Arc::new(emitter), settings);

    let cycle = create_new_cycle(&state, NewCycleForm::new(options.task, options.minutes))
        .await
        .map_err(|err| anyhow!("invalid {}: {err}", err.field()))?;
    println!("{} ({} minutes)", cycle.task, cycle.minutes_amount);

    let interrupt_deadline = async {
        match options.interrupt_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(interrupt_deadline);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(HostEvent::TitleChanged { title }) => println!("{title}"),
                Some(HostEvent::CycleFinished { cycle }) => {
                    println!("finished: {}", cycle.task);
                    break;
                }
                Some(other) => LogEmitter.emit(other),
                None => break,
            },
            _ = &mut interrupt_deadline => {
                report_interrupt(&state).await;
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                report_interrupt(&state).await;
                break;
            }
        }
    }

    let history = list_cycle_history(&state).await;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
