//! Events pushed to whatever renders the cycles (window title, list views).

use log::info;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::cycles::{Cycle, CyclesSnapshot};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    #[serde(rename_all = "camelCase")]
    TitleChanged { title: String },
    #[serde(rename_all = "camelCase")]
    CycleStateChanged { snapshot: CyclesSnapshot },
    #[serde(rename_all = "camelCase")]
    CycleFinished { cycle: Cycle },
    #[serde(rename_all = "camelCase")]
    Heartbeat {
        cycle_id: String,
        amount_seconds_passed: u64,
        remaining_seconds: u64,
    },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::TitleChanged { .. } => "title-changed",
            HostEvent::CycleStateChanged { .. } => "cycle-state-changed",
            HostEvent::CycleFinished { .. } => "cycle-finished",
            HostEvent::Heartbeat { .. } => "cycle-heartbeat",
        }
    }
}

pub trait Emitter: Send + Sync {
    fn emit(&self, event: HostEvent);
}

/// Writes every event to the log as a JSON payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn emit(&self, event: HostEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!("{}: {}", event.name(), payload),
            Err(err) => log::error!("failed to serialize {}: {err}", event.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Emitter for ChannelEmitter {
    fn emit(&self, event: HostEvent) {
        // Receiver gone means nobody is rendering anymore.
        let _ = self.tx.send(event);
    }
}
