use std::{path::PathBuf, time::Duration};

use clap::Parser;
use pomocycle_lib::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "pomocycle", about = "Run a focus cycle in the terminal")]
struct Cli {
    /// What you are working on.
    #[arg(long)]
    task: String,
    /// Cycle length, 5 to 60.
    #[arg(long, default_value_t = 25)]
    minutes: i64,
    /// JSON settings file; read if present, defaults otherwise.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Interrupt the cycle after this many seconds.
    #[arg(long)]
    interrupt_after: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    pomocycle_lib::run(RunOptions {
        task: cli.task,
        minutes: cli.minutes,
        settings_path: cli.settings,
        interrupt_after: cli.interrupt_after.map(Duration::from_secs),
    })
    .await
}
