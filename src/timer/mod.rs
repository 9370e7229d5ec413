pub mod commands;
pub mod controller;
pub mod countdown;

pub use controller::CountdownDriver;
pub use countdown::{Remaining, TickOutcome};
