pub mod form;
pub mod model;
pub mod reducer;
pub mod store;

pub use form::{FormError, NewCycleForm};
pub use model::{CreateCycleData, Cycle, CycleStatus, CycleSummary};
pub use reducer::{reduce, CycleAction, CyclesState};
pub use store::{CycleStore, CyclesSnapshot};
