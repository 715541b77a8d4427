//! Job lifecycle: the polling state machine and its phase vocabulary

pub mod states;
pub mod tracker;

pub use states::JobPhase;
pub use tracker::{JobTracker, DEFAULT_POLL_INTERVAL, SEND_FORMAT};
