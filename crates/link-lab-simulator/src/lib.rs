//! In-memory simulated physical medium plus a wall-clock scenario runner
//! for exercising two [`link_lab_core::LinkLayer`] endpoints.

pub mod channel;
pub mod runner;
pub mod trace;

pub use channel::{ChannelHandle, SimulatedChannel};
pub use runner::{run_scenario, run_scenario_file};
pub use trace::{RunReport, TraceEvent};
