pub mod checksum;
pub mod config;
pub mod error;
pub mod medium;
pub mod packet;
pub mod scenario;

pub use checksum::{compute, verify};
pub use config::{ChannelConfig, LinkConfig};
pub use error::LinkError;
pub use medium::PhysicalLayer;
pub use packet::{FRAME_LEN, Frame, FrameHeader, HEADER_LEN, MAX_PAYLOAD};

pub use config::LinkConfigOverride;
pub use scenario::{Scenario, ScenarioAction, ScenarioAssertion, ScenarioNode};
