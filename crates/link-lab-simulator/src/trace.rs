use serde::Serialize;

use link_lab_abstract::{ChannelConfig, LinkConfig, ScenarioNode};

/// One observed channel event, for diagnostics and assertions.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// Milliseconds since the channel was created.
    pub at_ms: u64,
    /// Originating endpoint.
    pub from: ScenarioNode,
    pub seq: u32,
    pub ack: u32,
    pub payload_len: u32,
    /// What the channel did with the frame.
    pub outcome: TraceOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    Delivered,
    DroppedRandom,
    DroppedDeterministic,
    Corrupted,
}

/// Serializable snapshot of a finished scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub link: LinkConfig,
    pub channel: ChannelConfig,
    pub duration_ms: u64,
    /// Payloads delivered to the application on each endpoint, in order.
    pub delivered_a: Vec<String>,
    pub delivered_b: Vec<String>,
    pub events: Vec<TraceEvent>,
}
