use serde::{Deserialize, Serialize};

use crate::config::{ChannelConfig, LinkConfigOverride};

/// A declarative test script executed by the simulator's scenario runner.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub link: LinkConfigOverride,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

/// The two endpoints of a simulated point-to-point link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioNode {
    A,
    B,
}

impl ScenarioNode {
    pub fn peer(&self) -> Self {
        match self {
            ScenarioNode::A => ScenarioNode::B,
            ScenarioNode::B => ScenarioNode::A,
        }
    }
}

impl std::fmt::Display for ScenarioNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioNode::A => write!(f, "A"),
            ScenarioNode::B => write!(f, "B"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Application on `node` sends `data` at `time` ms after scenario start.
    AppSend {
        time: u64,
        node: ScenarioNode,
        data: String,
    },
    /// Deterministically drop the first data frame from `from` with this seq.
    DropNextSeq { from: ScenarioNode, seq: u32 },
    /// Deterministically corrupt the first data frame from `from` with this seq.
    CorruptNextSeq { from: ScenarioNode, seq: u32 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAssertion {
    /// `data` was delivered to the application on `node`.
    DataDelivered { node: ScenarioNode, data: String },
    /// Exactly `count` payloads were delivered on `node`.
    DeliveredCount { node: ScenarioNode, count: usize },
    /// `from` emitted a zero-payload frame carrying this cumulative ack.
    StandaloneAck { from: ScenarioNode, ack: u32 },
    /// The scenario must finish within `ms`.
    MaxDuration { ms: u64 },
}
