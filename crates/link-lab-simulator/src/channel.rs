//! A simulated point-to-point physical medium.
//!
//! [`SimulatedChannel::create`] yields two [`PhysicalLayer`] endpoints over
//! a pair of in-memory directional queues, plus a [`ChannelHandle`] for
//! fault injection and trace inspection. Faults are applied at send time:
//! random loss and corruption rolled on a seeded RNG (reproducible runs),
//! and deterministic one-shot drop/corrupt keyed by sequence number.
//! Corruption is realized by flipping the checksum field, which the
//! receiving link layer must detect and discard.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use link_lab_abstract::{ChannelConfig, Frame, PhysicalLayer, ScenarioNode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::trace::{TraceEvent, TraceOutcome};

// Wire offset of the checksum field, used for in-flight corruption.
const CHECKSUM_OFFSET: usize = 8;

struct Shared {
    config: ChannelConfig,
    rng: StdRng,
    to_a: VecDeque<Vec<u8>>,
    to_b: VecDeque<Vec<u8>>,
    drop_once: Vec<(ScenarioNode, u32)>,
    corrupt_once: Vec<(ScenarioNode, u32)>,
    events: Vec<TraceEvent>,
    started: Instant,
}

impl Shared {
    fn record(&mut self, from: ScenarioNode, frame: &Frame, outcome: TraceOutcome) {
        self.events.push(TraceEvent {
            at_ms: self.started.elapsed().as_millis() as u64,
            from,
            seq: frame.header.seq,
            ack: frame.header.ack,
            payload_len: frame.header.payload_len,
            outcome,
        });
    }

    fn transmit(&mut self, from: ScenarioNode, raw: &[u8]) -> usize {
        let Ok(frame) = Frame::decode(raw) else {
            // Malformed frames never leave the sending host's NIC.
            return 0;
        };
        let header = frame.header;
        let is_data = !frame.is_ack_only();

        if is_data
            && let Some(pos) = self
                .drop_once
                .iter()
                .position(|&(node, seq)| node == from && seq == header.seq)
        {
            self.drop_once.remove(pos);
            debug!(%from, seq = header.seq, "deterministic drop");
            self.record(from, &frame, TraceOutcome::DroppedDeterministic);
            return raw.len();
        }

        let mut raw = raw.to_vec();
        if is_data
            && let Some(pos) = self
                .corrupt_once
                .iter()
                .position(|&(node, seq)| node == from && seq == header.seq)
        {
            self.corrupt_once.remove(pos);
            debug!(%from, seq = header.seq, "deterministic corruption");
            self.record(from, &frame, TraceOutcome::Corrupted);
            flip_checksum(&mut raw);
        } else if self.rng.random::<f64>() < self.config.loss_rate {
            debug!(%from, seq = header.seq, ack = header.ack, "random loss");
            self.record(from, &frame, TraceOutcome::DroppedRandom);
            return raw.len();
        } else if self.rng.random::<f64>() < self.config.corrupt_rate {
            debug!(%from, seq = header.seq, ack = header.ack, "random corruption");
            self.record(from, &frame, TraceOutcome::Corrupted);
            flip_checksum(&mut raw);
        } else {
            self.record(from, &frame, TraceOutcome::Delivered);
        }

        let len = raw.len();
        match from {
            ScenarioNode::A => self.to_b.push_back(raw),
            ScenarioNode::B => self.to_a.push_back(raw),
        }
        len
    }

    fn poll(&mut self, to: ScenarioNode, buf: &mut [u8]) -> usize {
        let queue = match to {
            ScenarioNode::A => &mut self.to_a,
            ScenarioNode::B => &mut self.to_b,
        };
        match queue.pop_front() {
            Some(raw) if raw.len() <= buf.len() => {
                buf[..raw.len()].copy_from_slice(&raw);
                raw.len()
            }
            // A frame larger than the caller's buffer is unreceivable.
            Some(_) => 0,
            None => 0,
        }
    }
}

fn flip_checksum(raw: &mut [u8]) {
    raw[CHECKSUM_OFFSET] = !raw[CHECKSUM_OFFSET];
    raw[CHECKSUM_OFFSET + 1] = !raw[CHECKSUM_OFFSET + 1];
}

/// One endpoint of the simulated channel.
pub struct SimulatedChannel {
    node: ScenarioNode,
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedChannel {
    /// Build a connected pair of endpoints and the controlling handle.
    pub fn create(
        config: ChannelConfig,
    ) -> (SimulatedChannel, SimulatedChannel, ChannelHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            config,
            rng: StdRng::seed_from_u64(config.seed),
            to_a: VecDeque::new(),
            to_b: VecDeque::new(),
            drop_once: Vec::new(),
            corrupt_once: Vec::new(),
            events: Vec::new(),
            started: Instant::now(),
        }));
        let a = SimulatedChannel {
            node: ScenarioNode::A,
            shared: Arc::clone(&shared),
        };
        let b = SimulatedChannel {
            node: ScenarioNode::B,
            shared: Arc::clone(&shared),
        };
        (a, b, ChannelHandle { shared })
    }
}

impl PhysicalLayer for SimulatedChannel {
    fn send(&mut self, frame: &[u8]) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transmit(self.node, frame)
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .poll(self.node, buf)
    }
}

/// Fault injection and trace inspection for a [`SimulatedChannel`] pair.
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ChannelHandle {
    /// Drop the first data frame from `from` carrying sequence `seq`.
    pub fn drop_next_seq(&self, from: ScenarioNode, seq: u32) {
        self.lock().drop_once.push((from, seq));
    }

    /// Corrupt the first data frame from `from` carrying sequence `seq`.
    pub fn corrupt_next_seq(&self, from: ScenarioNode, seq: u32) {
        self.lock().corrupt_once.push((from, seq));
    }

    /// Snapshot of every channel event so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.lock().events.clone()
    }

    /// Whether `from` has emitted a zero-payload frame carrying `ack`.
    pub fn saw_standalone_ack(&self, from: ScenarioNode, ack: u32) -> bool {
        self.lock().events.iter().any(|event| {
            event.from == from
                && event.payload_len == 0
                && event.ack == ack
                && event.outcome == TraceOutcome::Delivered
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
