//! Wall-clock scenario execution.
//!
//! Builds a simulated channel and two link layers, replays the scenario's
//! application sends at their offsets, drains deliveries from both sides,
//! and evaluates the assertions once the expected deliveries have landed
//! and a settle period (to catch duplicate deliveries) has passed.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use link_lab_abstract::{
    LinkConfig, MAX_PAYLOAD, Scenario, ScenarioAction, ScenarioAssertion, ScenarioNode,
};
use link_lab_core::LinkLayer;
use tracing::{debug, info};

use crate::channel::{ChannelHandle, SimulatedChannel};
use crate::trace::RunReport;

const DEFAULT_DEADLINE_MS: u64 = 10_000;

pub fn run_scenario_file(path: &Path) -> anyhow::Result<RunReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    let scenario: Scenario = toml::from_str(&content).context("failed to parse scenario")?;
    run_scenario(&scenario)
}

pub fn run_scenario(scenario: &Scenario) -> anyhow::Result<RunReport> {
    info!(name = %scenario.name, "running scenario");
    info!(description = %scenario.description);

    let mut link_config = LinkConfig::default();
    scenario.link.apply_to(&mut link_config);

    let (end_a, end_b, handle) = SimulatedChannel::create(scenario.channel);

    let mut pending: VecDeque<(u64, ScenarioNode, Vec<u8>)> = VecDeque::new();
    for action in &scenario.actions {
        match action {
            ScenarioAction::AppSend { time, node, data } => {
                pending.push_back((*time, *node, data.as_bytes().to_vec()));
            }
            ScenarioAction::DropNextSeq { from, seq } => handle.drop_next_seq(*from, *seq),
            ScenarioAction::CorruptNextSeq { from, seq } => {
                handle.corrupt_next_seq(*from, *seq)
            }
        }
    }
    pending
        .make_contiguous()
        .sort_by_key(|(time, _, _)| *time);

    let link_a = LinkLayer::new(Box::new(end_a), link_config)
        .map_err(|err| anyhow!("endpoint A construction failed: {err}"))?;
    let link_b = LinkLayer::new(Box::new(end_b), link_config)
        .map_err(|err| anyhow!("endpoint B construction failed: {err}"))?;

    let deadline_ms = scenario
        .assertions
        .iter()
        .find_map(|assertion| match assertion {
            ScenarioAssertion::MaxDuration { ms } => Some(*ms),
            _ => None,
        })
        .unwrap_or(DEFAULT_DEADLINE_MS);

    // Lingering after the expected deliveries covers late duplicates from
    // retransmissions still in flight.
    let settle = 2 * link_config.timeout();
    let start = Instant::now();
    let mut delivered_a: Vec<Vec<u8>> = Vec::new();
    let mut delivered_b: Vec<Vec<u8>> = Vec::new();
    let mut completed_at: Option<Instant> = None;
    let completion_ms;

    loop {
        let elapsed = start.elapsed();

        // Issue due sends, one per node per iteration to preserve order;
        // a full window keeps the entry pending for retry.
        let mut tried: Vec<ScenarioNode> = Vec::new();
        let mut index = 0;
        while index < pending.len() {
            let (time, node, _) = &pending[index];
            if *time > elapsed.as_millis() as u64 || tried.contains(node) {
                index += 1;
                continue;
            }
            tried.push(*node);
            let (_, node, data) = &pending[index];
            let link = match node {
                ScenarioNode::A => &link_a,
                ScenarioNode::B => &link_b,
            };
            match link.send(data)? {
                0 => {
                    debug!(%node, "window full, retrying send");
                    index += 1;
                }
                n => {
                    debug!(%node, bytes = n, "application send accepted");
                    let _ = pending.remove(index);
                }
            }
        }

        let mut buf = [0u8; MAX_PAYLOAD];
        if let Ok(n) = link_a.receive(&mut buf)
            && n > 0
        {
            delivered_a.push(buf[..n].to_vec());
        }
        if let Ok(n) = link_b.receive(&mut buf)
            && n > 0
        {
            delivered_b.push(buf[..n].to_vec());
        }

        if completed_at.is_none()
            && pending.is_empty()
            && deliveries_complete(&scenario.assertions, &delivered_a, &delivered_b)
        {
            completed_at = Some(Instant::now());
        }

        if let Some(done) = completed_at {
            if done.elapsed() >= settle {
                completion_ms = done.duration_since(start).as_millis() as u64;
                break;
            }
        } else if elapsed.as_millis() as u64 > deadline_ms {
            return Err(anyhow!(
                "scenario '{}' timed out after {} ms (delivered A={:?} B={:?})",
                scenario.name,
                deadline_ms,
                delivered_a.len(),
                delivered_b.len()
            ));
        }

        thread::sleep(link_config.poll_interval());
    }

    drop(link_a);
    drop(link_b);

    check_assertions(
        scenario,
        &handle,
        &delivered_a,
        &delivered_b,
        completion_ms,
    )?;
    info!(name = %scenario.name, duration_ms = completion_ms, "scenario passed");

    Ok(RunReport {
        scenario: scenario.name.clone(),
        link: link_config,
        channel: scenario.channel,
        duration_ms: completion_ms,
        delivered_a: to_strings(&delivered_a),
        delivered_b: to_strings(&delivered_b),
        events: handle.events(),
    })
}

fn deliveries_complete(
    assertions: &[ScenarioAssertion],
    delivered_a: &[Vec<u8>],
    delivered_b: &[Vec<u8>],
) -> bool {
    assertions.iter().all(|assertion| match assertion {
        ScenarioAssertion::DataDelivered { node, data } => {
            delivered(node, delivered_a, delivered_b)
                .iter()
                .any(|payload| payload == data.as_bytes())
        }
        ScenarioAssertion::DeliveredCount { node, count } => {
            delivered(node, delivered_a, delivered_b).len() >= *count
        }
        _ => true,
    })
}

fn check_assertions(
    scenario: &Scenario,
    handle: &ChannelHandle,
    delivered_a: &[Vec<u8>],
    delivered_b: &[Vec<u8>],
    completion_ms: u64,
) -> anyhow::Result<()> {
    for assertion in &scenario.assertions {
        match assertion {
            ScenarioAssertion::DataDelivered { node, data } => {
                let found = delivered(node, delivered_a, delivered_b)
                    .iter()
                    .any(|payload| payload == data.as_bytes());
                if !found {
                    return Err(anyhow!(
                        "assertion failed: {:?} was not delivered on {node}",
                        data
                    ));
                }
            }
            ScenarioAssertion::DeliveredCount { node, count } => {
                let got = delivered(node, delivered_a, delivered_b).len();
                if got != *count {
                    return Err(anyhow!(
                        "assertion failed: {node} saw {got} deliveries, expected exactly {count}"
                    ));
                }
            }
            ScenarioAssertion::StandaloneAck { from, ack } => {
                if !handle.saw_standalone_ack(*from, *ack) {
                    return Err(anyhow!(
                        "assertion failed: no standalone ack {ack} observed from {from}"
                    ));
                }
            }
            ScenarioAssertion::MaxDuration { ms } => {
                if completion_ms > *ms {
                    return Err(anyhow!(
                        "assertion failed: completed in {completion_ms} ms, limit {ms} ms"
                    ));
                }
            }
        }
    }
    Ok(())
}

fn delivered<'a>(
    node: &ScenarioNode,
    delivered_a: &'a [Vec<u8>],
    delivered_b: &'a [Vec<u8>],
) -> &'a [Vec<u8>] {
    match node {
        ScenarioNode::A => delivered_a,
        ScenarioNode::B => delivered_b,
    }
}

fn to_strings(payloads: &[Vec<u8>]) -> Vec<String> {
    payloads
        .iter()
        .map(|payload| String::from_utf8_lossy(payload).into_owned())
        .collect()
}
