use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use link_lab_abstract::{ChannelConfig, Scenario, ScenarioAction, ScenarioAssertion, ScenarioNode};
use link_lab_simulator::{RunReport, run_scenario, run_scenario_file};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless sliding-window link simulator")]
struct Args {
    /// Load a scenario from disk. Runs a built-in demo when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the channel's random loss rate (0.0 to 1.0).
    #[arg(long)]
    loss_rate: Option<f64>,

    /// Override the channel's random corruption rate (0.0 to 1.0).
    #[arg(long)]
    corrupt_rate: Option<f64>,

    /// Override the channel's RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON trace of the finished run.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!("link-lab starting");

    let report = match &args.scenario {
        Some(path) if !needs_channel_override(&args) => run_scenario_file(path)?,
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario file {}", path.display()))?;
            let mut scenario: Scenario =
                toml::from_str(&content).context("failed to parse scenario")?;
            apply_channel_overrides(&args, &mut scenario.channel);
            run_scenario(&scenario)?
        }
        None => {
            let mut scenario = demo_scenario();
            apply_channel_overrides(&args, &mut scenario.channel);
            run_scenario(&scenario)?
        }
    };

    print_summary(&report);

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

fn needs_channel_override(args: &Args) -> bool {
    args.loss_rate.is_some() || args.corrupt_rate.is_some() || args.seed.is_some()
}

fn apply_channel_overrides(args: &Args, channel: &mut ChannelConfig) {
    if let Some(loss) = args.loss_rate {
        channel.loss_rate = loss;
    }
    if let Some(corrupt) = args.corrupt_rate {
        channel.corrupt_rate = corrupt;
    }
    if let Some(seed) = args.seed {
        channel.seed = seed;
    }
}

/// One frame each way over a clean channel. Useful as a smoke test and as a
/// template for writing scenario files.
fn demo_scenario() -> Scenario {
    Scenario {
        name: "demo".to_string(),
        description: "one payload in each direction over a clean channel".to_string(),
        link: Default::default(),
        channel: ChannelConfig::default(),
        actions: vec![
            ScenarioAction::AppSend {
                time: 0,
                node: ScenarioNode::A,
                data: "hello from A".to_string(),
            },
            ScenarioAction::AppSend {
                time: 50,
                node: ScenarioNode::B,
                data: "hello from B".to_string(),
            },
        ],
        assertions: vec![
            ScenarioAssertion::DataDelivered {
                node: ScenarioNode::B,
                data: "hello from A".to_string(),
            },
            ScenarioAssertion::DataDelivered {
                node: ScenarioNode::A,
                data: "hello from B".to_string(),
            },
            ScenarioAssertion::MaxDuration { ms: 5_000 },
        ],
    }
}

fn print_summary(report: &RunReport) {
    println!("scenario : {}", report.scenario);
    println!("duration : {} ms", report.duration_ms);
    println!(
        "delivered: {} to A, {} to B",
        report.delivered_a.len(),
        report.delivered_b.len()
    );
    for payload in &report.delivered_a {
        println!("  A <- {payload:?}");
    }
    for payload in &report.delivered_b {
        println!("  B <- {payload:?}");
    }
    println!("frames   : {} observed on the channel", report.events.len());
}

fn write_trace(path: &Path, report: &RunReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("failed to serialize run trace")?;
    fs::write(path, &data)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(())
}
