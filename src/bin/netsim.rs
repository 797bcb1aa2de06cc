//! 场景仿真
//!
//! 读取 JSON 场景文件，运行仿真，按行输出每条流的结果：
//! `flow_summary {json}`，最后一行 `network_stats {json}`。

use clap::Parser;
use netsim_rs::SimError;
use netsim_rs::metrics::RecordingSink;
use netsim_rs::net::{NetWorld, Network};
use netsim_rs::scenario::{Scenario, ScenarioSpec};
use netsim_rs::sim::{SimTime, Simulator};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "netsim", about = "Run a packet-level network scenario")]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Run until this time (ms); defaults to running until the event queue drains
    #[arg(long)]
    until_ms: Option<u64>,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write recorded metric samples to this JSON file
    #[arg(long)]
    metrics_json: Option<PathBuf>,
}

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let spec = ScenarioSpec::load(&args.scenario)?;
    let seed = args.seed.or(spec.seed).unwrap_or(0);

    let mut sim = Simulator::default();
    let mut world = NetWorld::new(Network::new(seed));
    if args.metrics_json.is_some() {
        world.net.set_metrics_sink(Box::new(RecordingSink::new()));
    }

    Scenario::build(&spec, &mut world.net, &mut sim)?;

    match args.until_ms {
        Some(ms) => sim.run_until(SimTime::from_millis(ms), &mut world),
        None => sim.run(&mut world),
    }

    for flow in world.net.flows() {
        println!("flow_summary {}", serde_json::to_string(&flow.summary())?);
    }
    println!("network_stats {}", serde_json::to_string(&world.net.stats)?);

    if let Some(path) = &args.metrics_json {
        if let Some(sink) = world.net.metrics_as::<RecordingSink>() {
            sink.write_json(path)?;
        }
    }
    Ok(())
}
