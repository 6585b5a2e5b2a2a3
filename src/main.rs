// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use vemonitor::config::{Config, ConfigLoader};
use vemonitor::engine::Orchestrator;
use vemonitor::observability::messages::scheduler::ShutdownRequested;
use vemonitor::observability::messages::StructuredLog;
use vemonitor::schema::SchemaRegistry;
use vemonitor::workers::{UnlinkedDrivers, WorkerRegistry};

const USAGE: &str = "Usage: vemonitor [--dir DIR] [--block NAME]... [--check | --run] CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    Run,
}

#[derive(Debug)]
struct Args {
    dir: Option<PathBuf>,
    blocks: Vec<String>,
    mode: Mode,
    config: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut dir = None;
    let mut blocks = Vec::new();
    let mut mode = Mode::Check;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dir" => dir = Some(PathBuf::from(args.next().context("--dir needs a directory")?)),
            "--block" => blocks.push(args.next().context("--block needs a block name")?),
            "--check" => mode = Mode::Check,
            "--run" => mode = Mode::Run,
            "-h" | "--help" => bail!("{USAGE}"),
            other if other.starts_with("--") => bail!("unknown option {other}\n{USAGE}"),
            other => {
                if config.replace(other.to_string()).is_some() {
                    bail!("only one configuration file may be given\n{USAGE}");
                }
            }
        }
    }

    Ok(Args {
        dir,
        blocks,
        mode,
        config: config.context(USAGE)?,
    })
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_summary(config: &Config) {
    if let Some(blocks) = config.blocks() {
        for block in blocks.iter() {
            let inputs: usize = block.inputs.values().map(Vec::len).sum();
            let outputs: usize = block.outputs.values().map(Vec::len).sum();
            println!("block {} ({}): {} input(s), {} output(s)", block.name, block.app, inputs, outputs);
        }
    }
    let active = config.active_connectors();
    for kind in active.kinds() {
        let names: Vec<&str> = active.instances(kind).map(|(name, _)| name).collect();
        println!("connector {kind}: {}", names.join(", "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = parse_args(env::args().skip(1))?;

    let schemas = Arc::new(SchemaRegistry::bundled().context("loading bundled schemas")?);
    let mut loader = ConfigLoader::new().with_schemas(Arc::clone(&schemas));
    if let Some(dir) = &args.dir {
        loader = loader.with_base_dir(dir);
    }

    let mut config = Config::load(&loader, &[args.config.as_str()], schemas)
        .with_context(|| format!("loading {}", args.config))?;
    if !args.blocks.is_empty() {
        let names: Vec<&str> = args.blocks.iter().map(String::as_str).collect();
        config.retain_blocks(&names)?;
    }

    print_summary(&config);
    if args.mode == Mode::Check {
        return Ok(());
    }

    let registry = WorkerRegistry::with_defaults(Arc::new(UnlinkedDrivers));
    let orchestrator = Orchestrator::new(config, registry);
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ShutdownRequested.log();
        }
        signal.cancel();
    });

    let report = orchestrator.run(shutdown).await?;
    for block in &report.blocks {
        println!(
            "block {}: {} sample(s), {} batch(es) sent, {} failed send(s), {} row(s) dropped",
            block.block, block.samples_read, block.batches_sent, block.failed_sends, block.dropped_rows
        );
    }
    Ok(())
}
