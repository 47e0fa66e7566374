// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use shared_log::{
    Client, FileSink, LogSystem, SharedLog, SharedLogConfig, SinkTable, StderrSink,
};

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON5 configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of producer threads
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Records per producer
    #[arg(long, default_value_t = 1000)]
    records: usize,

    /// Append txt records to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn build_sinks(output: Option<&PathBuf>) -> Result<SinkTable> {
    match output {
        Some(path) => {
            let file = FileSink::open(path)
                .with_context(|| format!("failed to open output {}", path.display()))?;
            Ok(SinkTable::new()
                .with_sink(Client::Txt, Box::new(file))
                .with_sink(Client::Msc, Box::new(StderrSink::new())))
        }
        None => Ok(SinkTable::console()),
    }
}

fn produce(log: SharedLog, producer: usize, records: usize) {
    for seq in 0..records {
        log.log_fmt(
            Client::Txt,
            format_args!(
                "[{:>8.3}] producer {} record {}\n",
                log.elapsed_time_since_start().as_secs_f64(),
                producer,
                seq
            ),
        );
    }
    log.log_fmt(
        Client::Msc,
        format_args!("producer {} done ({} records)\n", producer, records),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SharedLogConfig::load_from_file(path)?,
        None => SharedLogConfig::with_max_threads(args.producers + 1),
    };
    let sinks = build_sinks(args.output.as_ref())?;
    let system = LogSystem::start(&config, sinks)?;

    let producers: Vec<_> = (0..args.producers)
        .map(|producer| {
            let log = system.logger();
            let records = args.records;
            thread::Builder::new()
                .name(format!("producer-{}", producer))
                .spawn(move || produce(log, producer, records))
        })
        .collect::<std::io::Result<_>>()
        .context("failed to spawn producer thread")?;

    tokio::task::spawn_blocking(move || {
        for producer in producers {
            if producer.join().is_err() {
                eprintln!("producer thread panicked");
            }
        }
    })
    .await?;

    let log = system.logger();
    let report = system.shutdown().await;
    let summary = serde_json::json!({
        "started": log.start_time().to_rfc3339(),
        "final_drain": report.total(),
        "stats": log.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
