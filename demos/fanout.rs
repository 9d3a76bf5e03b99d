//! Fan stdin out to several readers
//!
//! Run with: cargo run --example fanout [READERS] [SLOW_READER_DELAY_MS]
//!
//! Examples:
//!   echo "KAMAHAMEHA!!" | cargo run --example fanout          # 3 readers
//!   cat big.bin | cargo run --example fanout 8                # 8 readers
//!   cat big.bin | cargo run --example fanout 4 50             # last reader sleeps 50ms per chunk
//!
//! Every reader prints how many bytes it received. With a slow reader, the
//! writer is paced by it: the others wait for it on every chunk.
//!
//! Logging is controlled with RUST_LOG, e.g. `RUST_LOG=multipipe=trace`.

use std::time::{Duration, Instant};

use multipipe::{MultiPipe, MultiPipeConfig, PipeReader};

const DEFAULT_READERS: usize = 3;

/// Drain one reader, optionally sleeping after every chunk
async fn consume(id: usize, mut reader: PipeReader, delay: Option<Duration>) -> u64 {
    let mut total = 0u64;

    loop {
        match reader.next_chunk().await {
            Ok(Some(chunk)) => {
                total += chunk.len() as u64;
                tracing::trace!(reader = id, bytes = chunk.len(), "Chunk received");
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(reader = id, error = %e, "Reader stopped");
                break;
            }
        }
    }

    total
}

fn parse_args(args: &[String]) -> Result<(usize, Option<Duration>), String> {
    let readers = match args.get(1) {
        Some(arg) => arg
            .parse::<usize>()
            .map_err(|_| format!("Invalid reader count: '{}'", arg))?,
        None => DEFAULT_READERS,
    };

    let delay = match args.get(2) {
        Some(arg) => Some(Duration::from_millis(
            arg.parse::<u64>()
                .map_err(|_| format!("Invalid delay: '{}'", arg))?,
        )),
        None => None,
    };

    Ok((readers, delay))
}

fn print_usage() {
    eprintln!("Usage: fanout [READERS] [SLOW_READER_DELAY_MS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  READERS               Number of readers (default: 3)");
    eprintln!("  SLOW_READER_DELAY_MS  Per-chunk delay for the last reader (default: none)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let (readers, delay) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multipipe=info".parse()?)
                .add_directive("fanout=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MultiPipeConfig::with_label("stdin").initial_capacity(readers);
    let mp = MultiPipe::with_config(config);

    let mut consumers = Vec::with_capacity(readers);
    for id in 0..readers {
        let reader = mp.reader().await?;
        let reader_delay = if id + 1 == readers { delay } else { None };
        consumers.push(tokio::spawn(consume(id, reader, reader_delay)));
    }

    let started = Instant::now();
    let result = mp.copy_from(&mut tokio::io::stdin()).await;

    match &result {
        Ok(_) => mp.close(),
        Err(e) => mp.close_with_error(e.to_string()),
    }

    for (id, consumer) in consumers.into_iter().enumerate() {
        let total = consumer.await?;
        println!("reader {}: {} bytes", id, total);
    }

    let relayed = result?;
    let stats = mp.stats();
    println!(
        "relayed {} bytes in {} writes to {} readers in {:?}",
        relayed,
        stats.writes,
        stats.reader_count,
        started.elapsed()
    );

    Ok(())
}
