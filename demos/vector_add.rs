//! Distributed block-vector run: generate two vectors, multiply them by a
//! prompted scalar, and reduce their dot product to rank 0.
//!
//! Usage: vector_add [workers] [seed]

use blockvec::params::StdinParams;
use blockvec::{channel, pipeline};
use futures::executor;
use std::process;
use std::time::{Instant, SystemTime};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let workers: u32 = args
        .next()
        .map(|arg| arg.parse().expect("workers must be an integer"))
        .unwrap_or(4);
    if workers == 0 {
        eprintln!("Usage: vector_add [workers] [seed]");
        process::exit(1);
    }
    let seed: u64 = args
        .next()
        .map(|arg| arg.parse().expect("seed must be an integer"))
        .unwrap_or_else(clock_seed);

    let start = Instant::now();
    let results = channel::run_group(workers, |group| {
        let mut params = StdinParams::new();
        let mut out = std::io::stdout();
        executor::block_on(pipeline::run(&group, &mut params, &mut out, seed))
    });

    // Every rank carries the same abort; rank 0 is the designated
    // reporter.
    if let Err(abort) = &results[0] {
        eprintln!("Proc 0 > {abort}");
        process::exit(-1);
    }

    println!("\nTook {:.3} s to run", start.elapsed().as_secs_f64());
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("clock precedes the epoch")
        .as_secs()
}
