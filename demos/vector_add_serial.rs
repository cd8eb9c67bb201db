//! The same pipeline with the worker count fixed at one: every collective
//! degenerates to a local no-op, and the output format is unchanged.
//!
//! Usage: vector_add_serial [seed]

use blockvec::params::StdinParams;
use blockvec::{channel, pipeline};
use futures::executor;
use std::process;
use std::time::{Instant, SystemTime};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let seed: u64 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse().expect("seed must be an integer"))
        .unwrap_or_else(clock_seed);

    let start = Instant::now();
    let results = channel::run_group(1, |group| {
        let mut params = StdinParams::new();
        let mut out = std::io::stdout();
        executor::block_on(pipeline::run(&group, &mut params, &mut out, seed))
    });

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
