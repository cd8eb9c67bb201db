//! The run pipeline: read parameters, distribute, compute, reduce,
//! report.
//!
//! Every worker executes the same fixed sequence of stages in lock-step;
//! rank [`ORIGIN`] additionally reads the parameters and writes every
//! report. A stage failure surfaces through the error gate as the same
//! [`Abort`] on every rank, so the whole group tears down together; no
//! stage is ever retried.

use crate::error::Abort;
use crate::params::ParamSource;
use crate::{distribute, gate, ops, partition, reduce, WorkerGroup};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use tracing::debug;

/// The distinguished worker that reads input and reports output.
pub const ORIGIN: u32 = 0;

/// What a finished run hands back: the dot product at the origin, `None`
/// on every other rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub dot: Option<f64>,
}

/// Run the whole pipeline on this worker.
///
/// Collective: every rank must call `run`, each with its own parameter
/// source and sink, though only the origin's source is consumed and only
/// the origin writes. `seed` feeds the origin's generator, so two runs
/// with the same seed and parameters produce the same vectors.
pub async fn run<G, P, W>(
    group: &G,
    params: &mut P,
    out: &mut W,
    seed: u64,
) -> Result<RunReport, Abort>
where
    G: WorkerGroup,
    P: ParamSource,
    W: Write,
{
    // The order comes from the origin; validation happens identically on
    // every rank against the broadcast value.
    let n = broadcast_param(group, || params.read_order()).await;
    let split = partition::split_order(n, group.size());
    gate::check(
        group,
        split.is_ok(),
        "read_order",
        "n must be nonnegative and evenly divisible by the worker count",
    )
    .await?;
    let local_n = split.unwrap_or_default(); // gate aborted on the Err side
    debug!(n, local_n, "order accepted");

    let rand_max = broadcast_param(group, || params.read_rand_max()).await;
    gate::check(
        group,
        rand_max > 0,
        "read_rand_max",
        "the random bound must be positive",
    )
    .await?;

    // Both blocks live until the end of the run.
    let (mut x, mut y) = allocate_blocks(group, local_n).await?;
    let n = n as usize;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    distribute::scatter_generate(group, &mut x, n, rand_max, ORIGIN, &mut rng).await?;
    report(
        out,
        distribute::gather_summary(group, &x, n, "Vector x", ORIGIN).await?,
    );
    distribute::scatter_generate(group, &mut y, n, rand_max, ORIGIN, &mut rng).await?;
    report(
        out,
        distribute::gather_summary(group, &y, n, "Vector y", ORIGIN).await?,
    );

    let scalar = broadcast_param(group, || params.read_scalar()).await;
    debug!(scalar, "scalar accepted");
    ops::scale(&mut x, scalar);
    report(
        out,
        distribute::gather_summary(group, &x, n, "Vector x by scalar", ORIGIN).await?,
    );
    ops::scale(&mut y, scalar);
    report(
        out,
        distribute::gather_summary(group, &y, n, "Vector y by scalar", ORIGIN).await?,
    );

    let local_dot = ops::local_dot_partial(&x, &y);
    let dot = reduce::sum(group, local_dot, ORIGIN).await;
    if let Some(dot) = dot {
        let _ = writeln!(out, "\nResult of dot product: {dot:.6}");
    }

    Ok(RunReport { dot })
}

/// Read one parameter at the origin and broadcast it to everyone.
async fn broadcast_param<G, F>(group: &G, read: F) -> i64
where
    G: WorkerGroup,
    F: FnOnce() -> i64,
{
    if group.rank() == ORIGIN {
        let value = read();
        group.bcast(&value).await;
        value
    } else {
        group.recv_bcast(ORIGIN).await
    }
}

/// Reserve both local blocks, with the whole group agreeing the
/// reservations worked before anything is committed.
async fn allocate_blocks<G: WorkerGroup>(
    group: &G,
    local_n: usize,
) -> Result<(Vec<f64>, Vec<f64>), Abort> {
    let mut x: Vec<f64> = Vec::new();
    let mut y: Vec<f64> = Vec::new();
    let ok = x.try_reserve_exact(local_n).is_ok() && y.try_reserve_exact(local_n).is_ok();
    gate::check(group, ok, "allocate_blocks", "can't allocate local vector(s)").await?;
    x.resize(local_n, 0.0);
    y.resize(local_n, 0.0);
    Ok((x, y))
}

fn report<W: Write>(out: &mut W, summary: Option<String>) {
    if let Some(summary) = summary {
        let _ = writeln!(out, "{summary}");
    }
}
